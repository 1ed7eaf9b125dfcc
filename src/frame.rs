//! Frame types.
//!
//! - `Frame`: 3-channel BGR8 color image, the unit that crosses the mailbox.
//! - `GrayFrame`: 1-channel intensity image, the normalized form the
//!   detection strategies consume.
//! - `Region`: axis-aligned bounding rectangle of detected foreground.
//!
//! Frames are immutable snapshots: every transformation (resize, grayscale,
//! blur, annotation) produces a new frame rather than mutating the source.
//! All pixel arithmetic is integer-only so repeated transformations of the
//! same input are bit-identical.

use anyhow::{anyhow, Result};

use crate::MotionError;

/// Rectangle outline color for annotated regions, BGR order.
pub const HIGHLIGHT_BGR: [u8; 3] = [255, 255, 0];

/// Outline thickness in pixels for annotated regions.
const OUTLINE_THICKNESS: u32 = 2;

// ----------------------------------------------------------------------------
// Region
// ----------------------------------------------------------------------------

/// Axis-aligned bounding rectangle in pixel coordinates.
///
/// `min_x`/`min_y` are inclusive; `max_x`/`max_y` are exclusive (one past the
/// last foreground pixel), so `width == max_x - min_x`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Region {
    pub min_x: u32,
    pub min_y: u32,
    pub max_x: u32,
    pub max_y: u32,
}

impl Region {
    pub fn width(&self) -> u32 {
        self.max_x.saturating_sub(self.min_x)
    }

    pub fn height(&self) -> u32 {
        self.max_y.saturating_sub(self.min_y)
    }

    pub fn area(&self) -> u32 {
        self.width() * self.height()
    }

    /// Smallest rectangle enclosing both regions.
    pub fn union(&self, other: &Region) -> Region {
        Region {
            min_x: self.min_x.min(other.min_x),
            min_y: self.min_y.min(other.min_y),
            max_x: self.max_x.max(other.max_x),
            max_y: self.max_y.max(other.max_y),
        }
    }
}

// ----------------------------------------------------------------------------
// Frame: BGR8 color image
// ----------------------------------------------------------------------------

/// Fixed-size BGR8 color frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
}

impl Frame {
    /// Wrap an interleaved BGR8 pixel buffer.
    pub fn from_bgr(data: Vec<u8>, width: u32, height: u32) -> Result<Self> {
        let expected = (width as usize) * (height as usize) * 3;
        if data.len() != expected {
            return Err(anyhow!(
                "pixel buffer is {} bytes, expected {} for {}x{} BGR8",
                data.len(),
                expected,
                width,
                height
            ));
        }
        Ok(Self {
            data,
            width,
            height,
        })
    }

    /// Solid-color frame.
    pub fn filled(width: u32, height: u32, bgr: [u8; 3]) -> Self {
        let mut data = Vec::with_capacity((width as usize) * (height as usize) * 3);
        for _ in 0..(width as usize) * (height as usize) {
            data.extend_from_slice(&bgr);
        }
        Self {
            data,
            width,
            height,
        }
    }

    /// Internal constructor for buffers whose length is correct by
    /// construction.
    pub(crate) fn from_parts_bgr(data: Vec<u8>, width: u32, height: u32) -> Self {
        debug_assert_eq!(data.len(), (width as usize) * (height as usize) * 3);
        Self {
            data,
            width,
            height,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Copy of this frame with a solid rectangle painted over it, clamped to
    /// the frame bounds.
    pub fn with_filled_rect(&self, x: u32, y: u32, w: u32, h: u32, bgr: [u8; 3]) -> Frame {
        let mut out = self.clone();
        for py in y..(y + h).min(self.height) {
            for px in x..(x + w).min(self.width) {
                out.put_pixel(px, py, bgr);
            }
        }
        out
    }

    fn pixel_index(&self, x: u32, y: u32) -> usize {
        ((y as usize) * (self.width as usize) + (x as usize)) * 3
    }

    /// Aspect-preserving resize to a canonical width (nearest neighbor).
    ///
    /// Returns a clone when the frame is already at the target width.
    pub fn resize_to_width(&self, target_width: u32) -> Frame {
        if target_width == 0 || target_width == self.width {
            return self.clone();
        }
        let target_height =
            (((self.height as u64) * (target_width as u64)) / (self.width as u64)).max(1) as u32;
        let mut data = vec![0u8; (target_width as usize) * (target_height as usize) * 3];
        for y in 0..target_height {
            let src_y = ((y as u64) * (self.height as u64) / (target_height as u64)) as u32;
            for x in 0..target_width {
                let src_x = ((x as u64) * (self.width as u64) / (target_width as u64)) as u32;
                let src = self.pixel_index(src_x, src_y);
                let dst = ((y as usize) * (target_width as usize) + (x as usize)) * 3;
                data[dst..dst + 3].copy_from_slice(&self.data[src..src + 3]);
            }
        }
        Frame {
            data,
            width: target_width,
            height: target_height,
        }
    }

    /// Reduce to a single intensity channel (BT.601 luma, integer rounding).
    pub fn to_gray(&self) -> GrayFrame {
        let mut data = Vec::with_capacity((self.width as usize) * (self.height as usize));
        for px in self.data.chunks_exact(3) {
            let (b, g, r) = (px[0] as u32, px[1] as u32, px[2] as u32);
            data.push(((299 * r + 587 * g + 114 * b + 500) / 1000) as u8);
        }
        GrayFrame {
            data,
            width: self.width,
            height: self.height,
        }
    }

    /// Copy of this frame with a rectangle outline drawn around `region`.
    pub fn with_region(&self, region: Region, bgr: [u8; 3]) -> Frame {
        let mut out = self.clone();
        let x0 = region.min_x.min(self.width);
        let x1 = region.max_x.min(self.width);
        let y0 = region.min_y.min(self.height);
        let y1 = region.max_y.min(self.height);
        if x0 >= x1 || y0 >= y1 {
            return out;
        }
        for t in 0..OUTLINE_THICKNESS {
            // Horizontal edges.
            for x in x0..x1 {
                if y0 + t < y1 {
                    out.put_pixel(x, y0 + t, bgr);
                }
                if y1 > t + 1 && y1 - t - 1 >= y0 {
                    out.put_pixel(x, y1 - t - 1, bgr);
                }
            }
            // Vertical edges.
            for y in y0..y1 {
                if x0 + t < x1 {
                    out.put_pixel(x0 + t, y, bgr);
                }
                if x1 > t + 1 && x1 - t - 1 >= x0 {
                    out.put_pixel(x1 - t - 1, y, bgr);
                }
            }
        }
        out
    }

    fn put_pixel(&mut self, x: u32, y: u32, bgr: [u8; 3]) {
        let idx = self.pixel_index(x, y);
        self.data[idx..idx + 3].copy_from_slice(&bgr);
    }

    /// Encode as JPEG for the streaming sink.
    pub fn encode_jpeg(&self, quality: u8) -> Result<Vec<u8>, MotionError> {
        // The jpeg encoder wants RGB order.
        let mut rgb = Vec::with_capacity(self.data.len());
        for px in self.data.chunks_exact(3) {
            rgb.extend_from_slice(&[px[2], px[1], px[0]]);
        }
        let mut out = Vec::new();
        let mut encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut out, quality);
        encoder
            .encode(
                &rgb,
                self.width,
                self.height,
                image::ExtendedColorType::Rgb8,
            )
            .map_err(|e| MotionError::Encoding(e.to_string()))?;
        Ok(out)
    }
}

// ----------------------------------------------------------------------------
// GrayFrame: 1-channel intensity image
// ----------------------------------------------------------------------------

/// Single-channel 8-bit frame, the normalized form strategies consume.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GrayFrame {
    data: Vec<u8>,
    width: u32,
    height: u32,
}

/// 7-tap binomial kernel approximating a Gaussian; weights sum to 64.
const BLUR_KERNEL: [u32; 7] = [1, 6, 15, 20, 15, 6, 1];
const BLUR_KERNEL_SUM: u32 = 64;
const BLUR_RADIUS: i64 = 3;

impl GrayFrame {
    pub fn from_raw(data: Vec<u8>, width: u32, height: u32) -> Result<Self> {
        let expected = (width as usize) * (height as usize);
        if data.len() != expected {
            return Err(anyhow!(
                "pixel buffer is {} bytes, expected {} for {}x{} gray",
                data.len(),
                expected,
                width,
                height
            ));
        }
        Ok(Self {
            data,
            width,
            height,
        })
    }

    pub fn filled(width: u32, height: u32, value: u8) -> Self {
        Self {
            data: vec![value; (width as usize) * (height as usize)],
            width,
            height,
        }
    }

    /// Internal constructor for buffers whose length is correct by
    /// construction.
    pub(crate) fn from_parts(data: Vec<u8>, width: u32, height: u32) -> Self {
        debug_assert_eq!(data.len(), (width as usize) * (height as usize));
        Self {
            data,
            width,
            height,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn get(&self, x: u32, y: u32) -> u8 {
        self.data[(y as usize) * (self.width as usize) + (x as usize)]
    }

    pub fn set(&mut self, x: u32, y: u32, value: u8) {
        self.data[(y as usize) * (self.width as usize) + (x as usize)] = value;
    }

    /// 7x7 Gaussian smoothing (separable binomial approximation, replicated
    /// borders). Deterministic: integer arithmetic only.
    pub fn blurred(&self) -> GrayFrame {
        let w = self.width as i64;
        let h = self.height as i64;
        let mut horizontal = vec![0u8; self.data.len()];
        for y in 0..h {
            for x in 0..w {
                let mut acc = 0u32;
                for (k, weight) in BLUR_KERNEL.iter().enumerate() {
                    let sx = (x + k as i64 - BLUR_RADIUS).clamp(0, w - 1);
                    acc += weight * self.data[(y * w + sx) as usize] as u32;
                }
                horizontal[(y * w + x) as usize] =
                    ((acc + BLUR_KERNEL_SUM / 2) / BLUR_KERNEL_SUM) as u8;
            }
        }
        let mut data = vec![0u8; self.data.len()];
        for y in 0..h {
            for x in 0..w {
                let mut acc = 0u32;
                for (k, weight) in BLUR_KERNEL.iter().enumerate() {
                    let sy = (y + k as i64 - BLUR_RADIUS).clamp(0, h - 1);
                    acc += weight * horizontal[(sy * w + x) as usize] as u32;
                }
                data[(y * w + x) as usize] =
                    ((acc + BLUR_KERNEL_SUM / 2) / BLUR_KERNEL_SUM) as u8;
            }
        }
        GrayFrame {
            data,
            width: self.width,
            height: self.height,
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
