//! Binary mask and morphological noise suppression.
//!
//! A `Mask` is a 0-or-255 grid derived per frame and never retained between
//! calls. Erosion followed by dilation (morphological opening) removes
//! isolated noise pixels while preserving larger contiguous foreground blobs.
//!
//! Both operators use a rectangular structuring element, which makes them
//! separable: a horizontal min/max pass followed by a vertical one. Pixels
//! outside the image do not participate in the window, so an opening with
//! matching iteration counts restores the exact edges of blobs that survive
//! the erosion.

use serde::Deserialize;

use crate::frame::GrayFrame;

/// Morphology parameters shared by both detection strategies.
#[derive(Clone, Copy, Debug, Deserialize)]
pub struct MorphSettings {
    /// Side length of the square structuring element.
    pub kernel_size: u32,
    pub erode_iterations: u32,
    pub dilate_iterations: u32,
}

impl Default for MorphSettings {
    fn default() -> Self {
        Self {
            kernel_size: 20,
            erode_iterations: 3,
            dilate_iterations: 3,
        }
    }
}

/// Binary foreground mask. Values are 0 (background) or 255 (foreground).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Mask {
    data: Vec<u8>,
    width: u32,
    height: u32,
}

impl Mask {
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn get(&self, x: u32, y: u32) -> u8 {
        self.data[(y as usize) * (self.width as usize) + (x as usize)]
    }

    pub fn count_foreground(&self) -> usize {
        self.data.iter().filter(|&&v| v != 0).count()
    }

    /// Apply `erode_iterations` erosions then `dilate_iterations` dilations.
    pub fn opened(&self, settings: &MorphSettings) -> Mask {
        let mut mask = self.clone();
        for _ in 0..settings.erode_iterations {
            mask = mask.filtered(settings.kernel_size, true);
        }
        for _ in 0..settings.dilate_iterations {
            mask = mask.filtered(settings.kernel_size, false);
        }
        mask
    }

    /// One separable min (erode) or max (dilate) pass with a square kernel.
    fn filtered(&self, kernel_size: u32, erode: bool) -> Mask {
        if kernel_size <= 1 {
            return self.clone();
        }
        let k = kernel_size as i64;
        // Anchor at the kernel center; for even sizes the window extends one
        // pixel further to the right/bottom.
        let before = k / 2;
        let after = k - 1 - before;

        let w = self.width as i64;
        let h = self.height as i64;

        let mut horizontal = vec![0u8; self.data.len()];
        for y in 0..h {
            let row = (y * w) as usize;
            for x in 0..w {
                let lo = (x - before).max(0) as usize;
                let hi = (x + after).min(w - 1) as usize;
                let window = &self.data[row + lo..=row + hi];
                horizontal[row + x as usize] = if erode {
                    *window.iter().min().unwrap_or(&0)
                } else {
                    *window.iter().max().unwrap_or(&0)
                };
            }
        }

        let mut data = vec![0u8; self.data.len()];
        for x in 0..w {
            for y in 0..h {
                let lo = (y - before).max(0);
                let hi = (y + after).min(h - 1);
                let mut value = horizontal[(lo * w + x) as usize];
                for sy in (lo + 1)..=hi {
                    let v = horizontal[(sy * w + x) as usize];
                    if (erode && v < value) || (!erode && v > value) {
                        value = v;
                    }
                }
                data[(y * w + x) as usize] = value;
            }
        }

        Mask {
            data,
            width: self.width,
            height: self.height,
        }
    }
}

/// Binarize a difference image: strictly above `threshold` becomes
/// foreground (255), everything else background (0).
pub fn binarize(diff: &GrayFrame, threshold: u8) -> Mask {
    Mask {
        data: diff
            .data()
            .iter()
            .map(|&v| if v > threshold { 255 } else { 0 })
            .collect(),
        width: diff.width(),
        height: diff.height(),
    }
}

pub(crate) fn mask_from_parts(data: Vec<u8>, width: u32, height: u32) -> Mask {
    debug_assert_eq!(data.len(), (width as usize) * (height as usize));
    Mask {
        data,
        width,
        height,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block_mask(width: u32, height: u32, x0: u32, y0: u32, x1: u32, y1: u32) -> Mask {
        let mut data = vec![0u8; (width as usize) * (height as usize)];
        for y in y0..y1 {
            for x in x0..x1 {
                data[(y as usize) * (width as usize) + (x as usize)] = 255;
            }
        }
        mask_from_parts(data, width, height)
    }

    #[test]
    fn binarize_is_strictly_greater_than() {
        let diff = GrayFrame::from_raw(vec![0, 24, 25, 26, 255], 5, 1).unwrap();
        let mask = binarize(&diff, 25);
        assert_eq!(mask.data(), &[0, 0, 0, 255, 255]);
    }

    #[test]
    fn opening_removes_isolated_pixels() {
        let mut data = vec![0u8; 32 * 32];
        data[5 * 32 + 5] = 255;
        data[20 * 32 + 17] = 255;
        let mask = mask_from_parts(data, 32, 32);

        let settings = MorphSettings {
            kernel_size: 3,
            erode_iterations: 1,
            dilate_iterations: 1,
        };
        let opened = mask.opened(&settings);
        assert_eq!(opened.count_foreground(), 0);
    }

    #[test]
    fn opening_restores_surviving_block_edges() {
        let mask = block_mask(64, 48, 8, 6, 28, 36);
        let settings = MorphSettings {
            kernel_size: 3,
            erode_iterations: 3,
            dilate_iterations: 3,
        };
        let opened = mask.opened(&settings);
        assert_eq!(opened, mask);
    }

    #[test]
    fn erosion_shrinks_below_kernel_blobs_away() {
        // A 4x4 blob cannot survive a 5x5 erosion.
        let mask = block_mask(32, 32, 10, 10, 14, 14);
        let settings = MorphSettings {
            kernel_size: 5,
            erode_iterations: 1,
            dilate_iterations: 1,
        };
        assert_eq!(mask.opened(&settings).count_foreground(), 0);
    }

    #[test]
    fn dilation_grows_by_kernel_radius() {
        let mask = block_mask(32, 32, 10, 10, 12, 12);
        let dilated = mask.filtered(3, false);
        // One pixel of growth on every side.
        for y in 9..13 {
            for x in 9..13 {
                assert_eq!(dilated.get(x, y), 255, "({x},{y})");
            }
        }
        assert_eq!(dilated.get(8, 10), 0);
        assert_eq!(dilated.count_foreground(), 16);
    }
}
