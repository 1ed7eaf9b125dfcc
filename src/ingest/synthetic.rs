//! Synthetic scene source.
//!
//! Generates a deterministic static background (a horizontal gradient) with
//! a bright square block that enters the scene after a fixed frame count and
//! drifts across it. A small amount of per-pixel sensor noise keeps the
//! stream from being perfectly static; the noise amplitude sits far below
//! the detection threshold so it never produces foreground on its own.

use rand::Rng;

use crate::frame::Frame;

use super::{pace, FrameSource, SourceConfig, SourceStats};

/// Frame index at which the moving block enters the scene.
const BLOCK_ENTERS_AT: u64 = 60;
/// Side length of the moving block, relative to frame width.
const BLOCK_FRACTION: u32 = 8;
/// Horizontal drift per frame, in pixels.
const BLOCK_SPEED: u32 = 3;
/// Peak-to-peak sensor noise amplitude in intensity levels.
const NOISE_AMPLITUDE: u8 = 2;

pub struct SyntheticSource {
    config: SourceConfig,
    frame_count: u64,
    noise: bool,
}

impl SyntheticSource {
    pub fn new(config: SourceConfig) -> Self {
        log::info!("SyntheticSource: connected to {}", config.url);
        Self {
            config,
            frame_count: 0,
            noise: true,
        }
    }

    /// Disable sensor noise for fully deterministic output.
    pub fn without_noise(mut self) -> Self {
        self.noise = false;
        self
    }

    /// Block geometry at a given frame index, when the block is on screen.
    pub fn block_at(&self, frame_index: u64) -> Option<(u32, u32, u32)> {
        if frame_index < BLOCK_ENTERS_AT {
            return None;
        }
        let size = (self.config.width / BLOCK_FRACTION).max(4);
        let travel = self.config.width.saturating_sub(size).max(1);
        let offset = ((frame_index - BLOCK_ENTERS_AT) as u32 * BLOCK_SPEED) % travel;
        let y = self.config.height / 3;
        Some((offset, y, size))
    }

    fn render(&self, frame_index: u64) -> Frame {
        let (width, height) = (self.config.width, self.config.height);
        let mut data = Vec::with_capacity((width as usize) * (height as usize) * 3);
        let mut rng = rand::thread_rng();
        for y in 0..height {
            for x in 0..width {
                // Static diagonal gradient background.
                let mut tone =
                    ((x * 140) / width.max(1) + (y * 60) / height.max(1) + 20) as u8;
                if self.noise {
                    tone = tone.saturating_add(rng.gen_range(0..=NOISE_AMPLITUDE));
                }
                data.extend_from_slice(&[tone, tone, tone]);
            }
        }
        let mut frame = Frame::from_parts_bgr(data, width, height);
        if let Some((bx, by, size)) = self.block_at(frame_index) {
            frame = frame.with_filled_rect(bx, by, size, size, [250, 250, 250]);
        }
        frame
    }
}

impl FrameSource for SyntheticSource {
    fn next_frame(&mut self) -> anyhow::Result<Frame> {
        pace(self.config.target_fps);
        let frame = self.render(self.frame_count);
        self.frame_count += 1;
        Ok(frame)
    }

    fn stats(&self) -> SourceStats {
        SourceStats {
            frames_captured: self.frame_count,
            url: self.config.url.clone(),
        }
    }
}
