//! Directory-of-JPEGs frame source.
//!
//! Reads every `.jpg`/`.jpeg` file in a directory in sorted order, decodes
//! in memory, and loops back to the first file when the sequence ends.
//! Useful for replaying captured footage through the pipeline without any
//! camera hardware.

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};

use crate::frame::Frame;

use super::{pace, FrameSource, SourceStats};

pub struct DirSource {
    dir: String,
    files: Vec<PathBuf>,
    next_index: usize,
    frame_count: u64,
    target_fps: u32,
}

impl DirSource {
    pub fn open(dir: &str, target_fps: u32) -> Result<Self> {
        let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
            .with_context(|| format!("read frame directory {}", dir))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                matches!(
                    path.extension().and_then(|e| e.to_str()),
                    Some("jpg") | Some("jpeg")
                )
            })
            .collect();
        files.sort();
        if files.is_empty() {
            return Err(anyhow!("no .jpg/.jpeg files in {}", dir));
        }
        log::info!("DirSource: {} frames in {}", files.len(), dir);
        Ok(Self {
            dir: dir.to_string(),
            files,
            next_index: 0,
            frame_count: 0,
            target_fps,
        })
    }

    fn decode(path: &PathBuf) -> Result<Frame> {
        let rgb = image::open(path)
            .with_context(|| format!("decode {}", path.display()))?
            .to_rgb8();
        let (width, height) = rgb.dimensions();
        let mut data = Vec::with_capacity(rgb.as_raw().len());
        for px in rgb.as_raw().chunks_exact(3) {
            data.extend_from_slice(&[px[2], px[1], px[0]]);
        }
        Frame::from_bgr(data, width, height)
    }
}

impl FrameSource for DirSource {
    fn next_frame(&mut self) -> Result<Frame> {
        pace(self.target_fps);
        let path = &self.files[self.next_index];
        let frame = Self::decode(path)?;
        self.next_index = (self.next_index + 1) % self.files.len();
        self.frame_count += 1;
        Ok(frame)
    }

    fn stats(&self) -> SourceStats {
        SourceStats {
            frames_captured: self.frame_count,
            url: format!("dir://{}", self.dir),
        }
    }
}
