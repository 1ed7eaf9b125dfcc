//! Frame sources.
//!
//! A source produces one BGR8 color frame per call, blocking until one is
//! available. Sources available here:
//!
//! - `stub://<name>`: deterministic synthetic scene (testing, demos)
//! - `dir://<path>`: directory of JPEG files consumed in sorted order
//!
//! Camera drivers and codec handling stay outside this crate; a hardware
//! deployment wraps its capture library in `FrameSource` and hands it to the
//! pipeline.

mod file;
mod synthetic;

pub use file::DirSource;
pub use synthetic::SyntheticSource;

use anyhow::{anyhow, Result};
use serde::Deserialize;

use crate::frame::Frame;

const DEFAULT_SOURCE_URL: &str = "stub://front_camera";
const DEFAULT_SOURCE_WIDTH: u32 = 640;
const DEFAULT_SOURCE_HEIGHT: u32 = 480;
const DEFAULT_SOURCE_FPS: u32 = 30;

/// Pull-based frame producer. One blocking call, one frame.
pub trait FrameSource: Send {
    /// Capture the next frame, blocking until one is available.
    fn next_frame(&mut self) -> Result<Frame>;

    /// Health counters for periodic logging.
    fn stats(&self) -> SourceStats;
}

/// Statistics for a frame source.
#[derive(Clone, Debug)]
pub struct SourceStats {
    pub frames_captured: u64,
    pub url: String,
}

/// Configuration for a frame source.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Source URL (`stub://...` or `dir:///path/to/jpegs`).
    pub url: String,
    /// Capture width (synthetic sources only).
    pub width: u32,
    /// Capture height (synthetic sources only).
    pub height: u32,
    /// Target frame rate; 0 disables pacing (tests run unthrottled).
    pub target_fps: u32,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_SOURCE_URL.to_string(),
            width: DEFAULT_SOURCE_WIDTH,
            height: DEFAULT_SOURCE_HEIGHT,
            target_fps: DEFAULT_SOURCE_FPS,
        }
    }
}

/// Open the source named by the config URL.
pub fn open_source(config: &SourceConfig) -> Result<Box<dyn FrameSource>> {
    if config.url.starts_with("stub://") {
        Ok(Box::new(SyntheticSource::new(config.clone())))
    } else if let Some(path) = config.url.strip_prefix("dir://") {
        Ok(Box::new(DirSource::open(path, config.target_fps)?))
    } else {
        Err(anyhow!(
            "unsupported source url '{}' (expected stub:// or dir://)",
            config.url
        ))
    }
}

/// Sleep long enough to hold `target_fps`; no-op when pacing is disabled.
pub(crate) fn pace(target_fps: u32) {
    if target_fps > 0 {
        std::thread::sleep(std::time::Duration::from_millis(1000 / target_fps as u64));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_scheme_is_rejected() {
        let config = SourceConfig {
            url: "rtsp://camera".to_string(),
            ..SourceConfig::default()
        };
        assert!(open_source(&config).is_err());
    }

    #[test]
    fn stub_scheme_opens_a_synthetic_source() {
        let config = SourceConfig {
            url: "stub://test".to_string(),
            target_fps: 0,
            ..SourceConfig::default()
        };
        let mut source = open_source(&config).unwrap();
        let frame = source.next_frame().unwrap();
        assert_eq!(frame.width(), 640);
        assert_eq!(frame.height(), 480);
        assert_eq!(source.stats().frames_captured, 1);
    }
}
