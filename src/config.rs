//! Daemon configuration.
//!
//! Layered the usual way: built-in defaults, then an optional JSON config
//! file (`SENTRY_CONFIG`), then environment overrides, then a `validate`
//! pass. The daemon binary applies its CLI flags between the env overrides
//! and validation.

use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::Path;

use crate::detect::StrategyKind;
use crate::ingest::SourceConfig;
use crate::stream::StreamConfig;

const DEFAULT_WEIGHT: f32 = 0.5;
const DEFAULT_THRESHOLD: u8 = 25;
const DEFAULT_WARMUP_FRAMES: u64 = 50;
const DEFAULT_TARGET_WIDTH: u32 = 400;
const DEFAULT_KERNEL_SIZE: u32 = 20;
const DEFAULT_ERODE_ITERATIONS: u32 = 3;
const DEFAULT_DILATE_ITERATIONS: u32 = 3;
const DEFAULT_HISTORY: u32 = 150;

#[derive(Debug, Default, Deserialize)]
struct SentryConfigFile {
    source: Option<SourceConfig>,
    detection: Option<DetectionSettingsFile>,
    stream: Option<StreamConfigFile>,
}

#[derive(Debug, Default, Deserialize)]
struct DetectionSettingsFile {
    strategy: Option<StrategyKind>,
    weight: Option<f32>,
    threshold: Option<u8>,
    warmup_frames: Option<u64>,
    target_width: Option<u32>,
    kernel_size: Option<u32>,
    erode_iterations: Option<u32>,
    dilate_iterations: Option<u32>,
    history: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct StreamConfigFile {
    addr: Option<String>,
    jpeg_quality: Option<u8>,
}

/// Detection parameters, resolved from all layers.
#[derive(Clone, Debug)]
pub struct DetectionSettings {
    pub strategy: StrategyKind,
    /// Background blend weight, strictly inside (0, 1).
    pub weight: f32,
    /// Binarization threshold on the 0-255 difference scale.
    pub threshold: u8,
    /// Frames observed before detection starts reporting regions.
    pub warmup_frames: u64,
    /// Canonical width frames are downsampled to before detection.
    pub target_width: u32,
    pub kernel_size: u32,
    pub erode_iterations: u32,
    pub dilate_iterations: u32,
    /// Decay history for the adaptive strategy.
    pub history: u32,
}

impl Default for DetectionSettings {
    fn default() -> Self {
        Self {
            strategy: StrategyKind::Weighted,
            weight: DEFAULT_WEIGHT,
            threshold: DEFAULT_THRESHOLD,
            warmup_frames: DEFAULT_WARMUP_FRAMES,
            target_width: DEFAULT_TARGET_WIDTH,
            kernel_size: DEFAULT_KERNEL_SIZE,
            erode_iterations: DEFAULT_ERODE_ITERATIONS,
            dilate_iterations: DEFAULT_DILATE_ITERATIONS,
            history: DEFAULT_HISTORY,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct SentryConfig {
    pub source: SourceConfig,
    pub detection: DetectionSettings,
    pub stream: StreamConfig,
}

impl SentryConfig {
    /// Load from `SENTRY_CONFIG` (when set), apply env overrides, validate.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("SENTRY_CONFIG").ok();
        let mut cfg = Self::load_without_validation(config_path.as_deref().map(Path::new))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// File + env layers only; the daemon applies CLI flags before
    /// validating.
    pub fn load_without_validation(path: Option<&Path>) -> Result<Self> {
        let file_cfg = match path {
            Some(path) => read_config_file(path)?,
            None => SentryConfigFile::default(),
        };
        let mut cfg = Self::from_file(file_cfg);
        cfg.apply_env()?;
        Ok(cfg)
    }

    fn from_file(file: SentryConfigFile) -> Self {
        let detection_file = file.detection.unwrap_or_default();
        let defaults = DetectionSettings::default();
        let detection = DetectionSettings {
            strategy: detection_file.strategy.unwrap_or(defaults.strategy),
            weight: detection_file.weight.unwrap_or(defaults.weight),
            threshold: detection_file.threshold.unwrap_or(defaults.threshold),
            warmup_frames: detection_file
                .warmup_frames
                .unwrap_or(defaults.warmup_frames),
            target_width: detection_file
                .target_width
                .unwrap_or(defaults.target_width),
            kernel_size: detection_file.kernel_size.unwrap_or(defaults.kernel_size),
            erode_iterations: detection_file
                .erode_iterations
                .unwrap_or(defaults.erode_iterations),
            dilate_iterations: detection_file
                .dilate_iterations
                .unwrap_or(defaults.dilate_iterations),
            history: detection_file.history.unwrap_or(defaults.history),
        };
        let stream_file = file.stream.unwrap_or_default();
        let stream_defaults = StreamConfig::default();
        let stream = StreamConfig {
            addr: stream_file.addr.unwrap_or(stream_defaults.addr),
            jpeg_quality: stream_file
                .jpeg_quality
                .unwrap_or(stream_defaults.jpeg_quality),
        };
        Self {
            source: file.source.unwrap_or_default(),
            detection,
            stream,
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(addr) = std::env::var("SENTRY_ADDR") {
            if !addr.trim().is_empty() {
                self.stream.addr = addr;
            }
        }
        if let Ok(url) = std::env::var("SENTRY_SOURCE_URL") {
            if !url.trim().is_empty() {
                self.source.url = url;
            }
        }
        if let Ok(strategy) = std::env::var("SENTRY_STRATEGY") {
            if !strategy.trim().is_empty() {
                self.detection.strategy = strategy.parse()?;
            }
        }
        if let Ok(weight) = std::env::var("SENTRY_WEIGHT") {
            self.detection.weight = weight
                .parse()
                .map_err(|_| anyhow!("SENTRY_WEIGHT must be a number in (0, 1)"))?;
        }
        if let Ok(threshold) = std::env::var("SENTRY_THRESHOLD") {
            self.detection.threshold = threshold
                .parse()
                .map_err(|_| anyhow!("SENTRY_THRESHOLD must be an integer in 0-255"))?;
        }
        if let Ok(warmup) = std::env::var("SENTRY_WARMUP") {
            self.detection.warmup_frames = warmup
                .parse()
                .map_err(|_| anyhow!("SENTRY_WARMUP must be a frame count"))?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let d = &self.detection;
        if !(d.weight > 0.0 && d.weight < 1.0) {
            return Err(anyhow!(
                "background weight must be strictly inside (0, 1), got {}",
                d.weight
            ));
        }
        if d.target_width == 0 {
            return Err(anyhow!("target width must be non-zero"));
        }
        if d.kernel_size == 0 {
            return Err(anyhow!("morphology kernel size must be non-zero"));
        }
        if d.history == 0 {
            return Err(anyhow!("adaptive history must be non-zero"));
        }
        if self.source.width == 0 || self.source.height == 0 {
            return Err(anyhow!("source dimensions must be non-zero"));
        }
        if !(1..=100).contains(&self.stream.jpeg_quality) {
            return Err(anyhow!(
                "jpeg quality must be in 1-100, got {}",
                self.stream.jpeg_quality
            ));
        }
        Ok(())
    }
}

fn read_config_file(path: &Path) -> Result<SentryConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let cfg = serde_json::from_str(&raw)
        .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?;
    Ok(cfg)
}
