//! Motion detection strategies.
//!
//! Two interchangeable strategies sit behind the `MotionStrategy` trait:
//!
//! - `WeightedAverageStrategy` (default): manual subtraction against a
//!   running-average background estimate; merges every foreground component
//!   into one enclosing region.
//! - `AdaptiveGaussianStrategy`: per-pixel mixture of Gaussians with a
//!   fixed-size decay history; reports the single largest component by area.
//!
//! Both consume frames that have already been normalized by `preprocess`.
//! The pipeline applies the same normalization before every `update` and
//! every `detect`, so the strategies never compare a raw frame against a
//! normalized estimate.

mod adaptive;
mod contours;
mod morph;
mod weighted;

pub use adaptive::{AdaptiveGaussianStrategy, AdaptiveSettings};
pub use contours::{find_components, largest_bounds, union_bounds, Component};
pub use morph::{binarize, Mask, MorphSettings};
pub use weighted::{WeightedAverageStrategy, WeightedSettings};

use serde::Deserialize;

use crate::config::DetectionSettings;
use crate::frame::{Frame, GrayFrame, Region};
use crate::MotionError;

/// Polymorphic detection capability.
///
/// `update` folds a normalized frame into the strategy's scene model;
/// `detect` reports the bounding region of whatever currently differs from
/// it. `detect` before the first `update` fails with
/// `MotionError::InvalidState`; a frame with no foreground yields `Ok(None)`.
pub trait MotionStrategy: Send {
    /// Strategy identifier for logs.
    fn name(&self) -> &'static str;

    /// Fold a normalized frame into the scene model.
    fn update(&mut self, frame: &GrayFrame) -> Result<(), MotionError>;

    /// Locate motion in a normalized frame. Read-only on the scene model.
    fn detect(&mut self, frame: &GrayFrame) -> Result<Option<Region>, MotionError>;

    /// Discard the scene model.
    fn reset(&mut self);
}

/// Which strategy the pipeline is constructed with.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    #[default]
    Weighted,
    Adaptive,
}

impl std::str::FromStr for StrategyKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "weighted" => Ok(StrategyKind::Weighted),
            "adaptive" => Ok(StrategyKind::Adaptive),
            other => Err(anyhow::anyhow!(
                "unknown strategy '{}' (expected 'weighted' or 'adaptive')",
                other
            )),
        }
    }
}

/// Normalize a color frame for detection: single intensity channel plus 7x7
/// Gaussian smoothing to suppress sensor noise. Deterministic.
///
/// Downsampling to the canonical width happens in the pipeline before this,
/// so detected regions are in the resized frame's coordinates.
pub fn preprocess(frame: &Frame) -> GrayFrame {
    frame.to_gray().blurred()
}

/// Construct the configured strategy.
pub fn build_strategy(settings: &DetectionSettings) -> Box<dyn MotionStrategy> {
    let morph = MorphSettings {
        kernel_size: settings.kernel_size,
        erode_iterations: settings.erode_iterations,
        dilate_iterations: settings.dilate_iterations,
    };
    match settings.strategy {
        StrategyKind::Weighted => Box::new(WeightedAverageStrategy::new(WeightedSettings {
            weight: settings.weight,
            threshold: settings.threshold,
            morph,
        })),
        StrategyKind::Adaptive => Box::new(AdaptiveGaussianStrategy::new(AdaptiveSettings {
            history: settings.history,
            morph,
            ..AdaptiveSettings::default()
        })),
    }
}
