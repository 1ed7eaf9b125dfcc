//! Weighted-average subtraction strategy.
//!
//! The default strategy: maintain an exponentially-weighted running average
//! of normalized frames, then per frame
//!
//! 1. absolute-difference against the estimate,
//! 2. binarize above the threshold,
//! 3. erode then dilate to drop isolated noise pixels,
//! 4. merge every remaining component into one enclosing region.
//!
//! Multiple simultaneous moving regions are deliberately reported as a
//! single enclosing box rather than separately.

use crate::background::BackgroundModel;
use crate::frame::{GrayFrame, Region};
use crate::MotionError;

use super::contours::{find_components, union_bounds};
use super::morph::{binarize, MorphSettings};
use super::MotionStrategy;

#[derive(Clone, Copy, Debug)]
pub struct WeightedSettings {
    /// Blend factor for new frames, in (0, 1).
    pub weight: f32,
    /// Per-pixel difference above which a pixel is foreground, 0-255 scale.
    pub threshold: u8,
    pub morph: MorphSettings,
}

impl Default for WeightedSettings {
    fn default() -> Self {
        Self {
            weight: 0.5,
            threshold: 25,
            morph: MorphSettings::default(),
        }
    }
}

pub struct WeightedAverageStrategy {
    background: BackgroundModel,
    settings: WeightedSettings,
}

impl WeightedAverageStrategy {
    pub fn new(settings: WeightedSettings) -> Self {
        Self {
            background: BackgroundModel::new(settings.weight),
            settings,
        }
    }

    /// Read access to the background estimate. Test hook.
    pub fn background(&self) -> &BackgroundModel {
        &self.background
    }
}

impl MotionStrategy for WeightedAverageStrategy {
    fn name(&self) -> &'static str {
        "weighted"
    }

    fn update(&mut self, frame: &GrayFrame) -> Result<(), MotionError> {
        self.background.update(frame)
    }

    fn detect(&mut self, frame: &GrayFrame) -> Result<Option<Region>, MotionError> {
        let diff = self.background.difference(frame)?;
        let mask = binarize(&diff, self.settings.threshold).opened(&self.settings.morph);
        let components = find_components(&mask);
        Ok(union_bounds(&components))
    }

    fn reset(&mut self) {
        self.background.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_kernel() -> MorphSettings {
        MorphSettings {
            kernel_size: 3,
            erode_iterations: 3,
            dilate_iterations: 3,
        }
    }

    fn strategy() -> WeightedAverageStrategy {
        WeightedAverageStrategy::new(WeightedSettings {
            weight: 0.5,
            threshold: 25,
            morph: small_kernel(),
        })
    }

    fn block_frame(width: u32, height: u32, region: Region, value: u8) -> GrayFrame {
        let mut frame = GrayFrame::filled(width, height, 0);
        for y in region.min_y..region.max_y {
            for x in region.min_x..region.max_x {
                frame.set(x, y, value);
            }
        }
        frame
    }

    #[test]
    fn detect_before_update_is_invalid_state() {
        let mut strategy = strategy();
        let err = strategy.detect(&GrayFrame::filled(64, 48, 0)).unwrap_err();
        assert!(matches!(err, MotionError::InvalidState(_)));
    }

    #[test]
    fn block_region_edges_match_exactly() {
        let mut strategy = strategy();
        strategy.update(&GrayFrame::filled(64, 48, 0)).unwrap();

        let block = Region {
            min_x: 8,
            min_y: 6,
            max_x: 28,
            max_y: 36,
        };
        let frame = block_frame(64, 48, block, 255);
        let region = strategy.detect(&frame).unwrap();
        assert_eq!(region, Some(block));
    }

    #[test]
    fn frame_matching_the_background_yields_no_motion() {
        let mut strategy = strategy();
        let scene = GrayFrame::filled(64, 48, 120);
        for _ in 0..5 {
            strategy.update(&scene).unwrap();
        }
        assert_eq!(strategy.detect(&scene).unwrap(), None);
    }

    #[test]
    fn sub_threshold_change_is_no_motion_not_an_error() {
        let mut strategy = strategy();
        strategy.update(&GrayFrame::filled(64, 48, 100)).unwrap();
        // 20 levels of change is below the threshold of 25.
        assert_eq!(
            strategy.detect(&GrayFrame::filled(64, 48, 120)).unwrap(),
            None
        );
    }

    #[test]
    fn two_blocks_merge_into_one_enclosing_region() {
        let mut strategy = strategy();
        strategy.update(&GrayFrame::filled(64, 48, 0)).unwrap();

        let a = Region {
            min_x: 4,
            min_y: 4,
            max_x: 16,
            max_y: 16,
        };
        let b = Region {
            min_x: 40,
            min_y: 30,
            max_x: 56,
            max_y: 44,
        };
        let mut frame = block_frame(64, 48, a, 255);
        for y in b.min_y..b.max_y {
            for x in b.min_x..b.max_x {
                frame.set(x, y, 255);
            }
        }

        let region = strategy.detect(&frame).unwrap();
        assert_eq!(region, Some(a.union(&b)));
    }

    #[test]
    fn reset_forgets_the_scene() {
        let mut strategy = strategy();
        strategy.update(&GrayFrame::filled(64, 48, 0)).unwrap();
        strategy.reset();
        assert!(strategy.detect(&GrayFrame::filled(64, 48, 0)).is_err());
    }
}
