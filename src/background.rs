//! Running background estimate.
//!
//! `BackgroundModel` keeps an exponentially-weighted moving average of the
//! normalized frames it has observed. The estimate approximates the static
//! scene: recent frames have exponentially more influence, so the model
//! adapts to slow lighting change while a transient foreground object's
//! contribution decays geometrically.
//!
//! The model is a single-owner, detection-thread-only object. It never
//! performs I/O and needs no synchronization.

use crate::frame::GrayFrame;
use crate::MotionError;

/// Exponentially-weighted moving average of observed frames.
pub struct BackgroundModel {
    weight: f32,
    estimate: Option<Vec<f32>>,
    width: u32,
    height: u32,
}

impl BackgroundModel {
    /// `weight` is the blend factor for new frames. The daemon's config
    /// validation restricts it to (0, 1); the model itself accepts the
    /// boundary values (`1.0` tracks the newest frame exactly, values near
    /// zero leave the estimate effectively frozen).
    pub fn new(weight: f32) -> Self {
        Self {
            weight,
            estimate: None,
            width: 0,
            height: 0,
        }
    }

    /// True once at least one frame has been observed.
    pub fn is_initialized(&self) -> bool {
        self.estimate.is_some()
    }

    /// Clear the estimate to absent.
    pub fn reset(&mut self) {
        self.estimate = None;
        self.width = 0;
        self.height = 0;
    }

    /// Blend a frame into the estimate.
    ///
    /// The first frame after construction or `reset` becomes the background
    /// exactly. Later frames blend element-wise:
    /// `estimate = (1 - w) * estimate + w * frame`.
    pub fn update(&mut self, frame: &GrayFrame) -> Result<(), MotionError> {
        match self.estimate.as_mut() {
            None => {
                self.estimate = Some(frame.data().iter().map(|&v| v as f32).collect());
                self.width = frame.width();
                self.height = frame.height();
                Ok(())
            }
            Some(estimate) => {
                if frame.dimensions() != (self.width, self.height) {
                    return Err(MotionError::DimensionMismatch {
                        expected: (self.width, self.height),
                        actual: frame.dimensions(),
                    });
                }
                let w = self.weight;
                for (est, &px) in estimate.iter_mut().zip(frame.data()) {
                    *est = (1.0 - w) * *est + w * (px as f32);
                }
                Ok(())
            }
        }
    }

    /// Per-pixel absolute difference between `frame` and the estimate.
    ///
    /// The estimate is truncated back to u8 before differencing.
    pub fn difference(&self, frame: &GrayFrame) -> Result<GrayFrame, MotionError> {
        let estimate = self
            .estimate
            .as_ref()
            .ok_or(MotionError::InvalidState("no background estimate"))?;
        if frame.dimensions() != (self.width, self.height) {
            return Err(MotionError::DimensionMismatch {
                expected: (self.width, self.height),
                actual: frame.dimensions(),
            });
        }
        let data = estimate
            .iter()
            .zip(frame.data())
            .map(|(&est, &px)| {
                let est = est.clamp(0.0, 255.0) as u8;
                est.abs_diff(px)
            })
            .collect();
        Ok(GrayFrame::from_parts(data, self.width, self.height))
    }

    /// Current estimate as f32 pixels, when initialized. Test hook.
    pub fn estimate(&self) -> Option<&[f32]> {
        self.estimate.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(width: u32, height: u32) -> GrayFrame {
        let data = (0..(width as usize * height as usize))
            .map(|i| (i % 256) as u8)
            .collect();
        GrayFrame::from_raw(data, width, height).unwrap()
    }

    #[test]
    fn first_update_adopts_the_frame_verbatim() {
        let mut model = BackgroundModel::new(0.5);
        let frame = gradient(20, 10);
        model.update(&frame).unwrap();

        let estimate = model.estimate().unwrap();
        for (est, &px) in estimate.iter().zip(frame.data()) {
            assert_eq!(*est, px as f32);
        }
    }

    #[test]
    fn identical_frames_converge_to_a_fixed_point() {
        let mut model = BackgroundModel::new(0.5);
        let frame = gradient(20, 10);
        model.update(&frame).unwrap();
        let converged = model.estimate().unwrap().to_vec();

        for _ in 0..10 {
            model.update(&frame).unwrap();
            assert_eq!(model.estimate().unwrap(), converged.as_slice());
        }

        let diff = model.difference(&frame).unwrap();
        assert!(diff.data().iter().all(|&v| v == 0));
    }

    #[test]
    fn difference_before_update_is_invalid_state() {
        let model = BackgroundModel::new(0.5);
        let err = model.difference(&gradient(20, 10)).unwrap_err();
        assert!(matches!(err, MotionError::InvalidState(_)));
    }

    #[test]
    fn dimension_change_is_rejected_not_reshaped() {
        let mut model = BackgroundModel::new(0.5);
        model.update(&gradient(20, 10)).unwrap();

        let err = model.update(&gradient(10, 20)).unwrap_err();
        assert_eq!(
            err,
            MotionError::DimensionMismatch {
                expected: (20, 10),
                actual: (10, 20),
            }
        );

        let err = model.difference(&gradient(10, 20)).unwrap_err();
        assert!(matches!(err, MotionError::DimensionMismatch { .. }));
    }

    #[test]
    fn reset_clears_the_estimate() {
        let mut model = BackgroundModel::new(0.5);
        model.update(&gradient(20, 10)).unwrap();
        assert!(model.is_initialized());

        model.reset();
        assert!(!model.is_initialized());
        assert!(model.difference(&gradient(20, 10)).is_err());

        // A differently-sized frame is fine after reset.
        model.update(&gradient(8, 8)).unwrap();
        assert!(model.is_initialized());
    }

    #[test]
    fn weight_one_tracks_the_newest_frame() {
        let mut model = BackgroundModel::new(1.0);
        model.update(&GrayFrame::filled(8, 8, 10)).unwrap();
        model.update(&GrayFrame::filled(8, 8, 200)).unwrap();

        let estimate = model.estimate().unwrap();
        assert!(estimate.iter().all(|&v| v == 200.0));
    }

    #[test]
    fn near_zero_weight_keeps_the_estimate_static() {
        let mut model = BackgroundModel::new(1e-6);
        model.update(&GrayFrame::filled(8, 8, 10)).unwrap();
        for _ in 0..100 {
            model.update(&GrayFrame::filled(8, 8, 250)).unwrap();
        }

        // After 100 updates at w=1e-6 the estimate has moved by well under
        // one intensity level.
        let estimate = model.estimate().unwrap();
        assert!(estimate.iter().all(|&v| v < 11.0));

        let diff = model.difference(&GrayFrame::filled(8, 8, 10)).unwrap();
        assert!(diff.data().iter().all(|&v| v == 0));
    }
}
