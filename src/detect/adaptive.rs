//! Adaptive Gaussian-mixture subtraction strategy.
//!
//! Each pixel carries a small mixture of Gaussians over observed intensity.
//! Updates decay with a fixed-size history window, so the model keeps
//! adapting at a constant rate instead of converging like the weighted
//! average. Shadow suppression is disabled: every non-matching pixel is
//! plain foreground.
//!
//! Unlike the weighted strategy, this one reports the single largest
//! foreground component by area rather than the union of all components.

use crate::frame::{GrayFrame, Region};
use crate::MotionError;

use super::contours::{find_components, largest_bounds};
use super::morph::{mask_from_parts, MorphSettings};
use super::MotionStrategy;

/// Variance floor keeping fully-converged modes from matching nothing.
const VARIANCE_MIN: f32 = 4.0;

#[derive(Clone, Copy, Debug)]
pub struct AdaptiveSettings {
    /// Decay history length in frames; bounds the learning rate at 1/history.
    pub history: u32,
    /// Gaussian modes per pixel.
    pub mixtures: usize,
    /// Squared-distance multiplier for the match test.
    pub var_threshold: f32,
    /// Cumulative weight of modes treated as background.
    pub background_ratio: f32,
    /// Variance assigned to newly created modes.
    pub initial_variance: f32,
    pub morph: MorphSettings,
}

impl Default for AdaptiveSettings {
    fn default() -> Self {
        Self {
            history: 150,
            mixtures: 3,
            var_threshold: 25.0,
            background_ratio: 0.9,
            initial_variance: 225.0,
            morph: MorphSettings::default(),
        }
    }
}

#[derive(Clone, Copy, Debug, Default)]
struct Gaussian {
    weight: f32,
    mean: f32,
    variance: f32,
}

impl Gaussian {
    fn matches(&self, value: f32, var_threshold: f32) -> bool {
        let d = value - self.mean;
        d * d <= var_threshold * self.variance
    }
}

pub struct AdaptiveGaussianStrategy {
    settings: AdaptiveSettings,
    /// `mixtures` Gaussians per pixel, kept sorted by descending weight.
    modes: Vec<Gaussian>,
    width: u32,
    height: u32,
    frames_seen: u64,
}

impl AdaptiveGaussianStrategy {
    pub fn new(settings: AdaptiveSettings) -> Self {
        Self {
            settings,
            modes: Vec::new(),
            width: 0,
            height: 0,
            frames_seen: 0,
        }
    }

    fn check_dimensions(&self, frame: &GrayFrame) -> Result<(), MotionError> {
        if frame.dimensions() != (self.width, self.height) {
            return Err(MotionError::DimensionMismatch {
                expected: (self.width, self.height),
                actual: frame.dimensions(),
            });
        }
        Ok(())
    }

    fn learning_rate(&self) -> f32 {
        let effective = (self.frames_seen + 1).min(self.settings.history.max(1) as u64);
        1.0 / effective as f32
    }

    fn update_pixel(modes: &mut [Gaussian], value: f32, lr: f32, settings: &AdaptiveSettings) {
        let mut matched: Option<usize> = None;
        for (i, mode) in modes.iter().enumerate() {
            if mode.weight > 0.0 && mode.matches(value, settings.var_threshold) {
                matched = Some(i);
                break;
            }
        }

        match matched {
            Some(i) => {
                for (j, mode) in modes.iter_mut().enumerate() {
                    let target = if j == i { 1.0 } else { 0.0 };
                    mode.weight += lr * (target - mode.weight);
                }
                let mode = &mut modes[i];
                let d = value - mode.mean;
                mode.mean += lr * d;
                mode.variance = (mode.variance + lr * (d * d - mode.variance))
                    .clamp(VARIANCE_MIN, settings.initial_variance * 5.0);
            }
            None => {
                // Replace the weakest mode with a fresh one centered on the
                // observation.
                for mode in modes.iter_mut() {
                    mode.weight *= 1.0 - lr;
                }
                let weakest = (0..modes.len())
                    .min_by(|&a, &b| {
                        modes[a]
                            .weight
                            .partial_cmp(&modes[b].weight)
                            .unwrap_or(std::cmp::Ordering::Equal)
                    })
                    .unwrap_or(0);
                modes[weakest] = Gaussian {
                    weight: lr,
                    mean: value,
                    variance: settings.initial_variance,
                };
            }
        }

        let total: f32 = modes.iter().map(|m| m.weight).sum();
        if total > 0.0 {
            for mode in modes.iter_mut() {
                mode.weight /= total;
            }
        }
        modes.sort_by(|a, b| {
            b.weight
                .partial_cmp(&a.weight)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
    }

    fn pixel_is_foreground(&self, modes: &[Gaussian], value: f32) -> bool {
        let mut cumulative = 0.0f32;
        for mode in modes {
            if mode.weight <= 0.0 || cumulative >= self.settings.background_ratio {
                break;
            }
            if mode.matches(value, self.settings.var_threshold) {
                return false;
            }
            cumulative += mode.weight;
        }
        true
    }
}

impl MotionStrategy for AdaptiveGaussianStrategy {
    fn name(&self) -> &'static str {
        "adaptive"
    }

    fn update(&mut self, frame: &GrayFrame) -> Result<(), MotionError> {
        if self.frames_seen == 0 {
            let pixels = (frame.width() as usize) * (frame.height() as usize);
            let mut modes = vec![Gaussian::default(); pixels * self.settings.mixtures];
            for (i, &px) in frame.data().iter().enumerate() {
                modes[i * self.settings.mixtures] = Gaussian {
                    weight: 1.0,
                    mean: px as f32,
                    variance: self.settings.initial_variance,
                };
            }
            self.modes = modes;
            self.width = frame.width();
            self.height = frame.height();
            self.frames_seen = 1;
            return Ok(());
        }

        self.check_dimensions(frame)?;
        let lr = self.learning_rate();
        let mixtures = self.settings.mixtures;
        let settings = self.settings;
        for (i, &px) in frame.data().iter().enumerate() {
            let modes = &mut self.modes[i * mixtures..(i + 1) * mixtures];
            Self::update_pixel(modes, px as f32, lr, &settings);
        }
        self.frames_seen += 1;
        Ok(())
    }

    fn detect(&mut self, frame: &GrayFrame) -> Result<Option<Region>, MotionError> {
        if self.frames_seen == 0 {
            return Err(MotionError::InvalidState("adaptive model has no history"));
        }
        self.check_dimensions(frame)?;

        let mixtures = self.settings.mixtures;
        let mask_data: Vec<u8> = frame
            .data()
            .iter()
            .enumerate()
            .map(|(i, &px)| {
                let modes = &self.modes[i * mixtures..(i + 1) * mixtures];
                if self.pixel_is_foreground(modes, px as f32) {
                    255
                } else {
                    0
                }
            })
            .collect();

        let mask =
            mask_from_parts(mask_data, self.width, self.height).opened(&self.settings.morph);
        let components = find_components(&mask);
        Ok(largest_bounds(&components))
    }

    fn reset(&mut self) {
        self.modes.clear();
        self.width = 0;
        self.height = 0;
        self.frames_seen = 0;
    }
}
