//! Detection pipeline thread.
//!
//! One long-lived loop: pull a frame from the source, resize it to the
//! canonical width, detect motion once the warm-up period has passed,
//! annotate, always fold the frame into the strategy's model, and publish
//! the annotated frame into the mailbox.
//!
//! The pipeline owns the source and the strategy outright; the only thing
//! it shares is the mailbox. There is no cancellation signal beyond the
//! handle's shutdown flag, checked between frames: a stalled source stalls
//! the loop with it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};

use crate::detect::{preprocess, MotionStrategy};
use crate::frame::HIGHLIGHT_BGR;
use crate::ingest::FrameSource;
use crate::mailbox::FrameMailbox;

const HEALTH_LOG_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Clone, Copy, Debug)]
pub struct PipelineSettings {
    /// Frames observed before detection starts reporting regions.
    pub warmup_frames: u64,
    /// Canonical width frames are downsampled to.
    pub target_width: u32,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            warmup_frames: 50,
            target_width: 400,
        }
    }
}

pub struct Pipeline {
    source: Box<dyn FrameSource>,
    strategy: Box<dyn MotionStrategy>,
    mailbox: Arc<FrameMailbox>,
    settings: PipelineSettings,
}

impl Pipeline {
    pub fn new(
        source: Box<dyn FrameSource>,
        strategy: Box<dyn MotionStrategy>,
        mailbox: Arc<FrameMailbox>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            source,
            strategy,
            mailbox,
            settings,
        }
    }

    /// Start the detection thread.
    pub fn spawn(self) -> PipelineHandle {
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_thread = shutdown.clone();
        let join = std::thread::spawn(move || {
            if let Err(err) = self.run(shutdown_thread) {
                log::error!("detection pipeline stopped: {}", err);
            }
        });
        PipelineHandle {
            shutdown,
            join: Some(join),
        }
    }

    fn run(mut self, shutdown: Arc<AtomicBool>) -> Result<()> {
        log::info!(
            "detection pipeline running: strategy={} warmup={} width={}",
            self.strategy.name(),
            self.settings.warmup_frames,
            self.settings.target_width
        );
        let mut frames_seen = 0u64;
        let mut last_health_log = Instant::now();

        while !shutdown.load(Ordering::SeqCst) {
            let raw = self.source.next_frame()?;
            let frame = raw.resize_to_width(self.settings.target_width);
            let normalized = preprocess(&frame);

            let annotated = if frames_seen > self.settings.warmup_frames {
                match self.strategy.detect(&normalized) {
                    Ok(Some(region)) => {
                        log::debug!(
                            "motion at ({},{})-({},{})",
                            region.min_x,
                            region.min_y,
                            region.max_x,
                            region.max_y
                        );
                        frame.with_region(region, HIGHLIGHT_BGR)
                    }
                    Ok(None) => frame,
                    Err(err) => {
                        log::warn!("detection failed, frame passed through: {}", err);
                        frame
                    }
                }
            } else {
                frame
            };

            self.strategy.update(&normalized)?;
            frames_seen += 1;
            self.mailbox.publish(annotated);

            if last_health_log.elapsed() >= HEALTH_LOG_INTERVAL {
                let stats = self.source.stats();
                log::info!(
                    "source health: frames={} url={}",
                    stats.frames_captured,
                    stats.url
                );
                last_health_log = Instant::now();
            }
        }
        log::info!("detection pipeline shut down after {} frames", frames_seen);
        Ok(())
    }
}

/// Handle for stopping the detection thread.
pub struct PipelineHandle {
    shutdown: Arc<AtomicBool>,
    join: Option<JoinHandle<()>>,
}

impl PipelineHandle {
    /// Request shutdown and wait for the thread to exit. The thread only
    /// checks the flag between frames, so a blocked source delays this.
    pub fn stop(mut self) -> Result<()> {
        self.shutdown.store(true, Ordering::SeqCst);
        if let Some(join) = self.join.take() {
            join.join()
                .map_err(|_| anyhow!("detection pipeline thread panicked"))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DetectionSettings;
    use crate::detect::{build_strategy, StrategyKind};
    use crate::ingest::{SourceConfig, SyntheticSource};
    use std::time::Duration;

    fn test_settings(strategy: StrategyKind) -> DetectionSettings {
        DetectionSettings {
            strategy,
            warmup_frames: 5,
            kernel_size: 3,
            ..DetectionSettings::default()
        }
    }

    fn spawn_pipeline(strategy: StrategyKind) -> (Arc<FrameMailbox>, PipelineHandle) {
        let source = SyntheticSource::new(SourceConfig {
            url: "stub://pipeline_test".to_string(),
            width: 320,
            height: 240,
            target_fps: 0,
        });
        let settings = test_settings(strategy);
        let mailbox = Arc::new(FrameMailbox::new());
        let pipeline = Pipeline::new(
            Box::new(source),
            build_strategy(&settings),
            mailbox.clone(),
            PipelineSettings {
                warmup_frames: settings.warmup_frames,
                target_width: settings.target_width,
            },
        );
        (mailbox.clone(), pipeline.spawn())
    }

    #[test]
    fn pipeline_publishes_resized_frames() {
        let (mailbox, handle) = spawn_pipeline(StrategyKind::Weighted);

        let (frame, _) = mailbox
            .wait_newer(0, Duration::from_secs(10))
            .expect("pipeline should publish");
        assert_eq!(frame.width(), 400);
        assert_eq!(frame.height(), 300);

        handle.stop().unwrap();
    }

    #[test]
    fn pipeline_keeps_publishing_newer_frames() {
        let (mailbox, handle) = spawn_pipeline(StrategyKind::Weighted);

        let (_, seq1) = mailbox.wait_newer(0, Duration::from_secs(10)).unwrap();
        let (_, seq2) = mailbox.wait_newer(seq1, Duration::from_secs(10)).unwrap();
        assert!(seq2 > seq1);

        handle.stop().unwrap();
    }

    #[test]
    fn stop_joins_the_thread() {
        let (_, handle) = spawn_pipeline(StrategyKind::Adaptive);
        handle.stop().unwrap();
    }
}
