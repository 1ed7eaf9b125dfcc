//! Motion Sentry
//!
//! This crate implements a background-subtraction motion detector with an
//! MJPEG streaming front end.
//!
//! # Architecture
//!
//! Two long-lived threads communicate through a single-slot mailbox:
//!
//! 1. **Detection thread** (`pipeline`): pulls frames from a `FrameSource`,
//!    resizes them to a canonical width, runs a `MotionStrategy`, annotates
//!    the frame with the detected region, and publishes it.
//! 2. **Streaming threads** (`stream`): one per HTTP client, each waiting on
//!    the mailbox, encoding the latest frame as JPEG, and writing multipart
//!    chunks.
//!
//! The background model and motion strategies are single-owner objects that
//! live entirely on the detection thread. Only the annotated `Frame` crossing
//! the mailbox needs synchronization.

pub mod background;
pub mod config;
pub mod detect;
pub mod frame;
pub mod ingest;
pub mod mailbox;
pub mod pipeline;
pub mod stream;

pub use background::BackgroundModel;
pub use config::SentryConfig;
pub use detect::{
    build_strategy, AdaptiveGaussianStrategy, MotionStrategy, StrategyKind,
    WeightedAverageStrategy,
};
pub use frame::{Frame, GrayFrame, Region};
pub use ingest::{open_source, FrameSource, SourceConfig, SourceStats};
pub use mailbox::FrameMailbox;
pub use pipeline::{Pipeline, PipelineHandle, PipelineSettings};
pub use stream::{StreamConfig, StreamHandle, StreamServer};

use std::fmt;

/// Errors produced by the detection core.
///
/// Application layers (`pipeline`, `stream`, the daemon) wrap these with
/// `anyhow`; core operations return them directly so callers and tests can
/// match on the failure mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MotionError {
    /// An operation requiring an established background estimate was invoked
    /// before one exists. Propagated to the caller, never retried.
    InvalidState(&'static str),
    /// A frame's spatial dimensions differ from the established estimate's.
    /// A caller/configuration error; frames are never silently reshaped.
    DimensionMismatch {
        expected: (u32, u32),
        actual: (u32, u32),
    },
    /// A frame could not be serialized for transmission. The streaming
    /// consumer skips the frame and continues.
    Encoding(String),
}

impl fmt::Display for MotionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MotionError::InvalidState(what) => {
                write!(f, "invalid state: {}", what)
            }
            MotionError::DimensionMismatch { expected, actual } => write!(
                f,
                "dimension mismatch: expected {}x{}, got {}x{}",
                expected.0, expected.1, actual.0, actual.1
            ),
            MotionError::Encoding(reason) => write!(f, "frame encoding failed: {}", reason),
        }
    }
}

impl std::error::Error for MotionError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn motion_error_messages_name_the_failure() {
        let err = MotionError::InvalidState("no background estimate");
        assert_eq!(err.to_string(), "invalid state: no background estimate");

        let err = MotionError::DimensionMismatch {
            expected: (400, 300),
            actual: (640, 480),
        };
        assert_eq!(
            err.to_string(),
            "dimension mismatch: expected 400x300, got 640x480"
        );
    }

    #[test]
    fn motion_error_downcasts_through_anyhow() {
        fn failing() -> anyhow::Result<()> {
            Err(MotionError::InvalidState("no background estimate"))?;
            Ok(())
        }

        let err = failing().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<MotionError>(),
            Some(MotionError::InvalidState(_))
        ));
    }
}
