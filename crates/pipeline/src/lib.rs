//! Speech output pipeline
//!
//! This crate turns a finished persona answer into audible speech:
//! - Markup cleanup and sentence segmentation (processors)
//! - Per-sentence emotional prosody and voice selection
//! - Sequential, cancellable playback with platform keepalive
//! - Reference speech channel and capture device implementations

pub mod capture;
pub mod processors;
pub mod tts;

pub use capture::ManualCapture;
pub use processors::{clean_markup, segment};
pub use tts::{
    select_voice, EmotionParams, LoggingSpeechChannel, PlaybackConfig, SpeechEvent, SpeechPlayer,
};

use thiserror::Error;

/// Pipeline errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    #[error("Capture device unavailable")]
    CaptureUnavailable,

    #[error("No capture session in progress")]
    NoSession,

    #[error("Channel closed")]
    ChannelClosed,
}

impl From<PipelineError> for duet_core::Error {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::CaptureUnavailable => {
                duet_core::Error::CapabilityUnavailable("speech recognition".to_string())
            }
            PipelineError::NoSession | PipelineError::ChannelClosed => {
                duet_core::Error::Capture(err.to_string())
            }
        }
    }
}
