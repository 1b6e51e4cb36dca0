//! Answer service integration
//!
//! The personas' answers come from a remote HTTP service; this crate wraps
//! it behind [`duet_core::AnswerService`].

pub mod backend;

pub use backend::{AnswerClient, AnswerClientConfig};

use thiserror::Error;

/// Answer service errors
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("HTTP {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Timeout")]
    Timeout,

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            LlmError::Timeout
        } else {
            LlmError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for LlmError {
    fn from(err: serde_json::Error) -> Self {
        LlmError::InvalidResponse(err.to_string())
    }
}

impl From<LlmError> for duet_core::Error {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::Api { status, message } => duet_core::Error::Api { status, message },
            LlmError::Configuration(msg) => duet_core::Error::Config(msg),
            other => duet_core::Error::Transport(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_mapping() {
        let err: duet_core::Error = LlmError::Api {
            status: 503,
            message: "busy".to_string(),
        }
        .into();
        assert_eq!(
            err,
            duet_core::Error::Api {
                status: 503,
                message: "busy".to_string()
            }
        );

        let err: duet_core::Error = LlmError::Timeout.into();
        assert!(err.is_transport());

        let err: duet_core::Error = LlmError::Configuration("bad url".to_string()).into();
        assert!(!err.is_transport());
    }
}
