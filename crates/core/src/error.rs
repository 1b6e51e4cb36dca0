//! Error types shared across the workspace

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the client and its collaborators.
///
/// None of these are fatal: the controller, speech engine and recognizer
/// all recover locally and return to an idle, usable state.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Answer service unreachable or the connection failed
    #[error("Transport error: {0}")]
    Transport(String),

    /// Answer service answered with a non-success status
    #[error("HTTP {status}: {message}")]
    Api { status: u16, message: String },

    /// No capture device, no synthesis voice, etc.
    #[error("Capability unavailable: {0}")]
    CapabilityUnavailable(String),

    /// A single utterance failed to synthesize
    #[error("Synthesis error: {0}")]
    Synthesis(String),

    /// Utterance cut short by cancel-all
    #[error("Utterance interrupted")]
    Interrupted,

    /// Capture device reported an error code
    #[error("Capture error: {0}")]
    Capture(String),

    /// A voice input session is already open
    #[error("Voice session already active")]
    VoiceSessionActive,

    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Errors the controller turns into a visible connectivity message
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Transport(_) | Error::Api { .. })
    }
}
