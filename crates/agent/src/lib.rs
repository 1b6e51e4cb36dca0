//! Dual-persona conversation client
//!
//! Features:
//! - Session controller with two isolated persona conversations
//! - Stale-persona guard: answers land in the persona they were asked of
//!   and are only spoken if that persona is still active
//! - Persona switch notification with a resettable auto-dismiss timer
//! - Keyboard shortcut handling
//! - Voice command recognizer (capture → transcript → message or switch)

pub mod notification;
pub mod session;
pub mod shortcut;
pub mod voice_input;

pub use notification::{NotificationEvent, PersonaNotifier};
pub use session::{generate_user_id, SendRejected, SessionConfig, SessionController, SessionEvent};
pub use shortcut::KeyChord;
pub use voice_input::{
    detect_persona_switch, VoiceCommandRecognizer, VoiceCommandSink, VoiceEvent, VoicePhase,
    VoiceSession, EVA_TRIGGERS, MIKU_TRIGGERS,
};

use duet_core::Persona;
use thiserror::Error;

/// Agent errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AgentError {
    #[error("A request is pending for {0}")]
    Pending(Persona),

    #[error("No assistant message at index {0}")]
    NoSuchMessage(usize),

    #[error("Voice session already active")]
    VoiceSessionActive,

    #[error("Answer service error: {0}")]
    Service(String),
}

impl From<duet_core::Error> for AgentError {
    fn from(err: duet_core::Error) -> Self {
        match err {
            duet_core::Error::VoiceSessionActive => AgentError::VoiceSessionActive,
            other => AgentError::Service(other.to_string()),
        }
    }
}
