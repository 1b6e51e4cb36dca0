//! Core traits and types for the dual-persona voice client
//!
//! This crate provides foundational types used across all other crates:
//! - Persona identity, language and voice profile
//! - Conversation types (messages, per-persona conversation state)
//! - Epoch tokens for invalidating stale async continuations
//! - Collaborator traits (answer service, speech output, audio capture)
//! - Error types

pub mod conversation;
pub mod epoch;
pub mod error;
pub mod language;
pub mod persona;
pub mod traits;
pub mod voice_config;

pub use conversation::{ConversationState, Message, Role};
pub use epoch::{Epoch, EpochToken};
pub use error::{Error, Result};
pub use language::Language;
pub use persona::{Persona, PersonaMap, VoiceProfile};
pub use voice_config::{Utterance, VoiceInfo};

pub use traits::{
    AnswerRequest, AnswerResponse, AnswerService, CaptureDevice, CaptureEvent, SpeechChannel,
};
