//! Speech synthesis side of the pipeline
//!
//! - `prosody`: per-unit emotional pitch/rate model
//! - `voice_select`: persona language → preferred installed voice
//! - `player`: sequential, cancellable playback engine
//! - `channel`: logging reference channel

mod channel;
mod player;
pub mod prosody;
mod voice_select;

pub use channel::LoggingSpeechChannel;
pub use player::{PlaybackConfig, SpeechEvent, SpeechPlayer};
pub use prosody::EmotionParams;
pub use voice_select::select_voice;
