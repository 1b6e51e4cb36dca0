//! Voice and utterance types for the speech output channel

use serde::{Deserialize, Serialize};

use crate::Language;

/// A synthesis voice offered by the platform
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceInfo {
    /// Platform voice name (e.g. "Samantha", "Kyoko")
    pub name: String,
    /// BCP-47 language tag (e.g. "en-US")
    pub lang: String,
}

impl VoiceInfo {
    pub fn new(name: impl Into<String>, lang: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            lang: lang.into(),
        }
    }
}

/// One unit handed to the speech output channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Utterance {
    pub text: String,
    /// Selected voice; `None` lets the platform pick its default for `language`
    pub voice: Option<VoiceInfo>,
    pub language: Language,
    /// Pitch multiplier (0.5 - 2.0)
    pub pitch: f32,
    /// Rate multiplier (0.5 - 2.0)
    pub rate: f32,
    /// Volume (0.0 - 1.0)
    #[serde(default = "default_volume")]
    pub volume: f32,
}

fn default_volume() -> f32 {
    1.0
}

impl Utterance {
    pub fn new(text: impl Into<String>, language: Language) -> Self {
        Self {
            text: text.into(),
            voice: None,
            language,
            pitch: 1.0,
            rate: 1.0,
            volume: default_volume(),
        }
    }

    pub fn with_voice(mut self, voice: Option<VoiceInfo>) -> Self {
        self.voice = voice;
        self
    }

    /// Set pitch and rate, clamped to the channel's accepted range
    pub fn with_prosody(mut self, pitch: f32, rate: f32) -> Self {
        self.pitch = pitch.clamp(0.5, 2.0);
        self.rate = rate.clamp(0.5, 2.0);
        self
    }
}
