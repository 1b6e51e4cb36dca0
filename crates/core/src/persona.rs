//! Persona identity and per-persona storage
//!
//! The client talks to exactly two personas. Each one owns its own
//! language, voice profile and conversation; nothing is shared between them.

use serde::{Deserialize, Serialize};

use crate::Language;

/// One of the two mutually exclusive conversational identities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Persona {
    /// Playful VOCALOID persona, speaks Japanese
    #[default]
    Miku,
    /// Composed persona, speaks English
    Eva,
}

impl Persona {
    /// Both personas, in the order trigger phrases are checked
    pub const ALL: [Persona; 2] = [Persona::Miku, Persona::Eva];

    /// Wire tag sent to the answer service as `mode`
    pub fn tag(&self) -> &'static str {
        match self {
            Persona::Miku => "miku",
            Persona::Eva => "eva",
        }
    }

    /// Display name
    pub fn name(&self) -> &'static str {
        match self {
            Persona::Miku => "Miku",
            Persona::Eva => "Eva",
        }
    }

    /// Language used for synthesis and recognition
    pub fn language(&self) -> Language {
        match self {
            Persona::Miku => Language::Japanese,
            Persona::Eva => Language::English,
        }
    }

    /// The persona a toggle switches to
    pub fn other(&self) -> Persona {
        match self {
            Persona::Miku => Persona::Eva,
            Persona::Eva => Persona::Miku,
        }
    }

    /// Built-in base prosody.
    ///
    /// Miku is lighter with a higher base pitch; Eva is measured and slower.
    pub fn default_profile(&self) -> VoiceProfile {
        match self {
            Persona::Miku => VoiceProfile::new(1.10, 0.94),
            Persona::Eva => VoiceProfile::new(1.08, 0.88),
        }
    }
}

impl std::fmt::Display for Persona {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.tag())
    }
}

/// Base prosody for a persona, before per-sentence emotion adjustments
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VoiceProfile {
    pub base_pitch: f32,
    pub base_rate: f32,
}

impl VoiceProfile {
    pub fn new(base_pitch: f32, base_rate: f32) -> Self {
        Self {
            base_pitch,
            base_rate,
        }
    }
}

/// Fixed-size map with exactly one slot per persona.
///
/// Used wherever per-persona state must never be merged: conversation
/// stores, voice profiles.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersonaMap<T> {
    pub miku: T,
    pub eva: T,
}

impl<T> PersonaMap<T> {
    pub fn new(miku: T, eva: T) -> Self {
        Self { miku, eva }
    }

    pub fn get(&self, persona: Persona) -> &T {
        match persona {
            Persona::Miku => &self.miku,
            Persona::Eva => &self.eva,
        }
    }

    pub fn get_mut(&mut self, persona: Persona) -> &mut T {
        match persona {
            Persona::Miku => &mut self.miku,
            Persona::Eva => &mut self.eva,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Persona, &T)> {
        [(Persona::Miku, &self.miku), (Persona::Eva, &self.eva)].into_iter()
    }
}

impl<T> std::ops::Index<Persona> for PersonaMap<T> {
    type Output = T;

    fn index(&self, persona: Persona) -> &T {
        self.get(persona)
    }
}

impl<T> std::ops::IndexMut<Persona> for PersonaMap<T> {
    fn index_mut(&mut self, persona: Persona) -> &mut T {
        self.get_mut(persona)
    }
}
