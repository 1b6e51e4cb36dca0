//! Keyboard shortcut handling

/// A key press with its modifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyChord {
    pub key: char,
    pub ctrl: bool,
    pub meta: bool,
    pub alt: bool,
    pub shift: bool,
}

impl KeyChord {
    pub fn new(key: char) -> Self {
        Self {
            key,
            ctrl: false,
            meta: false,
            alt: false,
            shift: false,
        }
    }

    /// `Ctrl` + `key`
    pub fn ctrl(key: char) -> Self {
        Self {
            ctrl: true,
            ..Self::new(key)
        }
    }

    /// `Cmd` + `key`
    pub fn meta(key: char) -> Self {
        Self {
            meta: true,
            ..Self::new(key)
        }
    }

    /// Ctrl+M or Cmd+M, either case
    pub fn is_persona_toggle(&self) -> bool {
        (self.ctrl || self.meta) && self.key.to_ascii_lowercase() == 'm'
    }
}
