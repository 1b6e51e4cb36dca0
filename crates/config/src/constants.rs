//! Default values shared by settings and their consumers

/// Answer service defaults
pub mod service {
    /// Local development backend
    pub const DEFAULT_ENDPOINT: &str = "http://localhost:8000";

    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

    /// Prefix of generated user identifiers
    pub const USER_ID_PREFIX: &str = "user-";
}

/// Speech playback timing
pub mod speech {
    /// Platform engines suspend after roughly 15s of continuous output
    pub const KEEPALIVE_INTERVAL_MS: u64 = 10_000;

    pub const KEEPALIVE_MIN_MS: u64 = 1_000;
    pub const KEEPALIVE_MAX_MS: u64 = 60_000;

    /// Accepted range for pitch and rate multipliers
    pub const PROSODY_MIN: f32 = 0.5;
    pub const PROSODY_MAX: f32 = 2.0;
}

/// Voice input settle delays
pub mod voice_input {
    pub const COMMAND_SETTLE_MS: u64 = 400;
    pub const MESSAGE_SETTLE_MS: u64 = 500;
}

/// Persona switch notification
pub mod notification {
    pub const DISPLAY_MS: u64 = 2_200;
}
