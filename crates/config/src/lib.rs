//! Configuration management for the voice client
//!
//! Supports loading configuration from:
//! - `config/default.*` and `config/{env}.*` files (TOML, YAML or JSON)
//! - Environment variables (`DUET_` prefix, `__` separator)

pub mod constants;
pub mod settings;

pub use settings::{
    load_settings, load_settings_from, NotificationConfig, ObservabilityConfig, ServiceConfig,
    Settings, SpeechConfig, VoiceInputConfig,
};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("Environment error: {0}")]
    Environment(String),
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        match err {
            config::ConfigError::NotFound(key) => ConfigError::MissingField(key),
            other => ConfigError::ParseError(other.to_string()),
        }
    }
}

impl From<ConfigError> for duet_core::Error {
    fn from(err: ConfigError) -> Self {
        duet_core::Error::Config(err.to_string())
    }
}
