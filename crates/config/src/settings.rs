//! Main settings module

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use duet_core::{Persona, PersonaMap, VoiceProfile};

use crate::constants::{notification, service, speech, voice_input};
use crate::ConfigError;

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    /// Answer service connection
    #[serde(default)]
    pub service: ServiceConfig,

    /// Speech playback
    #[serde(default)]
    pub speech: SpeechConfig,

    /// Voice command recognizer
    #[serde(default)]
    pub voice_input: VoiceInputConfig,

    /// Persona switch notification
    #[serde(default)]
    pub notification: NotificationConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Settings {
    /// Create default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_service()?;
        self.validate_speech()?;
        self.validate_timing()?;
        Ok(())
    }

    fn validate_service(&self) -> Result<(), ConfigError> {
        let endpoint = self.service.endpoint.trim();
        if endpoint.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "service.endpoint".to_string(),
                message: "Endpoint cannot be empty".to_string(),
            });
        }

        if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
            return Err(ConfigError::InvalidValue {
                field: "service.endpoint".to_string(),
                message: format!("Expected an http(s) URL, got {}", endpoint),
            });
        }

        if self.service.timeout_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                field: "service.timeout_seconds".to_string(),
                message: "Timeout must be at least 1 second".to_string(),
            });
        }

        if let Some(user_id) = &self.service.user_id {
            if user_id.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "service.user_id".to_string(),
                    message: "User id cannot be blank when set".to_string(),
                });
            }
        }

        Ok(())
    }

    fn validate_speech(&self) -> Result<(), ConfigError> {
        let keepalive = self.speech.keepalive_interval_ms;
        if !(speech::KEEPALIVE_MIN_MS..=speech::KEEPALIVE_MAX_MS).contains(&keepalive) {
            return Err(ConfigError::InvalidValue {
                field: "speech.keepalive_interval_ms".to_string(),
                message: format!(
                    "Must be between {} and {}, got {}",
                    speech::KEEPALIVE_MIN_MS,
                    speech::KEEPALIVE_MAX_MS,
                    keepalive
                ),
            });
        }

        for (persona, profile) in self.speech.profiles().iter() {
            validate_prosody(&format!("speech.{}.base_pitch", persona), profile.base_pitch)?;
            validate_prosody(&format!("speech.{}.base_rate", persona), profile.base_rate)?;
        }

        Ok(())
    }

    fn validate_timing(&self) -> Result<(), ConfigError> {
        if self.notification.display_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "notification.display_ms".to_string(),
                message: "Display interval must be positive".to_string(),
            });
        }

        Ok(())
    }
}

fn validate_prosody(field: &str, value: f32) -> Result<(), ConfigError> {
    if !(speech::PROSODY_MIN..=speech::PROSODY_MAX).contains(&value) {
        return Err(ConfigError::InvalidValue {
            field: field.to_string(),
            message: format!(
                "Must be between {} and {}, got {}",
                speech::PROSODY_MIN,
                speech::PROSODY_MAX,
                value
            ),
        });
    }
    Ok(())
}

/// Answer service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Base URL of the answer service
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Fixed user id; generated once per process when absent
    #[serde(default)]
    pub user_id: Option<String>,
}

fn default_endpoint() -> String {
    service::DEFAULT_ENDPOINT.to_string()
}

fn default_timeout() -> u64 {
    service::DEFAULT_TIMEOUT_SECS
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            timeout_seconds: default_timeout(),
            user_id: None,
        }
    }
}

impl ServiceConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

/// Speech playback configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeechConfig {
    /// Speak responses aloud
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Pause/resume cycle period while speaking
    #[serde(default = "default_keepalive")]
    pub keepalive_interval_ms: u64,

    #[serde(default = "default_miku_profile")]
    pub miku: VoiceProfile,

    #[serde(default = "default_eva_profile")]
    pub eva: VoiceProfile,
}

fn default_true() -> bool {
    true
}

fn default_keepalive() -> u64 {
    speech::KEEPALIVE_INTERVAL_MS
}

fn default_miku_profile() -> VoiceProfile {
    Persona::Miku.default_profile()
}

fn default_eva_profile() -> VoiceProfile {
    Persona::Eva.default_profile()
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            keepalive_interval_ms: default_keepalive(),
            miku: default_miku_profile(),
            eva: default_eva_profile(),
        }
    }
}

impl SpeechConfig {
    pub fn keepalive_interval(&self) -> Duration {
        Duration::from_millis(self.keepalive_interval_ms)
    }

    /// Base prosody per persona
    pub fn profiles(&self) -> PersonaMap<VoiceProfile> {
        PersonaMap::new(self.miku, self.eva)
    }
}

/// Voice command recognizer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceInputConfig {
    /// Delay before a recognised switch command is applied
    #[serde(default = "default_command_settle")]
    pub command_settle_ms: u64,

    /// Delay before a transcript is forwarded as a chat message
    #[serde(default = "default_message_settle")]
    pub message_settle_ms: u64,
}

fn default_command_settle() -> u64 {
    voice_input::COMMAND_SETTLE_MS
}

fn default_message_settle() -> u64 {
    voice_input::MESSAGE_SETTLE_MS
}

impl Default for VoiceInputConfig {
    fn default() -> Self {
        Self {
            command_settle_ms: default_command_settle(),
            message_settle_ms: default_message_settle(),
        }
    }
}

impl VoiceInputConfig {
    pub fn command_settle(&self) -> Duration {
        Duration::from_millis(self.command_settle_ms)
    }

    pub fn message_settle(&self) -> Duration {
        Duration::from_millis(self.message_settle_ms)
    }
}

/// Persona switch notification configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// How long a notification stays visible
    #[serde(default = "default_display")]
    pub display_ms: u64,
}

fn default_display() -> u64 {
    notification::DISPLAY_MS
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            display_ms: default_display(),
        }
    }
}

impl NotificationConfig {
    pub fn display(&self) -> Duration {
        Duration::from_millis(self.display_ms)
    }
}

/// Observability configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default)]
    pub log_json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_json: false,
        }
    }
}

/// Load settings from `config/` in the working directory and the environment
pub fn load_settings(env: Option<&str>) -> Result<Settings, ConfigError> {
    load_settings_from(Path::new("config"), env)
}

/// Load settings from `dir/default.*`, `dir/{env}.*` and `DUET__*` variables
pub fn load_settings_from(dir: &Path, env: Option<&str>) -> Result<Settings, ConfigError> {
    let mut builder = Config::builder();

    // Load default config
    builder = builder.add_source(File::from(dir.join("default")).required(false));

    // Load environment-specific config
    if let Some(env_name) = env {
        builder = builder.add_source(File::from(dir.join(env_name)).required(false));
    }

    // Load from environment variables
    builder = builder.add_source(
        Environment::with_prefix("DUET")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;
    let settings: Settings = config.try_deserialize()?;

    // Validate
    settings.validate()?;

    tracing::debug!(
        endpoint = %settings.service.endpoint,
        speech_enabled = settings.speech.enabled,
        "Settings loaded"
    );

    Ok(settings)
}
