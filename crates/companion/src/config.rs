use std::path::PathBuf;

use domain::models::DeviceTag;
use serde::Deserialize;

/// Device-side configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct CompanionConfig {
    /// Relay base url, e.g. `https://relay.example.com/api`.
    pub relay_url: String,

    /// Sent as `X-Client-Id` on every relay request.
    pub client_key: String,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_device")]
    pub device: DeviceTag,

    #[serde(default = "default_settings_path")]
    pub settings_path: PathBuf,
}

fn default_request_timeout() -> u64 {
    5
}
fn default_device() -> DeviceTag {
    DeviceTag::Ios
}
fn default_settings_path() -> PathBuf {
    PathBuf::from("settings.json")
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Missing required configuration: {0}")]
    MissingRequired(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

impl CompanionConfig {
    /// Loads `config/companion.toml` (optional) overridden by `LR_COMPANION__*`
    /// environment variables.
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/companion").required(false))
            .add_source(
                config::Environment::with_prefix("LR_COMPANION")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let cfg: Self = config.try_deserialize()?;
        cfg.validate()
            .map_err(|e| config::ConfigError::Message(e.to_string()))?;
        Ok(cfg)
    }

    pub fn from_toml_str(
        toml: &str,
        overrides: &[(&str, &str)],
    ) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder()
            .add_source(config::File::from_str(toml, config::FileFormat::Toml));

        for (key, value) in overrides {
            builder = builder.set_override(*key, *value)?;
        }

        builder.build()?.try_deserialize()
    }

    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.relay_url.is_empty() {
            return Err(ConfigValidationError::MissingRequired(
                "LR_COMPANION__RELAY_URL must be set".to_string(),
            ));
        }

        if !(self.relay_url.starts_with("http://") || self.relay_url.starts_with("https://")) {
            return Err(ConfigValidationError::InvalidValue(format!(
                "relay_url must be an http(s) url, got {}",
                self.relay_url
            )));
        }

        if self.client_key.trim().is_empty() {
            return Err(ConfigValidationError::MissingRequired(
                "LR_COMPANION__CLIENT_KEY must be set".to_string(),
            ));
        }

        if self.request_timeout_secs == 0 {
            return Err(ConfigValidationError::InvalidValue(
                "request_timeout_secs cannot be 0".to_string(),
            ));
        }

        Ok(())
    }
}
