//! Configuration module for loading and parsing TOML configuration files.

use chain_client::{ClientConfig, DEFAULT_INSTRUMENT_KEY, Role, Selector};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Configuration error types.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse TOML configuration.
    #[error("failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),
    /// Invalid configuration value.
    #[error("invalid config value: {0}")]
    InvalidValue(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Backend connection.
    pub backend: BackendConfig,
    /// Polling schedule.
    pub polling: PollingConfig,
    /// Initial selector, used when nothing has been persisted yet.
    pub selector: SelectorConfig,
    /// Durable state location.
    pub storage: StorageConfig,
}

/// Backend connection configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Base URL of the backend.
    pub base_url: String,
    /// Per-request timeout in milliseconds.
    pub timeout_ms: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
            timeout_ms: 8_000,
        }
    }
}

/// Polling schedule configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    /// Period between fetch cycles in seconds.
    pub interval_secs: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self { interval_secs: 10 }
    }
}

/// Selector configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    /// Instrument key.
    pub instrument_key: String,
    /// Expiry date (ISO), may be empty.
    pub expiry_date: String,
    /// Role the backend refresh runs as.
    pub role: Role,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            instrument_key: DEFAULT_INSTRUMENT_KEY.to_string(),
            expiry_date: String::new(),
            role: Role::default(),
        }
    }
}

/// Durable state configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path of the JSON state file.
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("option-chain-viewer.json"),
        }
    }
}

impl Config {
    /// Loads configuration from a TOML file.
    ///
    /// # Arguments
    /// * `path` - Path to the configuration file.
    ///
    /// # Errors
    /// Returns error if file cannot be read or parsed.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parses configuration from a TOML string.
    ///
    /// # Arguments
    /// * `content` - TOML content as string.
    ///
    /// # Errors
    /// Returns error if content cannot be parsed.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Poll period.
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.polling.interval_secs)
    }

    /// Client settings for the backend.
    #[must_use]
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            base_url: self.backend.base_url.clone(),
            timeout: Duration::from_millis(self.backend.timeout_ms),
        }
    }

    /// Selector from configuration.
    #[must_use]
    pub fn selector(&self) -> Selector {
        Selector::new(
            self.selector.instrument_key.clone(),
            self.selector.expiry_date.clone(),
        )
    }

    /// Validates the configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.backend.base_url.is_empty() {
            return Err(ConfigError::InvalidValue(
                "backend base_url cannot be empty".to_string(),
            ));
        }
        url::Url::parse(&self.backend.base_url).map_err(|e| {
            ConfigError::InvalidValue(format!(
                "backend base_url {} is not a URL: {}",
                self.backend.base_url, e
            ))
        })?;

        if self.polling.interval_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "polling interval_secs must be positive".to_string(),
            ));
        }
        if self.backend.timeout_ms == 0 {
            return Err(ConfigError::InvalidValue(
                "backend timeout_ms must be positive".to_string(),
            ));
        }
        // A request may not outlive the next tick.
        if self.backend.timeout_ms > self.polling.interval_secs * 1_000 {
            return Err(ConfigError::InvalidValue(format!(
                "backend timeout_ms {} exceeds the poll period of {}s",
                self.backend.timeout_ms, self.polling.interval_secs
            )));
        }

        if self.selector.instrument_key.trim().is_empty() {
            return Err(ConfigError::InvalidValue(
                "selector instrument_key cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}
