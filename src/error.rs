//! Error types for the viewer engine.

use crate::config::ConfigError;


/// Engine error types.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Backend call failed.
    #[error(transparent)]
    Client(#[from] chain_client::Error),

    /// Durable state could not be read or written.
    #[error("storage error: {0}")]
    Storage(#[from] std::io::Error),

    /// Persisted value could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Selector cannot be polled.
    #[error("invalid selector: {0}")]
    InvalidSelector(String),

    /// Configuration is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl EngineError {
    /// Short machine-readable code, used in log fields and broadcast events.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::Client(chain_client::Error::Network(_)) => "NETWORK_ERROR",
            EngineError::Client(chain_client::Error::Http { .. }) => "HTTP_ERROR",
            EngineError::Client(chain_client::Error::Decode(_)) => "DECODE_ERROR",
            EngineError::Client(chain_client::Error::Validation(_)) => "VALIDATION_ERROR",
            EngineError::Client(chain_client::Error::NoData(_)) => "NO_DATA",
            EngineError::Client(chain_client::Error::InvalidUrl(_)) => "INVALID_URL",
            EngineError::Storage(_) => "STORAGE_ERROR",
            EngineError::Serialization(_) => "SERIALIZATION_ERROR",
            EngineError::InvalidSelector(_) => "INVALID_SELECTOR",
            EngineError::Config(_) => "CONFIG_ERROR",
        }
    }
}
