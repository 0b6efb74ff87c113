//! Error types for the chain client.

use thiserror::Error;


/// Client error types.
#[derive(Debug, Error)]
pub enum Error {
    /// The request could not be sent or timed out.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Backend answered with a non-success status.
    #[error("HTTP error ({status}): {message}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Response body, or the reason phrase when the body is empty.
        message: String,
    },

    /// Body is not valid JSON or lacks a required field.
    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// Decoded body violates a shape invariant.
    #[error("validation error: {0}")]
    Validation(String),

    /// Backend answered successfully but had nothing to return.
    #[error("no data: {0}")]
    NoData(String),

    /// Invalid URL.
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl Error {
    /// Returns true for failures that happened before any response arrived.
    #[must_use]
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network(_))
    }
}
