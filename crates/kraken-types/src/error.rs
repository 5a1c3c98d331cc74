//! Error types for Kraken SDK

use thiserror::Error;

/// Main error type for Kraken SDK operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KrakenError {
    /// Failed to parse JSON message
    #[error("Invalid JSON: {message}")]
    InvalidJson { message: String, raw: Option<String> },

    /// Unexpected message format
    #[error("Unexpected message format: {0}")]
    UnexpectedMessage(String),
}

impl KrakenError {
    /// Create an invalid JSON error, keeping the raw frame for diagnostics
    pub fn invalid_json(error: impl std::fmt::Display, raw: &str) -> Self {
        Self::InvalidJson {
            message: error.to_string(),
            raw: Some(raw.to_string()),
        }
    }
}

/// Result type alias for Kraken operations
pub type KrakenResult<T> = Result<T, KrakenError>;
