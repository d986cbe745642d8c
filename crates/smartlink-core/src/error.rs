//! Error types for smartlink-core.

use thiserror::Error;

use crate::cache::CacheError;

/// Result type alias using smartlink-core Error
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for SmartLink operations
#[derive(Error, Debug)]
pub enum Error {
    // Construction errors
    #[error("Configuration error: {0}")]
    Config(String),

    // Upstream API errors
    #[error("API key rejected by the configuration API")]
    Unauthorized,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Configuration API unavailable: {0}")]
    Unavailable(String),

    // Caller errors
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // Cache errors
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Create an invalid input error
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    /// Create an unavailable error
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable(message.into())
    }

    /// Whether the upstream API rejected our credentials
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized)
    }

    /// Whether this is a soft upstream failure (missing or unreachable data)
    pub fn is_soft_failure(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::Unavailable(_))
    }
}
