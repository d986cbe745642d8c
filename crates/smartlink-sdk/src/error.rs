//! SDK Error Types
//!
//! Defines error types for the SmartLink SDK.

use thiserror::Error;

/// SDK Result type alias
pub type SdkResult<T> = Result<T, SdkError>;

/// SDK errors
#[derive(Debug, Error)]
pub enum SdkError {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(#[from] crate::config::ConfigValidationError),

    /// Error from the core library (API, cache, entity)
    #[error(transparent)]
    Core(#[from] smartlink_core::Error),

    /// Invalid caller input
    #[error("invalid input: {message}")]
    InvalidInput { message: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic error
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl SdkError {
    /// Create an invalid input error
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Check if the configuration API rejected the API key
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Core(e) if e.is_unauthorized())
    }

    /// Check if this is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Core(smartlink_core::Error::NotFound(_)))
    }
}
