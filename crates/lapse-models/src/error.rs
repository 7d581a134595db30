//! Model validation errors.

use thiserror::Error;

/// Result type for model validation.
pub type ModelResult<T> = Result<T, ModelError>;

/// Errors raised while validating configuration or parsing keys.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Invalid location config for '{prefix}': {message}")]
    InvalidLocation { prefix: String, message: String },

    #[error("Unknown phase tag: {0}")]
    UnknownPhase(String),
}

impl ModelError {
    pub fn invalid_location(prefix: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidLocation {
            prefix: prefix.into(),
            message: message.into(),
        }
    }
}
