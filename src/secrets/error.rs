//! Error types for credential store operations.

use thiserror::Error;

/// Result type for credential store operations.
pub type Result<T> = std::result::Result<T, SecretsError>;

/// Errors that can occur while reading or writing credential slots.
#[derive(Error, Debug)]
pub enum SecretsError {
    /// The slot does not exist or holds no value.
    #[error("Secret not found: {key}")]
    NotFound { key: String },

    /// The backend could not be reached, timed out, or failed the request.
    #[error("Credential store unavailable: {message}")]
    Unavailable { message: String },

    /// The backend could not be constructed from its configuration.
    #[error("Configuration error: {message}")]
    ConfigError { message: String },
}

impl SecretsError {
    /// Create a not found error.
    pub fn not_found(key: impl Into<String>) -> Self {
        Self::NotFound { key: key.into() }
    }

    /// Create an unavailable error.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable { message: message.into() }
    }

    /// Create a config error.
    pub fn config_error(message: impl Into<String>) -> Self {
        Self::ConfigError { message: message.into() }
    }
}
