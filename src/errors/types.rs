//! # Error Types
//!
//! Provisioning error taxonomy using `thiserror`.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::secrets::SecretsError;

/// Custom result type for provisioning operations
pub type Result<T> = std::result::Result<T, ProvisionError>;

/// Classification of a provisioning failure.
///
/// `DuplicateIdentity` and `DuplicateAffiliation` are part of the taxonomy but
/// the workflows treat them as success; they only surface from the raw CA client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    CaUnreachable,
    InvalidSecret,
    Unauthorized,
    DuplicateIdentity,
    DuplicateAffiliation,
    StoreUnavailable,
    NotFound,
    Rejected,
    Config,
    Crypto,
}

impl ErrorKind {
    /// Returns the string representation of the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CaUnreachable => "ca_unreachable",
            Self::InvalidSecret => "invalid_secret",
            Self::Unauthorized => "unauthorized",
            Self::DuplicateIdentity => "duplicate_identity",
            Self::DuplicateAffiliation => "duplicate_affiliation",
            Self::StoreUnavailable => "store_unavailable",
            Self::NotFound => "not_found",
            Self::Rejected => "rejected",
            Self::Config => "config",
            Self::Crypto => "crypto",
        }
    }

    /// Whether an identical re-invocation may succeed later.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::CaUnreachable | Self::StoreUnavailable)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Main error type for the provisioning workflows
#[derive(thiserror::Error, Debug)]
pub enum ProvisionError {
    /// The CA could not be reached, timed out, or answered with a server error
    #[error("CA unreachable: {message}")]
    CaUnreachable { message: String },

    /// The one-time enrollment secret was rejected
    #[error("Invalid enrollment secret for '{enrollment_id}'")]
    InvalidSecret { enrollment_id: String },

    /// The acting identity lacks the rights for the operation
    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    /// The enrollment ID is already registered with the CA
    #[error("Identity '{enrollment_id}' is already registered")]
    DuplicateIdentity { enrollment_id: String },

    /// The affiliation already exists in the CA namespace
    #[error("Affiliation '{name}' already exists")]
    DuplicateAffiliation { name: String },

    /// The credential store or trust material source is unavailable
    #[error("Store unavailable: {message}")]
    StoreUnavailable { message: String },

    /// Trust material or a credential slot is missing
    #[error("Not found: {what}")]
    NotFound { what: String },

    /// The CA rejected the request for a reason outside the known taxonomy
    #[error("CA rejected request (status {status}): {message}")]
    Rejected { status: u16, message: String },

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Key generation, CSR, signing or PEM handling failed
    #[error("Crypto error: {message}")]
    Crypto { message: String },
}

impl ProvisionError {
    /// Create a CA unreachable error
    pub fn ca_unreachable<S: Into<String>>(message: S) -> Self {
        Self::CaUnreachable { message: message.into() }
    }

    /// Create an invalid secret error
    pub fn invalid_secret<S: Into<String>>(enrollment_id: S) -> Self {
        Self::InvalidSecret { enrollment_id: enrollment_id.into() }
    }

    /// Create an unauthorized error
    pub fn unauthorized<S: Into<String>>(message: S) -> Self {
        Self::Unauthorized { message: message.into() }
    }

    /// Create a duplicate identity error
    pub fn duplicate_identity<S: Into<String>>(enrollment_id: S) -> Self {
        Self::DuplicateIdentity { enrollment_id: enrollment_id.into() }
    }

    /// Create a duplicate affiliation error
    pub fn duplicate_affiliation<S: Into<String>>(name: S) -> Self {
        Self::DuplicateAffiliation { name: name.into() }
    }

    /// Create a store unavailable error
    pub fn store_unavailable<S: Into<String>>(message: S) -> Self {
        Self::StoreUnavailable { message: message.into() }
    }

    /// Create a not found error
    pub fn not_found<S: Into<String>>(what: S) -> Self {
        Self::NotFound { what: what.into() }
    }

    /// Create a rejected error
    pub fn rejected<S: Into<String>>(status: u16, message: S) -> Self {
        Self::Rejected { status, message: message.into() }
    }

    /// Create a configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config { message: message.into() }
    }

    /// Create a crypto error
    pub fn crypto<S: Into<String>>(message: S) -> Self {
        Self::Crypto { message: message.into() }
    }

    /// Taxonomy kind of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::CaUnreachable { .. } => ErrorKind::CaUnreachable,
            Self::InvalidSecret { .. } => ErrorKind::InvalidSecret,
            Self::Unauthorized { .. } => ErrorKind::Unauthorized,
            Self::DuplicateIdentity { .. } => ErrorKind::DuplicateIdentity,
            Self::DuplicateAffiliation { .. } => ErrorKind::DuplicateAffiliation,
            Self::StoreUnavailable { .. } => ErrorKind::StoreUnavailable,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Rejected { .. } => ErrorKind::Rejected,
            Self::Config { .. } => ErrorKind::Config,
            Self::Crypto { .. } => ErrorKind::Crypto,
        }
    }

    /// Whether an identical re-invocation may succeed later
    pub fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }
}

impl From<SecretsError> for ProvisionError {
    fn from(error: SecretsError) -> Self {
        match error {
            SecretsError::NotFound { key } => Self::not_found(format!("credential slot '{}'", key)),
            SecretsError::Unavailable { message } => Self::store_unavailable(message),
            SecretsError::ConfigError { message } => Self::config(message),
        }
    }
}

impl From<validator::ValidationErrors> for ProvisionError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let message = errors
            .field_errors()
            .iter()
            .map(|(field, field_errors)| {
                let error_messages: Vec<String> = field_errors
                    .iter()
                    .map(|e| {
                        e.message.as_ref().map_or("Invalid value".to_string(), |m| m.to_string())
                    })
                    .collect();
                format!("{}: {}", field, error_messages.join(", "))
            })
            .collect::<Vec<_>>()
            .join("; ");

        Self::config(format!("Validation failed: {}", message))
    }
}

impl From<rcgen::Error> for ProvisionError {
    fn from(error: rcgen::Error) -> Self {
        Self::crypto(error.to_string())
    }
}
