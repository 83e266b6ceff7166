//! Credential store trait.

use async_trait::async_trait;

use super::error::Result;
use super::types::SecretString;

/// Get/put access to opaque secret strings keyed by a stable slot identifier.
///
/// Slots are write-once-then-read-many in the provisioning workflows.
/// Serializing concurrent writers to the same slot is the backend's job.
///
/// # Security Considerations
///
/// - Implementations MUST NOT log secret values
/// - Network communication MUST use TLS
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Read the current value of a slot.
    ///
    /// # Errors
    ///
    /// - [`SecretsError::NotFound`](super::SecretsError::NotFound) if the slot is missing
    /// - [`SecretsError::Unavailable`](super::SecretsError::Unavailable) if the backend fails
    async fn get(&self, id: &str) -> Result<SecretString>;

    /// Write a new value to a slot, replacing any previous value.
    ///
    /// # Errors
    ///
    /// - [`SecretsError::Unavailable`](super::SecretsError::Unavailable) if the backend fails
    async fn put(&self, id: &str, value: &str) -> Result<()>;
}
