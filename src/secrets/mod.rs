//! Credential storage for enrollment secrets, private keys and certificates.
//!
//! The workflows only need two operations, both behind the [`CredentialStore`]
//! trait:
//! - **get**: read a slot by its stable identifier
//! - **put**: write a slot
//!
//! # Backends
//!
//! - **HashiCorp Vault**: KV v2 engine ([`VaultCredentialStore`])
//! - **Memory**: process-local map for development and tests ([`MemoryCredentialStore`])
//!
//! # Security Considerations
//!
//! - Secret values are carried as [`SecretString`] and never logged
//! - Errors name the slot, never its value

pub mod error;
pub mod memory;
pub mod store;
pub mod types;
pub mod vault;

pub use error::{Result, SecretsError};
pub use memory::MemoryCredentialStore;
pub use store::CredentialStore;
pub use types::SecretString;
pub use vault::{VaultConfig, VaultCredentialStore};
