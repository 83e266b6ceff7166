//! # Configuration Management
//!
//! Configuration is resolved from environment variables (after optional
//! `.env` loading in the binary) into an explicit [`ProvisionerConfig`] that
//! is passed to constructors, including the Vault connection settings. The
//! log format flag is resolved here too, ahead of the rest, so the
//! subscriber can be installed first.

pub mod settings;

pub use settings::{json_logs_from_env, CredentialBackend, ProvisionerConfig};
