//! # MSP Provisioner
//!
//! Enrollment and registration of identities with a permissioned network's
//! certificate authority.
//!
//! ## Architecture
//!
//! ```text
//! Lifecycle trigger → WorkflowDriver → AdminEnrollment / UserRegistration
//!                                            ↓
//!              TrustMaterialProvider → CertificateAuthority → CredentialStore
//! ```
//!
//! ## Core Components
//!
//! - **CA client**: Fabric-CA-compatible REST client with trust-anchor-pinned TLS
//! - **Workflows**: idempotent admin enrollment and user registration
//! - **Credential store**: Vault KV v2 or in-memory secret slots
//! - **Trust material**: CA TLS roots from files or object URLs
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use msp_provisioner::ca::{CaClientOptions, FabricCaConnector};
//! use msp_provisioner::config::ProvisionerConfig;
//! use msp_provisioner::secrets::MemoryCredentialStore;
//! use msp_provisioner::trust::LocationTrustMaterialProvider;
//! use msp_provisioner::workflow::{
//!     LifecycleAction, LifecycleEvent, ProvisioningContext, WorkflowDriver,
//! };
//!
//! # async fn run() -> msp_provisioner::Result<()> {
//! let config = ProvisionerConfig::from_env()?;
//! let ctx = ProvisioningContext::new(
//!     config.provisioning_settings()?,
//!     Arc::new(FabricCaConnector::new(CaClientOptions::default())),
//!     Arc::new(MemoryCredentialStore::new()),
//!     Arc::new(LocationTrustMaterialProvider::new(config.request_timeout())?),
//! );
//! let outcome = WorkflowDriver::new(ctx).handle(&LifecycleEvent::admin(LifecycleAction::Create)).await;
//! println!("{}", serde_json::to_string(&outcome).unwrap_or_default());
//! # Ok(())
//! # }
//! ```

pub mod ca;
pub mod cli;
pub mod config;
pub mod errors;
pub mod observability;
pub mod secrets;
pub mod trust;
pub mod workflow;

// Re-export commonly used types and traits
pub use config::ProvisionerConfig;
pub use errors::{ErrorKind, ProvisionError, Result};
pub use workflow::{WorkflowDriver, WorkflowOutcome};

/// Application version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name from Cargo.toml
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
