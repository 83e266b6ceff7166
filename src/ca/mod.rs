//! # Certificate Authority
//!
//! Typed access to a Fabric-CA-compatible certificate authority: endpoint
//! and CA-name derivation, request signing, the REST client and the traits
//! the provisioning workflows are written against.

use async_trait::async_trait;

use crate::errors::Result;
use crate::secrets::SecretString;
use crate::trust::TrustAnchor;

pub mod endpoint;
pub mod fabric;
pub mod retry;
pub mod signing;
pub mod types;
pub mod wire;

pub use endpoint::{derive_ca_name, CaEndpoint};
pub use fabric::{classify_failure, CaClientOptions, CaOperation, FabricCaClient, FabricCaConnector};
pub use retry::RetryConfig;
pub use signing::SigningIdentity;
pub use types::{Affiliation, Credential, Identity, RegisteredIdentity, Role};

/// Operations the provisioning workflows need from a CA.
///
/// Everything except `enroll` acts on behalf of a registrar identity.
#[async_trait]
pub trait CertificateAuthority: Send + Sync {
    /// Exchanges an enrollment ID and one-time secret for a key pair and a
    /// signed certificate. The key is generated locally and never leaves
    /// the returned [`Credential`] except through a credential store.
    async fn enroll(&self, enrollment_id: &str, secret: &SecretString) -> Result<Credential>;

    /// Registers `identity` and returns its one-time enrollment secret.
    async fn register(&self, identity: &Identity, registrar: &SigningIdentity) -> Result<SecretString>;

    /// Identities known to the CA.
    async fn list_identities(&self, registrar: &SigningIdentity) -> Result<Vec<RegisteredIdentity>>;

    /// All affiliations known to the CA, nested ones included.
    async fn list_affiliations(&self, registrar: &SigningIdentity) -> Result<Vec<Affiliation>>;

    async fn create_affiliation(&self, name: &str, registrar: &SigningIdentity) -> Result<()>;
}

/// Opens a [`CertificateAuthority`] session for an endpoint, trusting only
/// the given anchor.
#[async_trait]
pub trait CaConnector: Send + Sync {
    async fn connect(
        &self,
        endpoint: &CaEndpoint,
        trust_anchor: &TrustAnchor,
    ) -> Result<Box<dyn CertificateAuthority>>;
}
