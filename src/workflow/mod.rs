//! # Provisioning Workflows
//!
//! Admin enrollment and user registration, plus the trigger driver that
//! selects between them. Each invocation rebuilds its trust anchor and CA
//! client; nothing is shared between invocations except the injected
//! collaborators.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::ca::{CaConnector, CaEndpoint, CertificateAuthority};
use crate::errors::{ProvisionError, Result};
use crate::secrets::{CredentialStore, SecretString};
use crate::trust::{TrustAnchor, TrustMaterialProvider};

pub mod admin;
pub mod driver;
pub mod outcome;
pub mod user;

pub use admin::AdminEnrollment;
pub use driver::{Flow, LifecycleAction, LifecycleEvent, WorkflowDriver};
pub use outcome::{AdminEnrollmentReport, RegistrationReport, WorkflowOutcome, WorkflowReport};
pub use user::{UserRegistration, UserRequest};

/// Enrollment ID of the organisation's administrative identity.
pub const ADMIN_ENROLLMENT_ID: &str = "admin";

/// Credential store slot identifiers for one identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialSlots {
    /// One-time enrollment secret
    pub password: String,
    /// PKCS#8 PEM private key
    pub private_key: String,
    /// PEM signed certificate
    pub signed_certificate: String,
}

/// Resolved, per-deployment inputs shared by both flows.
#[derive(Debug, Clone)]
pub struct ProvisioningSettings {
    pub endpoint: CaEndpoint,
    pub org_name: String,
    pub admin_slots: CredentialSlots,
    pub trust_anchor_location: String,
    /// Bound applied to each store and trust-material call
    pub request_timeout: Duration,
}

impl ProvisioningSettings {
    /// MSP the signing identities are scoped to.
    pub fn msp_id(&self) -> String {
        format!("{}Msp", self.org_name)
    }

    /// Affiliation every organisation identity implicitly belongs to.
    pub fn root_affiliation(&self) -> &str {
        &self.org_name
    }
}

/// Collaborators and settings handed to each workflow.
#[derive(Clone)]
pub struct ProvisioningContext {
    settings: Arc<ProvisioningSettings>,
    connector: Arc<dyn CaConnector>,
    store: Arc<dyn CredentialStore>,
    trust: Arc<dyn TrustMaterialProvider>,
}

impl std::fmt::Debug for ProvisioningContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProvisioningContext").field("settings", &self.settings).finish()
    }
}

impl ProvisioningContext {
    pub fn new(
        settings: ProvisioningSettings,
        connector: Arc<dyn CaConnector>,
        store: Arc<dyn CredentialStore>,
        trust: Arc<dyn TrustMaterialProvider>,
    ) -> Self {
        Self { settings: Arc::new(settings), connector, store, trust }
    }

    pub fn settings(&self) -> &ProvisioningSettings {
        &self.settings
    }

    pub(crate) async fn fetch_trust_anchor(&self) -> Result<TrustAnchor> {
        let location = &self.settings.trust_anchor_location;
        let anchor = self.bounded("trust anchor fetch", self.trust.fetch(location)).await?;
        debug!(
            location = %location,
            certificates = anchor.certificate_count(),
            "Trust anchor loaded"
        );
        Ok(anchor)
    }

    pub(crate) async fn connect(&self, anchor: &TrustAnchor) -> Result<Box<dyn CertificateAuthority>> {
        self.connector.connect(&self.settings.endpoint, anchor).await
    }

    pub(crate) async fn get_secret(&self, slot: &str) -> Result<SecretString> {
        self.bounded("credential read", async {
            self.store.get(slot).await.map_err(ProvisionError::from)
        }).await
    }

    pub(crate) async fn put_secret(&self, slot: &str, value: &str) -> Result<()> {
        self.bounded("credential write", async {
            self.store.put(slot, value).await.map_err(ProvisionError::from)
        }).await?;
        debug!(slot = %slot, "Credential persisted");
        Ok(())
    }

    async fn bounded<T, F>(&self, what: &str, call: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let timeout = self.settings.request_timeout;
        tokio::time::timeout(timeout, call).await.map_err(|_| {
            ProvisionError::store_unavailable(format!(
                "{} timed out after {}s",
                what,
                timeout.as_secs_f64()
            ))
        })?
    }
}
