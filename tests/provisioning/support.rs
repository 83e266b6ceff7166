//! In-process fakes for the provisioning collaborators.
//!
//! Every fake appends to a shared [`Journal`] so tests can assert the exact
//! order of CA, credential store and trust material calls.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Barrier;

use msp_provisioner::ca::{
    Affiliation, CaConnector, CaEndpoint, CertificateAuthority, Credential, Identity,
    RegisteredIdentity, Role, SigningIdentity,
};
use msp_provisioner::errors::{ProvisionError, Result};
use msp_provisioner::secrets::{self, CredentialStore, MemoryCredentialStore, SecretString};
use msp_provisioner::trust::{TrustAnchor, TrustMaterialProvider};
use msp_provisioner::workflow::{
    CredentialSlots, ProvisioningContext, ProvisioningSettings, UserRequest,
};

pub const ORG: &str = "org1";
pub const TLS_LOCATION: &str = "s3://bucket/ca-tls.pem";
pub const ADMIN_PASSWORD_SLOT: &str = "admin-password";
pub const ADMIN_KEY_SLOT: &str = "admin-key";
pub const ADMIN_CERT_SLOT: &str = "admin-cert";

/// Ordered log of every collaborator call.
#[derive(Debug, Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    pub fn record(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.entries().iter().filter(|e| e.starts_with(prefix)).count()
    }

    pub fn position(&self, entry: &str) -> Option<usize> {
        self.entries().iter().position(|e| e == entry)
    }
}

/// A self-signed P-256 certificate and its PKCS#8 key.
pub fn issue_certificate(common_name: &str) -> (String, String) {
    let key = rcgen::KeyPair::generate().unwrap();
    let mut params = rcgen::CertificateParams::new(Vec::<String>::new()).unwrap();
    params.distinguished_name.push(rcgen::DnType::CommonName, common_name);
    let cert = params.self_signed(&key).unwrap();
    (cert.pem(), key.serialize_pem())
}

/// Failure to inject into a fake CA call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    Unreachable,
    Unauthorized,
}

impl Fault {
    fn error(&self, operation: &str) -> ProvisionError {
        match self {
            Self::Unreachable => ProvisionError::ca_unreachable(format!("{} timed out", operation)),
            Self::Unauthorized => ProvisionError::unauthorized(format!("{}: not a registrar", operation)),
        }
    }
}

#[derive(Debug, Default)]
struct CaState {
    identities: Vec<RegisteredIdentity>,
    affiliations: HashSet<String>,
    /// Outstanding one-time secrets by enrollment ID
    secrets: HashMap<String, String>,
    faults: HashMap<&'static str, Fault>,
    barriers: HashMap<&'static str, Arc<Barrier>>,
    issued: u32,
}

/// Scriptable stand-in for a certificate authority.
#[derive(Debug, Clone)]
pub struct FakeCa {
    state: Arc<Mutex<CaState>>,
    journal: Journal,
}

impl FakeCa {
    pub fn new(journal: Journal) -> Self {
        let state = CaState {
            affiliations: [ORG.to_string(), format!("{}.department1", ORG)].into_iter().collect(),
            ..CaState::default()
        };
        Self { state: Arc::new(Mutex::new(state)), journal }
    }

    /// Make `secret` the valid one-time secret for `enrollment_id`.
    pub fn with_secret(self, enrollment_id: &str, secret: &str) -> Self {
        self.state.lock().unwrap().secrets.insert(enrollment_id.to_string(), secret.to_string());
        self
    }

    pub fn with_identity(self, enrollment_id: &str) -> Self {
        self.state.lock().unwrap().identities.push(RegisteredIdentity {
            enrollment_id: enrollment_id.to_string(),
            role: Role::Client,
            affiliation: ORG.to_string(),
        });
        self
    }

    pub fn with_affiliation(self, name: &str) -> Self {
        self.state.lock().unwrap().affiliations.insert(name.to_string());
        self
    }

    pub fn with_fault(self, operation: &'static str, fault: Fault) -> Self {
        self.state.lock().unwrap().faults.insert(operation, fault);
        self
    }

    /// Hold callers of a listing operation, after they took their snapshot,
    /// until `parties` callers arrived.
    pub fn with_barrier(self, operation: &'static str, parties: usize) -> Self {
        self.state.lock().unwrap().barriers.insert(operation, Arc::new(Barrier::new(parties)));
        self
    }

    pub fn is_registered(&self, enrollment_id: &str) -> bool {
        self.state.lock().unwrap().identities.iter().any(|i| i.enrollment_id == enrollment_id)
    }

    pub fn has_affiliation(&self, name: &str) -> bool {
        self.state.lock().unwrap().affiliations.contains(name)
    }

    async fn wait_at(&self, operation: &'static str) {
        let barrier = self.state.lock().unwrap().barriers.get(operation).cloned();
        if let Some(barrier) = barrier {
            barrier.wait().await;
        }
    }

    fn check(&self, operation: &'static str) -> Result<()> {
        match self.state.lock().unwrap().faults.get(operation) {
            Some(fault) => Err(fault.error(operation)),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl CertificateAuthority for FakeCa {
    async fn enroll(&self, enrollment_id: &str, secret: &SecretString) -> Result<Credential> {
        self.journal.record(format!("ca:enroll:{}", enrollment_id));
        self.check("enroll")?;

        {
            let mut state = self.state.lock().unwrap();
            match state.secrets.get(enrollment_id) {
                Some(expected) if expected == secret.expose_secret() => {
                    state.secrets.remove(enrollment_id);
                }
                _ => return Err(ProvisionError::invalid_secret(enrollment_id)),
            }
        }

        let (certificate, key) = issue_certificate(enrollment_id);
        Ok(Credential {
            private_key: SecretString::new(key),
            signed_certificate: certificate,
            enrollment_secret: secret.clone(),
        })
    }

    async fn register(&self, identity: &Identity, registrar: &SigningIdentity) -> Result<SecretString> {
        self.journal.record(format!("ca:register:{}", identity.enrollment_id));
        self.check("register")?;
        assert_eq!(registrar.enrollment_id(), "admin");
        assert_eq!(identity.role, Role::Client);

        let mut state = self.state.lock().unwrap();
        if state.identities.iter().any(|i| i.enrollment_id == identity.enrollment_id) {
            return Err(ProvisionError::duplicate_identity(&identity.enrollment_id));
        }
        if !state.affiliations.contains(&identity.affiliation) {
            return Err(ProvisionError::rejected(400, "affiliation does not exist"));
        }

        state.issued += 1;
        let secret = format!("otp-{}-{}", identity.enrollment_id, state.issued);
        state.secrets.insert(identity.enrollment_id.clone(), secret.clone());
        state.identities.push(RegisteredIdentity {
            enrollment_id: identity.enrollment_id.clone(),
            role: identity.role.clone(),
            affiliation: identity.affiliation.clone(),
        });
        Ok(SecretString::new(secret))
    }

    async fn list_identities(&self, _registrar: &SigningIdentity) -> Result<Vec<RegisteredIdentity>> {
        self.journal.record("ca:list_identities");
        self.check("list_identities")?;

        let identities = self.state.lock().unwrap().identities.clone();
        self.wait_at("list_identities").await;
        Ok(identities)
    }

    async fn list_affiliations(&self, _registrar: &SigningIdentity) -> Result<Vec<Affiliation>> {
        self.journal.record("ca:list_affiliations");
        self.check("list_affiliations")?;

        let mut affiliations: Vec<Affiliation> =
            self.state.lock().unwrap().affiliations.iter().cloned().map(Affiliation::new).collect();
        affiliations.sort();
        self.wait_at("list_affiliations").await;
        Ok(affiliations)
    }

    async fn create_affiliation(&self, name: &str, _registrar: &SigningIdentity) -> Result<()> {
        self.journal.record(format!("ca:create_affiliation:{}", name));
        self.check("create_affiliation")?;

        let mut state = self.state.lock().unwrap();
        if !state.affiliations.insert(name.to_string()) {
            return Err(ProvisionError::duplicate_affiliation(name));
        }
        Ok(())
    }
}

/// Connector handing out clones of one [`FakeCa`].
pub struct FakeConnector {
    ca: FakeCa,
    journal: Journal,
}

#[async_trait]
impl CaConnector for FakeConnector {
    async fn connect(
        &self,
        endpoint: &CaEndpoint,
        _trust_anchor: &TrustAnchor,
    ) -> Result<Box<dyn CertificateAuthority>> {
        self.journal.record(format!("connect:{}", endpoint.ca_name));
        Ok(Box::new(self.ca.clone()))
    }
}

/// Trust material source returning a fixed anchor or a fixed error.
pub struct FakeTrust {
    journal: Journal,
    anchor: TrustAnchor,
    missing: bool,
}

#[async_trait]
impl TrustMaterialProvider for FakeTrust {
    async fn fetch(&self, location: &str) -> Result<TrustAnchor> {
        self.journal.record(format!("trust:fetch:{}", location));
        if self.missing {
            return Err(ProvisionError::not_found(format!("trust anchor at {}", location)));
        }
        Ok(self.anchor.clone())
    }
}

/// Memory store that journals reads and writes.
pub struct RecordingStore {
    inner: MemoryCredentialStore,
    journal: Journal,
    delay: Option<Duration>,
}

#[async_trait]
impl CredentialStore for RecordingStore {
    async fn get(&self, id: &str) -> secrets::Result<SecretString> {
        self.journal.record(format!("store:get:{}", id));
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.inner.get(id).await
    }

    async fn put(&self, id: &str, value: &str) -> secrets::Result<()> {
        self.journal.record(format!("store:put:{}", id));
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.inner.put(id, value).await
    }
}

/// A fully wired provisioning context over fakes.
pub struct Harness {
    pub journal: Journal,
    pub ca: FakeCa,
    pub store: MemoryCredentialStore,
    pub ctx: ProvisioningContext,
}

pub struct HarnessBuilder {
    journal: Journal,
    ca: FakeCa,
    store: MemoryCredentialStore,
    trust_missing: bool,
    store_delay: Option<Duration>,
    timeout: Duration,
}

impl Default for HarnessBuilder {
    fn default() -> Self {
        let journal = Journal::default();
        Self {
            ca: FakeCa::new(journal.clone()),
            journal,
            store: MemoryCredentialStore::new(),
            trust_missing: false,
            store_delay: None,
            timeout: Duration::from_secs(5),
        }
    }
}

impl HarnessBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ca(mut self, configure: impl FnOnce(FakeCa) -> FakeCa) -> Self {
        self.ca = configure(self.ca);
        self
    }

    /// Seed the admin's one-time secret slot and make it valid at the CA.
    pub fn admin_secret(mut self, secret: &str) -> Self {
        self.store = self.store.with_slot(ADMIN_PASSWORD_SLOT, secret);
        self.ca = self.ca.with_secret("admin", secret);
        self
    }

    /// Seed a previously enrolled admin key and certificate.
    pub fn enrolled_admin(mut self) -> Self {
        let (certificate, key) = issue_certificate("admin");
        self.store = self.store.with_slot(ADMIN_KEY_SLOT, key).with_slot(ADMIN_CERT_SLOT, certificate);
        self
    }

    pub fn trust_missing(mut self) -> Self {
        self.trust_missing = true;
        self
    }

    pub fn slow_store(mut self, delay: Duration, timeout: Duration) -> Self {
        self.store_delay = Some(delay);
        self.timeout = timeout;
        self
    }

    pub fn build(self) -> Harness {
        let settings = ProvisioningSettings {
            endpoint: CaEndpoint::from_host("ca.org1-network.example.com:30002").unwrap(),
            org_name: ORG.to_string(),
            admin_slots: CredentialSlots {
                password: ADMIN_PASSWORD_SLOT.to_string(),
                private_key: ADMIN_KEY_SLOT.to_string(),
                signed_certificate: ADMIN_CERT_SLOT.to_string(),
            },
            trust_anchor_location: TLS_LOCATION.to_string(),
            request_timeout: self.timeout,
        };

        let (anchor_pem, _) = issue_certificate("tls-ca");
        let trust = FakeTrust {
            journal: self.journal.clone(),
            anchor: TrustAnchor::from_pem(anchor_pem).unwrap(),
            missing: self.trust_missing,
        };
        let store = RecordingStore {
            inner: self.store.clone(),
            journal: self.journal.clone(),
            delay: self.store_delay,
        };
        let connector = FakeConnector { ca: self.ca.clone(), journal: self.journal.clone() };

        let ctx =
            ProvisioningContext::new(settings, Arc::new(connector), Arc::new(store), Arc::new(trust));
        Harness { journal: self.journal, ca: self.ca, store: self.store, ctx }
    }
}

pub fn user_request(user_id: &str, affiliation: &str) -> UserRequest {
    UserRequest {
        user_id: user_id.to_string(),
        affiliation: affiliation.to_string(),
        password_slot: format!("{}-password", user_id),
        private_key_slot: format!("{}-key", user_id),
        cert_slot: format!("{}-cert", user_id),
    }
}
