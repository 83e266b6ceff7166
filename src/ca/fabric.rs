//! REST client for a Fabric-CA-compatible certificate authority.
//!
//! Endpoints used, all under `/api/v1/`:
//! - `POST enroll`: basic auth with the one-time secret, CSR in the body
//! - `POST register`: registrar token auth, returns the new one-time secret
//! - `GET identities?ca=…`: registrar token auth
//! - `GET affiliations?ca=…`: registrar token auth, nested tree
//! - `POST affiliations?force=false`: registrar token auth

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info};
use url::{Position, Url};

use super::endpoint::CaEndpoint;
use super::retry::RetryConfig;
use super::signing::SigningIdentity;
use super::types::{Affiliation, Credential, Identity, RegisteredIdentity};
use super::wire::{
    error_text, AddAffiliationRequest, AffiliationNode, CaResponse, EnrollRequest, EnrollResult,
    IdentitiesResult, RegisterRequest, RegisterResult,
};
use super::{CaConnector, CertificateAuthority};
use crate::errors::{ProvisionError, Result};
use crate::secrets::SecretString;
use crate::trust::TrustAnchor;

/// CA operations, used for error classification and log fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaOperation {
    Enroll,
    Register,
    ListIdentities,
    ListAffiliations,
    CreateAffiliation,
}

impl CaOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Enroll => "enroll",
            Self::Register => "register",
            Self::ListIdentities => "list_identities",
            Self::ListAffiliations => "list_affiliations",
            Self::CreateAffiliation => "create_affiliation",
        }
    }
}

/// Maps a failed CA response onto the error taxonomy.
///
/// `subject` is the enrollment ID or affiliation name the call was about.
pub fn classify_failure(
    operation: CaOperation,
    status: u16,
    message: &str,
    subject: &str,
) -> ProvisionError {
    let lower = message.to_lowercase();

    match operation {
        CaOperation::Register
            if lower.contains("already registered") || lower.contains("already exists") =>
        {
            return ProvisionError::duplicate_identity(subject);
        }
        CaOperation::CreateAffiliation if lower.contains("already exists") => {
            return ProvisionError::duplicate_affiliation(subject);
        }
        _ => {}
    }

    match status {
        401 if operation == CaOperation::Enroll => ProvisionError::invalid_secret(subject),
        401 | 403 => ProvisionError::unauthorized(format!("{}: {}", operation.as_str(), message)),
        _ if lower.contains("authorization failure") => {
            ProvisionError::unauthorized(format!("{}: {}", operation.as_str(), message))
        }
        429 | 500..=599 => ProvisionError::ca_unreachable(format!(
            "{} returned status {}: {}",
            operation.as_str(),
            status,
            message
        )),
        _ => ProvisionError::rejected(status, format!("{}: {}", operation.as_str(), message)),
    }
}

/// Transport options for [`FabricCaClient`].
#[derive(Debug, Clone)]
pub struct CaClientOptions {
    /// Bound on every individual request
    pub request_timeout: Duration,
    /// Check that the CA certificate matches the endpoint host
    pub verify_hostname: bool,
    /// Backoff for read-only calls
    pub retry: RetryConfig,
}

impl Default for CaClientOptions {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            verify_hostname: true,
            retry: RetryConfig::default(),
        }
    }
}

/// Typed wrapper over the CA REST protocol.
#[derive(Debug, Clone)]
pub struct FabricCaClient {
    client: reqwest::Client,
    base_url: Url,
    ca_name: String,
    retry: RetryConfig,
}

impl FabricCaClient {
    /// Builds a client for `endpoint`.
    ///
    /// With a trust anchor the anchor becomes the only accepted root; the
    /// platform root store is not consulted.
    pub fn new(
        endpoint: &CaEndpoint,
        trust_anchor: Option<&TrustAnchor>,
        options: &CaClientOptions,
    ) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .timeout(options.request_timeout)
            .user_agent(format!("{}/{}", crate::APP_NAME, crate::VERSION));

        if let Some(anchor) = trust_anchor {
            let roots = reqwest::Certificate::from_pem_bundle(anchor.as_pem()).map_err(|e| {
                ProvisionError::config(format!("Trust anchor rejected by TLS stack: {}", e))
            })?;
            builder = builder.tls_built_in_root_certs(false);
            for root in roots {
                builder = builder.add_root_certificate(root);
            }
        }

        if !options.verify_hostname {
            builder = builder.danger_accept_invalid_hostnames(true);
        }

        let client = builder
            .build()
            .map_err(|e| ProvisionError::config(format!("Failed to build CA client: {}", e)))?;

        Ok(Self {
            client,
            base_url: endpoint.url.clone(),
            ca_name: endpoint.ca_name.clone(),
            retry: options.retry.clone(),
        })
    }

    pub fn ca_name(&self) -> &str {
        &self.ca_name
    }

    fn url(&self, path: &str, query: &[(&str, &str)]) -> Result<Url> {
        let mut url = self
            .base_url
            .join(&format!("api/v1/{}", path))
            .map_err(|e| ProvisionError::config(format!("Invalid CA URL: {}", e)))?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    /// Builds a registrar-authenticated request, signing over the exact body bytes.
    fn signed_request<B: Serialize>(
        &self,
        method: Method,
        url: Url,
        body: Option<&B>,
        registrar: &SigningIdentity,
    ) -> Result<RequestBuilder> {
        let body = match body {
            Some(body) => serde_json::to_vec(body)
                .map_err(|e| ProvisionError::crypto(format!("Failed to encode request: {}", e)))?,
            None => Vec::new(),
        };
        let uri = &url[Position::BeforePath..];
        let token = registrar.auth_token(method.as_str(), uri, &body)?;

        let mut request = self.client.request(method, url.clone()).header(AUTHORIZATION, token);
        if !body.is_empty() {
            request = request.header(CONTENT_TYPE, "application/json").body(body);
        }
        Ok(request)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        operation: CaOperation,
        subject: &str,
        request: RequestBuilder,
    ) -> Result<Option<T>> {
        let response = request.send().await.map_err(|e| {
            ProvisionError::ca_unreachable(format!("{} request failed: {}", operation.as_str(), e))
        })?;

        let status = response.status().as_u16();
        let text = response.text().await.map_err(|e| {
            ProvisionError::ca_unreachable(format!(
                "{} response could not be read: {}",
                operation.as_str(),
                e
            ))
        })?;
        debug!(operation = operation.as_str(), status = status, "CA response received");

        let envelope: Option<CaResponse<T>> = serde_json::from_str(&text).ok();
        match envelope {
            Some(envelope) if (200..300).contains(&status) && envelope.success => Ok(envelope.result),
            Some(envelope) => {
                let message = if envelope.errors.is_empty() {
                    format!("request unsuccessful (status {})", status)
                } else {
                    error_text(&envelope.errors)
                };
                Err(classify_failure(operation, status, &message, subject))
            }
            None if (200..300).contains(&status) => Err(ProvisionError::rejected(
                status,
                format!("{}: malformed CA response", operation.as_str()),
            )),
            None => {
                let snippet: String = text.chars().take(200).collect();
                Err(classify_failure(operation, status, &snippet, subject))
            }
        }
    }

    fn required<T>(operation: CaOperation, result: Option<T>) -> Result<T> {
        result.ok_or_else(|| {
            ProvisionError::rejected(200, format!("{}: response has no result", operation.as_str()))
        })
    }

    async fn list_identities_once(&self, registrar: &SigningIdentity) -> Result<Vec<RegisteredIdentity>> {
        let url = self.url("identities", &[("ca", &self.ca_name)])?;
        let request = self.signed_request::<()>(Method::GET, url, None, registrar)?;
        let result: Option<IdentitiesResult> =
            self.send(CaOperation::ListIdentities, registrar.enrollment_id(), request).await?;
        let identities = Self::required(CaOperation::ListIdentities, result)?.identities;
        Ok(identities.into_iter().map(RegisteredIdentity::from).collect())
    }

    async fn list_affiliations_once(&self, registrar: &SigningIdentity) -> Result<Vec<Affiliation>> {
        let url = self.url("affiliations", &[("ca", &self.ca_name)])?;
        let request = self.signed_request::<()>(Method::GET, url, None, registrar)?;
        let result: Option<AffiliationNode> =
            self.send(CaOperation::ListAffiliations, registrar.enrollment_id(), request).await?;
        Ok(Self::required(CaOperation::ListAffiliations, result)?.flatten())
    }
}

#[async_trait]
impl CertificateAuthority for FabricCaClient {
    async fn enroll(&self, enrollment_id: &str, secret: &SecretString) -> Result<Credential> {
        let key_pair = rcgen::KeyPair::generate()?;
        let mut params = rcgen::CertificateParams::new(Vec::<String>::new())?;
        params.distinguished_name = rcgen::DistinguishedName::new();
        params.distinguished_name.push(rcgen::DnType::CommonName, enrollment_id);
        let csr = params.serialize_request(&key_pair)?.pem()?;

        let url = self.url("enroll", &[])?;
        let body = EnrollRequest { certificate_request: &csr, caname: &self.ca_name };
        let request = self
            .client
            .post(url)
            .basic_auth(enrollment_id, Some(secret.expose_secret()))
            .json(&body);

        let result: Option<EnrollResult> = self.send(CaOperation::Enroll, enrollment_id, request).await?;
        let encoded = Self::required(CaOperation::Enroll, result)?.cert;
        let signed_certificate = STANDARD
            .decode(encoded.trim())
            .ok()
            .and_then(|bytes| String::from_utf8(bytes).ok())
            .ok_or_else(|| ProvisionError::rejected(200, "enroll: certificate is not base64 PEM"))?;

        let credential = Credential {
            private_key: SecretString::new(key_pair.serialize_pem()),
            signed_certificate,
            enrollment_secret: secret.clone(),
        };
        match credential.subject_common_name() {
            Ok(Some(common_name)) if common_name == enrollment_id => {}
            Ok(common_name) => {
                return Err(ProvisionError::rejected(
                    200,
                    format!(
                        "enroll: certificate subject {:?} does not match '{}'",
                        common_name, enrollment_id
                    ),
                ))
            }
            Err(e) => return Err(ProvisionError::rejected(200, format!("enroll: {}", e))),
        }

        info!(enrollment_id = %enrollment_id, ca_name = %self.ca_name, "Enrolled identity with CA");
        Ok(credential)
    }

    async fn register(&self, identity: &Identity, registrar: &SigningIdentity) -> Result<SecretString> {
        let url = self.url("register", &[])?;
        let body = RegisterRequest {
            id: &identity.enrollment_id,
            role: identity.role.as_str(),
            affiliation: &identity.affiliation,
            max_enrollments: 0,
            attrs: Vec::new(),
            caname: &self.ca_name,
        };
        let request = self.signed_request(Method::POST, url, Some(&body), registrar)?;

        let result: Option<RegisterResult> =
            self.send(CaOperation::Register, &identity.enrollment_id, request).await?;
        let secret = Self::required(CaOperation::Register, result)?.secret;

        info!(
            enrollment_id = %identity.enrollment_id,
            affiliation = %identity.affiliation,
            registrar = %registrar.enrollment_id(),
            "Registered identity with CA"
        );
        Ok(SecretString::new(secret))
    }

    async fn list_identities(&self, registrar: &SigningIdentity) -> Result<Vec<RegisteredIdentity>> {
        self.retry
            .run(CaOperation::ListIdentities.as_str(), || self.list_identities_once(registrar))
            .await
    }

    async fn list_affiliations(&self, registrar: &SigningIdentity) -> Result<Vec<Affiliation>> {
        self.retry
            .run(CaOperation::ListAffiliations.as_str(), || self.list_affiliations_once(registrar))
            .await
    }

    async fn create_affiliation(&self, name: &str, registrar: &SigningIdentity) -> Result<()> {
        let url = self.url("affiliations", &[("force", "false")])?;
        let body = AddAffiliationRequest { name, caname: &self.ca_name };
        let request = self.signed_request(Method::POST, url, Some(&body), registrar)?;

        let _: Option<serde_json::Value> =
            self.send(CaOperation::CreateAffiliation, name, request).await?;

        info!(affiliation = %name, registrar = %registrar.enrollment_id(), "Created affiliation");
        Ok(())
    }
}

/// Builds a [`FabricCaClient`] per invocation.
#[derive(Debug, Clone, Default)]
pub struct FabricCaConnector {
    options: CaClientOptions,
}

impl FabricCaConnector {
    pub fn new(options: CaClientOptions) -> Self {
        Self { options }
    }
}

#[async_trait]
impl CaConnector for FabricCaConnector {
    async fn connect(
        &self,
        endpoint: &CaEndpoint,
        trust_anchor: &TrustAnchor,
    ) -> Result<Box<dyn CertificateAuthority>> {
        let client = FabricCaClient::new(endpoint, Some(trust_anchor), &self.options)?;
        Ok(Box::new(client))
    }
}
