//! # Configuration Settings
//!
//! Defines the configuration structure for the provisioner and its
//! resolution from environment variables.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use validator::Validate;

use crate::ca::{CaEndpoint, RetryConfig};
use crate::errors::{ProvisionError, Result};
use crate::secrets::VaultConfig;
use crate::workflow::{CredentialSlots, ProvisioningSettings};

/// Where credential slots live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CredentialBackend {
    #[default]
    Vault,
    Memory,
}

impl FromStr for CredentialBackend {
    type Err = ProvisionError;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_lowercase().as_str() {
            "vault" => Ok(Self::Vault),
            "memory" => Ok(Self::Memory),
            other => Err(ProvisionError::config(format!(
                "Unknown credential backend '{}', expected 'vault' or 'memory'",
                other
            ))),
        }
    }
}

impl fmt::Display for CredentialBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Vault => f.write_str("vault"),
            Self::Memory => f.write_str("memory"),
        }
    }
}

/// Provisioner configuration, resolved once before any workflow runs.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ProvisionerConfig {
    /// CA host, optionally with `:port`
    #[validate(length(min = 1, message = "CA endpoint cannot be empty"))]
    pub ca_endpoint: String,

    /// Organisation (member) name; also the root affiliation
    #[validate(length(min = 1, message = "Organization name cannot be empty"))]
    pub org_name: String,

    #[validate(length(min = 1, message = "Admin password slot cannot be empty"))]
    pub admin_password_id: String,

    #[validate(length(min = 1, message = "Admin private key slot cannot be empty"))]
    pub admin_private_key_id: String,

    #[validate(length(min = 1, message = "Admin signed certificate slot cannot be empty"))]
    pub admin_signed_cert_id: String,

    /// Path, `file://` URL or `http(s)://` URL of the CA's TLS root
    #[validate(length(min = 1, message = "TLS certificate location cannot be empty"))]
    pub tls_cert_location: String,

    /// Bound on every CA, credential store and trust material call
    #[validate(range(min = 1, max = 300, message = "Timeout must be between 1 and 300 seconds"))]
    pub request_timeout_seconds: u64,

    /// Check the CA certificate against the endpoint host
    pub verify_ca_hostname: bool,

    pub credential_backend: CredentialBackend,

    /// Attempts for read-only CA calls, including the first
    #[validate(range(min = 1, max = 10, message = "Retry attempts must be between 1 and 10"))]
    pub ca_max_attempts: u32,

    /// Vault connection, present when `credential_backend` is `vault`
    pub vault: Option<VaultConfig>,
}

fn is_truthy(value: &str) -> bool {
    matches!(value.to_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

/// Whether `PROVISIONER_LOG_JSON` asks for JSON log output.
///
/// Read separately from [`ProvisionerConfig`] because logging is installed
/// before the rest of the configuration is resolved.
pub fn json_logs_from_lookup<F>(lookup: F) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    lookup("PROVISIONER_LOG_JSON").map(|v| is_truthy(v.trim())).unwrap_or(false)
}

pub fn json_logs_from_env() -> bool {
    json_logs_from_lookup(|key| std::env::var(key).ok())
}

impl ProvisionerConfig {
    /// Resolve configuration from process environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve configuration through `lookup`, which returns the value of a
    /// variable or `None` when unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let value = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let required = |key: &str| {
            value(key).ok_or_else(|| {
                ProvisionError::config(format!("Missing required environment variable {}", key))
            })
        };

        let request_timeout_seconds = match value("PROVISIONER_REQUEST_TIMEOUT_SECONDS") {
            Some(raw) => raw.parse::<u64>().map_err(|e| {
                ProvisionError::config(format!("Invalid PROVISIONER_REQUEST_TIMEOUT_SECONDS: {}", e))
            })?,
            None => 30,
        };

        let ca_max_attempts = match value("PROVISIONER_CA_MAX_ATTEMPTS") {
            Some(raw) => raw.parse::<u32>().map_err(|e| {
                ProvisionError::config(format!("Invalid PROVISIONER_CA_MAX_ATTEMPTS: {}", e))
            })?,
            None => RetryConfig::default().max_attempts,
        };

        let verify_ca_hostname = value("PROVISIONER_VERIFY_CA_HOSTNAME")
            .map(|v| is_truthy(&v))
            .unwrap_or(true);

        let credential_backend = match value("PROVISIONER_CREDENTIAL_BACKEND") {
            Some(raw) => raw.parse()?,
            None => CredentialBackend::default(),
        };

        let vault = match credential_backend {
            CredentialBackend::Vault => Some(VaultConfig::from_lookup(&lookup)?),
            CredentialBackend::Memory => None,
        };

        let config = Self {
            ca_endpoint: required("PROVISIONER_CA_ENDPOINT")?,
            org_name: required("PROVISIONER_ORG_NAME")?,
            admin_password_id: required("PROVISIONER_ADMIN_PASSWORD_ID")?,
            admin_private_key_id: required("PROVISIONER_ADMIN_PRIVATE_KEY_ID")?,
            admin_signed_cert_id: required("PROVISIONER_ADMIN_SIGNED_CERT_ID")?,
            tls_cert_location: required("PROVISIONER_TLS_CERT_LOCATION")?,
            request_timeout_seconds,
            verify_ca_hostname,
            credential_backend,
            ca_max_attempts,
            vault,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate field ranges and the CA-name convention of the endpoint.
    pub fn validate(&self) -> Result<()> {
        Validate::validate(self)?;
        crate::ca::derive_ca_name(&self.ca_endpoint)?;
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    pub fn retry(&self) -> RetryConfig {
        RetryConfig { max_attempts: self.ca_max_attempts, ..RetryConfig::default() }
    }

    /// Settings handed to the workflows.
    pub fn provisioning_settings(&self) -> Result<ProvisioningSettings> {
        Ok(ProvisioningSettings {
            endpoint: CaEndpoint::from_host(&self.ca_endpoint)?,
            org_name: self.org_name.clone(),
            admin_slots: CredentialSlots {
                password: self.admin_password_id.clone(),
                private_key: self.admin_private_key_id.clone(),
                signed_certificate: self.admin_signed_cert_id.clone(),
            },
            trust_anchor_location: self.tls_cert_location.clone(),
            request_timeout: self.request_timeout(),
        })
    }
}
