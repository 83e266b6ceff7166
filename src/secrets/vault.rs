//! HashiCorp Vault credential store.
//!
//! Slots live in a KV v2 secrets engine. Each slot is one KV path whose data
//! map holds the secret under the `value` field.
//!
//! # Configuration
//!
//! - `VAULT_ADDR`: Vault server address
//! - `VAULT_TOKEN`: Authentication token
//! - `VAULT_NAMESPACE`: Optional namespace
//! - `VAULT_MOUNT_PATH`: KV v2 mount path (default: "secret")
//!
//! # Example
//!
//! ```rust,ignore
//! use msp_provisioner::secrets::{CredentialStore, VaultConfig, VaultCredentialStore};
//!
//! let store = VaultCredentialStore::connect(VaultConfig::from_env()?, timeout).await?;
//! let admin_password = store.get("fabric/admin-password").await?;
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use vaultrs::client::{VaultClient, VaultClientSettingsBuilder};
use vaultrs::error::ClientError;
use vaultrs::kv2;

use super::error::{Result, SecretsError};
use super::store::CredentialStore;
use super::types::SecretString;

const VALUE_FIELD: &str = "value";

/// Configuration for the Vault credential store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultConfig {
    /// Vault server address (e.g., "https://vault.example.com:8200")
    pub address: String,

    /// Vault authentication token
    pub token: Option<SecretString>,

    /// Vault namespace (for Enterprise multi-tenancy)
    pub namespace: Option<String>,

    /// KV v2 mount path
    #[serde(default = "default_mount_path")]
    pub mount_path: String,
}

fn default_mount_path() -> String {
    "secret".to_string()
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            address: "http://127.0.0.1:8200".to_string(),
            token: None,
            namespace: None,
            mount_path: default_mount_path(),
        }
    }
}

impl VaultConfig {
    /// Reads `VAULT_ADDR`, `VAULT_TOKEN`, `VAULT_NAMESPACE` and `VAULT_MOUNT_PATH`.
    ///
    /// # Errors
    ///
    /// - [`SecretsError::ConfigError`] if `VAULT_ADDR` is not set
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`VaultConfig::from_env`], with variables supplied by `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let value = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let address = value("VAULT_ADDR")
            .ok_or_else(|| SecretsError::config_error("VAULT_ADDR environment variable not set"))?;

        Ok(Self {
            address,
            token: value("VAULT_TOKEN").map(SecretString::new),
            namespace: value("VAULT_NAMESPACE"),
            mount_path: value("VAULT_MOUNT_PATH").unwrap_or_else(default_mount_path),
        })
    }
}

/// Credential store backed by Vault KV v2.
pub struct VaultCredentialStore {
    client: VaultClient,
    mount_path: String,
}

impl std::fmt::Debug for VaultCredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultCredentialStore")
            .field("mount_path", &self.mount_path)
            .field("client", &"[VaultClient]")
            .finish()
    }
}

impl VaultCredentialStore {
    /// Builds the client and checks Vault health.
    ///
    /// `timeout` bounds every request made through the client.
    ///
    /// # Errors
    ///
    /// - [`SecretsError::ConfigError`] if the configuration is invalid
    /// - [`SecretsError::Unavailable`] if Vault is unreachable
    pub async fn connect(config: VaultConfig, timeout: Duration) -> Result<Self> {
        if config.address.is_empty() {
            return Err(SecretsError::config_error("Vault address cannot be empty"));
        }

        let mut settings_builder = VaultClientSettingsBuilder::default();
        settings_builder.address(&config.address);
        settings_builder.timeout(Some(timeout));

        if let Some(ref token) = config.token {
            settings_builder.token(token.expose_secret());
        }

        if let Some(namespace) = config.namespace {
            settings_builder.namespace(Some(namespace));
        }

        let settings = settings_builder.build().map_err(|e| {
            SecretsError::config_error(format!("Invalid Vault configuration: {}", e))
        })?;

        let client = VaultClient::new(settings).map_err(|e| {
            SecretsError::config_error(format!("Failed to create Vault client: {}", e))
        })?;

        if let Err(e) = vaultrs::sys::health(&client).await {
            tracing::error!(error = %e, address = %config.address, "Vault health check failed");
            return Err(SecretsError::unavailable(format!("Vault health check failed: {}", e)));
        }

        tracing::info!(address = %config.address, mount_path = %config.mount_path, "Connected to Vault");
        Ok(Self { client, mount_path: config.mount_path })
    }
}

fn map_vault_error(key: &str, error: ClientError) -> SecretsError {
    match error {
        ClientError::APIError { code: 404, .. } => SecretsError::not_found(key),
        other => SecretsError::unavailable(format!("Vault request for '{}' failed: {}", key, other)),
    }
}

#[async_trait]
impl CredentialStore for VaultCredentialStore {
    async fn get(&self, id: &str) -> Result<SecretString> {
        let data: HashMap<String, String> =
            kv2::read(&self.client, &self.mount_path, id).await.map_err(|e| {
                tracing::warn!(error = %e, key = %id, "Failed to read secret from Vault");
                map_vault_error(id, e)
            })?;

        data.get(VALUE_FIELD).cloned().map(SecretString::new).ok_or_else(|| {
            tracing::warn!(key = %id, "Vault secret has no 'value' field");
            SecretsError::not_found(id)
        })
    }

    async fn put(&self, id: &str, value: &str) -> Result<()> {
        let mut data = HashMap::new();
        data.insert(VALUE_FIELD.to_string(), value.to_string());

        kv2::set(&self.client, &self.mount_path, id, &data).await.map_err(|e| {
            tracing::error!(error = %e, key = %id, "Failed to write secret to Vault");
            map_vault_error(id, e)
        })?;

        tracing::debug!(key = %id, mount_path = %self.mount_path, "Stored secret in Vault");
        Ok(())
    }
}
