//! CA endpoint descriptor and CA-name derivation.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::errors::{ProvisionError, Result};

/// Derives the CA name from the endpoint host.
///
/// Takes the second dot-separated label, splits it on `-`, uppercases the
/// second token and rejoins: `ca.org1-network.example.com` yields
/// `org1-NETWORK`.
///
/// # Errors
///
/// [`ProvisionError::Config`] when the host has no second label or that label
/// has no second `-` token.
pub fn derive_ca_name(host: &str) -> Result<String> {
    let label = host
        .split('.')
        .nth(1)
        .ok_or_else(|| ProvisionError::config(format!("CA host '{}' has no second label", host)))?;

    let mut tokens: Vec<String> = label.split('-').map(str::to_string).collect();
    let second = tokens.get_mut(1).ok_or_else(|| {
        ProvisionError::config(format!(
            "CA host label '{}' has no '-' separated token to derive a CA name from",
            label
        ))
    })?;
    *second = second.to_uppercase();

    Ok(tokens.join("-"))
}

/// Where the CA lives and the name it answers to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaEndpoint {
    /// Host, optionally with `:port`
    pub host: String,

    /// Name derived with [`derive_ca_name`]
    pub ca_name: String,

    /// Base URL requests are issued against
    pub url: Url,
}

impl CaEndpoint {
    /// HTTPS endpoint for `host`.
    pub fn from_host(host: &str) -> Result<Self> {
        let host = host.trim();
        if host.is_empty() {
            return Err(ProvisionError::config("CA endpoint host cannot be empty"));
        }
        let url = Url::parse(&format!("https://{}", host))
            .map_err(|e| ProvisionError::config(format!("Invalid CA endpoint '{}': {}", host, e)))?;

        Ok(Self { host: host.to_string(), ca_name: derive_ca_name(host)?, url })
    }

    /// Endpoint with an explicit base URL, keeping the host-derived CA name.
    pub fn with_url(host: &str, url: Url) -> Result<Self> {
        Ok(Self { host: host.to_string(), ca_name: derive_ca_name(host)?, url })
    }
}
