//! # Trust Material
//!
//! Retrieval of the CA's TLS trust root. The anchor is fetched once per
//! workflow invocation and never cached across invocations.
//!
//! Locations are resolved by scheme:
//! - `file:///path/ca.pem` or a bare path: local filesystem
//! - `http://…` / `https://…`: object storage URL fetched with `reqwest`

use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;
use url::Url;
use x509_parser::pem::Pem;

use crate::errors::{ProvisionError, Result};

/// PEM-encoded certificate bundle used to pin the CA's TLS identity.
#[derive(Clone, PartialEq, Eq)]
pub struct TrustAnchor {
    pem: Vec<u8>,
    certificate_count: usize,
}

impl std::fmt::Debug for TrustAnchor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrustAnchor")
            .field("pem", &format!("[{} bytes PEM]", self.pem.len()))
            .field("certificate_count", &self.certificate_count)
            .finish()
    }
}

impl TrustAnchor {
    /// Validates that `pem` holds at least one parseable X.509 certificate.
    pub fn from_pem(pem: impl Into<Vec<u8>>) -> Result<Self> {
        let pem = pem.into();
        let mut certificate_count = 0;

        for block in Pem::iter_from_buffer(&pem) {
            let block = block
                .map_err(|e| ProvisionError::config(format!("Trust anchor is not valid PEM: {}", e)))?;
            if block.label != "CERTIFICATE" {
                continue;
            }
            block.parse_x509().map_err(|e| {
                ProvisionError::config(format!("Trust anchor certificate is malformed: {}", e))
            })?;
            certificate_count += 1;
        }

        if certificate_count == 0 {
            return Err(ProvisionError::config("Trust anchor does not contain any certificates"));
        }

        Ok(Self { pem, certificate_count })
    }

    pub fn as_pem(&self) -> &[u8] {
        &self.pem
    }

    pub fn certificate_count(&self) -> usize {
        self.certificate_count
    }
}

/// Supplies the CA's TLS trust root bytes.
#[async_trait]
pub trait TrustMaterialProvider: Send + Sync {
    /// Fetch and validate the trust anchor stored at `location`.
    ///
    /// # Errors
    ///
    /// - [`ProvisionError::NotFound`] if nothing exists at `location`
    /// - [`ProvisionError::StoreUnavailable`] if the source cannot be read
    /// - [`ProvisionError::Config`] if the bytes are not a PEM certificate bundle
    async fn fetch(&self, location: &str) -> Result<TrustAnchor>;
}

/// Reads trust material from the local filesystem.
#[derive(Debug, Clone, Default)]
pub struct FileTrustMaterialProvider;

impl FileTrustMaterialProvider {
    async fn read(&self, path: PathBuf) -> Result<TrustAnchor> {
        debug!(path = %path.display(), "Reading trust anchor from file");
        let bytes = tokio::fs::read(&path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => {
                ProvisionError::not_found(format!("trust anchor at {}", path.display()))
            }
            _ => ProvisionError::store_unavailable(format!(
                "Failed to read trust anchor at {}: {}",
                path.display(),
                e
            )),
        })?;
        TrustAnchor::from_pem(bytes)
    }
}

#[async_trait]
impl TrustMaterialProvider for FileTrustMaterialProvider {
    async fn fetch(&self, location: &str) -> Result<TrustAnchor> {
        let path = match Url::parse(location) {
            Ok(url) if url.scheme() == "file" => url.to_file_path().map_err(|_| {
                ProvisionError::config(format!("Invalid file URL for trust anchor: {}", location))
            })?,
            _ => PathBuf::from(location),
        };
        self.read(path).await
    }
}

/// Fetches trust material from an HTTP(S) object URL.
#[derive(Debug, Clone)]
pub struct HttpTrustMaterialProvider {
    client: reqwest::Client,
}

impl HttpTrustMaterialProvider {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProvisionError::config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl TrustMaterialProvider for HttpTrustMaterialProvider {
    async fn fetch(&self, location: &str) -> Result<TrustAnchor> {
        debug!(location = %location, "Fetching trust anchor over HTTP");
        let response = self.client.get(location).send().await.map_err(|e| {
            ProvisionError::store_unavailable(format!("Failed to fetch trust anchor: {}", e))
        })?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ProvisionError::not_found(format!("trust anchor at {}", location)));
        }
        if !status.is_success() {
            return Err(ProvisionError::store_unavailable(format!(
                "Trust anchor fetch returned status {}",
                status
            )));
        }

        let bytes = response.bytes().await.map_err(|e| {
            ProvisionError::store_unavailable(format!("Failed to read trust anchor body: {}", e))
        })?;
        TrustAnchor::from_pem(bytes.to_vec())
    }
}

/// Dispatches to the file or HTTP provider based on the location scheme.
#[derive(Debug, Clone)]
pub struct LocationTrustMaterialProvider {
    file: FileTrustMaterialProvider,
    http: HttpTrustMaterialProvider,
}

impl LocationTrustMaterialProvider {
    pub fn new(timeout: Duration) -> Result<Self> {
        Ok(Self { file: FileTrustMaterialProvider, http: HttpTrustMaterialProvider::new(timeout)? })
    }
}

#[async_trait]
impl TrustMaterialProvider for LocationTrustMaterialProvider {
    async fn fetch(&self, location: &str) -> Result<TrustAnchor> {
        match Url::parse(location) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => self.http.fetch(location).await,
            Ok(url) if url.scheme() != "file" && url.scheme().len() > 1 => Err(
                ProvisionError::config(format!("Unsupported trust anchor scheme '{}'", url.scheme())),
            ),
            _ => self.file.fetch(location).await,
        }
    }
}
