//! Identity, affiliation and credential types exchanged with the CA.

use serde::{Deserialize, Serialize};
use std::fmt;
use x509_parser::pem::parse_x509_pem;

use crate::errors::{ProvisionError, Result};
use crate::secrets::SecretString;

/// Role a CA identity is registered with.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Client,
    Peer,
    Orderer,
    #[serde(untagged)]
    Other(String),
}

impl Role {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Admin => "admin",
            Self::Client => "client",
            Self::Peer => "peer",
            Self::Orderer => "orderer",
            Self::Other(other) => other,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for Role {
    fn from(value: &str) -> Self {
        match value {
            "admin" => Self::Admin,
            "client" => Self::Client,
            "peer" => Self::Peer,
            "orderer" => Self::Orderer,
            other => Self::Other(other.to_string()),
        }
    }
}

/// An identity declared to the CA.
///
/// Immutable once enrolled; re-enrollment is a separate operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Unique within the CA
    pub enrollment_id: String,
    pub role: Role,
    pub affiliation: String,
    pub msp_id: String,
}

impl Identity {
    /// A client identity scoped to `msp_id`.
    pub fn client(
        enrollment_id: impl Into<String>,
        affiliation: impl Into<String>,
        msp_id: impl Into<String>,
    ) -> Self {
        Self {
            enrollment_id: enrollment_id.into(),
            role: Role::Client,
            affiliation: affiliation.into(),
            msp_id: msp_id.into(),
        }
    }
}

/// An identity as listed by the CA.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisteredIdentity {
    pub enrollment_id: String,
    pub role: Role,
    pub affiliation: String,
}

/// A node in the CA's affiliation namespace.
///
/// The parent is implicit in the dotted name: `org1.dept2` is a child of
/// `org1`. The organisation root always exists.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Affiliation {
    pub name: String,
}

impl Affiliation {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// Name of the parent affiliation, `None` for a root.
    pub fn parent(&self) -> Option<&str> {
        self.name.rsplit_once('.').map(|(parent, _)| parent)
    }
}

/// Result of an enrollment: a private key and the certificate the CA signed for it.
///
/// Held in memory only for the duration of one workflow execution.
#[derive(Clone)]
pub struct Credential {
    /// PKCS#8 PEM private key
    pub private_key: SecretString,

    /// PEM certificate signed by the CA
    pub signed_certificate: String,

    /// One-time secret the credential was enrolled with
    pub enrollment_secret: SecretString,
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("private_key", &self.private_key)
            .field("signed_certificate", &format!("[{} bytes PEM]", self.signed_certificate.len()))
            .field("enrollment_secret", &self.enrollment_secret)
            .finish()
    }
}

impl Credential {
    /// Common name of the signed certificate's subject.
    pub fn subject_common_name(&self) -> Result<Option<String>> {
        let (_, pem) = parse_x509_pem(self.signed_certificate.as_bytes())
            .map_err(|e| ProvisionError::crypto(format!("Signed certificate is not PEM: {}", e)))?;
        let certificate = pem
            .parse_x509()
            .map_err(|e| ProvisionError::crypto(format!("Signed certificate is malformed: {}", e)))?;
        let common_name = certificate
            .subject()
            .iter_common_name()
            .next()
            .and_then(|cn| cn.as_str().ok())
            .map(str::to_string);
        Ok(common_name)
    }
}
