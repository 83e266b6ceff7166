//! JSON request and response bodies of the CA REST API.

use serde::{Deserialize, Serialize};

use super::types::{Affiliation, RegisteredIdentity, Role};

/// Envelope every CA response is wrapped in.
#[derive(Debug, Deserialize)]
pub struct CaResponse<T> {
    #[serde(default)]
    pub success: bool,
    pub result: Option<T>,
    #[serde(default)]
    pub errors: Vec<CaMessage>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CaMessage {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub message: String,
}

/// Concatenated error messages of a failed response.
pub fn error_text(errors: &[CaMessage]) -> String {
    errors.iter().map(|e| format!("[{}] {}", e.code, e.message)).collect::<Vec<_>>().join("; ")
}

#[derive(Debug, Serialize)]
pub struct EnrollRequest<'a> {
    pub certificate_request: &'a str,
    pub caname: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct EnrollResult {
    /// Base64 of the PEM certificate
    #[serde(rename = "Cert")]
    pub cert: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterRequest<'a> {
    pub id: &'a str,
    #[serde(rename = "type")]
    pub role: &'a str,
    pub affiliation: &'a str,
    pub max_enrollments: i32,
    pub attrs: Vec<serde_json::Value>,
    pub caname: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct RegisterResult {
    pub secret: String,
}

#[derive(Debug, Deserialize)]
pub struct IdentitiesResult {
    #[serde(default)]
    pub identities: Vec<IdentityInfo>,
}

#[derive(Debug, Deserialize)]
pub struct IdentityInfo {
    pub id: String,
    #[serde(rename = "type", default)]
    pub role: String,
    #[serde(default)]
    pub affiliation: String,
}

impl From<IdentityInfo> for RegisteredIdentity {
    fn from(info: IdentityInfo) -> Self {
        Self {
            enrollment_id: info.id,
            role: Role::from(info.role.as_str()),
            affiliation: info.affiliation,
        }
    }
}

/// A node of the affiliation tree; the root node has an empty name.
#[derive(Debug, Deserialize)]
pub struct AffiliationNode {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub affiliations: Vec<AffiliationNode>,
}

impl AffiliationNode {
    /// Every named node in the tree, depth first.
    pub fn flatten(&self) -> Vec<Affiliation> {
        let mut out = Vec::new();
        self.collect(&mut out);
        out
    }

    fn collect(&self, out: &mut Vec<Affiliation>) {
        if !self.name.is_empty() {
            out.push(Affiliation::new(self.name.clone()));
        }
        for child in &self.affiliations {
            child.collect(out);
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AddAffiliationRequest<'a> {
    pub name: &'a str,
    pub caname: &'a str,
}
