//! Registration and enrollment of a subordinate client identity.

use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use validator::Validate;

use super::outcome::RegistrationReport;
use super::{ProvisioningContext, ADMIN_ENROLLMENT_ID};
use crate::ca::{Affiliation, Identity, SigningIdentity};
use crate::errors::{ProvisionError, Result};

/// Per-user request payload.
///
/// Field aliases accept the custom-resource property names used by
/// infrastructure templates (`passwordArn`, `privateKeyArn`, `signedCertArn`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UserRequest {
    #[validate(length(min = 1, message = "User ID cannot be empty"))]
    pub user_id: String,

    #[validate(length(min = 1, message = "Affiliation cannot be empty"))]
    pub affiliation: String,

    #[serde(alias = "passwordArn")]
    #[validate(length(min = 1, message = "Password slot cannot be empty"))]
    pub password_slot: String,

    #[serde(alias = "privateKeyArn")]
    #[validate(length(min = 1, message = "Private key slot cannot be empty"))]
    pub private_key_slot: String,

    #[serde(alias = "signedCertArn")]
    #[validate(length(min = 1, message = "Certificate slot cannot be empty"))]
    pub cert_slot: String,
}

/// Registers, enrolls and persists a client identity on behalf of the admin.
///
/// Steps run strictly in order: trust anchor, admin identity, CA client,
/// existence check, affiliation check, register, enroll, persist. The
/// existence and affiliation reads only short-circuit work; correctness under
/// concurrent invocations comes from treating duplicates on the mutating
/// calls as success.
#[derive(Debug, Clone)]
pub struct UserRegistration {
    ctx: ProvisioningContext,
}

impl UserRegistration {
    pub fn new(ctx: ProvisioningContext) -> Self {
        Self { ctx }
    }

    #[instrument(
        skip(self, request),
        fields(user_id = %request.user_id, affiliation = %request.affiliation),
        name = "user_registration"
    )]
    pub async fn run(&self, request: &UserRequest) -> Result<RegistrationReport> {
        request.validate()?;
        let settings = self.ctx.settings();

        let anchor = self.ctx.fetch_trust_anchor().await?;
        let admin = self.load_admin().await?;
        let ca = self.ctx.connect(&anchor).await?;

        let identities = ca.list_identities(&admin).await?;
        if identities.iter().any(|identity| identity.enrollment_id == request.user_id) {
            info!("User already exists, nothing to do");
            return Ok(RegistrationReport::AlreadyExists { user_id: request.user_id.clone() });
        }

        let mut affiliation_created = false;
        if request.affiliation != settings.root_affiliation() {
            let affiliations = ca.list_affiliations(&admin).await?;
            if !affiliations.iter().any(|affiliation| affiliation.name == request.affiliation) {
                let affiliation = Affiliation::new(request.affiliation.as_str());
                info!(parent = ?affiliation.parent(), "Creating affiliation");
                match ca.create_affiliation(&request.affiliation, &admin).await {
                    Ok(()) => affiliation_created = true,
                    Err(ProvisionError::DuplicateAffiliation { .. }) => {
                        info!("Affiliation created concurrently, continuing");
                    }
                    Err(e) => return Err(e),
                }
            }
        }

        let identity = Identity::client(&request.user_id, &request.affiliation, settings.msp_id());
        let secret = match ca.register(&identity, &admin).await {
            Ok(secret) => secret,
            Err(ProvisionError::DuplicateIdentity { .. }) => {
                info!("User registered concurrently, leaving enrollment to that invocation");
                return Ok(RegistrationReport::AlreadyRegistered { user_id: request.user_id.clone() });
            }
            Err(e) => return Err(e),
        };

        let credential = ca.enroll(&request.user_id, &secret).await?;

        self.ctx.put_secret(&request.password_slot, secret.expose_secret()).await?;
        self.ctx.put_secret(&request.private_key_slot, credential.private_key.expose_secret()).await?;
        self.ctx.put_secret(&request.cert_slot, &credential.signed_certificate).await?;

        info!(affiliation_created = affiliation_created, "User registered, enrolled and persisted");
        Ok(RegistrationReport::Registered {
            user_id: request.user_id.clone(),
            affiliation: request.affiliation.clone(),
            affiliation_created,
        })
    }

    async fn load_admin(&self) -> Result<SigningIdentity> {
        let settings = self.ctx.settings();
        let private_key = self.ctx.get_secret(&settings.admin_slots.private_key).await?;
        let certificate = self.ctx.get_secret(&settings.admin_slots.signed_certificate).await?;

        SigningIdentity::from_pem(
            ADMIN_ENROLLMENT_ID,
            settings.msp_id(),
            certificate.expose_secret(),
            &private_key,
        )
    }
}
