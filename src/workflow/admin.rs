//! Enrollment of the organisation's administrative identity.

use tracing::{info, instrument};

use super::outcome::AdminEnrollmentReport;
use super::{ProvisioningContext, ADMIN_ENROLLMENT_ID};
use crate::errors::Result;

/// Exchanges the admin's one-time secret for a key and certificate and
/// persists both.
///
/// Gated by the trigger to run once per network lifetime: a second run
/// presents an already-consumed secret and fails with `InvalidSecret`.
#[derive(Debug, Clone)]
pub struct AdminEnrollment {
    ctx: ProvisioningContext,
}

impl AdminEnrollment {
    pub fn new(ctx: ProvisioningContext) -> Self {
        Self { ctx }
    }

    #[instrument(skip(self), fields(enrollment_id = ADMIN_ENROLLMENT_ID), name = "admin_enrollment")]
    pub async fn run(&self) -> Result<AdminEnrollmentReport> {
        let slots = &self.ctx.settings().admin_slots;

        let anchor = self.ctx.fetch_trust_anchor().await?;
        let secret = self.ctx.get_secret(&slots.password).await?;
        let ca = self.ctx.connect(&anchor).await?;

        let credential = ca.enroll(ADMIN_ENROLLMENT_ID, &secret).await?;

        self.ctx.put_secret(&slots.private_key, credential.private_key.expose_secret()).await?;
        self.ctx.put_secret(&slots.signed_certificate, &credential.signed_certificate).await?;

        info!(
            msp_id = %self.ctx.settings().msp_id(),
            ca_name = %self.ctx.settings().endpoint.ca_name,
            "Admin identity enrolled and persisted"
        );

        Ok(AdminEnrollmentReport {
            enrollment_id: ADMIN_ENROLLMENT_ID.to_string(),
            private_key_slot: slots.private_key.clone(),
            signed_certificate_slot: slots.signed_certificate.clone(),
        })
    }
}
