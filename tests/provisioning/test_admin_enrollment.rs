use msp_provisioner::errors::ErrorKind;
use msp_provisioner::ca::SigningIdentity;
use msp_provisioner::secrets::SecretString;
use msp_provisioner::workflow::AdminEnrollment;

use super::support::*;

#[tokio::test]
async fn enrolls_admin_and_persists_only_key_and_certificate() {
    let harness = HarnessBuilder::new().admin_secret("pw123").build();

    let report = AdminEnrollment::new(harness.ctx.clone()).run().await.unwrap();

    assert_eq!(report.enrollment_id, "admin");
    assert_eq!(report.private_key_slot, ADMIN_KEY_SLOT);
    assert_eq!(report.signed_certificate_slot, ADMIN_CERT_SLOT);
    assert_eq!(harness.store.writes(), vec![ADMIN_KEY_SLOT.to_string(), ADMIN_CERT_SLOT.to_string()]);

    // the persisted pair is usable as a registrar identity
    let key = harness.store.value(ADMIN_KEY_SLOT).unwrap();
    let certificate = harness.store.value(ADMIN_CERT_SLOT).unwrap();
    assert!(certificate.starts_with("-----BEGIN CERTIFICATE-----"));
    let identity =
        SigningIdentity::from_pem("admin", "org1Msp", certificate, &SecretString::new(key)).unwrap();
    assert_eq!(identity.msp_id(), "org1Msp");
}

#[tokio::test]
async fn runs_steps_in_order() {
    let harness = HarnessBuilder::new().admin_secret("pw123").build();

    AdminEnrollment::new(harness.ctx.clone()).run().await.unwrap();

    assert_eq!(
        harness.journal.entries(),
        vec![
            format!("trust:fetch:{}", TLS_LOCATION),
            format!("store:get:{}", ADMIN_PASSWORD_SLOT),
            "connect:org1-NETWORK".to_string(),
            "ca:enroll:admin".to_string(),
            format!("store:put:{}", ADMIN_KEY_SLOT),
            format!("store:put:{}", ADMIN_CERT_SLOT),
        ]
    );
}

#[tokio::test]
async fn second_run_fails_with_invalid_secret() {
    let harness = HarnessBuilder::new().admin_secret("pw123").build();
    let enrollment = AdminEnrollment::new(harness.ctx.clone());

    enrollment.run().await.unwrap();
    let err = enrollment.run().await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::InvalidSecret);
    assert_eq!(harness.store.writes().len(), 2);
}

#[tokio::test]
async fn missing_secret_slot_is_not_found() {
    let harness = HarnessBuilder::new().build();

    let err = AdminEnrollment::new(harness.ctx.clone()).run().await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(harness.journal.count("ca:"), 0);
    assert!(harness.store.writes().is_empty());
}

#[tokio::test]
async fn unreachable_ca_writes_nothing() {
    let harness = HarnessBuilder::new()
        .admin_secret("pw123")
        .ca(|ca| ca.with_fault("enroll", Fault::Unreachable))
        .build();

    let err = AdminEnrollment::new(harness.ctx.clone()).run().await.unwrap_err();

    assert!(err.is_retryable());
    assert!(harness.store.writes().is_empty());
}

#[tokio::test]
async fn missing_trust_anchor_stops_before_any_other_call() {
    let harness = HarnessBuilder::new().admin_secret("pw123").trust_missing().build();

    let err = AdminEnrollment::new(harness.ctx.clone()).run().await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(harness.journal.entries(), vec![format!("trust:fetch:{}", TLS_LOCATION)]);
}
