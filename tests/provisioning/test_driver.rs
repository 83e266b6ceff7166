use msp_provisioner::errors::ErrorKind;
use msp_provisioner::workflow::{
    LifecycleAction, LifecycleEvent, RegistrationReport, WorkflowDriver, WorkflowOutcome,
    WorkflowReport,
};

use super::support::*;

fn user_event(action: &str, user_id: &str, affiliation: &str) -> LifecycleEvent {
    serde_json::from_value(serde_json::json!({
        "RequestType": action,
        "ResourceProperties": {
            "ServiceToken": "arn:aws:lambda:us-east-1:000000000000:function:register-user",
            "userId": user_id,
            "affiliation": affiliation,
            "passwordArn": format!("{}-password", user_id),
            "privateKeyArn": format!("{}-key", user_id),
            "signedCertArn": format!("{}-cert", user_id),
        }
    }))
    .unwrap()
}

#[tokio::test]
async fn non_create_actions_make_zero_calls() {
    let harness = HarnessBuilder::new().admin_secret("pw123").enrolled_admin().build();
    let driver = WorkflowDriver::new(harness.ctx.clone());

    for action in ["Update", "Delete", "SomethingElse"] {
        let outcome = driver.handle(&user_event(action, "alice", "org1.dept2")).await;
        assert_eq!(outcome, WorkflowOutcome::Skipped { action: action.to_string() });
        assert!(outcome.is_success());

        let outcome = driver.handle(&LifecycleEvent::admin(LifecycleAction::from(action.to_string()))).await;
        assert!(matches!(outcome, WorkflowOutcome::Skipped { .. }));
    }

    assert!(harness.journal.entries().is_empty());
    assert!(harness.store.reads().is_empty());
    assert!(harness.store.writes().is_empty());
}

#[tokio::test]
async fn create_without_user_runs_admin_enrollment() {
    let harness = HarnessBuilder::default().admin_secret("pw123").build();
    let driver = WorkflowDriver::new(harness.ctx.clone());

    let event: LifecycleEvent =
        serde_json::from_str(r#"{"RequestType":"Create","ResourceProperties":{"ServiceToken":"x"}}"#)
            .unwrap();
    let outcome = driver.handle(&event).await;

    match outcome {
        WorkflowOutcome::Completed(WorkflowReport::AdminEnrollment(report)) => {
            assert_eq!(report.enrollment_id, "admin");
        }
        other => panic!("unexpected outcome {:?}", other),
    }
    assert_eq!(harness.journal.count("ca:enroll:admin"), 1);
}

#[tokio::test]
async fn create_with_user_runs_registration() {
    let harness = HarnessBuilder::new()
        .enrolled_admin()
        .ca(|ca| ca.with_affiliation("org1.dept2"))
        .build();
    let driver = WorkflowDriver::new(harness.ctx.clone());

    let outcome = driver.handle(&user_event("Create", "alice", "org1.dept2")).await;

    assert_eq!(
        outcome,
        WorkflowOutcome::Completed(WorkflowReport::UserRegistration(RegistrationReport::Registered {
            user_id: "alice".to_string(),
            affiliation: "org1.dept2".to_string(),
            affiliation_created: false,
        }))
    );
    let register = harness.journal.position("ca:register:alice").unwrap();
    let enroll = harness.journal.position("ca:enroll:alice").unwrap();
    let persist = harness.journal.position("store:put:alice-password").unwrap();
    assert!(register < enroll && enroll < persist);
}

#[tokio::test]
async fn repeated_create_is_idempotent() {
    let harness = HarnessBuilder::new().enrolled_admin().build();
    let driver = WorkflowDriver::new(harness.ctx.clone());
    let event = user_event("Create", "alice", "org1.dept2");

    assert!(driver.handle(&event).await.is_success());
    let outcome = driver.handle(&event).await;

    assert_eq!(
        outcome,
        WorkflowOutcome::Completed(WorkflowReport::UserRegistration(
            RegistrationReport::AlreadyExists { user_id: "alice".to_string() }
        ))
    );
    assert_eq!(harness.journal.count("ca:register"), 1);
    assert_eq!(harness.store.writes().len(), 3);
}

#[tokio::test]
async fn missing_trust_anchor_is_fatal() {
    let harness = HarnessBuilder::new().admin_secret("pw123").trust_missing().build();
    let driver = WorkflowDriver::new(harness.ctx.clone());

    let outcome = driver.handle(&LifecycleEvent::admin(LifecycleAction::Create)).await;

    match outcome {
        WorkflowOutcome::FatalFailure { kind, acting_id, .. } => {
            assert_eq!(kind, ErrorKind::NotFound);
            assert_eq!(acting_id, "admin");
        }
        other => panic!("unexpected outcome {:?}", other),
    }
}

#[tokio::test]
async fn unreachable_ca_is_retryable() {
    let harness = HarnessBuilder::new()
        .enrolled_admin()
        .ca(|ca| ca.with_fault("list_identities", Fault::Unreachable))
        .build();
    let driver = WorkflowDriver::new(harness.ctx.clone());

    let outcome = driver.handle(&user_event("Create", "alice", "org1")).await;

    match outcome {
        WorkflowOutcome::RetryableFailure { kind, acting_id, .. } => {
            assert_eq!(kind, ErrorKind::CaUnreachable);
            assert_eq!(acting_id, "alice");
        }
        other => panic!("unexpected outcome {:?}", other),
    }
    assert_eq!(harness.journal.count("ca:register"), 0);
}

#[tokio::test]
async fn unavailable_store_is_retryable() {
    let harness = HarnessBuilder::new().admin_secret("pw123").build();
    harness.store.set_unavailable(true);
    let driver = WorkflowDriver::new(harness.ctx.clone());

    let outcome = driver.enroll_admin().await;

    assert!(outcome.is_retryable());
    assert_eq!(harness.journal.count("ca:"), 0);
}

#[tokio::test]
async fn malformed_user_properties_are_fatal() {
    let harness = HarnessBuilder::new().enrolled_admin().build();
    let driver = WorkflowDriver::new(harness.ctx.clone());

    let event: LifecycleEvent = serde_json::from_str(
        r#"{"RequestType":"Create","ResourceProperties":{"userId":"alice"}}"#,
    )
    .unwrap();
    let outcome = driver.handle(&event).await;

    assert!(matches!(
        outcome,
        WorkflowOutcome::FatalFailure { kind: ErrorKind::Config, ref acting_id, .. } if acting_id == "alice"
    ));
    assert!(harness.journal.entries().is_empty());
}

#[tokio::test]
async fn outcome_serializes_for_the_trigger_handler() {
    let harness = HarnessBuilder::new().admin_secret("pw123").build();
    let driver = WorkflowDriver::new(harness.ctx.clone());

    let outcome = driver.handle(&LifecycleEvent::admin(LifecycleAction::Create)).await;
    let json = serde_json::to_value(&outcome).unwrap();

    assert_eq!(json["outcome"], "completed");
    assert_eq!(json["flow"], "admin_enrollment");
    assert_eq!(json["private_key_slot"], ADMIN_KEY_SLOT);
    assert!(!json.to_string().contains("PRIVATE KEY"));
}
