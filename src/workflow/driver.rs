//! Lifecycle trigger handling.
//!
//! Only a `Create` trigger runs provisioning. Every other action returns
//! [`WorkflowOutcome::Skipped`] without touching the CA, the credential store
//! or the trust material source.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{error, info, warn, Instrument};

use super::admin::AdminEnrollment;
use super::outcome::{WorkflowOutcome, WorkflowReport};
use super::user::{UserRegistration, UserRequest};
use super::{ProvisioningContext, ADMIN_ENROLLMENT_ID};
use crate::errors::{ProvisionError, Result};
use crate::workflow_span;

/// Infrastructure lifecycle action carried by a trigger.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum LifecycleAction {
    Create,
    Update,
    Delete,
    Other(String),
}

impl From<String> for LifecycleAction {
    fn from(value: String) -> Self {
        match value.as_str() {
            "Create" => Self::Create,
            "Update" => Self::Update,
            "Delete" => Self::Delete,
            _ => Self::Other(value),
        }
    }
}

impl From<LifecycleAction> for String {
    fn from(action: LifecycleAction) -> Self {
        action.to_string()
    }
}

impl fmt::Display for LifecycleAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create => f.write_str("Create"),
            Self::Update => f.write_str("Update"),
            Self::Delete => f.write_str("Delete"),
            Self::Other(other) => f.write_str(other),
        }
    }
}

/// A custom-resource style trigger:
/// `{"RequestType": "Create", "ResourceProperties": {...}}`.
///
/// Properties carrying a `userId` select user registration; anything else
/// selects admin enrollment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LifecycleEvent {
    #[serde(rename = "RequestType")]
    pub action: LifecycleAction,

    #[serde(rename = "ResourceProperties", default)]
    pub properties: serde_json::Value,
}

/// The provisioning flow an event asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Flow {
    AdminEnrollment,
    UserRegistration(UserRequest),
}

impl LifecycleEvent {
    pub fn admin(action: LifecycleAction) -> Self {
        Self { action, properties: serde_json::Value::Null }
    }

    pub fn user(action: LifecycleAction, request: &UserRequest) -> Result<Self> {
        let properties = serde_json::to_value(request)
            .map_err(|e| ProvisionError::config(format!("Failed to encode user request: {}", e)))?;
        Ok(Self { action, properties })
    }

    /// Resolves which flow the event's properties describe.
    pub fn flow(&self) -> Result<Flow> {
        if self.properties.get("userId").is_none() {
            return Ok(Flow::AdminEnrollment);
        }
        let request = UserRequest::deserialize(&self.properties).map_err(|e| {
            ProvisionError::config(format!("Invalid user registration properties: {}", e))
        })?;
        Ok(Flow::UserRegistration(request))
    }

    /// Identifier the flow acts as, used for logging failures.
    fn acting_id(&self) -> String {
        self.properties
            .get("userId")
            .and_then(|v| v.as_str())
            .unwrap_or(ADMIN_ENROLLMENT_ID)
            .to_string()
    }
}

/// Entry point for trigger handlers.
///
/// Never panics and never returns an error: every failure is logged with
/// the acting identifier and classified into a [`WorkflowOutcome`].
#[derive(Debug, Clone)]
pub struct WorkflowDriver {
    ctx: ProvisioningContext,
}

impl WorkflowDriver {
    pub fn new(ctx: ProvisioningContext) -> Self {
        Self { ctx }
    }

    pub async fn handle(&self, event: &LifecycleEvent) -> WorkflowOutcome {
        if event.action != LifecycleAction::Create {
            info!(action = %event.action, "Lifecycle action does not provision, skipping");
            return WorkflowOutcome::Skipped { action: event.action.to_string() };
        }

        match event.flow() {
            Ok(Flow::AdminEnrollment) => self.enroll_admin().await,
            Ok(Flow::UserRegistration(request)) => self.register_user(&request).await,
            Err(e) => Self::failed(&event.acting_id(), e),
        }
    }

    pub async fn enroll_admin(&self) -> WorkflowOutcome {
        let span = workflow_span!("admin_enrollment", ADMIN_ENROLLMENT_ID);
        let result = AdminEnrollment::new(self.ctx.clone()).run().instrument(span).await;
        match result {
            Ok(report) => WorkflowOutcome::Completed(WorkflowReport::AdminEnrollment(report)),
            Err(e) => Self::failed(ADMIN_ENROLLMENT_ID, e),
        }
    }

    pub async fn register_user(&self, request: &UserRequest) -> WorkflowOutcome {
        let span = workflow_span!("user_registration", &request.user_id);
        let result = UserRegistration::new(self.ctx.clone()).run(request).instrument(span).await;
        match result {
            Ok(report) => {
                info!(user_id = %report.user_id(), "User registration workflow completed");
                WorkflowOutcome::Completed(WorkflowReport::UserRegistration(report))
            }
            Err(e) => Self::failed(&request.user_id, e),
        }
    }

    fn failed(acting_id: &str, error: ProvisionError) -> WorkflowOutcome {
        let outcome = WorkflowOutcome::from_error(acting_id, &error);
        if outcome.is_retryable() {
            warn!(acting_id = %acting_id, kind = %error.kind(), error = %error, "Provisioning failed, retryable");
        } else {
            error!(acting_id = %acting_id, kind = %error.kind(), error = %error, "Provisioning failed");
        }
        outcome
    }
}
