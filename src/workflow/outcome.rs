//! Structured results returned to the trigger handler.

use serde::Serialize;

use crate::errors::{ErrorKind, ProvisionError};

/// What admin enrollment produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdminEnrollmentReport {
    pub enrollment_id: String,
    pub private_key_slot: String,
    pub signed_certificate_slot: String,
}

/// What user registration did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum RegistrationReport {
    /// The identity list already contained the user; nothing was changed
    AlreadyExists { user_id: String },

    /// A concurrent invocation registered the user between our existence
    /// check and our register call; its invocation owns enrollment
    AlreadyRegistered { user_id: String },

    /// Registered, enrolled and persisted
    Registered { user_id: String, affiliation: String, affiliation_created: bool },
}

impl RegistrationReport {
    pub fn user_id(&self) -> &str {
        match self {
            Self::AlreadyExists { user_id }
            | Self::AlreadyRegistered { user_id }
            | Self::Registered { user_id, .. } => user_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "flow", rename_all = "snake_case")]
pub enum WorkflowReport {
    AdminEnrollment(AdminEnrollmentReport),
    UserRegistration(RegistrationReport),
}

/// Result of handling one lifecycle trigger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum WorkflowOutcome {
    Completed(WorkflowReport),

    /// The trigger action does not run provisioning
    Skipped { action: String },

    /// A later identical invocation may succeed
    RetryableFailure { kind: ErrorKind, acting_id: String, message: String },

    /// Re-invoking without operator intervention will not help
    FatalFailure { kind: ErrorKind, acting_id: String, message: String },
}

impl WorkflowOutcome {
    /// Classifies `error` raised while acting as `acting_id`.
    pub fn from_error(acting_id: impl Into<String>, error: &ProvisionError) -> Self {
        let kind = error.kind();
        let acting_id = acting_id.into();
        let message = error.to_string();
        if kind.is_retryable() {
            Self::RetryableFailure { kind, acting_id, message }
        } else {
            Self::FatalFailure { kind, acting_id, message }
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed(_) | Self::Skipped { .. })
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RetryableFailure { .. })
    }
}
