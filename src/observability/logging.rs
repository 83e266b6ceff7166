//! # Structured Logging
//!
//! Provides the workflow span macro and subscriber setup using the tracing
//! ecosystem. Output is human-readable by default and JSON when requested,
//! filtered through `RUST_LOG` when set.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Create a tracing span for one workflow invocation.
///
/// Every span carries a fresh `invocation_id` so all events of a single
/// trigger can be correlated, plus the identifier the workflow acts as.
///
/// ```rust,ignore
/// let span = workflow_span!("user_registration", "alice");
/// let span = workflow_span!("user_registration", "alice", affiliation = "org1.dept2");
/// ```
#[macro_export]
macro_rules! workflow_span {
    ($workflow:expr, $acting_id:expr) => {
        tracing::info_span!(
            "workflow",
            workflow = %$workflow,
            acting_id = %$acting_id,
            invocation_id = %uuid::Uuid::new_v4()
        )
    };
    ($workflow:expr, $acting_id:expr, $($field:tt)*) => {
        tracing::info_span!(
            "workflow",
            workflow = %$workflow,
            acting_id = %$acting_id,
            invocation_id = %uuid::Uuid::new_v4(),
            $($field)*
        )
    };
}

/// Install the global subscriber.
///
/// `default_level` applies when `RUST_LOG` is unset. A subscriber that is
/// already installed (integration tests) is left in place.
pub fn init_logging(default_level: &str, json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let result = if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_current_span(true).with_writer(std::io::stderr))
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .try_init()
    };

    // Subscriber already set elsewhere; keep it.
    result.ok();
}

/// Log the resolved configuration at startup. Slot identifiers are logged,
/// their contents never are.
pub fn log_config_info(config: &crate::config::ProvisionerConfig) {
    tracing::info!(
        ca_endpoint = %config.ca_endpoint,
        org_name = %config.org_name,
        credential_backend = %config.credential_backend,
        trust_anchor_location = %config.tls_cert_location,
        request_timeout_seconds = config.request_timeout_seconds,
        verify_ca_hostname = config.verify_ca_hostname,
        "Provisioner configuration"
    );
}
