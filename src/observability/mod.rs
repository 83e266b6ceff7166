//! # Observability Infrastructure
//!
//! Structured logging for provisioning runs. Every workflow invocation runs
//! inside a span that carries its invocation ID and acting identifier.

pub mod logging;

pub use logging::{init_logging, log_config_info};
