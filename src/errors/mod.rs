//! # Error Handling
//!
//! Error types for the provisioning workflows. Every failure that can leave a
//! workflow maps onto one [`ErrorKind`] so the invoking trigger handler can
//! decide between retrying and alerting.

pub mod types;

pub use types::{ErrorKind, ProvisionError, Result};
