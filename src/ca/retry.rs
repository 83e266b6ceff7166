//! Backoff for read-only CA calls.

use std::future::Future;
use std::time::Duration;
use tracing::warn;

use crate::errors::{ErrorKind, Result};

/// Retry behaviour for transient CA failures.
///
/// Only read-only calls are retried. Enrollment consumes a one-time secret and
/// registration mints one, so neither is safe to repeat blindly.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first
    pub max_attempts: u32,
    /// Backoff before the first retry
    pub initial_backoff: Duration,
    /// Cap for exponential growth
    pub max_backoff: Duration,
    /// Multiplier for exponential backoff
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(200),
            max_backoff: Duration::from_secs(2),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// A single attempt, no retries.
    pub fn none() -> Self {
        Self { max_attempts: 1, ..Self::default() }
    }

    /// Backoff duration for a given attempt number (0-indexed).
    pub fn backoff_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        let multiplier = self.backoff_multiplier.powi(attempt as i32 - 1);
        let backoff_ms = self.initial_backoff.as_millis() as f64 * multiplier;
        let capped_ms = backoff_ms.min(self.max_backoff.as_millis() as f64);

        Duration::from_millis(capped_ms as u64)
    }

    /// Runs `call` until it succeeds, fails with anything other than
    /// `CaUnreachable`, or attempts run out.
    pub async fn run<T, F, Fut>(&self, operation: &str, mut call: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 0;
        loop {
            match call().await {
                Err(e) if e.kind() == ErrorKind::CaUnreachable && attempt + 1 < max_attempts => {
                    attempt += 1;
                    let backoff = self.backoff_for_attempt(attempt);
                    warn!(
                        operation = %operation,
                        attempt = attempt + 1,
                        max_attempts = max_attempts,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %e,
                        "Retrying CA call after backoff"
                    );
                    tokio::time::sleep(backoff).await;
                }
                other => return other,
            }
        }
    }
}
