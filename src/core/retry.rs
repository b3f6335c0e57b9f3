//! Bounded exponential-backoff retry around a single fallible call.
//!
//! Only [`CollaboratorError::Transient`] failures are retried. Anything else,
//! rate limiting included, is returned on the spot without sleeping.

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{CollaboratorError, CollaboratorResult};

/// Retry policy for collaborator calls
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including first try)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay after the first failed attempt, in milliseconds
    #[serde(default = "default_initial_delay")]
    pub initial_delay_ms: u64,

    /// Upper bound for any single delay, in milliseconds
    #[serde(default = "default_max_delay")]
    pub max_delay_ms: u64,

    /// Backoff multiplier (delay *= multiplier after each retry)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
}

fn default_max_attempts() -> u32 {
    3
}
fn default_initial_delay() -> u64 {
    2000
}
fn default_max_delay() -> u64 {
    10000
}
fn default_backoff_multiplier() -> f64 {
    2.0
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay(),
            max_delay_ms: default_max_delay(),
            backoff_multiplier: default_backoff_multiplier(),
        }
    }
}

impl RetryPolicy {
    /// Calculate the wait after a failed attempt (1-indexed)
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return Duration::from_millis(self.initial_delay_ms.min(self.max_delay_ms));
        }

        let delay = self.initial_delay_ms as f64
            * self.backoff_multiplier.powi((attempt - 1) as i32);

        let capped = delay.min(self.max_delay_ms as f64) as u64;
        Duration::from_millis(capped)
    }

    /// Check if we should retry based on attempt count
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }

    /// Run `operation` under this policy
    pub async fn run<T, F, Fut>(&self, operation_name: &str, operation: F) -> CollaboratorResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = CollaboratorResult<T>>,
    {
        self.run_observed(operation_name, operation, |_, _| {}).await
    }

    /// Like [`RetryPolicy::run`], reporting each backoff wait to `on_backoff`
    /// as `(failed_attempt, delay)` before sleeping.
    pub async fn run_observed<T, F, Fut, O>(
        &self,
        operation_name: &str,
        mut operation: F,
        mut on_backoff: O,
    ) -> CollaboratorResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = CollaboratorResult<T>>,
        O: FnMut(u32, Duration),
    {
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            debug!(operation = operation_name, attempt, "Attempting call");

            let err: CollaboratorError = match operation().await {
                Ok(value) => return Ok(value),
                Err(e) => e,
            };

            if !err.is_retryable() {
                warn!(
                    operation = operation_name,
                    attempt,
                    error = %err,
                    "Call failed with non-retryable error"
                );
                return Err(err);
            }

            if !self.should_retry(attempt) {
                warn!(
                    operation = operation_name,
                    attempt,
                    error = %err,
                    "Call failed, attempts exhausted"
                );
                return Err(err);
            }

            let delay = self.delay_for_attempt(attempt);
            warn!(
                operation = operation_name,
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "Call failed, retrying"
            );
            on_backoff(attempt, delay);
            tokio::time::sleep(delay).await;
        }
    }
}
