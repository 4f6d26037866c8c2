//! Bounded retry with exponential backoff, and the best-effort operation category.
//!
//! *Required* operations propagate their error. *Best-effort* operations
//! (panel-close waits, diagnostic capture) log the error and return `None`.

use crate::clock::{sleep_or_cancel, Clock};
use crate::config::DriverConfig;
use crate::diagnostics::{sanitize_label, Diagnostics};
use crate::error::Result;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub attempts: u32,
    /// Delay after the first failed attempt
    pub base_delay: Duration,
    /// Growth factor between consecutive delays
    pub multiplier: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            base_delay: Duration::from_secs(1),
            multiplier: 2,
        }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &DriverConfig) -> Self {
        Self {
            attempts: config.retry_attempts.max(1),
            base_delay: config.backoff_base(),
            ..Self::default()
        }
    }

    /// Delay after the failed `attempt` (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = self
            .multiplier
            .saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor)
    }
}

/// Run `op` until it succeeds or `policy.attempts` is exhausted.
///
/// Cancellation and the final failure are never retried; the final failure
/// leaves a screenshot behind.
pub async fn retry_with_backoff<T, F, Fut>(
    policy: RetryPolicy,
    clock: &dyn Clock,
    cancel: &CancellationToken,
    diagnostics: &Diagnostics,
    description: &str,
    mut op: F,
) -> Result<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let attempts = policy.attempts.max(1);
    let mut attempt = 1;

    loop {
        diagnostics.info(format!(
            "Attempting action: {} (attempt {}/{})",
            description, attempt, attempts
        ));

        match op(attempt).await {
            Ok(value) => {
                diagnostics.info(format!("Action succeeded: {}", description));
                return Ok(value);
            }
            Err(e) if e.is_cancelled() => return Err(e),
            Err(e) if attempt >= attempts => {
                diagnostics
                    .failure(
                        format!(
                            "Action failed after {} attempts: {}: {}",
                            attempts, description, e
                        ),
                        &format!("retry-failure-{}", sanitize_label(description)),
                    )
                    .await;
                return Err(e);
            }
            Err(e) => {
                let wait = policy.delay_after(attempt);
                diagnostics.warn(format!(
                    "Retry attempt {}/{} failed ({}), waiting {}ms",
                    attempt,
                    attempts,
                    e,
                    wait.as_millis()
                ));
                sleep_or_cancel(clock, cancel, wait).await?;
                attempt += 1;
            }
        }
    }
}

/// Run an operation whose failure must never reach the caller.
pub async fn best_effort<T, Fut>(diagnostics: &Diagnostics, what: &str, fut: Fut) -> Option<T>
where
    Fut: Future<Output = Result<T>>,
{
    match fut.await {
        Ok(value) => Some(value),
        Err(e) => {
            diagnostics.warn(format!("{} (ignored): {}", what, e));
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delays_double() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_after(1), Duration::from_secs(1));
        assert_eq!(policy.delay_after(2), Duration::from_secs(2));
        assert_eq!(policy.delay_after(3), Duration::from_secs(4));
    }

    #[test]
    fn test_from_config_never_zero_attempts() {
        let config = DriverConfig {
            retry_attempts: 0,
            backoff_base_ms: 250,
            ..Default::default()
        };
        let policy = RetryPolicy::from_config(&config);
        assert_eq!(policy.attempts, 1);
        assert_eq!(policy.delay_after(2), Duration::from_millis(500));
    }
}
