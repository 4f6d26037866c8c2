//! Time source used by every wait, poll and backoff in the crate.
//!
//! Production code runs on [`TokioClock`]. Tests either pause tokio time
//! (`#[tokio::test(start_paused = true)]`) or inject their own clock.

use crate::error::{DriverError, Result};
use async_trait::async_trait;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

#[async_trait]
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;

    async fn sleep(&self, duration: Duration);
}

/// Clock backed by the tokio timer.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioClock;

#[async_trait]
impl Clock for TokioClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Fixed point in time after which a wait gives up.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    at: Instant,
}

impl Deadline {
    pub fn after(clock: &dyn Clock, timeout: Duration) -> Self {
        Self {
            at: clock.now() + timeout,
        }
    }

    pub fn remaining(&self, clock: &dyn Clock) -> Duration {
        self.at.saturating_duration_since(clock.now())
    }

    pub fn expired(&self, clock: &dyn Clock) -> bool {
        clock.now() >= self.at
    }

    /// The smaller of `cap` and the time left.
    pub fn capped(&self, clock: &dyn Clock, cap: Duration) -> Duration {
        self.remaining(clock).min(cap)
    }
}

/// Sleep unless `token` is cancelled first.
pub async fn sleep_or_cancel(
    clock: &dyn Clock,
    token: &CancellationToken,
    duration: Duration,
) -> Result<()> {
    if token.is_cancelled() {
        return Err(DriverError::Cancelled("cancelled before wait".to_string()));
    }
    tokio::select! {
        _ = token.cancelled() => Err(DriverError::Cancelled("cancelled during wait".to_string())),
        _ = clock.sleep(duration) => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn deadline_tracks_paused_time() {
        let clock = TokioClock;
        let deadline = Deadline::after(&clock, Duration::from_secs(2));
        assert!(!deadline.expired(&clock));
        assert_eq!(
            deadline.capped(&clock, Duration::from_millis(500)),
            Duration::from_millis(500)
        );

        clock.sleep(Duration::from_millis(1500)).await;
        assert_eq!(deadline.remaining(&clock), Duration::from_millis(500));

        clock.sleep(Duration::from_secs(1)).await;
        assert!(deadline.expired(&clock));
        assert_eq!(deadline.remaining(&clock), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_token_interrupts_sleep() {
        let clock = TokioClock;
        let token = CancellationToken::new();

        let child = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            child.cancel();
        });

        let result = sleep_or_cancel(&clock, &token, Duration::from_secs(60)).await;
        assert!(matches!(result, Err(DriverError::Cancelled(_))));
    }
}
