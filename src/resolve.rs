//! Locator resolution.
//!
//! Candidates of a [`Target`] are probed strictly in priority order. Each probe
//! polls one candidate for a short window; the first candidate that picks an
//! attached, visible (and, for actionable targets, enabled) element wins. Rounds
//! repeat until the overall timeout, after which every attempted candidate is
//! reported in [`DriverError::NotFound`].

use crate::clock::{sleep_or_cancel, Clock, Deadline};
use crate::document::{Document, ElementState};
use crate::error::{DriverError, Result};
use crate::locator::{Locator, Target};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// The winning candidate of a resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub locator: Locator,
    /// Position of the winner in the target's candidate list
    pub candidate: usize,
    pub state: ElementState,
}

#[derive(Clone)]
pub struct Resolver {
    document: Arc<dyn Document>,
    clock: Arc<dyn Clock>,
    probe_window: Duration,
    poll_interval: Duration,
}

impl Resolver {
    pub fn new(
        document: Arc<dyn Document>,
        clock: Arc<dyn Clock>,
        probe_window: Duration,
        poll_interval: Duration,
    ) -> Self {
        Self {
            document,
            clock,
            probe_window,
            poll_interval: poll_interval.max(Duration::from_millis(1)),
        }
    }

    pub async fn resolve(
        &self,
        target: &Target,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<Resolved> {
        let clock = self.clock.as_ref();
        let deadline = Deadline::after(clock, timeout);

        loop {
            for (index, candidate) in target.candidates().iter().enumerate() {
                if let Some(state) = self
                    .probe(candidate, target.is_actionable(), &deadline, cancel)
                    .await?
                {
                    log::debug!(
                        target: "resolver",
                        "Resolved '{}' via candidate {} ({})",
                        target.description(),
                        index,
                        candidate
                    );
                    return Ok(Resolved {
                        locator: candidate.clone(),
                        candidate: index,
                        state,
                    });
                }
            }

            if deadline.expired(clock) {
                return Err(DriverError::NotFound {
                    description: target.description().to_string(),
                    attempted: target.candidates().iter().map(|c| c.to_string()).collect(),
                });
            }

            sleep_or_cancel(clock, cancel, deadline.capped(clock, self.poll_interval)).await?;
        }
    }

    /// Poll a single candidate for at most one probe window.
    async fn probe(
        &self,
        candidate: &Locator,
        actionable: bool,
        deadline: &Deadline,
        cancel: &CancellationToken,
    ) -> Result<Option<ElementState>> {
        let clock = self.clock.as_ref();
        let window = Deadline::after(clock, deadline.capped(clock, self.probe_window));

        loop {
            match self.document.inspect(candidate).await {
                Ok(state) if state.is_usable(actionable) => return Ok(Some(state)),
                Ok(_) => {}
                Err(e) => {
                    log::debug!(target: "resolver", "Probe of {} failed: {}", candidate, e);
                }
            }

            if window.expired(clock) {
                return Ok(None);
            }

            sleep_or_cancel(clock, cancel, window.capped(clock, self.poll_interval)).await?;
        }
    }

    /// Poll `locator` until `condition` holds. Returns the last observed state,
    /// or `None` if the timeout passed first.
    pub async fn wait_for<F>(
        &self,
        locator: &Locator,
        timeout: Duration,
        cancel: &CancellationToken,
        condition: F,
    ) -> Result<Option<ElementState>>
    where
        F: Fn(&ElementState) -> bool,
    {
        let clock = self.clock.as_ref();
        let deadline = Deadline::after(clock, timeout);

        loop {
            let state = match self.document.inspect(locator).await {
                Ok(state) => state,
                Err(e) => {
                    log::debug!(target: "resolver", "Inspect of {} failed: {}", locator, e);
                    ElementState::detached()
                }
            };

            if condition(&state) {
                return Ok(Some(state));
            }

            if deadline.expired(clock) {
                return Ok(None);
            }

            sleep_or_cancel(clock, cancel, deadline.capped(clock, self.poll_interval)).await?;
        }
    }
}
