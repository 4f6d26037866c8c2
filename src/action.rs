//! Action executor.
//!
//! Wraps [`Document`] primitives in the click and fill protocols: each action
//! resolves its [`Target`], then walks an escalation ladder until one strategy
//! succeeds or the action's time budget runs out. Which strategy succeeded is
//! reported back through [`ActionOutcome`] so callers can tell a clean success
//! from a degraded one.

use crate::clock::{sleep_or_cancel, Clock, Deadline, TokioClock};
use crate::config::DriverConfig;
use crate::diagnostics::{Diagnostics, LogSink, RecordSink};
use crate::document::{ClickMode, Document, ElementState, Key};
use crate::error::{DriverError, Result};
use crate::locator::{Locator, Target};
use crate::resolve::{Resolved, Resolver};
use crate::retry::{retry_with_backoff, RetryPolicy};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Strategy name reported when fill falls back to typing.
pub const KEYSTROKE_STRATEGY: &str = "keystrokes";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ActionOutcome {
    Success,
    /// A fallback strategy was needed; `fallback` is its position in the
    /// escalation ladder (1 = first fallback).
    Degraded { fallback: usize, strategy: String },
}

impl ActionOutcome {
    pub fn is_degraded(&self) -> bool {
        matches!(self, ActionOutcome::Degraded { .. })
    }

    pub fn fallback_index(&self) -> Option<usize> {
        match self {
            ActionOutcome::Success => None,
            ActionOutcome::Degraded { fallback, .. } => Some(*fallback),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Click,
    Fill { value: String, validate: bool },
}

impl Action {
    pub fn fill(value: impl Into<String>) -> Self {
        Action::Fill {
            value: value.into(),
            validate: true,
        }
    }

    fn verb(&self) -> &'static str {
        match self {
            Action::Click => "click",
            Action::Fill { .. } => "fill",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActionOptions {
    /// Overall budget; the configured action timeout when `None`
    pub timeout: Option<Duration>,
    /// Capture screenshots before and after the action
    pub capture: bool,
}

impl ActionOptions {
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
            ..Self::default()
        }
    }

    pub fn with_screenshots(mut self) -> Self {
        self.capture = true;
        self
    }
}

/// Executes resilient actions against one page.
#[derive(Clone)]
pub struct ActionExecutor {
    document: Arc<dyn Document>,
    clock: Arc<dyn Clock>,
    resolver: Resolver,
    diagnostics: Diagnostics,
    config: DriverConfig,
    cancel: CancellationToken,
}

impl ActionExecutor {
    pub fn new(document: Arc<dyn Document>, config: DriverConfig) -> Self {
        Self::with_parts(
            document,
            config,
            Arc::new(TokioClock),
            Arc::new(LogSink),
            CancellationToken::new(),
        )
    }

    pub fn with_parts(
        document: Arc<dyn Document>,
        config: DriverConfig,
        clock: Arc<dyn Clock>,
        sink: Arc<dyn RecordSink>,
        cancel: CancellationToken,
    ) -> Self {
        let resolver = Resolver::new(
            document.clone(),
            clock.clone(),
            config.probe_window(),
            config.poll_interval(),
        );
        let diagnostics = Diagnostics::new(
            "ActionExecutor",
            sink,
            document.clone(),
            config.artifacts_dir.clone(),
        );
        Self {
            document,
            clock,
            resolver,
            diagnostics,
            config,
            cancel,
        }
    }

    /// Same page and settings, logging under another component name.
    pub fn for_component(&self, component: &str) -> Self {
        Self {
            diagnostics: self.diagnostics.for_component(component),
            ..self.clone()
        }
    }

    /// Same page and settings, bound to another cancellation token.
    pub fn with_cancellation(&self, cancel: CancellationToken) -> Self {
        Self {
            cancel,
            ..self.clone()
        }
    }

    pub fn document(&self) -> &Arc<dyn Document> {
        &self.document
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub async fn perform(
        &self,
        action: &Action,
        target: &Target,
        options: ActionOptions,
    ) -> Result<ActionOutcome> {
        if options.capture {
            self.diagnostics
                .screenshot(&format!("before-{}-{}", action.verb(), target.description()))
                .await;
        }

        let outcome = match action {
            Action::Click => self.click(target, options).await?,
            Action::Fill { value, validate } => {
                self.fill_checked(target, value, *validate, options).await?
            }
        };

        if options.capture {
            self.diagnostics
                .screenshot(&format!("after-{}-{}", action.verb(), target.description()))
                .await;
        }
        Ok(outcome)
    }

    /// Click with escalation: standard, forced, double, then DOM-level.
    pub async fn click(&self, target: &Target, options: ActionOptions) -> Result<ActionOutcome> {
        let deadline = self.deadline(options);
        self.diagnostics
            .info(format!("Attempting to click: {}", target.description()));

        let resolved = match self.resolve_within(target, &deadline).await {
            Ok(resolved) => resolved,
            Err(e) => return Err(self.fail("click", target, None, e).await),
        };
        let mut locator = resolved.locator;

        self.scroll(&locator).await;

        let enabled = self
            .resolver
            .wait_for(
                &locator,
                self.stage(&deadline),
                &self.cancel,
                |state: &ElementState| state.is_usable(target.is_actionable()),
            )
            .await?;
        if enabled.is_none() {
            let reason = DriverError::Timeout("element never became enabled".to_string());
            return Err(self.fail("click", target, Some(&locator), reason).await);
        }

        let mut last_error = None;
        for (index, mode) in ClickMode::ESCALATION.iter().enumerate() {
            if index > 0 {
                if deadline.expired(self.clock()) {
                    break;
                }
                match self.reattach(target, &locator, &deadline).await {
                    Ok(current) => locator = current,
                    Err(e) if e.is_cancelled() => return Err(e),
                    Err(e) => {
                        last_error = Some(e);
                        break;
                    }
                }
            }

            let stage = self.stage(&deadline);
            match self
                .bounded(stage, mode.as_str(), self.document.click(&locator, *mode))
                .await
            {
                Ok(()) => {
                    if index == 0 {
                        self.diagnostics
                            .info(format!("Clicked: {}", target.description()));
                        return Ok(ActionOutcome::Success);
                    }
                    self.diagnostics.warn(format!(
                        "Clicked {} using {} after {} failed attempt(s)",
                        target.description(),
                        mode.as_str(),
                        index
                    ));
                    return Ok(ActionOutcome::Degraded {
                        fallback: index,
                        strategy: mode.as_str().to_string(),
                    });
                }
                Err(e) if e.is_cancelled() => return Err(e),
                Err(e) => {
                    self.diagnostics.warn(format!(
                        "{} failed for {}: {}",
                        mode.as_str(),
                        target.description(),
                        e
                    ));
                    last_error = Some(e);
                }
            }
        }

        let reason = last_error
            .unwrap_or_else(|| DriverError::Timeout("no click strategy attempted".to_string()));
        Err(self.fail("click", target, Some(&locator), reason).await)
    }

    /// Run exactly one click strategy on an already-known locator.
    pub async fn click_with(&self, locator: &Locator, mode: ClickMode) -> Result<()> {
        self.bounded(
            self.config.attempt_timeout(),
            mode.as_str(),
            self.document.click(locator, mode),
        )
        .await
    }

    /// Fill and verify; on mismatch, clear and type the value key by key.
    pub async fn fill(
        &self,
        target: &Target,
        value: &str,
        options: ActionOptions,
    ) -> Result<ActionOutcome> {
        self.fill_checked(target, value, true, options).await
    }

    async fn fill_checked(
        &self,
        target: &Target,
        value: &str,
        validate: bool,
        options: ActionOptions,
    ) -> Result<ActionOutcome> {
        let deadline = self.deadline(options);
        self.diagnostics.info(format!(
            "Attempting to fill: {} with value: {}",
            target.description(),
            value
        ));

        let resolved = match self.resolve_within(target, &deadline).await {
            Ok(resolved) => resolved,
            Err(e) => return Err(self.fail("fill", target, None, e).await),
        };
        let locator = resolved.locator;
        self.scroll(&locator).await;

        let primary = async {
            self.bounded(self.stage(&deadline), "fill", async {
                self.document.clear(&locator).await?;
                self.document.set_value(&locator, value).await
            })
            .await?;
            if validate {
                self.expect_value(&locator, value, self.stage(&deadline))
                    .await?;
            }
            Ok::<(), DriverError>(())
        };

        let first_error = match primary.await {
            Ok(()) => {
                self.diagnostics
                    .info(format!("Filled: {}", target.description()));
                return Ok(ActionOutcome::Success);
            }
            Err(e) if e.is_cancelled() => return Err(e),
            Err(e) if !validate => {
                return Err(self.fail("fill", target, Some(&locator), e).await);
            }
            Err(e) => e,
        };

        self.diagnostics.warn(format!(
            "Fill of {} did not stick ({}), retrying with keystrokes",
            target.description(),
            first_error
        ));

        let typed = async {
            let remaining = deadline.remaining(self.clock());
            self.bounded(remaining, "keystroke fill", async {
                self.document.clear(&locator).await?;
                self.type_keys(&locator, value).await
            })
            .await?;
            self.expect_value(&locator, value, self.stage(&deadline))
                .await
        };

        match typed.await {
            Ok(()) => {
                self.diagnostics.warn(format!(
                    "Filled {} using keystrokes",
                    target.description()
                ));
                Ok(ActionOutcome::Degraded {
                    fallback: 1,
                    strategy: KEYSTROKE_STRATEGY.to_string(),
                })
            }
            Err(e) if e.is_cancelled() => Err(e),
            Err(e) => Err(self.fail("fill", target, Some(&locator), e).await),
        }
    }

    /// Type `text` one key per call, pausing the configured typing delay
    /// between keys.
    async fn type_keys(&self, locator: &Locator, text: &str) -> Result<()> {
        let delay = self.config.typing_delay();
        let mut buf = [0u8; 4];
        for (i, c) in text.chars().enumerate() {
            if i > 0 {
                self.pause(delay).await?;
            }
            self.document
                .type_text(locator, c.encode_utf8(&mut buf))
                .await?;
        }
        Ok(())
    }

    /// Poll the input's value until it equals `expected`.
    pub async fn expect_value(
        &self,
        locator: &Locator,
        expected: &str,
        timeout: Duration,
    ) -> Result<()> {
        let deadline = Deadline::after(self.clock(), timeout);
        let mut actual = String::new();

        loop {
            match self.document.input_value(locator).await {
                Ok(value) if value == expected => return Ok(()),
                Ok(value) => actual = value,
                Err(e) => log::debug!(target: "ActionExecutor", "Reading value failed: {}", e),
            }

            if deadline.expired(self.clock()) {
                return Err(DriverError::ValidationMismatch {
                    expected: expected.to_string(),
                    actual,
                });
            }
            self.pause(deadline.capped(self.clock(), self.config.poll_interval()))
                .await?;
        }
    }

    /// Wait until the target is visible.
    pub async fn wait_visible(&self, target: &Target, timeout: Duration) -> Result<Resolved> {
        let passive = target.clone().passive();
        match self.resolver.resolve(&passive, timeout, &self.cancel).await {
            Ok(resolved) => Ok(resolved),
            Err(e) if e.is_cancelled() => Err(e),
            Err(e) => Err(self.fail("wait for", target, None, e).await),
        }
    }

    /// Wait until the target is visible and enabled.
    pub async fn wait_enabled(&self, target: &Target, timeout: Duration) -> Result<Resolved> {
        match self.resolver.resolve(target, timeout, &self.cancel).await {
            Ok(resolved) => Ok(resolved),
            Err(e) if e.is_cancelled() => Err(e),
            Err(e) => Err(self.fail("wait for enabled", target, None, e).await),
        }
    }

    /// Wait until nothing visible matches `locator`.
    pub async fn wait_hidden(&self, locator: &Locator, timeout: Duration) -> Result<()> {
        let state = self
            .resolver
            .wait_for(locator, timeout, &self.cancel, |state| {
                !(state.attached && state.visible)
            })
            .await?;
        match state {
            Some(_) => Ok(()),
            None => Err(DriverError::Timeout(format!(
                "{} still visible after {}ms",
                locator,
                timeout.as_millis()
            ))),
        }
    }

    /// Whether the target shows up within `timeout`. Never fails.
    pub async fn element_exists(&self, target: &Target, timeout: Duration) -> bool {
        let passive = target.clone().passive();
        self.resolver
            .resolve(&passive, timeout, &self.cancel)
            .await
            .is_ok()
    }

    /// Visible text of the target, trimmed.
    pub async fn text_of(&self, target: &Target, timeout: Duration) -> Result<String> {
        let resolved = self.wait_visible(target, timeout).await?;
        let text = self
            .bounded(
                self.config.attempt_timeout(),
                "read text",
                self.document.inner_text(&resolved.locator),
            )
            .await?;
        Ok(text.trim().to_string())
    }

    pub async fn press(&self, key: Key) -> Result<()> {
        log::debug!(target: "ActionExecutor", "Pressing {}", key.name());
        self.bounded(
            self.config.attempt_timeout(),
            key.name(),
            self.document.press_key(key),
        )
        .await
    }

    pub async fn mouse_click(&self, x: f64, y: f64) -> Result<()> {
        self.bounded(
            self.config.attempt_timeout(),
            "mouse click",
            self.document.mouse_click(x, y),
        )
        .await
    }

    /// Cancellable sleep on the executor's clock.
    pub async fn pause(&self, duration: Duration) -> Result<()> {
        sleep_or_cancel(self.clock(), &self.cancel, duration).await
    }

    pub async fn navigate(&self, url: &str) -> Result<()> {
        self.diagnostics.info(format!("Navigating to {}", url));
        let timeout = self.config.navigation_timeout();
        match self
            .bounded(timeout, "navigation", self.document.navigate(url))
            .await
        {
            Ok(()) => Ok(()),
            Err(e) if e.is_cancelled() => Err(e),
            Err(e) => {
                self.diagnostics
                    .failure(
                        format!("Navigation to {} failed: {}", url, e),
                        "navigation-failure",
                    )
                    .await;
                Err(DriverError::NavigationFailed(format!("{}: {}", url, e)))
            }
        }
    }

    /// Retry `op` with the configured backoff policy.
    pub async fn retry<T, F, Fut>(&self, description: &str, op: F) -> Result<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        retry_with_backoff(
            RetryPolicy::from_config(&self.config),
            self.clock(),
            &self.cancel,
            &self.diagnostics,
            description,
            op,
        )
        .await
    }

    /// Race `fut` against a stage timeout and the cancellation token.
    pub async fn bounded<T, Fut>(&self, limit: Duration, what: &str, fut: Fut) -> Result<T>
    where
        Fut: Future<Output = Result<T>>,
    {
        if self.cancel.is_cancelled() {
            return Err(DriverError::Cancelled(format!("{} not started", what)));
        }
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(DriverError::Cancelled(what.to_string())),
            result = fut => result,
            _ = self.clock.sleep(limit) => Err(DriverError::Timeout(format!(
                "{} exceeded {}ms",
                what,
                limit.as_millis()
            ))),
        }
    }

    fn deadline(&self, options: ActionOptions) -> Deadline {
        let timeout = options
            .timeout
            .unwrap_or_else(|| self.config.action_timeout());
        Deadline::after(self.clock(), timeout)
    }

    fn stage(&self, deadline: &Deadline) -> Duration {
        deadline.capped(self.clock(), self.config.attempt_timeout())
    }

    async fn resolve_within(&self, target: &Target, deadline: &Deadline) -> Result<Resolved> {
        self.resolver
            .resolve(target, deadline.remaining(self.clock()), &self.cancel)
            .await
    }

    async fn scroll(&self, locator: &Locator) {
        let result = self
            .bounded(
                self.config.attempt_timeout(),
                "scroll into view",
                self.document.scroll_into_view(locator),
            )
            .await;
        if let Err(e) = result {
            log::debug!(target: "ActionExecutor", "Scroll of {} failed: {}", locator, e);
        }
    }

    /// Confirm the element is still there before another attempt, resolving
    /// the target again if the page replaced it.
    async fn reattach(
        &self,
        target: &Target,
        locator: &Locator,
        deadline: &Deadline,
    ) -> Result<Locator> {
        if let Ok(state) = self.document.inspect(locator).await {
            if state.attached {
                return Ok(locator.clone());
            }
        }
        log::debug!(
            target: "ActionExecutor",
            "{} detached, resolving '{}' again",
            locator,
            target.description()
        );
        let resolved = self
            .resolver
            .resolve(target, self.stage(deadline), &self.cancel)
            .await?;
        Ok(resolved.locator)
    }

    /// Log, capture the mandatory failure screenshot and shape the error.
    async fn fail(
        &self,
        verb: &str,
        target: &Target,
        locator: Option<&Locator>,
        error: DriverError,
    ) -> DriverError {
        if error.is_cancelled() {
            return error;
        }
        self.diagnostics
            .failure(
                format!("Failed to {}: {}: {}", verb, target.description(), error),
                &format!("{}-failure-{}", verb, target.description()),
            )
            .await;

        match error {
            DriverError::NotFound { .. } => error,
            other => DriverError::ActionFailed {
                description: format!("{} {}", verb, target.description()),
                target: locator
                    .or_else(|| target.candidates().first())
                    .map(|l| l.to_string())
                    .unwrap_or_default(),
                reason: other.to_string(),
            },
        }
    }
}
