//! Driver configuration
//!
//! Timeout ceilings, retry counts and browser mode. Values come from defaults,
//! an optional JSON file and `FORMDRIVER_*` environment variables, in that order.

use crate::error::{DriverError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Prefix for environment overrides, e.g. `FORMDRIVER_ACTION_TIMEOUT_MS`.
pub const ENV_PREFIX: &str = "FORMDRIVER_";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    /// Outer ceiling for a single click/fill action
    pub action_timeout_ms: u64,

    /// Cap for each escalation stage inside an action
    pub attempt_timeout_ms: u64,

    /// Page load ceiling for navigation
    pub navigation_timeout_ms: u64,

    /// How long one locator candidate is probed before moving to the next
    pub probe_window_ms: u64,

    /// Polling interval for every wait loop
    pub poll_interval_ms: u64,

    /// Wait for dropdown/picker panels to open or close
    pub panel_timeout_ms: u64,

    /// Pause after typing into a filtering search box
    pub settle_delay_ms: u64,

    /// Per-key delay for keystroke simulation
    pub typing_delay_ms: u64,

    /// Attempts for retry-with-backoff
    pub retry_attempts: u32,

    /// First backoff delay; doubles on every attempt
    pub backoff_base_ms: u64,

    /// Cap on year-page clicks in the month picker
    pub max_year_pages: u32,

    /// Fail select actions when no option text matches instead of taking the first option
    pub strict_options: bool,

    /// Run Chrome without a window
    pub headless: bool,

    /// Where failure screenshots are written
    pub artifacts_dir: PathBuf,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            action_timeout_ms: 10_000,
            attempt_timeout_ms: 3_000,
            navigation_timeout_ms: 30_000,
            probe_window_ms: 500,
            poll_interval_ms: 100,
            panel_timeout_ms: 3_000,
            settle_delay_ms: 500,
            typing_delay_ms: 50,
            retry_attempts: 3,
            backoff_base_ms: 1_000,
            max_year_pages: 12,
            strict_options: false,
            headless: true,
            artifacts_dir: PathBuf::from("test-results/screenshots"),
        }
    }
}

impl DriverConfig {
    /// Load a config file; missing keys keep their defaults.
    pub async fn from_file(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await?;
        let config: DriverConfig = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Apply `FORMDRIVER_*` environment overrides.
    pub fn with_env_overrides(self) -> Result<Self> {
        self.with_overrides(|key| std::env::var(format!("{}{}", ENV_PREFIX, key)).ok())
    }

    /// Apply overrides from an arbitrary key lookup (keys are upper-case field names).
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        fn parse<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T> {
            raw.trim().parse().map_err(|_| {
                DriverError::InvalidValue(format!("{}{}={:?}", ENV_PREFIX, key, raw))
            })
        }

        fn parse_bool(key: &str, raw: &str) -> Result<bool> {
            match raw.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => Ok(true),
                "0" | "false" | "no" | "off" => Ok(false),
                _ => Err(DriverError::InvalidValue(format!(
                    "{}{}={:?}",
                    ENV_PREFIX, key, raw
                ))),
            }
        }

        if let Some(raw) = lookup("ACTION_TIMEOUT_MS") {
            self.action_timeout_ms = parse("ACTION_TIMEOUT_MS", &raw)?;
        }
        if let Some(raw) = lookup("ATTEMPT_TIMEOUT_MS") {
            self.attempt_timeout_ms = parse("ATTEMPT_TIMEOUT_MS", &raw)?;
        }
        if let Some(raw) = lookup("NAVIGATION_TIMEOUT_MS") {
            self.navigation_timeout_ms = parse("NAVIGATION_TIMEOUT_MS", &raw)?;
        }
        if let Some(raw) = lookup("PROBE_WINDOW_MS") {
            self.probe_window_ms = parse("PROBE_WINDOW_MS", &raw)?;
        }
        if let Some(raw) = lookup("POLL_INTERVAL_MS") {
            self.poll_interval_ms = parse("POLL_INTERVAL_MS", &raw)?;
        }
        if let Some(raw) = lookup("PANEL_TIMEOUT_MS") {
            self.panel_timeout_ms = parse("PANEL_TIMEOUT_MS", &raw)?;
        }
        if let Some(raw) = lookup("SETTLE_DELAY_MS") {
            self.settle_delay_ms = parse("SETTLE_DELAY_MS", &raw)?;
        }
        if let Some(raw) = lookup("TYPING_DELAY_MS") {
            self.typing_delay_ms = parse("TYPING_DELAY_MS", &raw)?;
        }
        if let Some(raw) = lookup("RETRY_ATTEMPTS") {
            self.retry_attempts = parse("RETRY_ATTEMPTS", &raw)?;
        }
        if let Some(raw) = lookup("BACKOFF_BASE_MS") {
            self.backoff_base_ms = parse("BACKOFF_BASE_MS", &raw)?;
        }
        if let Some(raw) = lookup("MAX_YEAR_PAGES") {
            self.max_year_pages = parse("MAX_YEAR_PAGES", &raw)?;
        }
        if let Some(raw) = lookup("STRICT_OPTIONS") {
            self.strict_options = parse_bool("STRICT_OPTIONS", &raw)?;
        }
        if let Some(raw) = lookup("HEADLESS") {
            self.headless = parse_bool("HEADLESS", &raw)?;
        }
        if let Some(raw) = lookup("ARTIFACTS_DIR") {
            self.artifacts_dir = PathBuf::from(raw);
        }

        Ok(self)
    }

    pub fn action_timeout(&self) -> Duration {
        Duration::from_millis(self.action_timeout_ms)
    }

    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_millis(self.attempt_timeout_ms)
    }

    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.navigation_timeout_ms)
    }

    pub fn probe_window(&self) -> Duration {
        Duration::from_millis(self.probe_window_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn panel_timeout(&self) -> Duration {
        Duration::from_millis(self.panel_timeout_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn typing_delay(&self) -> Duration {
        Duration::from_millis(self.typing_delay_ms)
    }

    pub fn backoff_base(&self) -> Duration {
        Duration::from_millis(self.backoff_base_ms)
    }
}
