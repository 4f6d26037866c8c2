//! Multi-value select driver.
//!
//! Each value goes through its own open/type/pick cycle, since the panel
//! re-renders after every pick. Matching falls through exact text, then
//! case-insensitive containment, then Arrow-Down + Enter. The panel never
//! reports a clean close, so the driver finishes by clicking away from it.

use crate::action::{Action, ActionExecutor, ActionOptions};
use crate::error::{DriverError, Result};
use crate::locator::{Locator, Target};
use crate::retry::best_effort;
use crate::widgets::antd::{self, FieldRef};
use crate::widgets::select::{
    match_rendered, option_texts, poll_options, select_with_keyboard, OptionMatch,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Viewport point clicked to dismiss the panel.
const DISMISS_POINT: (f64, f64) = (10.0, 10.0);
const DISMISS_SETTLE: Duration = Duration::from_millis(300);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PickedValue {
    pub value: String,
    pub matched: OptionMatch,
}

pub struct MultiSelect {
    executor: ActionExecutor,
}

impl MultiSelect {
    pub fn new(executor: &ActionExecutor) -> Self {
        Self {
            executor: executor.for_component("MultiSelect"),
        }
    }

    /// Add every non-blank entry of `values` to the field, in order.
    pub async fn select_multiple(
        &self,
        field: &FieldRef,
        values: &[String],
    ) -> Result<Vec<PickedValue>> {
        let values: Vec<&str> = values
            .iter()
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .collect();
        let input = field.multi_search_input();
        let diagnostics = self.executor.diagnostics();

        if values.is_empty() {
            diagnostics.info(format!("Skipping {}: no values", input.description()));
            return Ok(Vec::new());
        }

        match self.run(&input, &values).await {
            Ok(picked) => {
                diagnostics.info(format!(
                    "Selected {} value(s) in {}",
                    picked.len(),
                    input.description()
                ));
                Ok(picked)
            }
            Err(e) if e.is_cancelled() => Err(e),
            Err(e) => {
                diagnostics
                    .failure(
                        format!("Multi-select failed for {}: {}", input.description(), e),
                        &format!("multiselect-failure-{}", input.description()),
                    )
                    .await;
                Err(e)
            }
        }
    }

    async fn run(&self, input: &Target, values: &[&str]) -> Result<Vec<PickedValue>> {
        let executor = &self.executor;
        let config = executor.config();
        let strict = config.strict_options;

        executor.wait_visible(input, config.action_timeout()).await?;

        let panel = Locator::css(antd::SELECT_PANEL).last();
        let options = panel.child_css(antd::OPTION_CONTENT);
        let mut picked = Vec::with_capacity(values.len());

        for value in values {
            executor.diagnostics().info(format!("Processing: \"{}\"", value));

            executor.click(input, ActionOptions::default()).await?;
            let search = Action::Fill {
                value: value.to_string(),
                validate: false,
            };
            executor
                .perform(&search, input, ActionOptions::default())
                .await?;

            let panel_target = Target::new("multi-select panel", panel.clone()).passive();
            if let Err(e) = executor
                .wait_visible(&panel_target, config.panel_timeout())
                .await
            {
                if e.is_cancelled() {
                    return Err(e);
                }
                return Err(DriverError::PanelTimeout {
                    panel: "multi-select dropdown".to_string(),
                    state: "visible".to_string(),
                });
            }
            executor.pause(config.settle_delay()).await?;

            let rendered = poll_options(executor, &options, config.panel_timeout()).await?;
            let matched = match match_rendered(&rendered, value) {
                Some((option, matched)) => {
                    let option = Target::new(
                        format!("option \"{}\"", option.text),
                        options.clone().nth(option.index),
                    );
                    let attempt = ActionOptions::with_timeout(config.attempt_timeout());
                    match executor.click(&option, attempt).await {
                        Ok(_) => matched,
                        Err(e) if e.is_cancelled() => return Err(e),
                        Err(_) => {
                            select_with_keyboard(executor).await?;
                            OptionMatch::Keyboard
                        }
                    }
                }
                None if strict => {
                    return Err(DriverError::NoMatchingOption {
                        value: value.to_string(),
                        available: option_texts(&rendered),
                    });
                }
                None => {
                    executor.diagnostics().warn(format!(
                        "No option matches \"{}\", using keyboard selection",
                        value
                    ));
                    select_with_keyboard(executor).await?;
                    OptionMatch::Keyboard
                }
            };

            picked.push(PickedValue {
                value: value.to_string(),
                matched,
            });
            executor.pause(config.settle_delay()).await?;
        }

        best_effort(
            executor.diagnostics(),
            "Dismissing multi-select panel",
            executor.mouse_click(DISMISS_POINT.0, DISMISS_POINT.1),
        )
        .await;
        executor.pause(DISMISS_SETTLE).await?;

        Ok(picked)
    }
}
