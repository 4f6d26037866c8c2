//! Search-as-you-type autocomplete (college search).

use crate::action::{Action, ActionExecutor, ActionOptions};
use crate::error::{DriverError, Result};
use crate::locator::Target;
use crate::widgets::antd;
use crate::widgets::select::{close_panel, select_with_keyboard, wait_panel_open, OptionMatch};

pub struct CollegeSearch {
    executor: ActionExecutor,
}

impl CollegeSearch {
    pub fn new(executor: &ActionExecutor) -> Self {
        Self {
            executor: executor.for_component("CollegeSearch"),
        }
    }

    /// Type `name` into `input` and pick the suggestion containing it.
    ///
    /// With `keyboard_fallback`, a missing suggestion is accepted through
    /// Arrow-Down + Enter instead of failing. Blank names are skipped.
    pub async fn select_college(
        &self,
        input: &Target,
        name: &str,
        keyboard_fallback: bool,
    ) -> Result<Option<OptionMatch>> {
        let executor = &self.executor;
        let config = executor.config();
        let name = name.trim();
        if name.is_empty() {
            executor
                .diagnostics()
                .info(format!("Skipping {}: no value", input.description()));
            return Ok(None);
        }

        executor.click(input, ActionOptions::default()).await?;
        let search = Action::Fill {
            value: name.to_string(),
            validate: false,
        };
        executor
            .perform(&search, input, ActionOptions::default())
            .await?;
        wait_panel_open(executor, config.panel_timeout()).await?;

        let option = Target::new(
            format!("college \"{}\"", name),
            antd::open_select_panel()
                .child_css(antd::SELECT_OPTION)
                .has_text(name)
                .first(),
        );
        let attempt = ActionOptions::with_timeout(config.attempt_timeout());

        let matched = match executor.click(&option, attempt).await {
            Ok(_) => OptionMatch::CaseInsensitive,
            Err(e) if e.is_cancelled() => return Err(e),
            Err(e) if keyboard_fallback => {
                executor.diagnostics().warn(format!(
                    "No suggestion for \"{}\" ({}), using keyboard selection",
                    name, e
                ));
                select_with_keyboard(executor).await?;
                OptionMatch::Keyboard
            }
            Err(DriverError::NotFound { .. }) => {
                return Err(DriverError::NoMatchingOption {
                    value: name.to_string(),
                    available: Vec::new(),
                })
            }
            Err(e) => return Err(e),
        };

        close_panel(executor).await?;
        executor
            .diagnostics()
            .info(format!("Selected college \"{}\"", name));
        Ok(Some(matched))
    }
}
