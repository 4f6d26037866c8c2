//! Searchable-select driver.
//!
//! `Closed -> Open -> Filtering -> OptionVisible | NoMatch -> Closed`: click the
//! selector, type into its search box, pick an option from the filtered list,
//! then wait for the panel to go away.

use crate::action::{Action, ActionExecutor, ActionOptions};
use crate::document::Key;
use crate::error::{DriverError, Result};
use crate::locator::{Locator, Target};
use crate::retry::best_effort;
use crate::widgets::antd::{self, FieldRef};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectState {
    Closed,
    Open,
    Filtering,
    OptionVisible,
    NoMatch,
}

/// How the chosen option was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptionMatch {
    Exact,
    CaseInsensitive,
    /// Nothing matched the text; the first rendered option was taken
    FirstOption,
    /// Arrow-Down + Enter on the highlighted option
    Keyboard,
}

impl OptionMatch {
    pub fn is_fallback(&self) -> bool {
        matches!(self, OptionMatch::FirstOption | OptionMatch::Keyboard)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    /// Option text clicked, or the typed value for a keyboard selection
    pub chosen: String,
    pub matched: OptionMatch,
    /// Value the closed selector displays afterwards, when it could be read
    pub committed: Option<String>,
    pub transitions: Vec<SelectState>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SelectOptions {
    /// Fail with `NoMatchingOption` instead of taking the first option;
    /// the configured default when `None`
    pub strict: Option<bool>,
}

impl SelectOptions {
    pub fn strict() -> Self {
        Self { strict: Some(true) }
    }
}

/// The parts of a select a driver touches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectField {
    pub description: String,
    pub trigger: Target,
    pub search_input: Target,
    pub display: Option<Target>,
}

impl From<&FieldRef> for SelectField {
    fn from(field: &FieldRef) -> Self {
        let trigger = field.selector();
        Self {
            description: trigger.description().to_string(),
            trigger,
            search_input: field.search_input(),
            display: Some(field.display()),
        }
    }
}

/// An option as rendered in the open panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedOption {
    /// Position among every element the option locator matches, hidden ones
    /// included; the value to click with `Ordinal::Nth`
    pub index: usize,
    pub text: String,
}

/// Visible, non-blank options with their DOM positions.
pub fn rendered_options(texts: Vec<String>) -> Vec<RenderedOption> {
    texts
        .into_iter()
        .enumerate()
        .map(|(index, text)| RenderedOption {
            index,
            text: text.trim().to_string(),
        })
        .filter(|o| !o.text.is_empty())
        .collect()
}

/// Match `value` against rendered options; returns the matched option.
pub fn match_rendered<'a>(
    options: &'a [RenderedOption],
    value: &str,
) -> Option<(&'a RenderedOption, OptionMatch)> {
    let texts: Vec<String> = options.iter().map(|o| o.text.clone()).collect();
    match_option(&texts, value).map(|(position, matched)| (&options[position], matched))
}

pub(crate) fn option_texts(options: &[RenderedOption]) -> Vec<String> {
    options.iter().map(|o| o.text.clone()).collect()
}

/// Pick the option for `value`: exact text first, then case-insensitive
/// containment. Returns the option index.
pub fn match_option(options: &[String], value: &str) -> Option<(usize, OptionMatch)> {
    let wanted = value.trim();
    if let Some(index) = options.iter().position(|o| o.trim() == wanted) {
        return Some((index, OptionMatch::Exact));
    }
    let lowered = wanted.to_lowercase();
    options
        .iter()
        .position(|o| o.to_lowercase().contains(&lowered))
        .map(|index| (index, OptionMatch::CaseInsensitive))
}

pub struct SearchableSelect {
    executor: ActionExecutor,
}

impl SearchableSelect {
    pub fn new(executor: &ActionExecutor) -> Self {
        Self {
            executor: executor.for_component("SearchableSelect"),
        }
    }

    /// Select `value` in `field`. A blank value leaves the field untouched and
    /// returns `Ok(None)`.
    pub async fn select(
        &self,
        field: &SelectField,
        value: &str,
        options: SelectOptions,
    ) -> Result<Option<Selection>> {
        let diagnostics = self.executor.diagnostics();
        if value.trim().is_empty() {
            diagnostics.info(format!("Skipping {}: no value", field.description));
            return Ok(None);
        }

        diagnostics.info(format!(
            "Selecting from dropdown: {} - value: \"{}\"",
            field.description, value
        ));

        match self.run(field, value.trim(), options).await {
            Ok(selection) => {
                diagnostics.info(format!(
                    "Selected \"{}\" from {} ({:?})",
                    selection.chosen, field.description, selection.matched
                ));
                Ok(Some(selection))
            }
            Err(e) if e.is_cancelled() => Err(e),
            Err(e) => {
                diagnostics
                    .failure(
                        format!("Dropdown selection failed for: {}: {}", field.description, e),
                        &format!("dropdown-failure-{}", field.description),
                    )
                    .await;
                Err(e)
            }
        }
    }

    async fn run(&self, field: &SelectField, value: &str, options: SelectOptions) -> Result<Selection> {
        let executor = &self.executor;
        let config = executor.config();
        let strict = options.strict.unwrap_or(config.strict_options);
        let mut transitions = vec![SelectState::Closed];

        executor.click(&field.trigger, ActionOptions::default()).await?;
        wait_panel_open(executor, config.panel_timeout()).await?;
        transitions.push(SelectState::Open);

        let search = Action::Fill {
            value: value.to_string(),
            validate: false,
        };
        executor
            .perform(&search, &field.search_input, ActionOptions::default())
            .await?;
        executor.pause(config.settle_delay()).await?;
        transitions.push(SelectState::Filtering);

        let rendered = poll_options(executor, &antd::select_options(), config.panel_timeout()).await?;
        let (chosen, matched) = match match_rendered(&rendered, value) {
            Some((option, matched)) => {
                transitions.push(SelectState::OptionVisible);
                self.click_option(option, matched).await?
            }
            None if strict => {
                transitions.push(SelectState::NoMatch);
                return Err(DriverError::NoMatchingOption {
                    value: value.to_string(),
                    available: option_texts(&rendered),
                });
            }
            None if !rendered.is_empty() => {
                transitions.push(SelectState::NoMatch);
                executor.diagnostics().warn(format!(
                    "No option matches \"{}\" in {}, taking the first option \"{}\"",
                    value, field.description, rendered[0].text
                ));
                self.click_option(&rendered[0], OptionMatch::FirstOption)
                    .await?
            }
            None => {
                transitions.push(SelectState::NoMatch);
                executor.diagnostics().warn(format!(
                    "No options rendered for \"{}\" in {}, using keyboard selection",
                    value, field.description
                ));
                select_with_keyboard(executor).await?;
                (value.to_string(), OptionMatch::Keyboard)
            }
        };

        close_panel(executor).await?;
        transitions.push(SelectState::Closed);

        let committed = match &field.display {
            Some(display) => read_committed(executor, display).await,
            None => None,
        };
        if let Some(shown) = &committed {
            if !matched.is_fallback() && shown.trim() != chosen.trim() {
                executor.diagnostics().warn(format!(
                    "{} shows \"{}\" after selecting \"{}\"",
                    field.description, shown, chosen
                ));
            }
        }

        Ok(Selection {
            chosen,
            matched,
            committed,
            transitions,
        })
    }

    /// Click `option` by its DOM position; a failed click falls back to the keyboard.
    async fn click_option(
        &self,
        option: &RenderedOption,
        matched: OptionMatch,
    ) -> Result<(String, OptionMatch)> {
        let executor = &self.executor;
        let text = option.text.clone();
        let option = Target::new(
            format!("option \"{}\"", text),
            antd::select_options().nth(option.index),
        );

        let attempt = ActionOptions::with_timeout(executor.config().attempt_timeout());
        match executor.click(&option, attempt).await {
            Ok(_) => Ok((text, matched)),
            Err(e) if e.is_cancelled() => Err(e),
            Err(e) => {
                executor.diagnostics().warn(format!(
                    "Clicking option \"{}\" failed ({}), using keyboard selection",
                    text, e
                ));
                select_with_keyboard(executor).await?;
                Ok((text, OptionMatch::Keyboard))
            }
        }
    }
}

/// Wait for an open (not hidden) select panel.
pub(crate) async fn wait_panel_open(executor: &ActionExecutor, timeout: Duration) -> Result<()> {
    let panel = Target::new("dropdown panel", antd::open_select_panel()).passive();
    match executor.wait_visible(&panel, timeout).await {
        Ok(_) => Ok(()),
        Err(e) if e.is_cancelled() => Err(e),
        Err(_) => Err(DriverError::PanelTimeout {
            panel: "select dropdown".to_string(),
            state: "visible".to_string(),
        }),
    }
}

/// Poll until at least one option renders. An empty list means the panel
/// stayed empty for the whole window.
pub(crate) async fn poll_options(
    executor: &ActionExecutor,
    options: &Locator,
    timeout: Duration,
) -> Result<Vec<RenderedOption>> {
    let clock = executor.clock();
    let deadline = crate::clock::Deadline::after(clock, timeout);

    loop {
        match executor.document().all_inner_texts(options).await {
            Ok(texts) => {
                let rendered = rendered_options(texts);
                if !rendered.is_empty() {
                    return Ok(rendered);
                }
            }
            Err(e) => log::debug!(target: "SearchableSelect", "Reading options failed: {}", e),
        }

        if deadline.expired(clock) {
            return Ok(Vec::new());
        }
        executor
            .pause(deadline.capped(clock, executor.config().poll_interval()))
            .await?;
    }
}

pub(crate) async fn select_with_keyboard(executor: &ActionExecutor) -> Result<()> {
    executor.press(Key::ArrowDown).await?;
    executor.press(Key::Enter).await
}

/// Best-effort close: wait for the panel to hide, pressing Escape if it lingers.
pub(crate) async fn close_panel(executor: &ActionExecutor) -> Result<()> {
    let timeout = executor.config().panel_timeout();
    let panel = Locator::css(antd::OPEN_SELECT_PANEL).first();

    match executor.wait_hidden(&panel, timeout).await {
        Ok(()) => Ok(()),
        Err(e) if e.is_cancelled() => Err(e),
        Err(e) => {
            executor.diagnostics().warn(format!(
                "Dropdown panel did not close cleanly ({}), pressing Escape",
                e
            ));
            best_effort(
                executor.diagnostics(),
                "Escape after select",
                executor.press(Key::Escape),
            )
            .await;
            Ok(())
        }
    }
}

async fn read_committed(executor: &ActionExecutor, display: &Target) -> Option<String> {
    let timeout = executor.config().attempt_timeout();
    if !executor.element_exists(display, timeout).await {
        return None;
    }
    best_effort(
        executor.diagnostics(),
        "Reading committed value",
        executor.text_of(display, timeout),
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_exact_beats_contains() {
        let options = opts(&["Senior Engineer", "Engineer"]);
        assert_eq!(match_option(&options, "Engineer"), Some((1, OptionMatch::Exact)));
    }

    #[test]
    fn test_rendered_options_keep_dom_positions() {
        let rendered = rendered_options(opts(&["", "  ", "Engineer", "Manager"]));
        assert_eq!(rendered.len(), 2);

        let (option, matched) = match_rendered(&rendered, "Manager").unwrap();
        assert_eq!(option.index, 3);
        assert_eq!(option.text, "Manager");
        assert_eq!(matched, OptionMatch::Exact);
    }

    #[test]
    fn test_case_insensitive_contains() {
        let options = opts(&["Analyst", "Engineer", "Manager"]);
        assert_eq!(
            match_option(&options, "eng"),
            Some((1, OptionMatch::CaseInsensitive))
        );
        assert_eq!(match_option(&options, "Pilot"), None);
    }
}
