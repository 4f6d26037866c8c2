//! Scenario Script Types
//!
//! Defines the JSON structure for form-filling scenarios.

use crate::document::Key;
use crate::locator::Target;
use crate::scenario::data::{split_list, DataRecord};
use crate::widgets::antd::FieldRef;
use crate::widgets::date_picker::YearMonth;
use crate::widgets::select::SelectField;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// An ordered sequence of steps run against one page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    /// Unique scenario name (lowercase-hyphenated)
    pub name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    /// Deadline for the whole scenario; in-flight steps are cancelled when it passes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,

    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    #[serde(flatten)]
    pub action: StepAction,

    /// Failure is recorded but the scenario keeps going
    #[serde(default)]
    pub optional: bool,

    /// Wrap the step in retry with backoff
    #[serde(default)]
    pub retry: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum StepAction {
    Navigate {
        url: ValueRef,
    },
    Click {
        target: Target,
    },
    Fill {
        target: Target,
        value: ValueRef,
        #[serde(default = "default_true")]
        validate: bool,
    },
    Select {
        field: SelectSpec,
        value: ValueRef,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        strict: Option<bool>,
    },
    SelectMonth {
        trigger: ElementSpec,
        month: ValueRef,
    },
    SelectMultiple {
        field: FieldRef,
        values: ValueRef,
    },
    SelectCollege {
        input: ElementSpec,
        value: ValueRef,
        #[serde(default)]
        keyboard_fallback: bool,
    },
    Press {
        key: Key,
    },
    CloseUi,
    Screenshot {
        label: String,
    },
    Wait {
        ms: u64,
    },
}

fn default_true() -> bool {
    true
}

impl StepAction {
    pub fn name(&self) -> &'static str {
        match self {
            StepAction::Navigate { .. } => "navigate",
            StepAction::Click { .. } => "click",
            StepAction::Fill { .. } => "fill",
            StepAction::Select { .. } => "select",
            StepAction::SelectMonth { .. } => "select_month",
            StepAction::SelectMultiple { .. } => "select_multiple",
            StepAction::SelectCollege { .. } => "select_college",
            StepAction::Press { .. } => "press",
            StepAction::CloseUi => "close_ui",
            StepAction::Screenshot { .. } => "screenshot",
            StepAction::Wait { .. } => "wait",
        }
    }
}

impl Step {
    /// Description if given, otherwise the action name.
    pub fn label(&self) -> String {
        match &self.description {
            Some(description) => description.clone(),
            None => self.action.name().to_string(),
        }
    }
}

/// A literal value or a reference to a data record field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ValueRef {
    Field { field: String },
    List(Vec<String>),
    Literal(String),
}

impl ValueRef {
    pub fn literal(value: impl Into<String>) -> Self {
        ValueRef::Literal(value.into())
    }

    pub fn field(name: impl Into<String>) -> Self {
        ValueRef::Field { field: name.into() }
    }

    /// Scalar value, `None` when blank.
    pub fn resolve(&self, record: &DataRecord) -> Option<String> {
        let value = match self {
            ValueRef::Field { field } => return record.get(field),
            ValueRef::List(items) => items.join(", "),
            ValueRef::Literal(text) => text.trim().to_string(),
        };
        (!value.is_empty()).then_some(value)
    }

    pub fn resolve_list(&self, record: &DataRecord) -> Vec<String> {
        match self {
            ValueRef::Field { field } => record.get_list(field),
            ValueRef::List(items) => items
                .iter()
                .map(|s| s.trim())
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
            ValueRef::Literal(text) => split_list(text),
        }
    }
}

/// A select named by label, or by explicit targets.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SelectSpec {
    Explicit {
        trigger: Target,
        search_input: Target,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        display: Option<Target>,
    },
    Field(FieldRef),
}

impl SelectSpec {
    pub fn to_field(&self) -> SelectField {
        match self {
            SelectSpec::Explicit {
                trigger,
                search_input,
                display,
            } => SelectField {
                description: trigger.description().to_string(),
                trigger: trigger.clone(),
                search_input: search_input.clone(),
                display: display.clone(),
            },
            SelectSpec::Field(field) => SelectField::from(field),
        }
    }
}

/// An element named by label, or by an explicit target.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ElementSpec {
    Target(Target),
    Field(FieldRef),
}

impl ElementSpec {
    pub fn picker_target(&self) -> Target {
        match self {
            ElementSpec::Target(target) => target.clone(),
            ElementSpec::Field(field) => field.picker_input(),
        }
    }

    pub fn input_target(&self) -> Target {
        match self {
            ElementSpec::Target(target) => target.clone(),
            ElementSpec::Field(field) => field.search_input(),
        }
    }
}

impl Scenario {
    /// Load a scenario from a JSON file
    pub async fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = tokio::fs::read_to_string(path).await?;
        let scenario: Scenario = serde_json::from_str(&content)?;
        Ok(scenario)
    }

    /// Save this scenario to a JSON file
    pub async fn to_file(&self, path: &Path) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, json).await?;
        Ok(())
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    /// Structural checks that need no browser.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.name.is_empty() {
            anyhow::bail!("Scenario name cannot be empty");
        }

        if self.steps.is_empty() {
            anyhow::bail!("Scenario must contain at least one step");
        }

        if self.timeout_ms == Some(0) {
            anyhow::bail!("Scenario timeout must be positive");
        }

        for (i, step) in self.steps.iter().enumerate() {
            let n = i + 1;
            match &step.action {
                StepAction::Navigate { url } => check_value(n, "url", url)?,
                StepAction::Fill { value, .. } => check_value(n, "value", value)?,
                StepAction::Select { field, value, .. } => {
                    if let SelectSpec::Field(field) = field {
                        check_field(n, field)?;
                    }
                    check_value(n, "value", value)?;
                }
                StepAction::SelectMonth { trigger, month } => {
                    if let ElementSpec::Field(field) = trigger {
                        check_field(n, field)?;
                    }
                    check_value(n, "month", month)?;
                    if let ValueRef::Literal(text) = month {
                        if !text.trim().is_empty() {
                            text.parse::<YearMonth>().map_err(|e| {
                                anyhow::anyhow!("Step {} has invalid month: {}", n, e)
                            })?;
                        }
                    }
                }
                StepAction::SelectMultiple { field, values } => {
                    check_field(n, field)?;
                    check_value(n, "values", values)?;
                }
                StepAction::SelectCollege { input, value, .. } => {
                    if let ElementSpec::Field(field) = input {
                        check_field(n, field)?;
                    }
                    check_value(n, "value", value)?;
                }
                StepAction::Screenshot { label } => {
                    if label.trim().is_empty() {
                        anyhow::bail!("Step {} has an empty screenshot label", n);
                    }
                }
                StepAction::Click { .. }
                | StepAction::Press { .. }
                | StepAction::CloseUi
                | StepAction::Wait { .. } => {}
            }
        }

        Ok(())
    }
}

fn check_value(step: usize, what: &str, value: &ValueRef) -> anyhow::Result<()> {
    if let ValueRef::Field { field } = value {
        if field.trim().is_empty() {
            anyhow::bail!("Step {} references an empty field name for {}", step, what);
        }
    }
    Ok(())
}

fn check_field(step: usize, field: &FieldRef) -> anyhow::Result<()> {
    if field.label.trim().is_empty() {
        anyhow::bail!("Step {} has a field with an empty label", step);
    }
    if !field.ordinal.is_valid() {
        anyhow::bail!("Step {} has field ordinal 0 (ordinals start at 1)", step);
    }
    Ok(())
}
