//! Scenario Runner
//!
//! Executes scenario steps in order against an [`ActionExecutor`], recording
//! per-step outcomes in an [`ExecutionReport`].

use crate::action::{Action, ActionExecutor, ActionOptions, ActionOutcome};
use crate::error::{DriverError, Result};
use crate::scenario::data::DataRecord;
use crate::scenario::script::{Scenario, Step, StepAction};
use crate::widgets::college::CollegeSearch;
use crate::widgets::date_picker::{MonthPicker, YearMonth};
use crate::widgets::multi_select::MultiSelect;
use crate::widgets::select::{SearchableSelect, SelectOptions};
use crate::widgets::ui::close_ui;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Result of executing a single step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepResult {
    /// Step number (1-indexed)
    pub step: usize,

    /// Action name (e.g., "select_month")
    pub action: String,

    pub description: String,

    pub status: StepStatus,

    /// Time taken to execute
    pub duration: Duration,

    /// Error message (if failed)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Chosen value, fallback strategy or skip reason
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Success,
    /// Succeeded through a fallback strategy
    Degraded,
    Failed,
    Skipped,
}

/// Report of a scenario run against one data record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionReport {
    pub scenario_name: String,

    /// Total number of steps in the scenario
    pub total_steps: usize,

    pub successful: usize,

    pub degraded: usize,

    pub failed: usize,

    pub skipped: usize,

    pub total_duration: Duration,

    pub results: Vec<StepResult>,

    /// Every step was attempted; false when a required step failed or the
    /// run was cancelled
    pub completed: bool,
}

impl ExecutionReport {
    pub fn new(scenario_name: String, total_steps: usize) -> Self {
        Self {
            scenario_name,
            total_steps,
            successful: 0,
            degraded: 0,
            failed: 0,
            skipped: 0,
            total_duration: Duration::ZERO,
            results: Vec::new(),
            completed: false,
        }
    }

    pub fn add_result(&mut self, result: StepResult) {
        match result.status {
            StepStatus::Success => self.successful += 1,
            StepStatus::Degraded => self.degraded += 1,
            StepStatus::Failed => self.failed += 1,
            StepStatus::Skipped => self.skipped += 1,
        }
        self.total_duration += result.duration;
        self.results.push(result);
    }

    /// Completed with no failed steps, optional ones included.
    pub fn is_success(&self) -> bool {
        self.completed && self.failed == 0
    }

    /// Success rate (0.0 to 1.0); degraded steps count as successes
    pub fn success_rate(&self) -> f64 {
        if self.total_steps == 0 {
            return 0.0;
        }
        (self.successful + self.degraded) as f64 / self.total_steps as f64
    }

    pub fn degraded_steps(&self) -> impl Iterator<Item = &StepResult> {
        self.results
            .iter()
            .filter(|r| r.status == StepStatus::Degraded)
    }
}

enum StepOutcome {
    Done(Option<String>),
    Degraded(String),
    Skipped(String),
}

impl StepOutcome {
    fn from_action(outcome: ActionOutcome) -> Self {
        match outcome {
            ActionOutcome::Success => StepOutcome::Done(None),
            ActionOutcome::Degraded { fallback, strategy } => {
                StepOutcome::Degraded(format!("fallback {}: {}", fallback, strategy))
            }
        }
    }
}

pub struct ScenarioRunner {
    executor: ActionExecutor,
}

impl ScenarioRunner {
    pub fn new(executor: &ActionExecutor) -> Self {
        Self {
            executor: executor.for_component("ScenarioRunner"),
        }
    }

    /// Run `scenario` with values from `record`.
    ///
    /// Step failures end up in the report; the error path is reserved for
    /// scenarios that fail validation.
    pub async fn run(&self, scenario: &Scenario, record: &DataRecord) -> anyhow::Result<ExecutionReport> {
        scenario.validate()?;

        let cancel = self.executor.cancel_token().child_token();
        let executor = self.executor.with_cancellation(cancel.clone());
        executor.diagnostics().info(format!(
            "Running scenario '{}' ({} steps)",
            scenario.name,
            scenario.steps.len()
        ));

        let steps = self.run_steps(&executor, scenario, record);
        tokio::pin!(steps);

        let report = match scenario.timeout() {
            Some(limit) => {
                tokio::select! {
                    report = &mut steps => report,
                    _ = executor.clock().sleep(limit) => {
                        executor.diagnostics().error(format!(
                            "Scenario '{}' exceeded {}ms, cancelling",
                            scenario.name,
                            limit.as_millis()
                        ));
                        cancel.cancel();
                        steps.as_mut().await
                    }
                }
            }
            None => steps.as_mut().await,
        };

        executor.diagnostics().info(format!(
            "Scenario '{}' finished: {} ok, {} degraded, {} failed, {} skipped",
            report.scenario_name, report.successful, report.degraded, report.failed, report.skipped
        ));
        Ok(report)
    }

    async fn run_steps(
        &self,
        executor: &ActionExecutor,
        scenario: &Scenario,
        record: &DataRecord,
    ) -> ExecutionReport {
        let mut report = ExecutionReport::new(scenario.name.clone(), scenario.steps.len());
        let clock = executor.clock();

        for (i, step) in scenario.steps.iter().enumerate() {
            let start = clock.now();
            let result = if step.retry {
                executor
                    .retry(&step.label(), move |_| self.execute_step(executor, step, record))
                    .await
            } else {
                self.execute_step(executor, step, record).await
            };
            let duration = clock.now().saturating_duration_since(start);

            let mut step_result = StepResult {
                step: i + 1,
                action: step.action.name().to_string(),
                description: step.label(),
                status: StepStatus::Success,
                duration,
                error: None,
                detail: None,
            };

            match result {
                Ok(StepOutcome::Done(detail)) => step_result.detail = detail,
                Ok(StepOutcome::Degraded(detail)) => {
                    step_result.status = StepStatus::Degraded;
                    step_result.detail = Some(detail);
                }
                Ok(StepOutcome::Skipped(reason)) => {
                    executor
                        .diagnostics()
                        .info(format!("Step {} skipped: {}", i + 1, reason));
                    step_result.status = StepStatus::Skipped;
                    step_result.detail = Some(reason);
                }
                Err(e) => {
                    let cancelled = e.is_cancelled();
                    step_result.status = StepStatus::Failed;
                    step_result.error = Some(e.to_string());
                    report.add_result(step_result);

                    if cancelled || !step.optional {
                        executor.diagnostics().error(format!(
                            "Step {} ({}) failed, stopping: {}",
                            i + 1,
                            step.label(),
                            e
                        ));
                        return report;
                    }
                    executor.diagnostics().warn(format!(
                        "Optional step {} ({}) failed: {}",
                        i + 1,
                        step.label(),
                        e
                    ));
                    continue;
                }
            }

            report.add_result(step_result);
        }

        report.completed = true;
        report
    }

    async fn execute_step(
        &self,
        executor: &ActionExecutor,
        step: &Step,
        record: &DataRecord,
    ) -> Result<StepOutcome> {
        match &step.action {
            StepAction::Navigate { url } => {
                let Some(url) = url.resolve(record) else {
                    return Ok(StepOutcome::Skipped("no url".to_string()));
                };
                executor.navigate(&url).await?;
                Ok(StepOutcome::Done(Some(url)))
            }

            StepAction::Click { target } => {
                let outcome = executor.click(target, ActionOptions::default()).await?;
                Ok(StepOutcome::from_action(outcome))
            }

            StepAction::Fill {
                target,
                value,
                validate,
            } => {
                let Some(value) = value.resolve(record) else {
                    return Ok(skipped(target.description()));
                };
                let action = Action::Fill {
                    value,
                    validate: *validate,
                };
                let outcome = executor
                    .perform(&action, target, ActionOptions::default())
                    .await?;
                Ok(StepOutcome::from_action(outcome))
            }

            StepAction::Select {
                field,
                value,
                strict,
            } => {
                let field = field.to_field();
                let Some(value) = value.resolve(record) else {
                    return Ok(skipped(&field.description));
                };
                let options = SelectOptions { strict: *strict };
                let selection = SearchableSelect::new(executor)
                    .select(&field, &value, options)
                    .await?;
                Ok(match selection {
                    None => skipped(&field.description),
                    Some(selection) if selection.matched.is_fallback() => {
                        StepOutcome::Degraded(format!(
                            "{:?} match: chose \"{}\" for \"{}\"",
                            selection.matched, selection.chosen, value
                        ))
                    }
                    Some(selection) => {
                        StepOutcome::Done(Some(selection.committed.unwrap_or(selection.chosen)))
                    }
                })
            }

            StepAction::SelectMonth { trigger, month } => {
                let trigger = trigger.picker_target();
                let Some(month) = month.resolve(record) else {
                    return Ok(skipped(trigger.description()));
                };
                let month: YearMonth = month.parse()?;
                MonthPicker::new(executor)
                    .select_month(&trigger, month)
                    .await?;
                Ok(StepOutcome::Done(Some(month.to_string())))
            }

            StepAction::SelectMultiple { field, values } => {
                let values = values.resolve_list(record);
                if values.is_empty() {
                    return Ok(skipped(&field.label));
                }
                let picked = MultiSelect::new(executor)
                    .select_multiple(field, &values)
                    .await?;
                let fallbacks: Vec<&str> = picked
                    .iter()
                    .filter(|p| p.matched.is_fallback())
                    .map(|p| p.value.as_str())
                    .collect();
                if fallbacks.is_empty() {
                    Ok(StepOutcome::Done(Some(values.join(", "))))
                } else {
                    Ok(StepOutcome::Degraded(format!(
                        "no exact option for: {}",
                        fallbacks.join(", ")
                    )))
                }
            }

            StepAction::SelectCollege {
                input,
                value,
                keyboard_fallback,
            } => {
                let input = input.input_target();
                let Some(value) = value.resolve(record) else {
                    return Ok(skipped(input.description()));
                };
                let matched = CollegeSearch::new(executor)
                    .select_college(&input, &value, *keyboard_fallback)
                    .await?;
                Ok(match matched {
                    None => skipped(input.description()),
                    Some(m) if m.is_fallback() => {
                        StepOutcome::Degraded(format!("{:?} match for \"{}\"", m, value))
                    }
                    Some(_) => StepOutcome::Done(Some(value)),
                })
            }

            StepAction::Press { key } => {
                executor.press(*key).await?;
                Ok(StepOutcome::Done(None))
            }

            StepAction::CloseUi => {
                close_ui(executor).await?;
                Ok(StepOutcome::Done(None))
            }

            StepAction::Screenshot { label } => {
                let path = executor.diagnostics().screenshot(label).await.ok_or_else(|| {
                    DriverError::Browser(format!("screenshot '{}' could not be captured", label))
                })?;
                Ok(StepOutcome::Done(Some(path.display().to_string())))
            }

            StepAction::Wait { ms } => {
                executor.pause(Duration::from_millis(*ms)).await?;
                Ok(StepOutcome::Done(None))
            }
        }
    }
}

fn skipped(what: &str) -> StepOutcome {
    StepOutcome::Skipped(format!("no value for {}", what))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(step: usize, status: StepStatus) -> StepResult {
        StepResult {
            step,
            action: "click".to_string(),
            description: "click".to_string(),
            status,
            duration: Duration::from_millis(100),
            error: None,
            detail: None,
        }
    }

    #[test]
    fn test_report_counters() {
        let mut report = ExecutionReport::new("form".to_string(), 4);
        report.add_result(result(1, StepStatus::Success));
        report.add_result(result(2, StepStatus::Degraded));
        report.add_result(result(3, StepStatus::Skipped));
        report.add_result(result(4, StepStatus::Success));
        report.completed = true;

        assert_eq!(report.successful, 2);
        assert_eq!(report.degraded, 1);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.total_duration, Duration::from_millis(400));
        assert_eq!(report.success_rate(), 0.75);
        assert_eq!(report.degraded_steps().count(), 1);
        assert!(report.is_success());
    }

    #[test]
    fn test_incomplete_report_is_not_success() {
        let mut report = ExecutionReport::new("form".to_string(), 3);
        report.add_result(result(1, StepStatus::Success));
        assert!(!report.is_success());

        report.add_result(result(2, StepStatus::Failed));
        report.completed = true;
        assert!(!report.is_success());
        assert_eq!(ExecutionReport::new("empty".to_string(), 0).success_rate(), 0.0);
    }
}
