//! JSON form-filling scenarios.
//!
//! A [`Scenario`] is an ordered list of steps whose values come from literals
//! or from a [`DataRecord`]; [`ScenarioRunner`] drives them through the widget
//! drivers and reports each step's outcome.

pub mod data;
pub mod runner;
pub mod script;

pub use data::{load_records, DataRecord};
pub use runner::{ExecutionReport, ScenarioRunner, StepResult, StepStatus};
pub use script::{ElementSpec, Scenario, SelectSpec, Step, StepAction, ValueRef};
