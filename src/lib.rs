pub mod action;
pub mod browser;
pub mod clock;
pub mod config;
pub mod diagnostics;
pub mod document;
pub mod error;
pub mod locator;
pub mod resolve;
pub mod retry;
pub mod scenario;
pub mod widgets;

//  Re-export commonly used items
pub use action::{Action, ActionExecutor, ActionOptions, ActionOutcome};
pub use browser::{ChromeDocument, ChromeDriver, ConnectionMode};
pub use clock::{Clock, Deadline, TokioClock};
pub use config::DriverConfig;
pub use diagnostics::{init_logging, DiagnosticRecord, Diagnostics, LogSink, RecordSink, Severity};
pub use document::{ClickMode, Document, ElementState, Key};
pub use error::{DriverError, Result};
pub use locator::{Locator, Ordinal, Query, Target};
pub use resolve::{Resolved, Resolver};
pub use retry::{best_effort, retry_with_backoff, RetryPolicy};
pub use scenario::{
    load_records, DataRecord, ExecutionReport, Scenario, ScenarioRunner, StepResult, StepStatus,
};
pub use widgets::{
    close_ui, wait_for_ui_stable, CollegeSearch, FieldOrdinal, FieldRef, MonthPicker, MultiSelect, OptionMatch,
    PickedValue, Scope, SearchableSelect, SelectField, SelectOptions, SelectState, Selection,
    YearMonth,
};
