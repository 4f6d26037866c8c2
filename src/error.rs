use thiserror::Error;

#[derive(Error, Debug)]
pub enum DriverError {
    #[error("Element not found: {description} (tried: {})", attempted.join(" | "))]
    NotFound {
        description: String,
        attempted: Vec<String>,
    },

    #[error("Failed to {description} on {target}: {reason}")]
    ActionFailed {
        description: String,
        target: String,
        reason: String,
    },

    #[error("Value mismatch: expected {expected:?}, found {actual:?}")]
    ValidationMismatch { expected: String, actual: String },

    #[error("Panel {panel} did not become {state} in time")]
    PanelTimeout { panel: String, state: String },

    #[error("No option matching {value:?} (available: {available:?})")]
    NoMatchingOption {
        value: String,
        available: Vec<String>,
    },

    #[error("Picker not found: {0}")]
    PickerNotFound(String),

    #[error("Cell for {month} not found: {reason}")]
    CellNotFound { month: String, reason: String },

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("Cancelled: {0}")]
    Cancelled(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Failed to launch Chrome: {0}")]
    LaunchFailed(String),

    #[error("Failed to connect to Chrome: {0}")]
    ConnectionFailed(String),

    #[error("Navigation failed: {0}")]
    NavigationFailed(String),

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("CDP error: {0}")]
    Cdp(#[from] chromiumoxide::error::CdpError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl DriverError {
    /// Errors that may be swallowed by best-effort operations (panel waits,
    /// diagnostic capture) without invalidating the scenario.
    pub fn is_best_effort_safe(&self) -> bool {
        matches!(
            self,
            DriverError::PanelTimeout { .. }
                | DriverError::Timeout(_)
                | DriverError::Io(_)
                | DriverError::NotFound { .. }
        )
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, DriverError::Cancelled(_))
    }
}

pub type Result<T> = std::result::Result<T, DriverError>;
