//! Diagnostic sink: timestamped records plus failure screenshots.
//!
//! Unattended runs leave nothing behind except these artifacts, so every
//! failure path in the executor and the widget drivers reports here. Nothing in
//! this module may fail the caller: screenshot errors are logged and dropped.

use crate::document::Document;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Longest sanitized label kept in a screenshot filename.
const MAX_LABEL_LEN: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warn,
    Error,
}

impl Severity {
    fn level(self) -> log::Level {
        match self {
            Severity::Info => log::Level::Info,
            Severity::Warn => log::Level::Warn,
            Severity::Error => log::Level::Error,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosticRecord {
    pub timestamp: DateTime<Utc>,
    pub severity: Severity,
    pub component: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screenshot: Option<PathBuf>,
}

/// Append-only destination for diagnostic records.
pub trait RecordSink: Send + Sync {
    fn append(&self, record: DiagnosticRecord);
}

/// Forwards records to the `log` facade, using the component as the target.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl RecordSink for LogSink {
    fn append(&self, record: DiagnosticRecord) {
        match &record.screenshot {
            Some(path) => log::log!(
                target: &record.component,
                record.severity.level(),
                "{} (screenshot: {})",
                record.message,
                path.display()
            ),
            None => log::log!(
                target: &record.component,
                record.severity.level(),
                "{}",
                record.message
            ),
        }
    }
}

/// Per-component handle on the diagnostic sink.
#[derive(Clone)]
pub struct Diagnostics {
    component: String,
    sink: Arc<dyn RecordSink>,
    document: Arc<dyn Document>,
    artifacts_dir: PathBuf,
}

impl Diagnostics {
    pub fn new(
        component: impl Into<String>,
        sink: Arc<dyn RecordSink>,
        document: Arc<dyn Document>,
        artifacts_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            component: component.into(),
            sink,
            document,
            artifacts_dir: artifacts_dir.into(),
        }
    }

    /// Same sink and artifacts directory, tagged with another component name.
    pub fn for_component(&self, component: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            ..self.clone()
        }
    }

    pub fn component(&self) -> &str {
        &self.component
    }

    pub fn artifacts_dir(&self) -> &Path {
        &self.artifacts_dir
    }

    pub fn log(&self, message: impl Into<String>, severity: Severity) {
        self.sink.append(DiagnosticRecord {
            timestamp: Utc::now(),
            severity,
            component: self.component.clone(),
            message: message.into(),
            screenshot: None,
        });
    }

    pub fn info(&self, message: impl Into<String>) {
        self.log(message, Severity::Info);
    }

    pub fn warn(&self, message: impl Into<String>) {
        self.log(message, Severity::Warn);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.log(message, Severity::Error);
    }

    /// Capture a full-page screenshot named after `label`.
    ///
    /// Returns the written path, or `None` if capture or writing failed.
    pub async fn screenshot(&self, label: &str) -> Option<PathBuf> {
        let filename = format!(
            "{}-{}.png",
            sanitize_label(label),
            Utc::now().timestamp_millis()
        );
        let path = self.artifacts_dir.join(filename);

        match self.write_screenshot(&path).await {
            Ok(()) => {
                self.sink.append(DiagnosticRecord {
                    timestamp: Utc::now(),
                    severity: Severity::Info,
                    component: self.component.clone(),
                    message: format!("Screenshot captured: {}", label),
                    screenshot: Some(path.clone()),
                });
                Some(path)
            }
            Err(e) => {
                self.warn(format!("Failed to capture screenshot '{}': {}", label, e));
                None
            }
        }
    }

    /// Log at error severity and capture a screenshot in one step.
    pub async fn failure(&self, message: impl Into<String>, label: &str) -> Option<PathBuf> {
        self.error(message);
        self.screenshot(label).await
    }

    async fn write_screenshot(&self, path: &Path) -> crate::error::Result<()> {
        tokio::fs::create_dir_all(&self.artifacts_dir).await?;
        let png = self.document.screenshot(true).await?;
        tokio::fs::write(path, png).await?;
        Ok(())
    }
}

/// Reduce a free-form label to a lowercase, dash-separated filename token.
pub fn sanitize_label(label: &str) -> String {
    let mut out = String::with_capacity(label.len());
    let mut pending_dash = false;

    for c in label.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }

    if out.len() > MAX_LABEL_LEN {
        out.truncate(MAX_LABEL_LEN);
        while out.ends_with('-') {
            out.pop();
        }
    }

    if out.is_empty() {
        "screenshot".to_string()
    } else {
        out
    }
}

/// Initialise `env_logger` writing `[timestamp] LEVEL [component] message` lines to stdout.
///
/// Safe to call more than once; later calls are ignored.
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stdout)
        .format(|buf, record| {
            writeln!(
                buf,
                "[{}] {} [{}] {}",
                Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
                record.level(),
                record.target(),
                record.args()
            )
        })
        .try_init();
}
