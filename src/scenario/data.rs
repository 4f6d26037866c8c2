//! Flat data records feeding scenario values.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;

/// One row of input data: field name to string, number or list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DataRecord(BTreeMap<String, Value>);

impl DataRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(field.into(), value.into());
        self
    }

    /// Scalar value of `field`; null, blank and missing all read as `None`.
    pub fn get(&self, field: &str) -> Option<String> {
        let text = match self.0.get(field)? {
            Value::Null => return None,
            Value::String(s) => s.trim().to_string(),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Array(items) => items
                .iter()
                .filter_map(scalar)
                .collect::<Vec<_>>()
                .join(", "),
            Value::Object(_) => return None,
        };
        (!text.is_empty()).then_some(text)
    }

    /// List value of `field`: an array, or a comma-separated string.
    pub fn get_list(&self, field: &str) -> Vec<String> {
        match self.0.get(field) {
            Some(Value::Array(items)) => items.iter().filter_map(scalar).collect(),
            Some(_) => self.get(field).map(|s| split_list(&s)).unwrap_or_default(),
            None => Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

fn scalar(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

/// Split "Rust, Go,, SQL" into its non-blank parts.
pub fn split_list(text: &str) -> Vec<String> {
    text.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Load a JSON array of records.
pub async fn load_records(path: &Path) -> anyhow::Result<Vec<DataRecord>> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read data file {}", path.display()))?;
    let records: Vec<DataRecord> = serde_json::from_str(&content)
        .with_context(|| format!("Data file {} is not a JSON array of objects", path.display()))?;
    Ok(records)
}
