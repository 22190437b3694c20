//! Append-only audit log entries and field-level diffs.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use haulage_shared::types::UserId;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One field that changed between two versions of a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldChange {
    /// JSON field name (camelCase, as stored).
    pub field: String,
    /// Value before the change (`null` when absent).
    pub before: Value,
    /// Value after the change (`null` when absent).
    pub after: Value,
}

impl FieldChange {
    /// Creates a change record.
    #[must_use]
    pub fn new(field: impl Into<String>, before: Value, after: Value) -> Self {
        Self {
            field: field.into(),
            before,
            after,
        }
    }
}

/// An audit entry appended on every mutating operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    /// When the mutation happened.
    pub date: DateTime<Utc>,
    /// Who performed it.
    pub user_id: UserId,
    /// Short machine-readable action name (`created`, `updated`, `paid`, ...).
    pub action: String,
    /// Human-readable summary.
    pub details: String,
    /// Structured before/after values.
    #[serde(default)]
    pub difference: Vec<FieldChange>,
}

impl LogEntry {
    /// Creates a log entry timestamped `date`.
    #[must_use]
    pub fn new(
        user_id: UserId,
        action: impl Into<String>,
        details: impl Into<String>,
        date: DateTime<Utc>,
    ) -> Self {
        Self {
            date,
            user_id,
            action: action.into(),
            details: details.into(),
            difference: Vec::new(),
        }
    }

    /// Attaches the field-level difference list.
    #[must_use]
    pub fn with_difference(mut self, difference: Vec<FieldChange>) -> Self {
        self.difference = difference;
        self
    }
}

/// Documents that carry an append-only audit log.
pub trait Auditable {
    /// The log, oldest first.
    fn logs(&self) -> &[LogEntry];

    /// Mutable access for appending.
    fn logs_mut(&mut self) -> &mut Vec<LogEntry>;

    /// Appends one entry.
    fn record(&mut self, entry: LogEntry) {
        self.logs_mut().push(entry);
    }

    /// Most recent entry, if any.
    fn last_log(&self) -> Option<&LogEntry> {
        self.logs().last()
    }
}

/// Compares two JSON objects field by field.
///
/// Only top-level keys are compared; nested objects are reported as a whole.
/// Keys listed in `ignored` are skipped. Output is sorted by field name.
#[must_use]
pub fn diff_fields(before: &Value, after: &Value, ignored: &[&str]) -> Vec<FieldChange> {
    let empty = serde_json::Map::new();
    let before = before.as_object().unwrap_or(&empty);
    let after = after.as_object().unwrap_or(&empty);

    let keys: BTreeSet<&String> = before.keys().chain(after.keys()).collect();

    keys.into_iter()
        .filter(|key| !ignored.contains(&key.as_str()))
        .filter_map(|key| {
            let old = before.get(key).unwrap_or(&Value::Null);
            let new = after.get(key).unwrap_or(&Value::Null);
            (old != new).then(|| FieldChange::new(key.clone(), old.clone(), new.clone()))
        })
        .collect()
}
