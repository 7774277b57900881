//! Column-aligned text export.
//!
//! Layout: title line, blank line, header row, one row per record. Every
//! cell is left-justified to the widest value (or label) of its column and
//! cells are joined by a single space. Each line ends with `\n`.

use chrono::{DateTime, Utc};
use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::status::{classify_signals, ActivitySignals};
use crate::types::Loose;
use crate::util::parse_datetime_safe;

const SEPARATOR: &str = " ";

/// How a column turns a record into text.
#[derive(Clone)]
pub enum Extract {
    /// Walk the dot-separated key path.
    Path,
    /// Derived user status, read from the record's `IsActive`, `LastLogin`,
    /// `LastTokenRefresh` and `DateOfRegistration` fields.
    Status { cutoff: DateTime<Utc> },
    /// The value at the key path is an object; show its `Name`, or its
    /// `FirstName` and `LastName`.
    DisplayName,
    /// The value at the key path is an array of objects; show `field` of
    /// each element, comma separated.
    ArrayField { field: String },
    /// Anything else.
    With(fn(&Value) -> String),
}

#[derive(Clone)]
pub struct Column {
    pub key: String,
    pub label: String,
    pub extract: Extract,
}

impl Column {
    pub fn new(key: &str, label: &str) -> Self {
        Column::with(key, label, Extract::Path)
    }

    pub fn with(key: &str, label: &str, extract: Extract) -> Self {
        Column {
            key: key.to_string(),
            label: label.to_string(),
            extract,
        }
    }

    pub fn status(label: &str, cutoff: DateTime<Utc>) -> Self {
        Column::with("Status", label, Extract::Status { cutoff })
    }

    fn cell(&self, record: &Value) -> String {
        let text = match &self.extract {
            Extract::Path => resolve_path(record, &self.key)
                .map(render)
                .unwrap_or_default(),
            Extract::Status { cutoff } => classify_signals(signals_of(record), *cutoff).to_string(),
            Extract::DisplayName => resolve_path(record, &self.key)
                .map(display_name)
                .unwrap_or_default(),
            Extract::ArrayField { field } => resolve_path(record, &self.key)
                .map(|v| join_field(v, field))
                .unwrap_or_default(),
            Extract::With(f) => f(record),
        };
        // Embedded line breaks would split a row in two.
        text.replace(['\r', '\n'], " ")
    }
}

/// Follow `path` ("a.b.c") through nested objects. Any missing step, or a
/// step through a non-object, yields `None`.
pub fn resolve_path<'v>(record: &'v Value, path: &str) -> Option<&'v Value> {
    path.split('.').try_fold(record, |current, key| current.as_object()?.get(key))
}

fn render(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

fn field_text<'v>(value: &'v Value, key: &str) -> Option<&'v str> {
    value.get(key).and_then(Value::as_str).map(str::trim).filter(|s| !s.is_empty())
}

fn display_name(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Object(_) => {
            if let Some(name) = field_text(value, "Name").or_else(|| field_text(value, "name")) {
                return name.to_string();
            }
            [field_text(value, "FirstName"), field_text(value, "LastName")]
                .into_iter()
                .flatten()
                .collect::<Vec<_>>()
                .join(" ")
        }
        _ => String::new(),
    }
}

fn join_field(value: &Value, field: &str) -> String {
    let Some(items) = value.as_array() else {
        return String::new();
    };
    items
        .iter()
        .filter_map(|item| item.get(field))
        .map(render)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}

fn timestamp(record: &Value, key: &str) -> Option<DateTime<Utc>> {
    parse_datetime_safe(record.get(key).and_then(Value::as_str))
}

fn signals_of(record: &Value) -> ActivitySignals {
    // Same flag rule as the loader, so a record reads the same either way.
    let is_active = record
        .get("IsActive")
        .and_then(|v| Loose::deserialize(v).ok())
        .and_then(|v| v.as_flag());
    ActivitySignals {
        is_active,
        last_login: timestamp(record, "LastLogin"),
        last_token_refresh: timestamp(record, "LastTokenRefresh"),
        date_of_registration: timestamp(record, "DateOfRegistration"),
    }
}

/// Render `records` under `title` using `columns`, in column order.
pub fn to_padded_text<T: Serialize>(records: &[T], columns: &[Column], title: &str) -> String {
    let grid: Vec<Vec<String>> = records
        .iter()
        .map(|record| {
            let value = serde_json::to_value(record).unwrap_or_else(|e| {
                warn!("record could not be rendered for export: {}", e);
                Value::Null
            });
            columns.iter().map(|c| c.cell(&value)).collect()
        })
        .collect();

    let widths: Vec<usize> = columns
        .iter()
        .enumerate()
        .map(|(i, column)| {
            grid.iter()
                .map(|row| row[i].chars().count())
                .chain(std::iter::once(column.label.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let mut out = String::new();
    out.push_str(title);
    out.push_str("\n\n");
    out.push_str(&pad_line(columns.iter().map(|c| c.label.as_str()), &widths));
    out.push('\n');
    for row in &grid {
        out.push_str(&pad_line(row.iter().map(String::as_str), &widths));
        out.push('\n');
    }
    out
}

fn pad_line<'a>(cells: impl Iterator<Item = &'a str>, widths: &[usize]) -> String {
    cells
        .zip(widths)
        .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
        .collect::<Vec<_>>()
        .join(SEPARATOR)
}
