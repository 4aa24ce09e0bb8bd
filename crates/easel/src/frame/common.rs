// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2024 Jonathan Lee
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License version 3
// as published by the Free Software Foundation.
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.
// See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see https://www.gnu.org/licenses/.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use std::cmp::Ordering;
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

pub const DEFAULT_PREVIEW_ROWS: usize = 10;

pub const DEFAULT_TEMPORAL_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%SZ",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y",
    "%d/%m/%Y",
    "%Y/%m/%d",
];

pub const DATETIME_RENDER_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

#[derive(Error, Debug)]
pub enum FrameError {
    #[error("Column not found: {0}")]
    ColumnNotFound(String),
    #[error("Type mismatch: {0}")]
    TypeMismatch(String),
    #[error("Index out of bounds: {0}")]
    OutOfBounds(usize),
    #[error("Column length mismatch: expected {expected}, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),
    #[error("Parse error: {0}")]
    ParseError(String),
}

pub type Result<T> = std::result::Result<T, FrameError>;

/// Storage type of a column. Every cell of a column shares it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Int64,
    Float64,
    String,
    Boolean,
    Datetime,
}

impl DataType {
    pub fn is_numeric(&self) -> bool {
        matches!(self, DataType::Int64 | DataType::Float64)
    }
    pub fn is_temporal(&self) -> bool {
        matches!(self, DataType::Datetime)
    }
    pub fn is_textual(&self) -> bool {
        matches!(self, DataType::String)
    }
    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::Int64 => "int64",
            DataType::Float64 => "float64",
            DataType::String => "string",
            DataType::Boolean => "bool",
            DataType::Datetime => "datetime",
        }
    }
    /// Fixed per-cell width used for memory estimates; strings add their byte length.
    pub fn cell_width(&self) -> usize {
        match self {
            DataType::Boolean => 1,
            DataType::String => 16,
            _ => 8,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DatasetId(String);

impl DatasetId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for DatasetId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DatasetId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for DatasetId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetMetadata {
    pub id: DatasetId,
    pub name: String,
    pub row_count: usize,
    pub column_count: usize,
    pub created_at: DateTime<Utc>,
}

impl DatasetMetadata {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            id: DatasetId::new(),
            name: name.into(),
            row_count: 0,
            column_count: 0,
            created_at: Utc::now(),
        }
    }
}

/// A single cell value detached from its column.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Null,
    Int(i64),
    Float(f64),
    Text(String),
    Bool(bool),
    Datetime(NaiveDateTime),
}

impl Scalar {
    pub fn is_null(&self) -> bool {
        matches!(self, Scalar::Null)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Scalar::Int(v) => Some(*v as f64),
            Scalar::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Text form used for equality filters, concatenation and pivot keys.
    pub fn render(&self) -> Option<String> {
        match self {
            Scalar::Null => None,
            Scalar::Int(v) => Some(v.to_string()),
            Scalar::Float(v) => Some(v.to_string()),
            Scalar::Text(s) => Some(s.clone()),
            Scalar::Bool(b) => Some(b.to_string()),
            Scalar::Datetime(dt) => Some(dt.format(DATETIME_RENDER_FORMAT).to_string()),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Scalar::Null => Value::Null,
            Scalar::Int(v) => Value::from(*v),
            Scalar::Float(v) => serde_json::Number::from_f64(*v).map_or(Value::Null, Value::Number),
            Scalar::Text(s) => Value::String(s.clone()),
            Scalar::Bool(b) => Value::Bool(*b),
            Scalar::Datetime(_) => self.render().map_or(Value::Null, Value::String),
        }
    }

    /// Converts a JSON leaf into a scalar. Arrays and objects become their JSON text.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => Scalar::Null,
            Value::Bool(b) => Scalar::Bool(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Scalar::Int(i),
                None => n.as_f64().map_or(Scalar::Null, Scalar::Float),
            },
            Value::String(s) => Scalar::Text(s.clone()),
            other => Scalar::Text(other.to_string()),
        }
    }

    /// Total order used to sort group keys: nulls last, numbers numerically,
    /// everything else by rendered text.
    pub fn total_cmp(&self, other: &Scalar) -> Ordering {
        match (self, other) {
            (Scalar::Null, Scalar::Null) => Ordering::Equal,
            (Scalar::Null, _) => Ordering::Greater,
            (_, Scalar::Null) => Ordering::Less,
            (Scalar::Datetime(a), Scalar::Datetime(b)) => a.cmp(b),
            (Scalar::Bool(a), Scalar::Bool(b)) => a.cmp(b),
            (a, b) => match (a.as_f64(), b.as_f64()) {
                (Some(x), Some(y)) => x.total_cmp(&y),
                _ => a.render().cmp(&b.render()),
            },
        }
    }

    /// Equality against a JSON filter value, typed the way the cell is typed.
    pub fn matches_json(&self, value: &Value) -> bool {
        match (self, value) {
            (Scalar::Null, Value::Null) => true,
            (Scalar::Null, _) | (_, Value::Null) => false,
            (Scalar::Bool(a), Value::Bool(b)) => a == b,
            (cell, Value::Number(n)) => match (cell.as_f64(), n.as_f64()) {
                (Some(x), Some(y)) => x == y,
                _ => false,
            },
            (cell, Value::String(s)) => cell.render().is_some_and(|r| r == *s),
            _ => false,
        }
    }
}

impl Serialize for Scalar {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.render() {
            Some(s) => f.write_str(&s),
            None => f.write_str("null"),
        }
    }
}

/// Parses a timestamp using the given chrono formats, falling back to RFC 3339.
/// Date-only formats yield midnight.
pub fn parse_temporal<S: AsRef<str>>(value: &str, formats: &[S]) -> Option<NaiveDateTime> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    for format in formats {
        let format = format.as_ref();
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(dt);
        }
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
            return date.and_hms_opt(0, 0, 0);
        }
    }
    DateTime::parse_from_rfc3339(trimmed)
        .ok()
        .map(|dt| dt.naive_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_date_only_values_as_midnight() {
        let dt = parse_temporal("2024-03-05", DEFAULT_TEMPORAL_FORMATS).unwrap();
        assert_eq!(dt.to_string(), "2024-03-05 00:00:00");
        assert!(parse_temporal("not a date", DEFAULT_TEMPORAL_FORMATS).is_none());
        assert!(parse_temporal("2024-01-02T10:11:12+02:00", DEFAULT_TEMPORAL_FORMATS).is_some());
    }

    #[test]
    fn scalar_json_equality_follows_cell_type() {
        assert!(Scalar::Int(3).matches_json(&json!(3.0)));
        assert!(Scalar::Text("A".into()).matches_json(&json!("A")));
        assert!(!Scalar::Text("3".into()).matches_json(&json!(3)));
        assert!(!Scalar::Null.matches_json(&json!("A")));
    }

    #[test]
    fn nulls_sort_last() {
        let mut keys = vec![Scalar::Null, Scalar::Int(2), Scalar::Float(1.5)];
        keys.sort_by(|a, b| a.total_cmp(b));
        assert_eq!(keys, vec![Scalar::Float(1.5), Scalar::Int(2), Scalar::Null]);
    }
}
