//! Value model shared by the filter pipeline.
//!
//! `FieldType` is what a Field Map declares for a field, `Value` is what an
//! accessor reads out of an entity at runtime.

pub mod field_map;

pub use field_map::{
    FieldDef, FieldMap, FieldMapBuilder, IncludeDef, IncludeKind, Queryable, RelatedEntity,
};

use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

/// Declared type of a queryable field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Number,
    Boolean,
    DateTime,
    Guid,
}

impl FieldType {
    /// Ordering operators only make sense on these
    pub fn is_ordered(&self) -> bool {
        matches!(self, FieldType::Number | FieldType::DateTime)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldType::String => "string",
            FieldType::Number => "number",
            FieldType::Boolean => "boolean",
            FieldType::DateTime => "datetime",
            FieldType::Guid => "guid",
        };
        f.write_str(name)
    }
}

/// A runtime field value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    String(String),
    Number(f64),
    Boolean(bool),
    DateTime(DateTime<Utc>),
    Guid(Uuid),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Compare two values of the same kind. Null or mixed kinds are incomparable.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            (Value::Number(a), Value::Number(b)) => a.partial_cmp(b),
            (Value::Boolean(a), Value::Boolean(b)) => Some(a.cmp(b)),
            (Value::DateTime(a), Value::DateTime(b)) => Some(a.cmp(b)),
            (Value::Guid(a), Value::Guid(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    /// Total order used for sorting: null sorts before everything else
    pub fn sort_cmp(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Value::Null, Value::Null) => Ordering::Equal,
            (Value::Null, _) => Ordering::Less,
            (_, Value::Null) => Ordering::Greater,
            (a, b) => a.compare(b).unwrap_or(Ordering::Equal),
        }
    }

    /// Plain JSON rendering, used for projections and SQL parameters
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::String(s) => json!(s),
            Value::Number(n) => number_to_json(*n),
            Value::Boolean(b) => json!(b),
            Value::DateTime(dt) => json!(format_datetime(dt)),
            Value::Guid(id) => json!(id.hyphenated().to_string()),
        }
    }

    /// Document-store rendering. Date-times and GUIDs use extended JSON wrappers
    /// so the store can tell them apart from plain strings.
    pub fn to_document(&self) -> serde_json::Value {
        match self {
            Value::DateTime(dt) => json!({ "$date": format_datetime(dt) }),
            Value::Guid(id) => json!({ "$uuid": id.hyphenated().to_string() }),
            other => other.to_json(),
        }
    }
}

fn number_to_json(n: f64) -> serde_json::Value {
    // 2^53: integral floats below this survive an i64 round trip exactly
    if n.fract() == 0.0 && n.abs() < 9_007_199_254_740_992.0 {
        json!(n as i64)
    } else {
        serde_json::Number::from_f64(n)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null)
    }
}

/// RFC 3339 in UTC, full sub-second precision
pub fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// Parse the date-time shapes the filter language accepts:
/// `2024-01-31`, `2024-01-31T10:00`, `2024-01-31T10:00:00`,
/// `2024-01-31T10:00:00.123Z`, `2024-01-31T10:00:00+02:00`.
/// Values without an offset are taken as UTC.
pub fn parse_datetime(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M%:z") {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<&String> for Value {
    fn from(s: &String) -> Self {
        Value::String(s.clone())
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(dt: DateTime<Utc>) -> Self {
        Value::DateTime(dt)
    }
}

impl From<Uuid> for Value {
    fn from(id: Uuid) -> Self {
        Value::Guid(id)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}
