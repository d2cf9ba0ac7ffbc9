//! Document-store side of the pipeline: filters expressed in the MongoDB
//! query vocabulary, plus the helpers to read typed values back out of
//! documents so that in-memory evaluation agrees with the store.

pub mod binder;
pub mod filter;

pub use binder::bind_document;
pub use filter::DocumentFilter;

use serde::Serialize;
use uuid::Uuid;

use crate::schema::{parse_datetime, Value};

/// Everything a document store needs to run one page of a query
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentQuery {
    pub filter: serde_json::Value,
    pub sort: serde_json::Value,
    pub skip: u64,
    pub limit: u64,
}

/// Follow a dotted path; anything missing reads as null
pub fn lookup_path<'a>(doc: &'a serde_json::Value, path: &str) -> &'a serde_json::Value {
    let mut current = doc;
    for segment in path.split('.') {
        match current.get(segment) {
            Some(next) => current = next,
            None => return &serde_json::Value::Null,
        }
    }
    current
}

/// Decode a stored value, honoring the `$date` / `$uuid` wrappers.
/// Arrays and plain objects have no scalar reading and decode as null.
pub fn from_document(value: &serde_json::Value) -> Value {
    match value {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Boolean(*b),
        serde_json::Value::Number(n) => n.as_f64().map(Value::Number).unwrap_or(Value::Null),
        serde_json::Value::String(s) => Value::String(s.clone()),
        serde_json::Value::Object(obj) if obj.len() == 1 => {
            if let Some(raw) = obj.get("$date").and_then(|v| v.as_str()) {
                return parse_datetime(raw).map(Value::DateTime).unwrap_or(Value::Null);
            }
            if let Some(raw) = obj.get("$uuid").and_then(|v| v.as_str()) {
                return Uuid::parse_str(raw).map(Value::Guid).unwrap_or(Value::Null);
            }
            Value::Null
        }
        _ => Value::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    #[test]
    fn test_lookup_path() {
        let doc = json!({ "company": { "name": "Acme" }, "name": "Pump" });
        assert_eq!(lookup_path(&doc, "name"), &json!("Pump"));
        assert_eq!(lookup_path(&doc, "company.name"), &json!("Acme"));
        assert_eq!(lookup_path(&doc, "company.taxId"), &serde_json::Value::Null);
        assert_eq!(lookup_path(&doc, "missing.deeper"), &serde_json::Value::Null);
    }

    #[test]
    fn test_wrappers_round_trip() {
        let dt = Utc.with_ymd_and_hms(2024, 2, 29, 12, 30, 0).unwrap();
        assert_eq!(from_document(&Value::DateTime(dt).to_document()), Value::DateTime(dt));

        let id = Uuid::parse_str("3fa85f64-5717-4562-b3fc-2c963f66afa6").unwrap();
        assert_eq!(from_document(&Value::Guid(id).to_document()), Value::Guid(id));

        assert_eq!(from_document(&json!(3)), Value::Number(3.0));
        assert_eq!(from_document(&json!({ "a": 1 })), Value::Null);
        assert_eq!(from_document(&json!([1, 2])), Value::Null);
    }
}
