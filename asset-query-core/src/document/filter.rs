use std::cmp::Ordering;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map};

use super::{from_document, lookup_path};
use crate::schema::Value;

/// Condition operators understood by [`DocumentFilter::matches`]
const CONDITION_OPERATORS: &[&str] = &[
    "$eq", "$ne", "$gt", "$gte", "$lt", "$lte", "$in", "$nin", "$regex", "$not",
];

/// A MongoDB-style filter document, e.g.
/// `{"$and": [{"isActive": {"$eq": true}}, {"name": {"$regex": "pump"}}]}`.
///
/// `{}` matches every document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentFilter(serde_json::Value);

impl Default for DocumentFilter {
    fn default() -> Self {
        Self::match_all()
    }
}

impl DocumentFilter {
    pub fn match_all() -> Self {
        DocumentFilter(json!({}))
    }

    pub(crate) fn field(path: &str, condition: serde_json::Value) -> Self {
        let mut doc = Map::new();
        doc.insert(path.to_string(), condition);
        DocumentFilter(serde_json::Value::Object(doc))
    }

    /// `{"$and": [..]}` / `{"$or": [..]}`, flattening directly nested runs
    /// of the same combinator
    pub(crate) fn combine(op: &str, left: DocumentFilter, right: DocumentFilter) -> Self {
        let mut clauses = Vec::new();
        for side in [left, right] {
            match side.0 {
                serde_json::Value::Object(mut obj) if obj.len() == 1 && obj.contains_key(op) => {
                    if let Some(serde_json::Value::Array(inner)) = obj.remove(op) {
                        clauses.extend(inner);
                    }
                }
                other => clauses.push(other),
            }
        }
        DocumentFilter(json!({ op: clauses }))
    }

    pub(crate) fn negate(self) -> Self {
        DocumentFilter(json!({ "$nor": [self.0] }))
    }

    pub fn as_json(&self) -> &serde_json::Value {
        &self.0
    }

    pub fn into_json(self) -> serde_json::Value {
        self.0
    }

    pub fn is_match_all(&self) -> bool {
        self.0.as_object().is_some_and(|o| o.is_empty())
    }

    /// Evaluate against one document, with store semantics: a missing
    /// field is null, comparisons never cross value kinds.
    pub fn matches(&self, doc: &serde_json::Value) -> bool {
        matches_filter(&self.0, doc)
    }
}

fn matches_filter(filter: &serde_json::Value, doc: &serde_json::Value) -> bool {
    let Some(clauses) = filter.as_object() else {
        return false;
    };
    clauses.iter().all(|(key, condition)| match key.as_str() {
        "$and" => each(condition).all(|f| matches_filter(f, doc)),
        "$or" => each(condition).any(|f| matches_filter(f, doc)),
        "$nor" => !each(condition).any(|f| matches_filter(f, doc)),
        path => matches_condition(condition, &from_document(lookup_path(doc, path))),
    })
}

fn each(value: &serde_json::Value) -> impl Iterator<Item = &serde_json::Value> {
    value.as_array().into_iter().flatten()
}

fn is_operator_document(condition: &serde_json::Value) -> bool {
    condition.as_object().is_some_and(|o| {
        !o.is_empty() && o.keys().all(|k| CONDITION_OPERATORS.contains(&k.as_str()))
    })
}

fn matches_condition(condition: &serde_json::Value, actual: &Value) -> bool {
    if !is_operator_document(condition) {
        return equals(actual, &from_document(condition));
    }
    let Some(ops) = condition.as_object() else {
        return false;
    };
    ops.iter().all(|(op, operand)| match op.as_str() {
        "$eq" => equals(actual, &from_document(operand)),
        "$ne" => !equals(actual, &from_document(operand)),
        "$gt" => ordered(actual, operand, |o| o == Ordering::Greater),
        "$gte" => ordered(actual, operand, |o| o != Ordering::Less),
        "$lt" => ordered(actual, operand, |o| o == Ordering::Less),
        "$lte" => ordered(actual, operand, |o| o != Ordering::Greater),
        "$in" => each(operand).any(|v| equals(actual, &from_document(v))),
        "$nin" => !each(operand).any(|v| equals(actual, &from_document(v))),
        "$regex" => regex_matches(actual, operand),
        "$not" => !matches_condition(operand, actual),
        _ => false,
    })
}

/// Null equals only null; otherwise same-kind equality
fn equals(actual: &Value, expected: &Value) -> bool {
    match (actual, expected) {
        (Value::Null, Value::Null) => true,
        (Value::Null, _) | (_, Value::Null) => false,
        (a, b) => a.compare(b) == Some(Ordering::Equal),
    }
}

fn ordered(actual: &Value, operand: &serde_json::Value, accept: impl Fn(Ordering) -> bool) -> bool {
    actual.compare(&from_document(operand)).is_some_and(accept)
}

fn regex_matches(actual: &Value, pattern: &serde_json::Value) -> bool {
    let (Value::String(s), Some(pattern)) = (actual, pattern.as_str()) else {
        return false;
    };
    match Regex::new(pattern) {
        Ok(re) => re.is_match(s),
        Err(e) => {
            tracing::warn!(pattern = pattern, error = %e, "Invalid $regex in document filter");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter(value: serde_json::Value) -> DocumentFilter {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_match_all() {
        assert!(DocumentFilter::match_all().matches(&json!({ "a": 1 })));
        assert!(DocumentFilter::default().is_match_all());
    }

    #[test]
    fn test_comparisons() {
        let doc = json!({ "price": 10, "name": "Pump" });
        assert!(filter(json!({ "price": { "$gte": 10, "$lt": 11 } })).matches(&doc));
        assert!(!filter(json!({ "price": { "$gt": 10 } })).matches(&doc));
        assert!(filter(json!({ "name": "Pump" })).matches(&doc));
        assert!(!filter(json!({ "name": { "$gt": 5 } })).matches(&doc));
    }

    #[test]
    fn test_missing_field_is_null() {
        let doc = json!({ "name": "Pump" });
        assert!(filter(json!({ "price": { "$eq": null } })).matches(&doc));
        assert!(filter(json!({ "price": { "$ne": 3 } })).matches(&doc));
        assert!(filter(json!({ "price": { "$nin": [3] } })).matches(&doc));
        assert!(!filter(json!({ "price": { "$in": [3] } })).matches(&doc));
        assert!(!filter(json!({ "price": { "$lt": 3 } })).matches(&doc));
        assert!(filter(json!({ "price": { "$not": { "$gt": 3 } } })).matches(&doc));
    }

    #[test]
    fn test_regex_and_combinators() {
        let doc = json!({ "name": "Pump (spare)" });
        assert!(filter(json!({ "name": { "$regex": "\\(spare\\)$" } })).matches(&doc));
        assert!(filter(json!({ "name": { "$not": { "$regex": "^pump" } } })).matches(&doc));
        assert!(filter(json!({ "$or": [{ "name": "x" }, { "name": { "$regex": "^Pump" } }] })).matches(&doc));
        assert!(!filter(json!({ "$nor": [{ "name": { "$regex": "Pump" } }] })).matches(&doc));
        assert!(filter(json!({ "$and": [] })).matches(&doc));
    }

    #[test]
    fn test_wrapped_values() {
        let doc = json!({ "createdAt": { "$date": "2024-05-01T00:00:00Z" } });
        assert!(filter(json!({ "createdAt": { "$gt": { "$date": "2024-01-01T00:00:00Z" } } })).matches(&doc));
        assert!(filter(json!({ "createdAt": { "$date": "2024-05-01T00:00:00Z" } })).matches(&doc));
    }

    #[test]
    fn test_combine_flattens() {
        let a = DocumentFilter::field("a", json!({ "$eq": 1 }));
        let b = DocumentFilter::field("b", json!({ "$eq": 2 }));
        let c = DocumentFilter::field("c", json!({ "$eq": 3 }));
        let combined = DocumentFilter::combine("$and", DocumentFilter::combine("$and", a, b), c);
        assert_eq!(
            combined.as_json(),
            &json!({ "$and": [{ "a": { "$eq": 1 } }, { "b": { "$eq": 2 } }, { "c": { "$eq": 3 } }] })
        );
    }
}
