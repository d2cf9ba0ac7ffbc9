//! Document binder: validated AST → [`DocumentFilter`].

use serde_json::json;

use super::filter::DocumentFilter;
use crate::error::FilterError;
use crate::query::filter::{BinaryOp, CallNode, CallOp, FilterNode, UnaryOp};
use crate::schema::{FieldDef, FieldMap, Value};
use crate::sql::binder::{resolve_field, resolve_literal};

/// Compile a validated filter into a document-store filter.
///
/// Selects exactly the entities [`crate::sql::bind_relational`] selects
/// for the same AST.
pub fn bind_document<E>(node: &FilterNode, map: &FieldMap<E>) -> Result<DocumentFilter, FilterError> {
    match node {
        FilterNode::Group(n) => bind_document(&n.expression, map),
        FilterNode::Unary(n) => match n.operator {
            UnaryOp::Not => Ok(bind_document(&n.operand, map)?.negate()),
        },
        FilterNode::Binary(n) => {
            let op = match n.operator {
                BinaryOp::And => {
                    return Ok(DocumentFilter::combine(
                        "$and",
                        bind_document(&n.left, map)?,
                        bind_document(&n.right, map)?,
                    ))
                }
                BinaryOp::Or => {
                    return Ok(DocumentFilter::combine(
                        "$or",
                        bind_document(&n.left, map)?,
                        bind_document(&n.right, map)?,
                    ))
                }
                BinaryOp::Eq => "$eq",
                BinaryOp::Ne => "$ne",
                BinaryOp::Gt => "$gt",
                BinaryOp::Ge => "$gte",
                BinaryOp::Lt => "$lt",
                BinaryOp::Le => "$lte",
            };
            let field = resolve_field(&n.left, map)?;
            let value = resolve_literal(&n.right, field)?;
            Ok(DocumentFilter::field(
                field.document_path,
                json!({ op: value.to_document() }),
            ))
        }
        FilterNode::Call(n) => bind_call(n, map),
        FilterNode::Literal(_) | FilterNode::Field(_) => Err(FilterError::bind(format!(
            "'{}' is not a boolean expression",
            node
        ))),
    }
}

fn bind_call<E>(n: &CallNode, map: &FieldMap<E>) -> Result<DocumentFilter, FilterError> {
    let field = resolve_field(&n.target, map)?;
    let values = n
        .arguments
        .iter()
        .map(|arg| resolve_literal(arg, field))
        .collect::<Result<Vec<_>, _>>()?;
    let path = field.document_path;

    let condition = match n.operator {
        CallOp::Contains => json!({ "$regex": regex_for(n, field, &values, "", "")? }),
        CallOp::NotContains => {
            json!({ "$not": { "$regex": regex_for(n, field, &values, "", "")? } })
        }
        CallOp::StartsWith => json!({ "$regex": regex_for(n, field, &values, "\\A", "")? }),
        CallOp::EndsWith => json!({ "$regex": regex_for(n, field, &values, "", "\\z")? }),
        CallOp::In => json!({ "$in": documents(&values) }),
        CallOp::NotIn => json!({ "$nin": documents(&values) }),
        CallOp::Between => match values.as_slice() {
            [lo, hi] => json!({ "$gte": lo.to_document(), "$lte": hi.to_document() }),
            _ => return Err(FilterError::bind("'between' needs exactly two bounds")),
        },
        CallOp::IsNull => json!({ "$eq": null }),
        CallOp::IsNotNull => json!({ "$ne": null }),
    };
    Ok(DocumentFilter::field(path, condition))
}

/// Escaped needle, so the pattern matches the literal text only
fn regex_for<E>(
    n: &CallNode,
    field: &FieldDef<E>,
    values: &[Value],
    prefix: &str,
    suffix: &str,
) -> Result<String, FilterError> {
    match values {
        [Value::String(needle)] => Ok(format!("{}{}{}", prefix, regex::escape(needle), suffix)),
        _ => Err(FilterError::bind(format!(
            "'{}' on '{}' needs one string argument",
            n.operator.symbol(),
            field.name
        ))),
    }
}

fn documents(values: &[Value]) -> Vec<serde_json::Value> {
    values.iter().map(Value::to_document).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_filter;
    use crate::schema::FieldType;
    use pretty_assertions::assert_eq;

    struct Sensor {
        label: String,
    }

    fn sensor_map() -> FieldMap<Sensor> {
        FieldMap::<Sensor>::builder("Sensor")
            .field("label", FieldType::String, |s| Value::from(&s.label))
            .field("reading", FieldType::Number, |_| Value::Null)
            .document_path("telemetry.reading")
            .field("installedAt", FieldType::DateTime, |_| Value::Null)
            .field("siteId", FieldType::Guid, |_| Value::Null)
            .build()
    }

    fn bind(filter: &str) -> serde_json::Value {
        let map = sensor_map();
        bind_document(&parse_filter(filter).unwrap(), &map)
            .unwrap()
            .into_json()
    }

    #[test]
    fn test_comparison_uses_document_path() {
        assert_eq!(bind("reading > 3.5"), json!({ "telemetry.reading": { "$gt": 3.5 } }));
        assert_eq!(bind("label != 'x'"), json!({ "label": { "$ne": "x" } }));
    }

    #[test]
    fn test_logical_flattening() {
        assert_eq!(
            bind("label == 'a' or label == 'b' or (label == 'c' and not reading < 1)"),
            json!({ "$or": [
                { "label": { "$eq": "a" } },
                { "label": { "$eq": "b" } },
                { "$and": [
                    { "label": { "$eq": "c" } },
                    { "$nor": [{ "telemetry.reading": { "$lt": 1 } }] },
                ] },
            ] })
        );
    }

    #[test]
    fn test_string_calls_escape_needle() {
        assert_eq!(bind("label @contains 'a.b'"), json!({ "label": { "$regex": "a\\.b" } }));
        assert_eq!(bind("label @startswith 'x'"), json!({ "label": { "$regex": "\\Ax" } }));
        assert_eq!(bind("label @endswith '(1)'"), json!({ "label": { "$regex": "\\(1\\)\\z" } }));
        assert_eq!(
            bind("label not @contains 'y'"),
            json!({ "label": { "$not": { "$regex": "y" } } })
        );
    }

    #[test]
    fn test_typed_values_are_wrapped() {
        assert_eq!(
            bind("installedAt between (2024-01-01, 2024-02-01T12:00:00Z)"),
            json!({ "installedAt": {
                "$gte": { "$date": "2024-01-01T00:00:00Z" },
                "$lte": { "$date": "2024-02-01T12:00:00Z" },
            } })
        );
        assert_eq!(
            bind("siteId in (3fa85f64-5717-4562-b3fc-2c963f66afa6)"),
            json!({ "siteId": { "$in": [{ "$uuid": "3fa85f64-5717-4562-b3fc-2c963f66afa6" }] } })
        );
    }

    #[test]
    fn test_null_checks() {
        assert_eq!(bind("label is null"), json!({ "label": { "$eq": null } }));
        assert_eq!(bind("label is not null"), json!({ "label": { "$ne": null } }));
    }
}
