//! Relational predicate: the compiled form of a filter for row stores.
//!
//! A predicate can be rendered to parameterized SQL or evaluated directly
//! against an entity through the Field Map accessors. Both paths follow the
//! same two-valued null rule: a leaf over a null value is false, except the
//! negative forms (`!=`, `not in`, `not @contains`) which are true. SQL leaves
//! are wrapped in `COALESCE` so the database agrees with `evaluate`.

use std::cmp::Ordering;
use std::fmt;

use super::naming::quote_ident;
use super::{escape_like_pattern, SqlParams};
use crate::schema::{FieldDef, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}

impl CompareOp {
    pub fn as_sql(&self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "<>",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
        }
    }

    fn holds(&self, ordering: Option<Ordering>) -> bool {
        match self {
            CompareOp::Eq => ordering == Some(Ordering::Equal),
            CompareOp::Ne => ordering != Some(Ordering::Equal),
            CompareOp::Gt => ordering == Some(Ordering::Greater),
            CompareOp::Ge => matches!(ordering, Some(Ordering::Greater | Ordering::Equal)),
            CompareOp::Lt => ordering == Some(Ordering::Less),
            CompareOp::Le => matches!(ordering, Some(Ordering::Less | Ordering::Equal)),
        }
    }

    /// What the leaf yields when the field is null
    fn on_null(&self) -> bool {
        matches!(self, CompareOp::Ne)
    }
}

/// Where the needle of a LIKE has to appear
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LikeKind {
    Contains,
    StartsWith,
    EndsWith,
}

impl LikeKind {
    fn pattern(&self, needle: &str) -> String {
        let escaped = escape_like_pattern(needle);
        match self {
            LikeKind::Contains => format!("%{}%", escaped),
            LikeKind::StartsWith => format!("{}%", escaped),
            LikeKind::EndsWith => format!("%{}", escaped),
        }
    }

    fn matches(&self, haystack: &str, needle: &str) -> bool {
        match self {
            LikeKind::Contains => haystack.contains(needle),
            LikeKind::StartsWith => haystack.starts_with(needle),
            LikeKind::EndsWith => haystack.ends_with(needle),
        }
    }
}

pub enum Predicate<'m, E> {
    Compare {
        field: &'m FieldDef<E>,
        op: CompareOp,
        value: Value,
    },
    Like {
        field: &'m FieldDef<E>,
        kind: LikeKind,
        needle: String,
        negated: bool,
    },
    InSet {
        field: &'m FieldDef<E>,
        values: Vec<Value>,
        negated: bool,
    },
    IsNull {
        field: &'m FieldDef<E>,
        negated: bool,
    },
    And(Box<Predicate<'m, E>>, Box<Predicate<'m, E>>),
    Or(Box<Predicate<'m, E>>, Box<Predicate<'m, E>>),
    Not(Box<Predicate<'m, E>>),
}

impl<'m, E> Predicate<'m, E> {
    pub fn and(self, other: Predicate<'m, E>) -> Self {
        Predicate::And(Box::new(self), Box::new(other))
    }

    pub fn or(self, other: Predicate<'m, E>) -> Self {
        Predicate::Or(Box::new(self), Box::new(other))
    }

    pub fn negate(self) -> Self {
        Predicate::Not(Box::new(self))
    }

    /// Apply the predicate to one entity
    pub fn evaluate(&self, entity: &E) -> bool {
        match self {
            Predicate::Compare { field, op, value } => {
                let actual = field.read(entity);
                if actual.is_null() {
                    return op.on_null();
                }
                op.holds(actual.compare(value))
            }
            Predicate::Like {
                field,
                kind,
                needle,
                negated,
            } => match field.read(entity) {
                Value::String(s) => kind.matches(&s, needle) != *negated,
                _ => *negated,
            },
            Predicate::InSet {
                field,
                values,
                negated,
            } => {
                let actual = field.read(entity);
                if actual.is_null() {
                    return *negated;
                }
                let found = values
                    .iter()
                    .any(|v| actual.compare(v) == Some(Ordering::Equal));
                found != *negated
            }
            Predicate::IsNull { field, negated } => field.read(entity).is_null() != *negated,
            Predicate::And(left, right) => left.evaluate(entity) && right.evaluate(entity),
            Predicate::Or(left, right) => left.evaluate(entity) || right.evaluate(entity),
            Predicate::Not(inner) => !inner.evaluate(entity),
        }
    }

    /// Render as a SQL boolean expression, pushing literals into `params`
    pub fn to_sql(&self, params: &mut SqlParams) -> String {
        match self {
            Predicate::Compare { field, op, value } => {
                let placeholder = params.push(value.to_json());
                coalesce(
                    format!("{} {} {}", quote_ident(&field.column), op.as_sql(), placeholder),
                    op.on_null(),
                )
            }
            Predicate::Like {
                field,
                kind,
                needle,
                negated,
            } => {
                let placeholder = params.push(serde_json::Value::String(kind.pattern(needle)));
                let keyword = if *negated { "NOT LIKE" } else { "LIKE" };
                coalesce(
                    format!(
                        "{} {} {} ESCAPE '\\'",
                        quote_ident(&field.column),
                        keyword,
                        placeholder
                    ),
                    *negated,
                )
            }
            Predicate::InSet {
                field,
                values,
                negated,
            } => {
                let placeholders: Vec<String> =
                    values.iter().map(|v| params.push(v.to_json())).collect();
                let keyword = if *negated { "NOT IN" } else { "IN" };
                coalesce(
                    format!(
                        "{} {} ({})",
                        quote_ident(&field.column),
                        keyword,
                        placeholders.join(", ")
                    ),
                    *negated,
                )
            }
            Predicate::IsNull { field, negated } => {
                let keyword = if *negated { "IS NOT NULL" } else { "IS NULL" };
                format!("{} {}", quote_ident(&field.column), keyword)
            }
            Predicate::And(left, right) => {
                format!("({} AND {})", left.to_sql(params), right.to_sql(params))
            }
            Predicate::Or(left, right) => {
                format!("({} OR {})", left.to_sql(params), right.to_sql(params))
            }
            Predicate::Not(inner) => format!("NOT {}", wrap(inner.to_sql(params))),
        }
    }

    /// Number of leaves, for logging
    pub fn leaf_count(&self) -> usize {
        match self {
            Predicate::And(l, r) | Predicate::Or(l, r) => l.leaf_count() + r.leaf_count(),
            Predicate::Not(inner) => inner.leaf_count(),
            _ => 1,
        }
    }
}

fn coalesce(expr: String, on_null: bool) -> String {
    let fallback = if on_null { "TRUE" } else { "FALSE" };
    format!("COALESCE({}, {})", expr, fallback)
}

fn wrap(sql: String) -> String {
    if sql.starts_with('(') {
        sql
    } else {
        format!("({})", sql)
    }
}

impl<E> fmt::Debug for Predicate<'_, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::Compare { field, op, value } => f
                .debug_struct("Compare")
                .field("field", &field.name)
                .field("op", op)
                .field("value", value)
                .finish(),
            Predicate::Like {
                field,
                kind,
                needle,
                negated,
            } => f
                .debug_struct("Like")
                .field("field", &field.name)
                .field("kind", kind)
                .field("needle", needle)
                .field("negated", negated)
                .finish(),
            Predicate::InSet {
                field,
                values,
                negated,
            } => f
                .debug_struct("InSet")
                .field("field", &field.name)
                .field("values", values)
                .field("negated", negated)
                .finish(),
            Predicate::IsNull { field, negated } => f
                .debug_struct("IsNull")
                .field("field", &field.name)
                .field("negated", negated)
                .finish(),
            Predicate::And(l, r) => f.debug_tuple("And").field(l).field(r).finish(),
            Predicate::Or(l, r) => f.debug_tuple("Or").field(l).field(r).finish(),
            Predicate::Not(inner) => f.debug_tuple("Not").field(inner).finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldMap, FieldType};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    struct Tool {
        name: Option<String>,
        price: Option<f64>,
    }

    fn tool_map() -> FieldMap<Tool> {
        FieldMap::<Tool>::builder("Tool")
            .field("name", FieldType::String, |t| t.name.clone().into())
            .field("unitPrice", FieldType::Number, |t| t.price.into())
            .build()
    }

    fn tool(name: Option<&str>, price: Option<f64>) -> Tool {
        Tool {
            name: name.map(str::to_string),
            price,
        }
    }

    #[test]
    fn test_compare_renders_coalesced_placeholder() {
        let map = tool_map();
        let price = map.get("unitPrice").unwrap();
        let predicate = Predicate::Compare {
            field: price,
            op: CompareOp::Gt,
            value: Value::Number(5.0),
        };
        let mut params = SqlParams::default();
        assert_eq!(predicate.to_sql(&mut params), "COALESCE(unit_price > $1, FALSE)");
        assert_eq!(params.values, vec![json!(5)]);
    }

    #[test]
    fn test_like_escapes_wildcards() {
        let map = tool_map();
        let predicate = Predicate::Like {
            field: map.get("name").unwrap(),
            kind: LikeKind::StartsWith,
            needle: "50%_off".to_string(),
            negated: true,
        };
        let mut params = SqlParams::default();
        assert_eq!(
            predicate.to_sql(&mut params),
            "COALESCE(name NOT LIKE $1 ESCAPE '\\', TRUE)"
        );
        assert_eq!(params.values, vec![json!("50\\%\\_off%")]);
    }

    #[test]
    fn test_combinators_number_placeholders_in_order() {
        let map = tool_map();
        let name = map.get("name").unwrap();
        let price = map.get("unitPrice").unwrap();
        let predicate = Predicate::InSet {
            field: name,
            values: vec!["a".into(), "b".into()],
            negated: false,
        }
        .or(Predicate::IsNull {
            field: price,
            negated: true,
        })
        .negate();

        let mut params = SqlParams::default();
        assert_eq!(
            predicate.to_sql(&mut params),
            "NOT (COALESCE(name IN ($1, $2), FALSE) OR unit_price IS NOT NULL)"
        );
        assert_eq!(params.values, vec![json!("a"), json!("b")]);
        assert_eq!(predicate.leaf_count(), 2);
    }

    #[test]
    fn test_null_semantics() {
        let map = tool_map();
        let name = map.get("name").unwrap();
        let price = map.get("unitPrice").unwrap();
        let blank = tool(None, None);

        let eq = Predicate::Compare {
            field: price,
            op: CompareOp::Eq,
            value: Value::Number(1.0),
        };
        let ne = Predicate::Compare {
            field: price,
            op: CompareOp::Ne,
            value: Value::Number(1.0),
        };
        let contains = Predicate::Like {
            field: name,
            kind: LikeKind::Contains,
            needle: "x".to_string(),
            negated: false,
        };
        let not_contains = Predicate::Like {
            field: name,
            kind: LikeKind::Contains,
            needle: "x".to_string(),
            negated: true,
        };
        let not_in = Predicate::InSet {
            field: name,
            values: vec!["x".into()],
            negated: true,
        };

        assert!(!eq.evaluate(&blank));
        assert!(ne.evaluate(&blank));
        assert!(!contains.evaluate(&blank));
        assert!(not_contains.evaluate(&blank));
        assert!(not_in.evaluate(&blank));
        assert!(eq.negate().evaluate(&blank));
    }

    #[test]
    fn test_evaluate_values() {
        let map = tool_map();
        let name = map.get("name").unwrap();
        let price = map.get("unitPrice").unwrap();
        let hammer = tool(Some("Claw hammer"), Some(12.5));

        let range = Predicate::Compare {
            field: price,
            op: CompareOp::Ge,
            value: Value::Number(10.0),
        }
        .and(Predicate::Compare {
            field: price,
            op: CompareOp::Le,
            value: Value::Number(12.5),
        });
        assert!(range.evaluate(&hammer));

        let suffix = Predicate::Like {
            field: name,
            kind: LikeKind::EndsWith,
            needle: "hammer".to_string(),
            negated: false,
        };
        assert!(suffix.evaluate(&hammer));

        let case_sensitive = Predicate::Like {
            field: name,
            kind: LikeKind::StartsWith,
            needle: "claw".to_string(),
            negated: false,
        };
        assert!(!case_sensitive.evaluate(&hammer));
    }
}
