//! Semantic checks of a parsed filter against a Field Map.
//!
//! The parser only knows shapes. Everything that depends on the entity
//! (field names, field types, capability flags) is checked here, together
//! with the size bounds that keep compilation cost predictable.

pub mod catalogue;

pub use catalogue::{describe_fields, invalid_filter, FieldDescription};

use crate::config::FilterLimits;
use crate::error::ValidationError;
use crate::query::filter::{BinaryNode, CallNode, FilterNode, LiteralNode, OperatorClass};
use crate::schema::{FieldDef, FieldMap};

/// Validate a filter AST.
///
/// Bounds are checked before anything else so that an oversized tree is
/// rejected without walking the whole field catalogue.
pub fn validate<E>(
    node: &FilterNode,
    map: &FieldMap<E>,
    limits: &FilterLimits,
) -> Result<(), ValidationError> {
    let depth = node.depth();
    if depth > limits.max_depth {
        return Err(ValidationError::DepthExceeded {
            depth,
            max: limits.max_depth,
        });
    }

    let count = node.cost();
    if count > limits.max_nodes {
        return Err(ValidationError::TooManyNodes {
            count,
            max: limits.max_nodes,
        });
    }

    Validator { map }.predicate(node)
}

/// Reject filter text too long to parse. Runs before the parser so that an
/// oversized tree is never built.
pub fn check_length(raw: &str, limits: &FilterLimits) -> Result<(), ValidationError> {
    let length = raw.chars().count();
    if length > limits.max_length {
        return Err(ValidationError::TooLong {
            length,
            max: limits.max_length,
        });
    }
    Ok(())
}

struct Validator<'m, E> {
    map: &'m FieldMap<E>,
}

impl<'m, E> Validator<'m, E> {
    /// A node in boolean position
    fn predicate(&self, node: &FilterNode) -> Result<(), ValidationError> {
        match node {
            FilterNode::Literal(_) | FilterNode::Field(_) => Err(malformed(
                node,
                "expected a comparison or logical expression",
            )),
            FilterNode::Unary(n) => self.predicate(&n.operand),
            FilterNode::Group(n) => self.predicate(&n.expression),
            FilterNode::Binary(n) if n.operator.is_logical() => {
                self.predicate(&n.left)?;
                self.predicate(&n.right)
            }
            FilterNode::Binary(n) => self.comparison(node, n),
            FilterNode::Call(n) => self.call(node, n),
        }
    }

    fn comparison(&self, node: &FilterNode, n: &BinaryNode) -> Result<(), ValidationError> {
        let FilterNode::Field(field) = n.left.as_ref() else {
            return Err(malformed(node, "left side of a comparison must be a field"));
        };
        let FilterNode::Literal(literal) = n.right.as_ref() else {
            return Err(malformed(node, "right side of a comparison must be a literal"));
        };

        let def = self.field(&field.name)?;
        check_operator(def, n.operator.symbol(), n.operator.class())?;
        check_literal(def, literal)
    }

    fn call(&self, node: &FilterNode, n: &CallNode) -> Result<(), ValidationError> {
        let FilterNode::Field(field) = n.target.as_ref() else {
            return Err(malformed(node, "operator target must be a field"));
        };

        let (min, max) = n.operator.arity();
        let count = n.arguments.len();
        if count < min || max.is_some_and(|max| count > max) {
            let expected = match max {
                Some(max) if max == min => format!("exactly {}", min),
                Some(max) => format!("between {} and {}", min, max),
                None => format!("at least {}", min),
            };
            return Err(malformed(
                node,
                &format!(
                    "'{}' takes {} argument(s), got {}",
                    n.operator.symbol(),
                    expected,
                    count
                ),
            ));
        }

        let def = self.field(&field.name)?;
        check_operator(def, n.operator.symbol(), n.operator.class())?;

        for argument in &n.arguments {
            let FilterNode::Literal(literal) = argument else {
                return Err(malformed(node, "operator arguments must be literals"));
            };
            check_literal(def, literal)?;
        }
        Ok(())
    }

    fn field(&self, name: &str) -> Result<&'m FieldDef<E>, ValidationError> {
        let def = self.map.get(name).ok_or_else(|| ValidationError::UnknownField {
            field: name.to_string(),
        })?;
        if !def.can_filter {
            return Err(ValidationError::NotFilterable {
                field: def.name.to_string(),
            });
        }
        Ok(def)
    }
}

fn check_operator<E>(
    def: &FieldDef<E>,
    symbol: &str,
    class: OperatorClass,
) -> Result<(), ValidationError> {
    if class.permits(def.field_type) {
        Ok(())
    } else {
        Err(ValidationError::OperatorNotAllowed {
            field: def.name.to_string(),
            operator: symbol.to_string(),
            field_type: def.field_type,
        })
    }
}

fn check_literal<E>(def: &FieldDef<E>, literal: &LiteralNode) -> Result<(), ValidationError> {
    match literal.resolve(def.field_type) {
        Some(_) => Ok(()),
        None => Err(ValidationError::LiteralTypeMismatch {
            field: def.name.to_string(),
            literal: FilterNode::Literal(literal.clone()).to_string(),
            field_type: def.field_type,
        }),
    }
}

fn malformed(node: &FilterNode, reason: &str) -> ValidationError {
    ValidationError::Malformed {
        clause: node.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_filter;
    use crate::query::filter::{BinaryOp, CallOp, LiteralType, UnaryOp};
    use crate::schema::{FieldType, Value};
    use pretty_assertions::assert_eq;

    struct Item {
        name: String,
        age: f64,
        active: bool,
    }

    fn item_map() -> FieldMap<Item> {
        FieldMap::<Item>::builder("Item")
            .field("name", FieldType::String, |i| Value::from(&i.name))
            .field("age", FieldType::Number, |i| i.age.into())
            .field("isActive", FieldType::Boolean, |i| i.active.into())
            .field("createdAt", FieldType::DateTime, |_| Value::Null)
            .field("id", FieldType::Guid, |_| Value::Null)
            .field("notes", FieldType::String, |_| Value::Null)
            .not_filterable()
            .build()
    }

    fn check(filter: &str) -> Result<(), ValidationError> {
        let node = parse_filter(filter).unwrap();
        validate(&node, &item_map(), &FilterLimits::default())
    }

    /// `n` nested parenthesis pairs around a single comparison
    fn nested(n: usize) -> String {
        format!("{}age > 1{}", "(".repeat(n), ")".repeat(n))
    }

    /// One group around `terms` or-ed comparisons: 2 * terms operator nodes
    fn wide(terms: usize) -> String {
        let body: Vec<String> = (0..terms).map(|i| format!("age == {}", i)).collect();
        format!("({})", body.join(" or "))
    }

    #[test]
    fn test_type_matrix() {
        assert!(check("name @contains 'x'").is_ok());
        assert!(check("age > 5").is_ok());
        assert!(check("createdAt between (2024-01-01, 2024-12-31)").is_ok());
        assert!(check("isActive == true and name in ('a', 'b')").is_ok());
        assert!(check("id == 3fa85f64-5717-4562-b3fc-2c963f66afa6").is_ok());
        assert!(check("id is null or not name @startswith 'x'").is_ok());

        assert_eq!(
            check("age @contains 'x'").unwrap_err(),
            ValidationError::OperatorNotAllowed {
                field: "age".to_string(),
                operator: "@contains".to_string(),
                field_type: FieldType::Number,
            }
        );
        assert!(matches!(
            check("isActive > false"),
            Err(ValidationError::OperatorNotAllowed { .. })
        ));
        assert!(matches!(
            check("name between ('a', 'b')"),
            Err(ValidationError::OperatorNotAllowed { .. })
        ));
    }

    #[test]
    fn test_unknown_field_is_named() {
        let err = check("secret == true").unwrap_err();
        assert_eq!(err.field(), Some("secret"));
        assert!(err.to_string().contains("secret"));
    }

    #[test]
    fn test_field_lookup_ignores_case() {
        assert!(check("NAME == 'x' and ISACTIVE == true").is_ok());
    }

    #[test]
    fn test_not_filterable() {
        assert_eq!(
            check("notes == 'x'").unwrap_err(),
            ValidationError::NotFilterable {
                field: "notes".to_string()
            }
        );
    }

    #[test]
    fn test_literal_mismatch() {
        let err = check("age == 'old'").unwrap_err();
        assert_eq!(
            err,
            ValidationError::LiteralTypeMismatch {
                field: "age".to_string(),
                literal: "'old'".to_string(),
                field_type: FieldType::Number,
            }
        );
        assert!(check("isActive == 1").is_err());
        assert!(check("id == 'not-a-guid'").is_err());
        assert!(check("createdAt > 'yesterday'").is_err());
        assert!(check("age in (1, 'two')").is_err());
    }

    #[test]
    fn test_overflowing_number_is_rejected() {
        let huge = "9".repeat(400);
        for op in ["==", "!=", "<"] {
            let err = check(&format!("age {} {}", op, huge)).unwrap_err();
            assert!(matches!(err, ValidationError::LiteralTypeMismatch { ref field, .. } if field == "age"));
        }
        assert!(check(&format!("age between (1, {})", huge)).is_err());
        assert!(check(&format!("age in (1, {})", huge)).is_err());
    }

    #[test]
    fn test_long_chain_is_counted_without_walking() {
        let chain = vec!["age == 1"; 1_000].join(" and ");
        let node = parse_filter(&chain).unwrap();
        assert_eq!(node.depth(), 1);
        assert_eq!(node.cost(), 1_999);
        let limits = FilterLimits {
            max_length: chain.len(),
            ..FilterLimits::default()
        };
        assert_eq!(
            validate(&node, &item_map(), &limits).unwrap_err(),
            ValidationError::TooManyNodes { count: 1_999, max: 50 }
        );
    }

    #[test]
    fn test_length_limit() {
        let limits = FilterLimits {
            max_length: 10,
            ..FilterLimits::default()
        };
        assert!(check_length("age == 1", &limits).is_ok());
        assert_eq!(
            check_length("name == 'ünïcode'", &limits).unwrap_err(),
            ValidationError::TooLong { length: 17, max: 10 }
        );
    }

    #[test]
    fn test_depth_boundary() {
        assert_eq!(parse_filter(&nested(9)).unwrap().depth(), 10);
        assert!(check(&nested(9)).is_ok());
        assert_eq!(
            check(&nested(10)).unwrap_err(),
            ValidationError::DepthExceeded { depth: 11, max: 10 }
        );
    }

    #[test]
    fn test_node_boundary() {
        assert_eq!(parse_filter(&wide(25)).unwrap().cost(), 50);
        assert!(check(&wide(25)).is_ok());
        assert_eq!(
            check(&wide(26)).unwrap_err(),
            ValidationError::TooManyNodes { count: 52, max: 50 }
        );

        let flat: Vec<String> = (0..26).map(|i| format!("age == {}", i)).collect();
        assert_eq!(
            check(&format!("{} or age == 99", flat.join(" or "))).unwrap_err(),
            ValidationError::TooManyNodes { count: 53, max: 50 }
        );
    }

    #[test]
    fn test_custom_limits() {
        let limits = FilterLimits {
            max_depth: 2,
            max_nodes: 3,
            ..FilterLimits::default()
        };
        let node = parse_filter("((age > 1))").unwrap();
        assert!(matches!(
            validate(&node, &item_map(), &limits),
            Err(ValidationError::DepthExceeded { depth: 3, max: 2 })
        ));
    }

    #[test]
    fn test_hand_built_malformed_trees() {
        let map = item_map();
        let limits = FilterLimits::default();

        // logical operator over a bare field
        let node = FilterNode::binary(
            BinaryOp::And,
            FilterNode::field("isActive"),
            FilterNode::field("name"),
        );
        assert!(matches!(
            validate(&node, &map, &limits),
            Err(ValidationError::Malformed { .. })
        ));

        // comparison between two literals
        let node = FilterNode::binary(
            BinaryOp::Eq,
            FilterNode::literal("1", LiteralType::Number),
            FilterNode::literal("1", LiteralType::Number),
        );
        assert!(matches!(
            validate(&node, &map, &limits),
            Err(ValidationError::Malformed { .. })
        ));

        // between with a single bound
        let node = FilterNode::call(
            CallOp::Between,
            FilterNode::field("age"),
            vec![FilterNode::literal("1", LiteralType::Number)],
        );
        let err = validate(&node, &map, &limits).unwrap_err();
        assert_eq!(
            err,
            ValidationError::Malformed {
                clause: "age between (1)".to_string(),
                reason: "'between' takes exactly 2 argument(s), got 1".to_string(),
            }
        );

        // negated literal
        let node = FilterNode::unary(UnaryOp::Not, FilterNode::literal("true", LiteralType::Boolean));
        assert!(matches!(
            validate(&node, &map, &limits),
            Err(ValidationError::Malformed { .. })
        ));
    }
}
