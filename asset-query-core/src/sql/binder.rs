//! Relational binder: validated AST → [`Predicate`].

use super::predicate::{CompareOp, LikeKind, Predicate};
use crate::error::FilterError;
use crate::query::filter::{BinaryNode, BinaryOp, CallNode, CallOp, FilterNode, LiteralNode, UnaryOp};
use crate::schema::{FieldDef, FieldMap, Value};

/// Compile a validated filter into a relational predicate.
///
/// Groups are transparent; `between` becomes `>= lo and <= hi`.
pub fn bind_relational<'m, E>(
    node: &FilterNode,
    map: &'m FieldMap<E>,
) -> Result<Predicate<'m, E>, FilterError> {
    match node {
        FilterNode::Group(n) => bind_relational(&n.expression, map),
        FilterNode::Unary(n) => match n.operator {
            UnaryOp::Not => Ok(bind_relational(&n.operand, map)?.negate()),
        },
        FilterNode::Binary(n) => match n.operator {
            BinaryOp::And => Ok(bind_relational(&n.left, map)?.and(bind_relational(&n.right, map)?)),
            BinaryOp::Or => Ok(bind_relational(&n.left, map)?.or(bind_relational(&n.right, map)?)),
            BinaryOp::Eq => compare(n, CompareOp::Eq, map),
            BinaryOp::Ne => compare(n, CompareOp::Ne, map),
            BinaryOp::Gt => compare(n, CompareOp::Gt, map),
            BinaryOp::Ge => compare(n, CompareOp::Ge, map),
            BinaryOp::Lt => compare(n, CompareOp::Lt, map),
            BinaryOp::Le => compare(n, CompareOp::Le, map),
        },
        FilterNode::Call(n) => bind_call(n, map),
        FilterNode::Literal(_) | FilterNode::Field(_) => Err(FilterError::bind(format!(
            "'{}' is not a boolean expression",
            node
        ))),
    }
}

fn bind_call<'m, E>(n: &CallNode, map: &'m FieldMap<E>) -> Result<Predicate<'m, E>, FilterError> {
    let field = resolve_field(&n.target, map)?;
    let values = n
        .arguments
        .iter()
        .map(|arg| resolve_literal(arg, field))
        .collect::<Result<Vec<_>, _>>()?;

    match n.operator {
        CallOp::Contains => like(n, field, &values, LikeKind::Contains, false),
        CallOp::NotContains => like(n, field, &values, LikeKind::Contains, true),
        CallOp::StartsWith => like(n, field, &values, LikeKind::StartsWith, false),
        CallOp::EndsWith => like(n, field, &values, LikeKind::EndsWith, false),
        CallOp::In | CallOp::NotIn => Ok(Predicate::InSet {
            field,
            values,
            negated: n.operator == CallOp::NotIn,
        }),
        CallOp::Between => {
            let [lo, hi]: [Value; 2] = values
                .try_into()
                .map_err(|_| FilterError::bind("'between' needs exactly two bounds"))?;
            Ok(Predicate::Compare {
                field,
                op: CompareOp::Ge,
                value: lo,
            }
            .and(Predicate::Compare {
                field,
                op: CompareOp::Le,
                value: hi,
            }))
        }
        CallOp::IsNull => Ok(Predicate::IsNull {
            field,
            negated: false,
        }),
        CallOp::IsNotNull => Ok(Predicate::IsNull {
            field,
            negated: true,
        }),
    }
}

fn compare<'m, E>(
    n: &BinaryNode,
    op: CompareOp,
    map: &'m FieldMap<E>,
) -> Result<Predicate<'m, E>, FilterError> {
    let field = resolve_field(&n.left, map)?;
    let value = resolve_literal(&n.right, field)?;
    Ok(Predicate::Compare { field, op, value })
}

fn like<'m, E>(
    n: &CallNode,
    field: &'m FieldDef<E>,
    values: &[Value],
    kind: LikeKind,
    negated: bool,
) -> Result<Predicate<'m, E>, FilterError> {
    match values {
        [Value::String(needle)] => Ok(Predicate::Like {
            field,
            kind,
            needle: needle.clone(),
            negated,
        }),
        _ => Err(FilterError::bind(format!(
            "'{}' needs one string argument",
            n.operator.symbol()
        ))),
    }
}

pub(crate) fn resolve_field<'m, E>(
    node: &FilterNode,
    map: &'m FieldMap<E>,
) -> Result<&'m FieldDef<E>, FilterError> {
    match node {
        FilterNode::Field(f) => map
            .get(&f.name)
            .ok_or_else(|| FilterError::bind(format!("unknown field '{}'", f.name))),
        other => Err(FilterError::bind(format!("expected a field, got '{}'", other))),
    }
}

pub(crate) fn resolve_literal<E>(node: &FilterNode, field: &FieldDef<E>) -> Result<Value, FilterError> {
    match node {
        FilterNode::Literal(lit) => coerce(lit, field),
        other => Err(FilterError::bind(format!("expected a literal, got '{}'", other))),
    }
}

fn coerce<E>(lit: &LiteralNode, field: &FieldDef<E>) -> Result<Value, FilterError> {
    lit.resolve(field.field_type).ok_or_else(|| {
        FilterError::bind(format!(
            "'{}' is not a {} value for '{}'",
            lit.value, field.field_type, field.name
        ))
    })
}
