use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::schema::{parse_datetime, FieldType, Value};

/// Shape-based type of a literal, assigned by the parser
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LiteralType {
    String,
    Number,
    Boolean,
    DateTime,
    /// Bare word or GUID-shaped token; its type comes from the field it meets
    Identifier,
}

/// Logical and comparison operators of a binary node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    And,
    Or,
    Eq,  // ==
    Ne,  // !=
    Gt,  // >
    Ge,  // >=
    Lt,  // <
    Le,  // <=
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    Not,
}

/// Call-style operators: `field op (args)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallOp {
    Contains,
    NotContains,
    StartsWith,
    EndsWith,
    In,
    NotIn,
    Between,
    IsNull,
    IsNotNull,
}

/// Which field types an operator may be applied to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorClass {
    /// and / or / not
    Logical,
    /// @contains, not @contains, @startswith, @endswith
    StringOnly,
    /// >, >=, <, <=, between
    Ordering,
    /// ==, !=, in, not in, is null, is not null
    Any,
}

impl OperatorClass {
    pub fn permits(&self, field_type: FieldType) -> bool {
        match self {
            OperatorClass::Logical => true,
            OperatorClass::StringOnly => field_type == FieldType::String,
            OperatorClass::Ordering => field_type.is_ordered(),
            OperatorClass::Any => true,
        }
    }
}

impl BinaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
        }
    }

    pub fn class(&self) -> OperatorClass {
        match self {
            BinaryOp::And | BinaryOp::Or => OperatorClass::Logical,
            BinaryOp::Eq | BinaryOp::Ne => OperatorClass::Any,
            BinaryOp::Gt | BinaryOp::Ge | BinaryOp::Lt | BinaryOp::Le => OperatorClass::Ordering,
        }
    }

    pub fn is_logical(&self) -> bool {
        self.class() == OperatorClass::Logical
    }
}

impl CallOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            CallOp::Contains => "@contains",
            CallOp::NotContains => "not @contains",
            CallOp::StartsWith => "@startswith",
            CallOp::EndsWith => "@endswith",
            CallOp::In => "in",
            CallOp::NotIn => "not in",
            CallOp::Between => "between",
            CallOp::IsNull => "is null",
            CallOp::IsNotNull => "is not null",
        }
    }

    pub fn class(&self) -> OperatorClass {
        match self {
            CallOp::Contains | CallOp::NotContains | CallOp::StartsWith | CallOp::EndsWith => {
                OperatorClass::StringOnly
            }
            CallOp::Between => OperatorClass::Ordering,
            CallOp::In | CallOp::NotIn | CallOp::IsNull | CallOp::IsNotNull => OperatorClass::Any,
        }
    }

    /// Accepted argument count as (min, max)
    pub fn arity(&self) -> (usize, Option<usize>) {
        match self {
            CallOp::Contains | CallOp::NotContains | CallOp::StartsWith | CallOp::EndsWith => {
                (1, Some(1))
            }
            CallOp::In | CallOp::NotIn => (1, None),
            CallOp::Between => (2, Some(2)),
            CallOp::IsNull | CallOp::IsNotNull => (0, Some(0)),
        }
    }
}

/// Every comparison operator of the language, in catalogue order
pub const COMPARISON_OPERATORS: &[(&str, OperatorClass)] = &[
    ("==", OperatorClass::Any),
    ("!=", OperatorClass::Any),
    (">", OperatorClass::Ordering),
    (">=", OperatorClass::Ordering),
    ("<", OperatorClass::Ordering),
    ("<=", OperatorClass::Ordering),
    ("between", OperatorClass::Ordering),
    ("in", OperatorClass::Any),
    ("not in", OperatorClass::Any),
    ("is null", OperatorClass::Any),
    ("is not null", OperatorClass::Any),
    ("@contains", OperatorClass::StringOnly),
    ("not @contains", OperatorClass::StringOnly),
    ("@startswith", OperatorClass::StringOnly),
    ("@endswith", OperatorClass::StringOnly),
];

/// Operators a field of the given type accepts
pub fn operators_for(field_type: FieldType) -> Vec<&'static str> {
    COMPARISON_OPERATORS
        .iter()
        .filter(|(_, class)| class.permits(field_type))
        .map(|(symbol, _)| *symbol)
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiteralNode {
    /// Source text; quoted strings are already unescaped
    pub value: String,
    pub declared_type: LiteralType,
}

impl LiteralNode {
    /// Resolve the literal against the type of the field it is compared with.
    /// `None` means the literal cannot stand for a value of that type.
    pub fn resolve(&self, field_type: FieldType) -> Option<Value> {
        match (field_type, self.declared_type) {
            (FieldType::String, LiteralType::String | LiteralType::Identifier) => {
                Some(Value::String(self.value.clone()))
            }
            (FieldType::Number, LiteralType::Number) => self
                .value
                .parse::<f64>()
                .ok()
                .filter(|n| n.is_finite())
                .map(Value::Number),
            (FieldType::Boolean, LiteralType::Boolean) => {
                Some(Value::Boolean(self.value.eq_ignore_ascii_case("true")))
            }
            (FieldType::DateTime, LiteralType::DateTime | LiteralType::String) => {
                parse_datetime(&self.value).map(Value::DateTime)
            }
            (FieldType::Guid, LiteralType::Identifier | LiteralType::String) => {
                Uuid::parse_str(&self.value).ok().map(Value::Guid)
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldNode {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnaryNode {
    pub operator: UnaryOp,
    pub operand: Box<FilterNode>,
    pub depth: usize,
    pub cost: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinaryNode {
    pub operator: BinaryOp,
    pub left: Box<FilterNode>,
    pub right: Box<FilterNode>,
    pub depth: usize,
    pub cost: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallNode {
    pub operator: CallOp,
    pub target: Box<FilterNode>,
    pub arguments: Vec<FilterNode>,
    pub depth: usize,
    pub cost: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupNode {
    pub expression: Box<FilterNode>,
    pub depth: usize,
    pub cost: usize,
}

/// Filter AST. Built once per filter string, read-only afterwards.
///
/// Depth: leaves are 1, operators take the deepest child, a group adds one.
/// The root depth is therefore one more than the deepest parenthesis nesting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FilterNode {
    Literal(LiteralNode),
    Field(FieldNode),
    Unary(UnaryNode),
    Binary(BinaryNode),
    Call(CallNode),
    Group(GroupNode),
}

impl FilterNode {
    pub fn literal(value: impl Into<String>, declared_type: LiteralType) -> Self {
        FilterNode::Literal(LiteralNode {
            value: value.into(),
            declared_type,
        })
    }

    pub fn field(name: impl Into<String>) -> Self {
        FilterNode::Field(FieldNode { name: name.into() })
    }

    pub fn unary(operator: UnaryOp, operand: FilterNode) -> Self {
        let depth = operand.depth();
        let cost = operand.cost() + 1;
        FilterNode::Unary(UnaryNode {
            operator,
            operand: Box::new(operand),
            depth,
            cost,
        })
    }

    pub fn binary(operator: BinaryOp, left: FilterNode, right: FilterNode) -> Self {
        let depth = left.depth().max(right.depth());
        let cost = left.cost() + right.cost() + 1;
        FilterNode::Binary(BinaryNode {
            operator,
            left: Box::new(left),
            right: Box::new(right),
            depth,
            cost,
        })
    }

    pub fn call(operator: CallOp, target: FilterNode, arguments: Vec<FilterNode>) -> Self {
        let depth = arguments
            .iter()
            .map(FilterNode::depth)
            .fold(target.depth(), usize::max);
        let cost = arguments.iter().map(FilterNode::cost).sum::<usize>() + target.cost() + 1;
        FilterNode::Call(CallNode {
            operator,
            target: Box::new(target),
            arguments,
            depth,
            cost,
        })
    }

    pub fn group(expression: FilterNode) -> Self {
        let depth = expression.depth() + 1;
        let cost = expression.cost() + 1;
        FilterNode::Group(GroupNode {
            expression: Box::new(expression),
            depth,
            cost,
        })
    }

    pub fn depth(&self) -> usize {
        match self {
            FilterNode::Literal(_) | FilterNode::Field(_) => 1,
            FilterNode::Unary(n) => n.depth,
            FilterNode::Binary(n) => n.depth,
            FilterNode::Call(n) => n.depth,
            FilterNode::Group(n) => n.depth,
        }
    }

    /// Number of operator nodes (unary, binary, call, group) in the tree,
    /// counted as the tree is built. Literals and field references carry no
    /// cost of their own.
    pub fn cost(&self) -> usize {
        match self {
            FilterNode::Literal(_) | FilterNode::Field(_) => 0,
            FilterNode::Unary(n) => n.cost,
            FilterNode::Binary(n) => n.cost,
            FilterNode::Call(n) => n.cost,
            FilterNode::Group(n) => n.cost,
        }
    }

    /// Fields referenced anywhere in the tree, in source order
    pub fn referenced_fields(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.collect_fields(&mut names);
        names
    }

    fn collect_fields<'a>(&'a self, names: &mut Vec<&'a str>) {
        match self {
            FilterNode::Literal(_) => {}
            FilterNode::Field(f) => names.push(f.name.as_str()),
            FilterNode::Unary(n) => n.operand.collect_fields(names),
            FilterNode::Binary(n) => {
                n.left.collect_fields(names);
                n.right.collect_fields(names);
            }
            FilterNode::Call(n) => {
                n.target.collect_fields(names);
                for arg in &n.arguments {
                    arg.collect_fields(names);
                }
            }
            FilterNode::Group(n) => n.expression.collect_fields(names),
        }
    }
}

impl fmt::Display for FilterNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterNode::Literal(lit) => match lit.declared_type {
                LiteralType::String => write!(f, "'{}'", lit.value.replace('\\', "\\\\").replace('\'', "\\'")),
                _ => f.write_str(&lit.value),
            },
            FilterNode::Field(field) => f.write_str(&field.name),
            FilterNode::Unary(n) => match n.operator {
                UnaryOp::Not => write!(f, "not {}", n.operand),
            },
            FilterNode::Binary(n) => write!(f, "{} {} {}", n.left, n.operator.symbol(), n.right),
            FilterNode::Call(n) => {
                write!(f, "{} {}", n.target, n.operator.symbol())?;
                if n.arguments.is_empty() {
                    return Ok(());
                }
                let args: Vec<String> = n.arguments.iter().map(|a| a.to_string()).collect();
                write!(f, " ({})", args.join(", "))
            }
            FilterNode::Group(n) => write!(f, "({})", n.expression),
        }
    }
}
