use thiserror::Error;

use crate::schema::FieldType;

/// Semantic problems found by the validator
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("filter nesting depth {depth} exceeds the maximum of {max}")]
    DepthExceeded { depth: usize, max: usize },

    #[error("filter has {count} operator nodes, the maximum is {max}")]
    TooManyNodes { count: usize, max: usize },

    #[error("filter is {length} characters long, the maximum is {max}")]
    TooLong { length: usize, max: usize },

    #[error("unknown field '{field}'")]
    UnknownField { field: String },

    #[error("field '{field}' cannot be used in a filter")]
    NotFilterable { field: String },

    #[error("operator '{operator}' cannot be applied to {field_type} field '{field}'")]
    OperatorNotAllowed {
        field: String,
        operator: String,
        field_type: FieldType,
    },

    #[error("{literal} is not a valid {field_type} value for field '{field}'")]
    LiteralTypeMismatch {
        field: String,
        literal: String,
        field_type: FieldType,
    },

    #[error("malformed expression '{clause}': {reason}")]
    Malformed { clause: String, reason: String },
}

impl ValidationError {
    /// The field the error is about, if any
    pub fn field(&self) -> Option<&str> {
        match self {
            ValidationError::UnknownField { field }
            | ValidationError::NotFilterable { field }
            | ValidationError::OperatorNotAllowed { field, .. }
            | ValidationError::LiteralTypeMismatch { field, .. } => Some(field),
            _ => None,
        }
    }
}

/// Everything that can go wrong turning filter text into a backend filter
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FilterError {
    #[error("syntax error at position {position} near '{fragment}': {message}")]
    Syntax {
        fragment: String,
        position: usize,
        message: String,
    },

    #[error("invalid filter: {0}")]
    Validation(#[from] ValidationError),

    /// Only reachable when a binder is handed an AST that skipped validation
    #[error("cannot bind filter: {reason}")]
    Bind { reason: String },
}

impl FilterError {
    pub fn kind(&self) -> &'static str {
        match self {
            FilterError::Syntax { .. } => "SyntaxError",
            FilterError::Validation(_) => "ValidationError",
            FilterError::Bind { .. } => "BindError",
        }
    }

    pub(crate) fn bind(reason: impl Into<String>) -> Self {
        FilterError::Bind {
            reason: reason.into(),
        }
    }
}

/// Caller-facing filter failure: the underlying error plus the catalogue of
/// filterable fields and a few usage examples.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{message}")]
pub struct InvalidFilter {
    #[source]
    pub error: FilterError,
    pub message: String,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum QueryError {
    #[error(transparent)]
    InvalidFilter(#[from] InvalidFilter),

    #[error("Unknown entity: {0}")]
    UnknownEntity(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds() {
        let syntax = FilterError::Syntax {
            fragment: ")".to_string(),
            position: 4,
            message: "unexpected token".to_string(),
        };
        assert_eq!(syntax.kind(), "SyntaxError");

        let validation: FilterError = ValidationError::UnknownField {
            field: "secret".to_string(),
        }
        .into();
        assert_eq!(validation.kind(), "ValidationError");
        assert_eq!(validation.to_string(), "invalid filter: unknown field 'secret'");

        assert_eq!(FilterError::bind("x").kind(), "BindError");
    }

    #[test]
    fn test_validation_error_names_field() {
        let err = ValidationError::OperatorNotAllowed {
            field: "age".to_string(),
            operator: "@contains".to_string(),
            field_type: FieldType::Number,
        };
        assert_eq!(err.field(), Some("age"));
        assert_eq!(
            err.to_string(),
            "operator '@contains' cannot be applied to number field 'age'"
        );
    }
}
