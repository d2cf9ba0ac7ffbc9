pub mod binder;
pub mod generator;
pub mod naming;
pub mod predicate;

pub use binder::bind_relational;
pub use generator::{generate_sql, EagerQuery, GeneratedSql};
pub use predicate::{CompareOp, LikeKind, Predicate};

/// Collects SQL parameters during rendering, numbered `$1`, `$2`, ... in
/// insertion order
#[derive(Debug, Default, Clone, PartialEq)]
pub struct SqlParams {
    pub values: Vec<serde_json::Value>,
}

impl SqlParams {
    /// Store a value and return its placeholder
    pub fn push(&mut self, value: serde_json::Value) -> String {
        self.values.push(value);
        format!("${}", self.values.len())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Escape `\`, `%` and `_` so a LIKE pattern matches them literally.
/// Use with `ESCAPE '\'`.
pub fn escape_like_pattern(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_placeholders_are_sequential() {
        let mut params = SqlParams::default();
        assert!(params.is_empty());
        assert_eq!(params.push(json!("a")), "$1");
        assert_eq!(params.push(json!(2)), "$2");
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn test_escape_like_pattern() {
        assert_eq!(escape_like_pattern("hello"), "hello");
        assert_eq!(escape_like_pattern("100%"), "100\\%");
        assert_eq!(escape_like_pattern("a_b"), "a\\_b");
        assert_eq!(escape_like_pattern("c:\\tmp"), "c:\\\\tmp");
    }
}
