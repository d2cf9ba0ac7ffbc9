//! Sort binder.
//!
//! `name,-createdAt` → name ascending, then createdAt descending. Unknown or
//! non-sortable keys are dropped, never reported. Nulls come first ascending
//! and last descending in every backend.

use std::cmp::Ordering;
use std::fmt;

use serde_json::Map;

use super::ast::SortDirection;
use crate::document::from_document;
use crate::document::lookup_path;
use crate::schema::{FieldDef, FieldMap};
use crate::sql::naming::quote_ident;

pub struct SortKey<'m, E> {
    pub field: &'m FieldDef<E>,
    pub direction: SortDirection,
}

impl<E> Clone for SortKey<'_, E> {
    fn clone(&self) -> Self {
        Self {
            field: self.field,
            direction: self.direction,
        }
    }
}

impl<E> fmt::Debug for SortKey<'_, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SortKey")
            .field("field", &self.field.name)
            .field("direction", &self.direction)
            .finish()
    }
}

pub struct SortPlan<'m, E> {
    keys: Vec<SortKey<'m, E>>,
    /// True when no caller key survived and the map's default was used
    defaulted: bool,
}

impl<'m, E> SortPlan<'m, E> {
    /// Parse a sort spec against a Field Map.
    pub fn parse(raw: Option<&str>, map: &'m FieldMap<E>) -> Self {
        let mut keys: Vec<SortKey<'m, E>> = Vec::new();

        for token in raw.unwrap_or_default().split(',') {
            let token = token.trim();
            if token.is_empty() {
                continue;
            }
            let (name, direction) = match token.as_bytes()[0] {
                b'-' => (token[1..].trim(), SortDirection::Desc),
                b'+' => (token[1..].trim(), SortDirection::Asc),
                _ => (token, SortDirection::Asc),
            };

            let Some(field) = map.get(name).filter(|f| f.can_sort) else {
                tracing::debug!(entity = map.entity(), key = name, "Dropping unknown sort key");
                continue;
            };
            if keys.iter().any(|k| std::ptr::eq(k.field, field)) {
                continue;
            }
            keys.push(SortKey { field, direction });
        }

        if keys.is_empty() {
            if let Some((field, direction)) = map.default_sort() {
                return Self {
                    keys: vec![SortKey { field, direction }],
                    defaulted: true,
                };
            }
        }

        Self {
            keys,
            defaulted: false,
        }
    }

    pub fn keys(&self) -> &[SortKey<'m, E>] {
        &self.keys
    }

    pub fn is_default(&self) -> bool {
        self.defaulted
    }

    pub fn compare(&self, a: &E, b: &E) -> Ordering {
        for key in &self.keys {
            let ordering = key.field.read(a).sort_cmp(&key.field.read(b));
            let ordering = match key.direction {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    }

    /// Stable in-place sort
    pub fn apply(&self, items: &mut [E]) {
        items.sort_by(|a, b| self.compare(a, b));
    }

    /// `ORDER BY` body, e.g. `name ASC NULLS FIRST, created_at DESC NULLS LAST`
    pub fn to_sql(&self) -> String {
        self.keys
            .iter()
            .map(|k| {
                let nulls = match k.direction {
                    SortDirection::Asc => "NULLS FIRST",
                    SortDirection::Desc => "NULLS LAST",
                };
                format!("{} {} {}", quote_ident(&k.field.column), k.direction.as_sql(), nulls)
            })
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Document-store sort spec; key order is priority order
    pub fn to_document(&self) -> serde_json::Value {
        let mut spec = Map::new();
        for key in &self.keys {
            spec.insert(
                key.field.document_path.to_string(),
                key.direction.as_document().into(),
            );
        }
        serde_json::Value::Object(spec)
    }

    /// Order two documents the way the store would with [`Self::to_document`]
    pub fn compare_documents(&self, a: &serde_json::Value, b: &serde_json::Value) -> Ordering {
        for key in &self.keys {
            let path = key.field.document_path;
            let left = from_document(lookup_path(a, path));
            let right = from_document(lookup_path(b, path));
            let ordering = left.sort_cmp(&right);
            let ordering = match key.direction {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    }
}

impl<E> fmt::Debug for SortPlan<'_, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SortPlan")
            .field("keys", &self.keys)
            .field("defaulted", &self.defaulted)
            .finish()
    }
}
