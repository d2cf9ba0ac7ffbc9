use std::collections::BTreeSet;

use crate::schema::{FieldMap, IncludeDef};

/// Canonical set of requested relations: lower-cased, checked against the
/// Field Map's include registry. Unknown names are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IncludeSet {
    names: BTreeSet<String>,
}

impl IncludeSet {
    pub fn parse<E>(raw: Option<&str>, map: &FieldMap<E>) -> Self {
        let mut names = BTreeSet::new();
        for name in raw.unwrap_or_default().split(',').map(str::trim) {
            if name.is_empty() {
                continue;
            }
            if map.include(name).is_some() {
                names.insert(name.to_lowercase());
            } else {
                tracing::debug!(entity = map.entity(), include = name, "Ignoring unknown include");
            }
        }
        Self { names }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(&name.to_lowercase())
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    /// The include definitions, in canonical (alphabetical) order
    pub fn resolve<'m, E>(&self, map: &'m FieldMap<E>) -> Vec<&'m IncludeDef<E>> {
        self.names.iter().filter_map(|n| map.include(n)).collect()
    }
}
