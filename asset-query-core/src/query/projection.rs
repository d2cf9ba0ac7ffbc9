//! Field projection: `fields=name,serialNumber,company.name`.
//!
//! The spec is a two-level tree. Top-level names are fields or include
//! relations of the entity; `relation.field` narrows a relation to some of
//! its fields. Names that are not selectable are skipped silently.

use serde_json::Map;

use super::include::IncludeSet;
use crate::schema::FieldMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectionEntry {
    pub name: String,
    /// Sub-fields requested through `name.field`
    pub fields: Vec<String>,
    /// Set when `name` was also given on its own, which selects everything
    pub whole: bool,
}

impl ProjectionEntry {
    /// Sub-field selection handed to a nested projector; empty means all
    fn selection(&self) -> &[String] {
        if self.whole {
            &[]
        } else {
            &self.fields
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectionTree {
    entries: Vec<ProjectionEntry>,
}

impl ProjectionTree {
    /// `None` for an absent or blank spec, meaning "project everything"
    pub fn parse(raw: Option<&str>) -> Option<Self> {
        let mut tree = ProjectionTree::default();
        for token in raw.unwrap_or_default().split(',').map(str::trim) {
            if token.is_empty() {
                continue;
            }
            let (name, child) = match token.split_once('.') {
                Some((name, child)) => (name.trim(), Some(child.trim())),
                None => (token, None),
            };
            if name.is_empty() {
                continue;
            }

            let entry = match tree
                .entries
                .iter()
                .position(|e| e.name.eq_ignore_ascii_case(name))
            {
                Some(i) => &mut tree.entries[i],
                None => {
                    tree.entries.push(ProjectionEntry {
                        name: name.to_string(),
                        fields: Vec::new(),
                        whole: false,
                    });
                    let last = tree.entries.len() - 1;
                    &mut tree.entries[last]
                }
            };

            match child {
                Some(child) if !child.is_empty() => {
                    if !entry.fields.iter().any(|f| f.eq_ignore_ascii_case(child)) {
                        entry.fields.push(child.to_string());
                    }
                }
                Some(_) => {}
                None => entry.whole = true,
            }
        }

        if tree.entries.is_empty() {
            None
        } else {
            Some(tree)
        }
    }

    pub fn entries(&self) -> &[ProjectionEntry] {
        &self.entries
    }

    fn entry(&self, name: &str) -> Option<&ProjectionEntry> {
        self.entries.iter().find(|e| e.name.eq_ignore_ascii_case(name))
    }
}

/// Project one entity.
///
/// Without a tree every selectable field is emitted. Included relations are
/// always emitted; a relation named in the tree is emitted even when it was
/// not included.
pub fn project_one<E>(
    entity: &E,
    map: &FieldMap<E>,
    tree: Option<&ProjectionTree>,
    includes: &IncludeSet,
) -> serde_json::Value {
    let mut out = Map::new();

    match tree {
        None => {
            for field in map.fields().filter(|f| f.can_select) {
                out.insert(field.name.to_string(), field.read(entity).to_json());
            }
        }
        Some(tree) => {
            for entry in tree.entries() {
                if !entry.whole {
                    continue;
                }
                if let Some(field) = map.get(&entry.name).filter(|f| f.can_select) {
                    out.insert(field.name.to_string(), field.read(entity).to_json());
                }
            }
        }
    }

    for include in map.includes() {
        let entry = tree.and_then(|t| t.entry(include.name));
        if entry.is_none() && !includes.contains(include.name) {
            continue;
        }
        let selection = entry.map(ProjectionEntry::selection).unwrap_or(&[]);
        out.insert(include.name.to_string(), (include.project)(entity, selection));
    }

    serde_json::Value::Object(out)
}

pub fn project_many<E>(
    items: &[E],
    map: &FieldMap<E>,
    tree: Option<&ProjectionTree>,
    includes: &IncludeSet,
) -> Vec<serde_json::Value> {
    items
        .iter()
        .map(|item| project_one(item, map, tree, includes))
        .collect()
}

/// Selectable fields of a related entity; an empty selection means all.
/// Nested projectors use this so relations follow the same whitelist.
pub fn select_fields<T>(entity: &T, map: &FieldMap<T>, selection: &[String]) -> serde_json::Value {
    let mut out = Map::new();
    if selection.is_empty() {
        for field in map.fields().filter(|f| f.can_select) {
            out.insert(field.name.to_string(), field.read(entity).to_json());
        }
    } else {
        for name in selection {
            if let Some(field) = map.get(name).filter(|f| f.can_select) {
                out.insert(field.name.to_string(), field.read(entity).to_json());
            }
        }
    }
    serde_json::Value::Object(out)
}
