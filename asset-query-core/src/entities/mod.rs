//! Queryable entities of the asset-management domain.
//!
//! Each entity publishes one Field Map, built on first use and shared for
//! the life of the process.

mod asset;
mod company;
mod organization;

pub use asset::Asset;
pub use company::Company;
pub use organization::Organization;

use serde::Serialize;

use crate::schema::{FieldMap, Queryable};

/// Entity names accepted by name-based entry points (FFI), lower-cased
pub const ENTITY_NAMES: &[&str] = &["asset", "company", "organization"];

/// Serialize a related collection through the related entity's own whitelist
pub(crate) fn project_collection<T: Queryable>(items: &[T], selection: &[String]) -> serde_json::Value {
    serde_json::Value::Array(
        items
            .iter()
            .map(|item| crate::query::select_fields(item, T::field_map(), selection))
            .collect(),
    )
}

/// Serialize an optional related object, null when it was not loaded
pub(crate) fn project_related<T: Queryable>(item: Option<&T>, selection: &[String]) -> serde_json::Value {
    item.map(|i| crate::query::select_fields(i, T::field_map(), selection))
        .unwrap_or(serde_json::Value::Null)
}

/// Run `f` with the Field Map of the entity called `name` (case-insensitive)
pub fn with_field_map<R>(name: &str, f: impl EntityVisitor<Output = R>) -> Option<R> {
    match name.to_lowercase().as_str() {
        "asset" | "assets" => Some(f.visit(Asset::field_map())),
        "company" | "companies" => Some(f.visit(Company::field_map())),
        "organization" | "organizations" => Some(f.visit(Organization::field_map())),
        _ => None,
    }
}

/// Generic callback over the entity types, for entry points that only know
/// an entity by name
pub trait EntityVisitor {
    type Output;

    fn visit<E: Queryable + Serialize>(self, map: &'static FieldMap<E>) -> Self::Output;
}
