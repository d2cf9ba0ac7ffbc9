//! Field Map: the whitelist of everything a caller may filter, sort, select or
//! include for one entity type.
//!
//! A map is built once through [`FieldMapBuilder`] and never mutated. Names are
//! matched case-insensitively; absence from the map is the only "not allowed"
//! signal.

use std::collections::HashMap;
use std::fmt;

use serde_json::Map;

use super::{FieldType, Value};
use crate::query::ast::SortDirection;
use crate::sql::naming::to_snake_case;

/// Reads a field value out of an entity without reflection
pub type Accessor<E> = fn(&E) -> Value;

/// Projects a related object or collection of an entity onto the given
/// sub-field names (empty = every selectable field of the related entity)
pub type NestedProjector<E> = fn(&E, &[String]) -> serde_json::Value;

/// One whitelisted field
pub struct FieldDef<E> {
    /// Logical (API) name, e.g. `createdAt`
    pub name: &'static str,
    /// Relational column, e.g. `created_at`
    pub column: String,
    /// Document-store field path, e.g. `createdAt`
    pub document_path: &'static str,
    pub field_type: FieldType,
    pub accessor: Accessor<E>,
    pub can_filter: bool,
    pub can_sort: bool,
    pub can_select: bool,
}

impl<E> FieldDef<E> {
    pub fn read(&self, entity: &E) -> Value {
        (self.accessor)(entity)
    }
}

impl<E> fmt::Debug for FieldDef<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDef")
            .field("name", &self.name)
            .field("column", &self.column)
            .field("document_path", &self.document_path)
            .field("field_type", &self.field_type)
            .field("can_filter", &self.can_filter)
            .field("can_sort", &self.can_sort)
            .field("can_select", &self.can_select)
            .finish()
    }
}

/// How an included relation hangs off its parent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncludeKind {
    /// The related table holds a foreign key to the parent's `id`
    HasMany,
    /// The parent holds a foreign key to the related table's `id`
    BelongsTo,
}

/// An allowed include relation
pub struct IncludeDef<E> {
    pub name: &'static str,
    pub kind: IncludeKind,
    /// Related table for HasMany, parent column for BelongsTo
    pub foreign_key: &'static str,
    pub project: NestedProjector<E>,
    related: fn() -> RelatedEntity,
}

/// Relational shape of the entity on the other side of an include
#[derive(Debug, Clone, PartialEq)]
pub struct RelatedEntity {
    pub entity: &'static str,
    pub columns: Vec<String>,
}

impl<E> IncludeDef<E> {
    /// Resolved on demand so that maps may include each other
    pub fn related(&self) -> RelatedEntity {
        (self.related)()
    }
}

fn related_entity<T: Queryable>() -> RelatedEntity {
    let map = T::field_map();
    RelatedEntity {
        entity: map.entity(),
        columns: map.fields().map(|f| f.column.clone()).collect(),
    }
}

impl<E> fmt::Debug for IncludeDef<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IncludeDef")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("foreign_key", &self.foreign_key)
            .finish()
    }
}

/// Entity types that expose a process-wide Field Map
pub trait Queryable: Sized + 'static {
    fn field_map() -> &'static FieldMap<Self>;
}

pub struct FieldMap<E> {
    entity: &'static str,
    fields: Vec<FieldDef<E>>,
    index: HashMap<String, usize>,
    includes: Vec<IncludeDef<E>>,
    include_index: HashMap<String, usize>,
    default_sort: Option<(String, SortDirection)>,
}

impl<E> FieldMap<E> {
    pub fn builder(entity: &'static str) -> FieldMapBuilder<E> {
        FieldMapBuilder {
            entity,
            fields: Vec::new(),
            includes: Vec::new(),
            default_sort: None,
        }
    }

    /// Entity name, e.g. `Asset`
    pub fn entity(&self) -> &'static str {
        self.entity
    }

    pub fn get(&self, name: &str) -> Option<&FieldDef<E>> {
        self.index
            .get(&name.to_lowercase())
            .map(|&i| &self.fields[i])
    }

    pub fn contains_field(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn can_filter(&self, name: &str) -> bool {
        self.get(name).map(|f| f.can_filter).unwrap_or(false)
    }

    pub fn can_sort(&self, name: &str) -> bool {
        self.get(name).map(|f| f.can_sort).unwrap_or(false)
    }

    pub fn can_select(&self, name: &str) -> bool {
        self.get(name).map(|f| f.can_select).unwrap_or(false)
    }

    /// Fields in registration order
    pub fn fields(&self) -> impl Iterator<Item = &FieldDef<E>> {
        self.fields.iter()
    }

    pub fn include(&self, name: &str) -> Option<&IncludeDef<E>> {
        self.include_index
            .get(&name.to_lowercase())
            .map(|&i| &self.includes[i])
    }

    pub fn includes(&self) -> impl Iterator<Item = &IncludeDef<E>> {
        self.includes.iter()
    }

    /// The fallback ordering used when a caller gives no usable sort key
    pub fn default_sort(&self) -> Option<(&FieldDef<E>, SortDirection)> {
        let (name, direction) = self.default_sort.as_ref()?;
        self.get(name).map(|field| (field, *direction))
    }

    /// Render an entity as a document keyed by document paths
    pub fn to_document(&self, entity: &E) -> serde_json::Value {
        let mut doc = Map::new();
        for field in &self.fields {
            doc.insert(
                field.document_path.to_string(),
                field.read(entity).to_document(),
            );
        }
        serde_json::Value::Object(doc)
    }
}

impl<E> fmt::Debug for FieldMap<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldMap")
            .field("entity", &self.entity)
            .field("fields", &self.fields)
            .field("includes", &self.includes)
            .field("default_sort", &self.default_sort)
            .finish()
    }
}

pub struct FieldMapBuilder<E> {
    entity: &'static str,
    fields: Vec<FieldDef<E>>,
    includes: Vec<IncludeDef<E>>,
    default_sort: Option<(String, SortDirection)>,
}

impl<E> FieldMapBuilder<E> {
    /// Register a field that can be filtered, sorted and selected.
    /// Column defaults to the snake_case name, document path to the name itself.
    pub fn field(mut self, name: &'static str, field_type: FieldType, accessor: Accessor<E>) -> Self {
        self.fields.push(FieldDef {
            name,
            column: to_snake_case(name),
            document_path: name,
            field_type,
            accessor,
            can_filter: true,
            can_sort: true,
            can_select: true,
        });
        self
    }

    /// Override the column of the last registered field
    pub fn column(mut self, column: &str) -> Self {
        if let Some(field) = self.fields.last_mut() {
            field.column = column.to_string();
        }
        self
    }

    /// Override the document path of the last registered field
    pub fn document_path(mut self, path: &'static str) -> Self {
        if let Some(field) = self.fields.last_mut() {
            field.document_path = path;
        }
        self
    }

    pub fn not_filterable(mut self) -> Self {
        if let Some(field) = self.fields.last_mut() {
            field.can_filter = false;
        }
        self
    }

    pub fn not_sortable(mut self) -> Self {
        if let Some(field) = self.fields.last_mut() {
            field.can_sort = false;
        }
        self
    }

    pub fn not_selectable(mut self) -> Self {
        if let Some(field) = self.fields.last_mut() {
            field.can_select = false;
        }
        self
    }

    /// Register an include. `T` is the related entity; its map is only
    /// consulted when a query actually asks for the relation.
    pub fn include<T: Queryable>(
        mut self,
        name: &'static str,
        kind: IncludeKind,
        foreign_key: &'static str,
        project: NestedProjector<E>,
    ) -> Self {
        self.includes.push(IncludeDef {
            name,
            kind,
            foreign_key,
            project,
            related: related_entity::<T>,
        });
        self
    }

    pub fn default_sort(mut self, name: &str, direction: SortDirection) -> Self {
        self.default_sort = Some((name.to_string(), direction));
        self
    }

    /// Later registrations of the same name (case-insensitive) replace earlier ones
    pub fn build(self) -> FieldMap<E> {
        let mut fields: Vec<FieldDef<E>> = Vec::with_capacity(self.fields.len());
        let mut index = HashMap::new();
        for field in self.fields {
            let key = field.name.to_lowercase();
            match index.get(&key) {
                Some(&i) => fields[i] = field,
                None => {
                    index.insert(key, fields.len());
                    fields.push(field);
                }
            }
        }

        let mut includes: Vec<IncludeDef<E>> = Vec::with_capacity(self.includes.len());
        let mut include_index = HashMap::new();
        for include in self.includes {
            let key = include.name.to_lowercase();
            match include_index.get(&key) {
                Some(&i) => includes[i] = include,
                None => {
                    include_index.insert(key, includes.len());
                    includes.push(include);
                }
            }
        }

        FieldMap {
            entity: self.entity,
            fields,
            index,
            includes,
            include_index,
            default_sort: self.default_sort,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lazy_static::lazy_static;
    use serde_json::json;

    struct Bin {
        code: String,
    }

    lazy_static! {
        static ref BIN_MAP: FieldMap<Bin> = FieldMap::<Bin>::builder("StorageBin")
            .field("code", FieldType::String, |b| Value::from(&b.code))
            .field("widgetId", FieldType::Guid, |_| Value::Null)
            .build();
    }

    impl Queryable for Bin {
        fn field_map() -> &'static FieldMap<Self> {
            &BIN_MAP
        }
    }

    struct Widget {
        label: String,
        weight: f64,
        secret: bool,
    }

    fn widget_map() -> FieldMap<Widget> {
        FieldMap::<Widget>::builder("Widget")
            .field("label", FieldType::String, |w| Value::from(&w.label))
            .field("weightKg", FieldType::Number, |w| w.weight.into())
            .document_path("weight")
            .not_sortable()
            .field("secret", FieldType::Boolean, |w| w.secret.into())
            .not_filterable()
            .not_selectable()
            .include::<Bin>("bins", IncludeKind::HasMany, "widget_id", |_, _| json!([]))
            .default_sort("label", SortDirection::Asc)
            .build()
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let map = widget_map();
        assert!(map.contains_field("LABEL"));
        assert!(map.contains_field("weightkg"));
        assert_eq!(map.get("WeightKG").unwrap().name, "weightKg");
        assert!(!map.contains_field("colour"));
    }

    #[test]
    fn test_capabilities() {
        let map = widget_map();
        assert!(map.can_filter("label"));
        assert!(map.can_sort("label"));
        assert!(!map.can_sort("weightKg"));
        assert!(!map.can_filter("secret"));
        assert!(!map.can_select("secret"));
        assert!(!map.can_filter("unknown"));
    }

    #[test]
    fn test_default_column_and_path() {
        let map = widget_map();
        let weight = map.get("weightKg").unwrap();
        assert_eq!(weight.column, "weight_kg");
        assert_eq!(weight.document_path, "weight");
        assert_eq!(map.get("label").unwrap().document_path, "label");
    }

    #[test]
    fn test_default_sort_resolves() {
        let map = widget_map();
        let (field, direction) = map.default_sort().unwrap();
        assert_eq!(field.name, "label");
        assert_eq!(direction, SortDirection::Asc);
    }

    #[test]
    fn test_to_document() {
        let map = widget_map();
        let w = Widget {
            label: "gear".to_string(),
            weight: 1.5,
            secret: true,
        };
        assert_eq!(
            map.to_document(&w),
            json!({ "label": "gear", "weight": 1.5, "secret": true })
        );
    }

    #[test]
    fn test_include_lookup() {
        let map = widget_map();
        let bins = map.include("BINS").unwrap();
        assert_eq!(bins.kind, IncludeKind::HasMany);
        assert_eq!(
            bins.related(),
            RelatedEntity {
                entity: "StorageBin",
                columns: vec!["code".to_string(), "widget_id".to_string()],
            }
        );
        assert!(map.include("drawers").is_none());
    }
}
