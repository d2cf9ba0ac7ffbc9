use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{project_collection, Company};
use crate::query::ast::SortDirection;
use crate::schema::{FieldMap, FieldType, IncludeKind, Queryable, Value};

/// Top of the ownership tree: organizations own companies, companies own assets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Organization {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub companies: Vec<Company>,
}

impl Organization {
    pub fn new(name: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: None,
            is_active: true,
            created_at: Utc::now(),
            companies: Vec::new(),
        }
    }
}

lazy_static! {
    static ref ORGANIZATION_FIELDS: FieldMap<Organization> = FieldMap::<Organization>::builder("Organization")
        .field("id", FieldType::Guid, |o| o.id.into())
        .document_path("_id")
        .field("name", FieldType::String, |o| Value::from(&o.name))
        .field("description", FieldType::String, |o| o.description.clone().into())
        .not_sortable()
        .field("isActive", FieldType::Boolean, |o| o.is_active.into())
        .field("createdAt", FieldType::DateTime, |o| o.created_at.into())
        .include::<Company>("companies", IncludeKind::HasMany, "organization_id", |o, selection| {
            project_collection(&o.companies, selection)
        })
        .default_sort("createdAt", SortDirection::Desc)
        .build();
}

impl Queryable for Organization {
    fn field_map() -> &'static FieldMap<Self> {
        &ORGANIZATION_FIELDS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_map_shape() {
        let map = Organization::field_map();
        assert_eq!(map.fields().count(), 5);
        assert!(map.can_filter("NAME"));
        assert!(!map.can_sort("description"));
        let companies = map.include("companies").unwrap();
        assert_eq!(companies.kind, IncludeKind::HasMany);
        assert_eq!(companies.related().entity, "Company");
    }
}
