use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{project_collection, project_related, Asset, Organization};
use crate::query::ast::SortDirection;
use crate::schema::{FieldMap, FieldType, IncludeKind, Queryable, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Company {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub name: String,
    pub tax_id: Option<String>,
    pub email: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub assets: Vec<Asset>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization: Option<Box<Organization>>,
}

impl Company {
    pub fn new(organization_id: Uuid, name: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            organization_id,
            name: name.to_string(),
            tax_id: None,
            email: None,
            is_active: true,
            created_at: Utc::now(),
            assets: Vec::new(),
            organization: None,
        }
    }
}

lazy_static! {
    static ref COMPANY_FIELDS: FieldMap<Company> = FieldMap::<Company>::builder("Company")
        .field("id", FieldType::Guid, |c| c.id.into())
        .document_path("_id")
        .field("organizationId", FieldType::Guid, |c| c.organization_id.into())
        .field("name", FieldType::String, |c| Value::from(&c.name))
        .field("taxId", FieldType::String, |c| c.tax_id.clone().into())
        .field("email", FieldType::String, |c| c.email.clone().into())
        .not_sortable()
        .field("isActive", FieldType::Boolean, |c| c.is_active.into())
        .field("createdAt", FieldType::DateTime, |c| c.created_at.into())
        .include::<Asset>("assets", IncludeKind::HasMany, "company_id", |c, selection| {
            project_collection(&c.assets, selection)
        })
        .include::<Organization>(
            "organization",
            IncludeKind::BelongsTo,
            "organization_id",
            |c, selection| project_related(c.organization.as_deref(), selection),
        )
        .default_sort("createdAt", SortDirection::Desc)
        .build();
}

impl Queryable for Company {
    fn field_map() -> &'static FieldMap<Self> {
        &COMPANY_FIELDS
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{project_one, IncludeSet, ProjectionTree};
    use serde_json::json;

    #[test]
    fn test_assets_include_projects_collection() {
        let mut company = Company::new(Uuid::nil(), "Acme");
        company.assets.push(Asset::new(company.id, "Lathe"));
        company.assets.push(Asset::new(company.id, "Drill"));

        let map = Company::field_map();
        let tree = ProjectionTree::parse(Some("name,assets.name")).unwrap();
        let projected = project_one(&company, map, Some(&tree), &IncludeSet::default());
        assert_eq!(
            projected,
            json!({ "name": "Acme", "assets": [{ "name": "Lathe" }, { "name": "Drill" }] })
        );
    }

    #[test]
    fn test_missing_relation_projects_null() {
        let company = Company::new(Uuid::nil(), "Acme");
        let map = Company::field_map();
        let includes = IncludeSet::parse(Some("organization"), map);
        let projected = project_one(&company, map, None, &includes);
        assert_eq!(projected["organization"], json!(null));
    }
}
