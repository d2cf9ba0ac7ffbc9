use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{project_related, Company};
use crate::query::ast::SortDirection;
use crate::schema::{FieldMap, FieldType, IncludeKind, Queryable, Value};

/// A fixed asset owned by a company
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Asset {
    pub id: Uuid,
    pub company_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub serial_number: Option<String>,
    pub category: String,
    pub purchase_price: Option<f64>,
    pub purchase_date: Option<DateTime<Utc>>,
    pub is_active: bool,
    /// Free-text notes for staff; never exposed through queries
    pub internal_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<Company>,
}

impl Asset {
    pub fn new(company_id: Uuid, name: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            company_id,
            name: name.to_string(),
            description: None,
            serial_number: None,
            category: "general".to_string(),
            purchase_price: None,
            purchase_date: None,
            is_active: true,
            internal_notes: None,
            created_at: Utc::now(),
            updated_at: None,
            company: None,
        }
    }
}

lazy_static! {
    static ref ASSET_FIELDS: FieldMap<Asset> = FieldMap::<Asset>::builder("Asset")
        .field("id", FieldType::Guid, |a| a.id.into())
        .document_path("_id")
        .field("companyId", FieldType::Guid, |a| a.company_id.into())
        .field("name", FieldType::String, |a| Value::from(&a.name))
        .field("description", FieldType::String, |a| a.description.clone().into())
        .not_sortable()
        .field("serialNumber", FieldType::String, |a| a.serial_number.clone().into())
        .field("category", FieldType::String, |a| Value::from(&a.category))
        .field("purchasePrice", FieldType::Number, |a| a.purchase_price.into())
        .field("purchaseDate", FieldType::DateTime, |a| a.purchase_date.into())
        .field("isActive", FieldType::Boolean, |a| a.is_active.into())
        .field("internalNotes", FieldType::String, |a| a.internal_notes.clone().into())
        .not_filterable()
        .not_sortable()
        .not_selectable()
        .field("createdAt", FieldType::DateTime, |a| a.created_at.into())
        .field("updatedAt", FieldType::DateTime, |a| a.updated_at.into())
        .include::<Company>("company", IncludeKind::BelongsTo, "company_id", |a, selection| {
            project_related(a.company.as_ref(), selection)
        })
        .default_sort("createdAt", SortDirection::Desc)
        .build();
}

impl Queryable for Asset {
    fn field_map() -> &'static FieldMap<Self> {
        &ASSET_FIELDS
    }
}
