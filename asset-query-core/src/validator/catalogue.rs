//! Caller-facing description of what a Field Map lets you filter on.

use serde::Serialize;

use crate::error::{FilterError, InvalidFilter};
use crate::query::filter::operators_for;
use crate::schema::{FieldDef, FieldMap, FieldType};

const MAX_EXAMPLES: usize = 3;

/// One filterable field with the operators it accepts
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDescription {
    pub name: String,
    pub field_type: FieldType,
    pub operators: Vec<&'static str>,
}

/// Every filterable field of the map, in registration order
pub fn describe_fields<E>(map: &FieldMap<E>) -> Vec<FieldDescription> {
    map.fields()
        .filter(|f| f.can_filter)
        .map(|f| FieldDescription {
            name: f.name.to_string(),
            field_type: f.field_type,
            operators: operators_for(f.field_type),
        })
        .collect()
}

/// Wrap a filter error with the field catalogue and a few working examples
pub fn invalid_filter<E>(error: FilterError, map: &FieldMap<E>) -> InvalidFilter {
    let mut message = error.to_string();

    let fields = describe_fields(map);
    if fields.is_empty() {
        message.push_str(&format!("\n{} has no filterable fields.", map.entity()));
    } else {
        message.push_str(&format!("\nFilterable fields for {}:", map.entity()));
        for field in &fields {
            message.push_str(&format!(
                "\n  {} ({}): {}",
                field.name,
                field.field_type,
                field.operators.join(", ")
            ));
        }

        let examples = examples(map);
        if !examples.is_empty() {
            message.push_str("\nExamples:");
            for example in examples {
                message.push_str("\n  ");
                message.push_str(&example);
            }
        }
    }

    InvalidFilter { error, message }
}

/// Pick fields of distinct types so the examples show different operators
fn examples<E>(map: &FieldMap<E>) -> Vec<String> {
    let mut seen = Vec::new();
    let mut out = Vec::new();
    for field in map.fields().filter(|f| f.can_filter) {
        if out.len() == MAX_EXAMPLES {
            break;
        }
        if seen.contains(&field.field_type) {
            continue;
        }
        seen.push(field.field_type);
        out.push(example_for(field));
    }
    out
}

fn example_for<E>(field: &FieldDef<E>) -> String {
    let name = field.name;
    match field.field_type {
        FieldType::String => format!("{} @contains 'value'", name),
        FieldType::Number => format!("{} >= 10", name),
        FieldType::Boolean => format!("{} == true", name),
        FieldType::DateTime => format!("{} > 2024-01-01", name),
        FieldType::Guid => format!("{} == 3fa85f64-5717-4562-b3fc-2c963f66afa6", name),
    }
}
