use serde::Serialize;

use super::naming::{entity_to_table, quote_ident};
use super::SqlParams;
use crate::query::CompiledQuery;
use crate::schema::IncludeKind;

/// Result of generating SQL for a compiled query.
/// One logical query produces several statements: the page itself, the
/// total count, and one eager loading query per include.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedSql {
    /// The main SELECT query
    pub main_query: String,
    /// `SELECT COUNT(*)` over the same filter, for the page envelope
    pub count_query: String,
    /// Values for `$1..$n`, shared by the main and count queries
    pub params: Vec<serde_json::Value>,
    pub eager_queries: Vec<EagerQuery>,
}

/// Loads one included relation for a page of parents
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EagerQuery {
    pub relation: String,
    /// Parent column whose values replace `$PARENT_IDS`
    pub parent_column: String,
    pub sql: String,
}

pub const PARENT_IDS: &str = "$PARENT_IDS";

/// Generate SQL for a compiled query
pub fn generate_sql<E>(query: &CompiledQuery<'_, E>) -> GeneratedSql {
    let table = quote_ident(&entity_to_table(query.map.entity()));

    let mut params = SqlParams::default();
    let where_clause = query.predicate.as_ref().map(|p| p.to_sql(&mut params));

    let columns: Vec<String> = query.map.fields().map(|f| quote_ident(&f.column)).collect();

    let main_query = build_main_query(
        &table,
        &columns,
        where_clause.as_deref(),
        &query.sort.to_sql(),
        query.page.limit(),
        query.page.skip(),
    );

    let mut count_query = format!("SELECT COUNT(*)\nFROM {}", table);
    if let Some(where_clause) = &where_clause {
        count_query.push_str(&format!("\nWHERE {}", where_clause));
    }

    let eager_queries = query
        .includes
        .resolve(query.map)
        .into_iter()
        .map(|include| {
            let related = include.related();
            let target_table = quote_ident(&entity_to_table(related.entity));
            let target_columns: Vec<String> = related.columns.iter().map(|c| quote_ident(c)).collect();
            let (key, parent_column) = match include.kind {
                IncludeKind::HasMany => (include.foreign_key, "id"),
                IncludeKind::BelongsTo => ("id", include.foreign_key),
            };
            EagerQuery {
                relation: include.name.to_string(),
                parent_column: parent_column.to_string(),
                sql: format!(
                    "SELECT {}\nFROM {}\nWHERE {} IN ({})",
                    target_columns.join(", "),
                    target_table,
                    quote_ident(key),
                    PARENT_IDS
                ),
            }
        })
        .collect();

    GeneratedSql {
        main_query,
        count_query,
        params: params.values,
        eager_queries,
    }
}

/// Build the main SELECT query
fn build_main_query(
    table: &str,
    columns: &[String],
    where_clause: Option<&str>,
    order_by: &str,
    limit: u64,
    offset: u64,
) -> String {
    let mut parts: Vec<String> = Vec::new();

    parts.push(format!("SELECT {}", columns.join(", ")));
    parts.push(format!("FROM {}", table));

    if let Some(where_clause) = where_clause {
        parts.push(format!("WHERE {}", where_clause));
    }

    if !order_by.is_empty() {
        parts.push(format!("ORDER BY {}", order_by));
    }

    parts.push(format!("LIMIT {}", limit));
    parts.push(format!("OFFSET {}", offset));

    parts.join("\n")
}
