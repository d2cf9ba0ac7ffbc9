use serde::{Deserialize, Serialize};

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }

    /// Mongo-style sort value: 1 ascending, -1 descending
    pub fn as_document(&self) -> i32 {
        match self {
            SortDirection::Asc => 1,
            SortDirection::Desc => -1,
        }
    }
}

/// What a caller asks for, straight from the query string.
/// Every field is optional; normalization happens at compile time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QueryRequest {
    /// Filter DSL text, e.g. `isActive == true and name @contains 'pump'`
    pub filter: Option<String>,
    /// Comma-separated sort keys, `-` prefix for descending
    pub sort: Option<String>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
    /// Comma-separated projection, `relation.field` for nested fields
    pub fields: Option<String>,
    /// Comma-separated include names
    pub include: Option<String>,
}

impl QueryRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, filter: &str) -> Self {
        self.filter = Some(filter.to_string());
        self
    }

    pub fn sort(mut self, sort: &str) -> Self {
        self.sort = Some(sort.to_string());
        self
    }

    pub fn page(mut self, page: i64) -> Self {
        self.page = Some(page);
        self
    }

    pub fn page_size(mut self, page_size: i64) -> Self {
        self.page_size = Some(page_size);
        self
    }

    pub fn fields(mut self, fields: &str) -> Self {
        self.fields = Some(fields.to_string());
        self
    }

    pub fn include(mut self, include: &str) -> Self {
        self.include = Some(include.to_string());
        self
    }
}
