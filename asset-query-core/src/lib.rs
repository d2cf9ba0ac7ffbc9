pub mod config;
pub mod document;
pub mod entities;
pub mod error;
pub mod ffi;
pub mod parser;
pub mod query;
pub mod repository;
pub mod schema;
pub mod sql;
pub mod validator;

pub use config::{FilterLimits, PagingConfig, QueryConfig};
pub use document::{bind_document, DocumentFilter, DocumentQuery};
pub use error::{FilterError, InvalidFilter, QueryError, ValidationError};
pub use parser::parse_filter;
pub use query::{
    check_filter, compile_query, CompiledQuery, FilterNode, IncludeSet, PageRequest, PageResult,
    ProjectionTree, QueryRequest, SortDirection, SortPlan,
};
pub use repository::{run_query, MemoryDocumentStore, MemoryRepository, QuerySource, RepositoryError};
pub use schema::{FieldMap, FieldType, Queryable, Value};
pub use sql::{bind_relational, generate_sql, GeneratedSql, Predicate};
pub use validator::{describe_fields, validate};

// Re-export FFI functions for external use
pub use ffi::{
    asset_query_check_filter,
    asset_query_compile,
    asset_query_describe,
    asset_query_free_string,
    asset_query_version,
    AssetQueryResult,
};
