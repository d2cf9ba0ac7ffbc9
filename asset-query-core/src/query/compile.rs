use std::fmt;

use super::ast::QueryRequest;
use super::filter::FilterNode;
use super::include::IncludeSet;
use super::paging::PageRequest;
use super::projection::{project_many, ProjectionTree};
use super::sort::SortPlan;
use crate::config::{FilterLimits, QueryConfig};
use crate::document::{bind_document, DocumentFilter, DocumentQuery};
use crate::error::{FilterError, QueryError};
use crate::parser::parse_filter;
use crate::schema::FieldMap;
use crate::sql::{bind_relational, Predicate};
use crate::validator::{check_length, invalid_filter, validate};

/// A request resolved against one entity's Field Map, ready for either
/// backend. Both filter forms are always built, so a filter that binds for
/// one backend is known to bind for the other.
pub struct CompiledQuery<'m, E> {
    pub map: &'m FieldMap<E>,
    pub filter: Option<FilterNode>,
    pub predicate: Option<Predicate<'m, E>>,
    pub document_filter: DocumentFilter,
    pub sort: SortPlan<'m, E>,
    pub includes: IncludeSet,
    pub page: PageRequest,
    pub projection: Option<ProjectionTree>,
}

impl<'m, E> CompiledQuery<'m, E> {
    /// In-memory filter; everything matches when there is no filter
    pub fn matches(&self, entity: &E) -> bool {
        self.predicate.as_ref().map_or(true, |p| p.evaluate(entity))
    }

    pub fn document_query(&self) -> DocumentQuery {
        DocumentQuery {
            filter: self.document_filter.as_json().clone(),
            sort: self.sort.to_document(),
            skip: self.page.skip(),
            limit: self.page.limit(),
        }
    }

    /// Apply the projection and includes to a page of entities
    pub fn project(&self, items: &[E]) -> Vec<serde_json::Value> {
        project_many(items, self.map, self.projection.as_ref(), &self.includes)
    }
}

impl<E> fmt::Debug for CompiledQuery<'_, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledQuery")
            .field("entity", &self.map.entity())
            .field("filter", &self.filter.as_ref().map(|n| n.to_string()))
            .field("predicate", &self.predicate)
            .field("document_filter", &self.document_filter)
            .field("sort", &self.sort)
            .field("includes", &self.includes)
            .field("page", &self.page)
            .field("projection", &self.projection)
            .finish()
    }
}

/// Parse and validate filter text against a Field Map
pub fn check_filter<E>(
    raw: &str,
    map: &FieldMap<E>,
    limits: &FilterLimits,
) -> Result<FilterNode, FilterError> {
    check_length(raw, limits).map_err(|e| {
        tracing::debug!(entity = map.entity(), error = %e, "Filter rejected before parsing");
        e
    })?;
    let node = parse_filter(raw)?;
    validate(&node, map, limits).map_err(|e| {
        tracing::debug!(entity = map.entity(), filter = raw, error = %e, "Filter failed validation");
        e
    })?;
    Ok(node)
}

/// Compile a caller's request.
///
/// Only the filter can fail. Sort keys, include names and projection names
/// that the Field Map does not know are dropped.
pub fn compile_query<'m, E>(
    request: &QueryRequest,
    map: &'m FieldMap<E>,
    config: &QueryConfig,
) -> Result<CompiledQuery<'m, E>, QueryError> {
    let raw_filter = request
        .filter
        .as_deref()
        .map(str::trim)
        .filter(|f| !f.is_empty());

    let (filter, predicate, document_filter) = match raw_filter {
        Some(raw) => {
            let bound = check_filter(raw, map, &config.limits).and_then(|node| {
                let predicate = bind_relational(&node, map)?;
                let document = bind_document(&node, map)?;
                Ok((node, predicate, document))
            });
            match bound {
                Ok((node, predicate, document)) => (Some(node), Some(predicate), document),
                Err(e) => return Err(invalid_filter(e, map).into()),
            }
        }
        None => (None, None, DocumentFilter::match_all()),
    };

    let compiled = CompiledQuery {
        map,
        filter,
        predicate,
        document_filter,
        sort: SortPlan::parse(request.sort.as_deref(), map),
        includes: IncludeSet::parse(request.include.as_deref(), map),
        page: PageRequest::normalize(request.page, request.page_size, &config.paging),
        projection: ProjectionTree::parse(request.fields.as_deref()),
    };

    tracing::debug!(
        entity = map.entity(),
        filter = ?compiled.filter.as_ref().map(|n| n.to_string()),
        predicate_leaves = compiled.predicate.as_ref().map_or(0, Predicate::leaf_count),
        sort = %compiled.sort.to_sql(),
        page = compiled.page.page,
        page_size = compiled.page.page_size,
        "Compiled query"
    );

    Ok(compiled)
}
