//! Data-access seam.
//!
//! Real persistence engines live outside this crate; they implement
//! [`QuerySource`] by running the compiled query's SQL or document query.
//! The two in-memory stores here evaluate the compiled forms directly and
//! serve as reference backends.

use std::marker::PhantomData;

use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::config::QueryConfig;
use crate::error::QueryError;
use crate::query::{compile_query, CompiledQuery, PageResult, QueryRequest};
use crate::schema::FieldMap;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RepositoryError {
    #[error("query was cancelled")]
    Cancelled,

    #[error(transparent)]
    Query(#[from] QueryError),
}

/// Something that can produce one page of results for a compiled query
pub trait QuerySource<E> {
    type Item;

    /// Must check `cancel` before materializing results
    fn fetch(
        &self,
        query: &CompiledQuery<'_, E>,
        cancel: &CancellationToken,
    ) -> Result<PageResult<Self::Item>, RepositoryError>;
}

/// Compile a request and run it against a source
pub fn run_query<E, S: QuerySource<E>>(
    source: &S,
    request: &QueryRequest,
    map: &FieldMap<E>,
    config: &QueryConfig,
    cancel: &CancellationToken,
) -> Result<PageResult<S::Item>, RepositoryError> {
    let compiled = compile_query(request, map, config)?;
    source.fetch(&compiled, cancel)
}

fn ensure_live(cancel: &CancellationToken, entity: &str) -> Result<(), RepositoryError> {
    if cancel.is_cancelled() {
        tracing::debug!(entity = entity, "Fetch cancelled");
        return Err(RepositoryError::Cancelled);
    }
    Ok(())
}

/// Row store: filters with the relational predicate, sorts with the sort
/// plan, pages in memory
#[derive(Debug, Clone)]
pub struct MemoryRepository<E> {
    rows: Vec<E>,
}

impl<E> MemoryRepository<E> {
    pub fn new(rows: Vec<E>) -> Self {
        Self { rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl<E: Clone> QuerySource<E> for MemoryRepository<E> {
    type Item = E;

    fn fetch(
        &self,
        query: &CompiledQuery<'_, E>,
        cancel: &CancellationToken,
    ) -> Result<PageResult<E>, RepositoryError> {
        ensure_live(cancel, query.map.entity())?;

        let mut matched: Vec<&E> = self.rows.iter().filter(|row| query.matches(row)).collect();
        matched.sort_by(|a, b| query.sort.compare(a, b));

        let total = matched.len() as u64;
        let items = page_of(matched, query)
            .into_iter()
            .cloned()
            .collect();

        ensure_live(cancel, query.map.entity())?;
        Ok(PageResult::new(items, query.page, total))
    }
}

/// Document store: filters with the document filter, sorts with the
/// document sort spec, pages in memory
#[derive(Debug, Clone)]
pub struct MemoryDocumentStore<E> {
    documents: Vec<serde_json::Value>,
    entity: PhantomData<fn() -> E>,
}

impl<E> MemoryDocumentStore<E> {
    pub fn new(documents: Vec<serde_json::Value>) -> Self {
        Self {
            documents,
            entity: PhantomData,
        }
    }

    /// Load entities through their Field Map's document rendering
    pub fn from_entities(items: &[E], map: &FieldMap<E>) -> Self {
        Self::new(items.iter().map(|item| map.to_document(item)).collect())
    }

    pub fn documents(&self) -> &[serde_json::Value] {
        &self.documents
    }
}

impl<E> QuerySource<E> for MemoryDocumentStore<E> {
    type Item = serde_json::Value;

    fn fetch(
        &self,
        query: &CompiledQuery<'_, E>,
        cancel: &CancellationToken,
    ) -> Result<PageResult<serde_json::Value>, RepositoryError> {
        ensure_live(cancel, query.map.entity())?;

        let mut matched: Vec<&serde_json::Value> = self
            .documents
            .iter()
            .filter(|doc| query.document_filter.matches(doc))
            .collect();
        matched.sort_by(|a, b| query.sort.compare_documents(a, b));

        let total = matched.len() as u64;
        let items = page_of(matched, query)
            .into_iter()
            .cloned()
            .collect();

        ensure_live(cancel, query.map.entity())?;
        Ok(PageResult::new(items, query.page, total))
    }
}

fn page_of<T, E>(items: Vec<T>, query: &CompiledQuery<'_, E>) -> Vec<T> {
    let skip = usize::try_from(query.page.skip()).unwrap_or(usize::MAX);
    let limit = usize::try_from(query.page.limit()).unwrap_or(usize::MAX);
    items.into_iter().skip(skip).take(limit).collect()
}
