//! Query execution against the engine.

use std::sync::Arc;

use crate::engine::response::RawResponse;
use crate::engine::{EngineRequest, SearchEngine};
use crate::error::Result;
use crate::query::CompiledQuery;

/// Largest page a single round trip may request.
///
/// Sizes above this are clamped rather than rejected; callers needing the
/// full match set page through it.
pub const MAX_PAGE_SIZE: usize = 10_000;

/// Sentinel size meaning "all matches".
///
/// Handled as one bounded fetch of [`MAX_PAGE_SIZE`], never as a literal
/// unbounded request to the engine.
pub const FETCH_ALL: usize = usize::MAX;

/// Issues compiled queries against the engine.
///
/// One synchronous round trip per call; no retries, no caching.
#[derive(Clone)]
pub struct QueryExecutor {
    engine: Arc<dyn SearchEngine>,
}

impl QueryExecutor {
    pub fn new(engine: Arc<dyn SearchEngine>) -> Self {
        Self { engine }
    }

    /// Engine-reported match count; never materializes hits.
    pub fn count(&self, query: &CompiledQuery) -> Result<u64> {
        self.engine
            .count(&query.collections, &query.doc_types, &query.query)
    }

    /// Fetch one page. `size` is clamped to [`MAX_PAGE_SIZE`]; a `from`
    /// beyond the total match count yields a zero-hit response.
    pub fn fetch_page(&self, query: &CompiledQuery, from: usize, size: usize) -> Result<RawResponse> {
        self.engine.search(&request(query, from, size, false))
    }

    /// Fetch all matches as one bounded maximum-size page.
    pub fn fetch_all(&self, query: &CompiledQuery) -> Result<RawResponse> {
        self.fetch_page(query, 0, FETCH_ALL)
    }

    /// Fetch identifiers only, no document bodies.
    pub(crate) fn fetch_ids(&self, query: &CompiledQuery, size: usize) -> Result<RawResponse> {
        self.engine.search(&request(query, 0, size, true))
    }
}

fn request(query: &CompiledQuery, from: usize, size: usize, ids_only: bool) -> EngineRequest {
    EngineRequest {
        collections: query.collections.clone(),
        doc_types: query.doc_types.clone(),
        query: query.query.clone(),
        score: query.score.clone(),
        sort: query.sort.clone(),
        projection: query.projection.clone(),
        aggregations: query.aggregations.clone(),
        from,
        size: size.min(MAX_PAGE_SIZE),
        ids_only,
    }
}
