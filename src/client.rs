//! Typed search client.
//!
//! The facade wiring registry, query building, execution, and
//! materialization together. One client serves any number of concurrent
//! callers; every operation builds its own query and owns its own results.

use std::sync::Arc;

use crate::delete::{self, CancelToken};
use crate::engine::SearchEngine;
use crate::error::Result;
use crate::executor::QueryExecutor;
use crate::facet::extract_facets;
use crate::query::builder::QueryBuilder;
use crate::query::{CompiledQuery, Filters, Projection, QueryNode};
use crate::registry::{Entity, TypeRegistry};
use crate::result::{self, AnyEntity, FacetedPage, SearchPage};
use crate::util::{lookup_path, scalar_to_string};

/// Typed entry points over a document search engine.
pub struct SearchClient {
    registry: Arc<TypeRegistry>,
    engine: Arc<dyn SearchEngine>,
    executor: QueryExecutor,
}

impl SearchClient {
    pub fn new(registry: Arc<TypeRegistry>, engine: Arc<dyn SearchEngine>) -> Self {
        let executor = QueryExecutor::new(engine.clone());
        Self {
            registry,
            engine,
            executor,
        }
    }

    /// The entity registry this client resolves types against.
    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    /// The executor, for callers issuing pre-compiled queries directly.
    pub fn executor(&self) -> &QueryExecutor {
        &self.executor
    }

    /// Start a query against a single entity type.
    pub fn query<T: Entity>(&self) -> Result<QueryBuilder> {
        let mapping = self.registry.resolve::<T>()?;
        Ok(QueryBuilder::new(vec![mapping.clone()]))
    }

    /// Start a query against every registered entity type.
    pub fn query_all(&self) -> QueryBuilder {
        QueryBuilder::new(self.registry.mappings().cloned().collect())
    }

    /// Start a query against an explicit list of document-type names.
    pub fn query_doc_types(&self, doc_types: &[&str]) -> Result<QueryBuilder> {
        let mut targets = Vec::with_capacity(doc_types.len());
        for doc_type in doc_types {
            targets.push(self.registry.resolve_doc_type(doc_type)?.clone());
        }
        Ok(QueryBuilder::new(targets))
    }

    /// Engine-reported match count for the filtered entity type.
    pub fn count<T: Entity>(&self, filters: &Filters) -> Result<u64> {
        let query = self.query::<T>()?.filters(filters).compile();
        self.executor.count(&query)
    }

    /// Paginated free-text + filtered search over one entity type.
    ///
    /// When the mapping declares a boost field, relevance is multiplied by
    /// it (missing values count as 1).
    pub fn search<T: Entity>(
        &self,
        text: Option<&str>,
        filters: &Filters,
        profile: Option<&str>,
        from: usize,
        size: usize,
    ) -> Result<SearchPage<T>> {
        let query = self.scored_query::<T>(text, filters, profile)?.compile();
        let response = self.executor.fetch_page(&query, from, size)?;
        result::materialize(response, from)
    }

    /// Like [`SearchClient::search`], with facet counts for the fields the
    /// mapping declares facetable.
    pub fn faceted_search<T: Entity>(
        &self,
        text: Option<&str>,
        filters: &Filters,
        profile: Option<&str>,
        from: usize,
        size: usize,
    ) -> Result<FacetedPage<T>> {
        let query = self
            .scored_query::<T>(text, filters, profile)?
            .faceted()
            .compile();
        let response = self.executor.fetch_page(&query, from, size)?;
        let facets = extract_facets(&response);
        let page = result::materialize(response, from)?;
        Ok(FacetedPage { page, facets })
    }

    /// Prefix suggestion search on one field of one entity type.
    pub fn suggest<T: Entity>(
        &self,
        field: &str,
        prefix: &str,
        profile: Option<&str>,
        from: usize,
        size: usize,
    ) -> Result<SearchPage<T>> {
        let mut builder = self.query::<T>()?.suggest(field, prefix);
        if let Some(profile) = profile {
            builder = builder.projection(profile);
        }
        let query = builder.compile();
        let response = self.executor.fetch_page(&query, from, size)?;
        result::materialize(response, from)
    }

    /// Fetch documents by identifier, optionally through a projection
    /// profile. An unknown profile name is reported with a warning and
    /// full documents are returned.
    pub fn find_by_ids<T: Entity>(&self, profile: Option<&str>, ids: &[&str]) -> Result<Vec<T>> {
        let mut builder = self
            .query::<T>()?
            .custom_filter(QueryNode::ids(ids.iter().copied()));
        if let Some(profile) = profile {
            builder = builder.projection(profile);
        }
        let query = builder.compile();
        let response = self.executor.fetch_page(&query, 0, ids.len().max(1))?;
        result::items(response)
    }

    /// First match of a pre-compiled query, or `None`.
    pub fn find_first<T: Entity>(&self, query: &CompiledQuery) -> Result<Option<T>> {
        let response = self.executor.fetch_page(query, 0, 1)?;
        result::first(response)
    }

    /// All matches of a pre-compiled query, as a plain list.
    pub fn find_all<T: Entity>(&self, query: &CompiledQuery) -> Result<Vec<T>> {
        let response = self.executor.fetch_all(query)?;
        result::items(response)
    }

    /// One page of a pre-compiled query, decoded as a single entity type.
    pub fn search_with<T: Entity>(
        &self,
        query: &CompiledQuery,
        from: usize,
        size: usize,
    ) -> Result<SearchPage<T>> {
        let response = self.executor.fetch_page(query, from, size)?;
        result::materialize(response, from)
    }

    /// One page of a pre-compiled query over heterogeneous entity types,
    /// each hit decoded per its reported document type.
    pub fn search_any(
        &self,
        query: &CompiledQuery,
        from: usize,
        size: usize,
    ) -> Result<SearchPage<AnyEntity>> {
        let response = self.executor.fetch_page(query, from, size)?;
        result::materialize_any(response, from, &self.registry)
    }

    /// Project one field path of every hit to its string form.
    pub fn select_path(
        &self,
        query: &CompiledQuery,
        path: &str,
        from: usize,
        size: usize,
    ) -> Result<Vec<String>> {
        let mut query = query.clone();
        query.projection = Some(Projection::default().include(path));
        let response = self.executor.fetch_page(&query, from, size)?;
        Ok(response
            .hits
            .iter()
            .filter_map(|hit| hit.source.as_ref())
            .filter_map(|source| lookup_path(source, path))
            .filter_map(scalar_to_string)
            .collect())
    }

    /// Delete every document of the entity type matching the filters.
    /// Returns the number of confirmed deletions.
    pub fn delete_by_query<T: Entity>(&self, filters: &Filters) -> Result<u64> {
        self.run_delete::<T>(filters, None)
    }

    /// [`SearchClient::delete_by_query`] with cooperative cancellation,
    /// checked between batches.
    pub fn delete_by_query_with_cancel<T: Entity>(
        &self,
        filters: &Filters,
        cancel: &CancelToken,
    ) -> Result<u64> {
        self.run_delete::<T>(filters, Some(cancel))
    }

    fn run_delete<T: Entity>(&self, filters: &Filters, cancel: Option<&CancelToken>) -> Result<u64> {
        let mapping = self.registry.resolve::<T>()?;
        let query = QueryBuilder::new(vec![mapping.clone()])
            .filters(filters)
            .compile();
        delete::delete_by_query(
            &self.executor,
            self.engine.as_ref(),
            mapping.collection(),
            mapping.doc_type(),
            &query,
            cancel,
        )
    }

    fn scored_query<T: Entity>(
        &self,
        text: Option<&str>,
        filters: &Filters,
        profile: Option<&str>,
    ) -> Result<QueryBuilder> {
        let mapping = self.registry.resolve::<T>()?;
        let boost = mapping.boost_field().map(str::to_string);
        let mut builder = QueryBuilder::new(vec![mapping.clone()]).filters(filters);
        if let Some(text) = text {
            builder = builder.text(text);
        }
        if let Some(profile) = profile {
            builder = builder.projection(profile);
        }
        if let Some(field) = boost {
            builder = builder.score_by_field(field);
        }
        Ok(builder)
    }
}
