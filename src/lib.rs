//! # Acorus
//!
//! A typed document search and indexing adapter for Rust.
//!
//! ## Features
//!
//! - Type-driven mapping between domain entities and engine collections
//! - Fluent query construction with filters, sort, projection, and
//!   score adjustment
//! - Paginated, faceted, and free-text search with typed result envelopes
//! - Polymorphic multi-type result sets
//! - Bulk delete-by-query against eventually consistent engines
//! - Pluggable engine backends, with an in-memory reference engine
// Core modules
pub mod client;
pub mod delete;
pub mod engine;
mod error;
pub mod executor;
pub mod facet;
pub mod query;
pub mod registry;
pub mod result;
mod util;

// Re-exports for the public API
pub use client::SearchClient;
pub use delete::{CancelToken, DELETE_PAGE_SIZE};
pub use engine::memory::MemoryEngine;
pub use engine::response::{RawAggregation, RawHit, RawResponse, TermsBucket};
pub use engine::{EngineRequest, SearchEngine};
pub use error::{AcorusError, Result};
pub use executor::{FETCH_ALL, MAX_PAGE_SIZE, QueryExecutor};
pub use facet::extract_facets;
pub use query::builder::QueryBuilder;
pub use query::{
    CompiledQuery, Filters, Projection, QueryNode, ScoreFunction, Sort, SortOrder,
    TermsAggregation,
};
pub use registry::{Entity, EntityMapping, TypeRegistry, TypeRegistryBuilder};
pub use result::{AnyEntity, FacetEntry, FacetedPage, SearchPage};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
