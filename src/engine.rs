//! The consumed search-engine abstraction.
//!
//! The adapter talks to a document search engine through the
//! [`SearchEngine`] trait: one search round trip, one count round trip, and
//! one bulk-delete operation. Implementations wrap whatever wire protocol
//! the concrete engine speaks; [`memory::MemoryEngine`] is an in-process
//! reference implementation used by the test suite and embeddable callers.

pub mod memory;
pub mod response;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::query::{Projection, QueryNode, ScoreFunction, Sort, TermsAggregation};

use self::response::RawResponse;

/// One search round trip, in the engine-neutral wire form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineRequest {
    /// Collections to search.
    pub collections: Vec<String>,
    /// Document-type names to accept; empty means any.
    pub doc_types: Vec<String>,
    /// The query tree.
    pub query: QueryNode,
    /// Optional relevance adjustment.
    pub score: Option<ScoreFunction>,
    /// Optional field sort; engines return score-descending order otherwise.
    pub sort: Option<Sort>,
    /// Optional source projection.
    pub projection: Option<Projection>,
    /// Requested terms aggregations.
    pub aggregations: Vec<TermsAggregation>,
    /// Offset of the first hit to return.
    pub from: usize,
    /// Maximum number of hits to return.
    pub size: usize,
    /// When true the engine may omit document bodies entirely.
    pub ids_only: bool,
}

/// A document search engine, as consumed by this adapter.
///
/// All calls are synchronous and block for the duration of one network
/// round trip. The adapter performs no retries; transient transport
/// failures surface unchanged as [`crate::AcorusError::Engine`].
pub trait SearchEngine: Send + Sync {
    /// Execute a search round trip.
    ///
    /// A `from` beyond the total match count yields a response with zero
    /// hits, not an error.
    fn search(&self, request: &EngineRequest) -> Result<RawResponse>;

    /// Count matching documents without materializing hits.
    fn count(&self, collections: &[String], doc_types: &[String], query: &QueryNode)
    -> Result<u64>;

    /// Delete the given documents in one bulk operation.
    fn bulk_delete(&self, collection: &str, doc_type: &str, ids: &[String]) -> Result<()>;
}
