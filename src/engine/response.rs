//! Raw engine response types.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Raw paginated response from one search round trip.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawResponse {
    /// Returned hits, in engine order.
    pub hits: Vec<RawHit>,
    /// Engine-reported total match count; may exceed `hits.len()`.
    pub total: u64,
    /// Engine-reported query duration in milliseconds.
    pub took_ms: u64,
    /// Aggregation results, when any were requested.
    #[serde(default)]
    pub aggregations: Vec<RawAggregation>,
}

impl RawResponse {
    /// Response with zero hits.
    pub fn empty() -> Self {
        Self::default()
    }

    /// True when the response carries no hits.
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }
}

/// One hit of a raw response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawHit {
    /// Document identifier.
    pub id: String,
    /// Document-type tag reported by the engine.
    pub doc_type: String,
    /// Document body; absent for ids-only fetches.
    pub source: Option<Value>,
}

/// One named aggregation result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RawAggregation {
    /// Terms buckets: one (key, count) entry per distinct field value.
    Terms {
        name: String,
        buckets: Vec<TermsBucket>,
    },
    /// An aggregation kind this adapter does not interpret.
    Other { name: String, kind: String },
}

/// One bucket of a terms aggregation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TermsBucket {
    pub key: String,
    pub doc_count: u64,
}
