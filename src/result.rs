//! Typed result envelopes and raw-response materialization.
//!
//! A zero-hit query always materializes to the canonical empty envelope,
//! never to an absent value, so "no results" stays distinguishable from
//! "error". A decode failure for any single hit fails the whole call: it
//! indicates a mapping or schema mismatch the caller must know about
//! immediately.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;

use log::warn;
use serde_json::Value;

use crate::engine::response::{RawHit, RawResponse};
use crate::error::{AcorusError, Result};
use crate::registry::{Entity, TypeRegistry};

/// One page of a typed, paginated result set.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchPage<T> {
    /// Decoded hits, in engine-returned order.
    pub items: Vec<T>,
    /// Document-type name of each hit, parallel to `items`.
    pub item_types: Vec<String>,
    /// Offset of the first hit in the overall match set.
    pub from: usize,
    /// Offset of the last hit (`from + items.len() - 1`).
    pub to: usize,
    /// Engine-reported total match count; may exceed `items.len()`.
    pub total: u64,
    /// Engine-reported query duration in milliseconds.
    pub took_ms: u64,
}

impl<T> SearchPage<T> {
    /// The canonical empty page.
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            item_types: Vec::new(),
            from: 0,
            to: 0,
            total: 0,
            took_ms: 0,
        }
    }

    /// Number of hits on this page.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True when this page carries no hits.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// One (value, count) facet bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FacetEntry {
    pub value: String,
    pub count: u64,
}

/// A [`SearchPage`] with facet counts attached.
///
/// `facets` is empty, not missing, when the engine returned no bucket
/// aggregations.
#[derive(Debug, Clone, PartialEq)]
pub struct FacetedPage<T> {
    pub page: SearchPage<T>,
    pub facets: HashMap<String, Vec<FacetEntry>>,
}

/// One hit of a multi-type result set.
///
/// Holds the decoded value registered for the hit's document type. A
/// document type the registry does not know degrades to the opaque raw
/// JSON body rather than failing the result set.
pub struct AnyEntity {
    doc_type: String,
    value: Box<dyn Any + Send + Sync>,
}

impl AnyEntity {
    /// Document-type tag reported by the engine for this hit.
    pub fn doc_type(&self) -> &str {
        &self.doc_type
    }

    /// Borrow the hit as a concrete entity type.
    pub fn downcast_ref<T: Entity>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }

    /// Take the hit as a concrete entity type.
    pub fn downcast<T: Entity>(self) -> std::result::Result<T, AnyEntity> {
        match self.value.downcast::<T>() {
            Ok(value) => Ok(*value),
            Err(value) => Err(AnyEntity {
                doc_type: self.doc_type,
                value,
            }),
        }
    }

    /// Borrow the raw JSON body of a hit whose document type was unknown.
    pub fn as_json(&self) -> Option<&Value> {
        self.value.downcast_ref::<Value>()
    }
}

impl fmt::Debug for AnyEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnyEntity")
            .field("doc_type", &self.doc_type)
            .finish_non_exhaustive()
    }
}

/// Materialize a raw response into a page of one pinned entity type.
pub fn materialize<T: Entity>(response: RawResponse, from: usize) -> Result<SearchPage<T>> {
    if response.is_empty() {
        return Ok(SearchPage::empty());
    }

    let mut items = Vec::with_capacity(response.hits.len());
    let mut item_types = Vec::with_capacity(response.hits.len());
    for hit in &response.hits {
        items.push(decode_hit::<T>(hit)?);
        item_types.push(hit.doc_type.clone());
    }

    Ok(SearchPage {
        to: from + items.len() - 1,
        items,
        item_types,
        from,
        total: response.total,
        took_ms: response.took_ms,
    })
}

/// Materialize a raw response into a polymorphic page, resolving each hit's
/// document type through the registry.
pub fn materialize_any(
    response: RawResponse,
    from: usize,
    registry: &TypeRegistry,
) -> Result<SearchPage<AnyEntity>> {
    if response.is_empty() {
        return Ok(SearchPage::empty());
    }

    let mut items = Vec::with_capacity(response.hits.len());
    let mut item_types = Vec::with_capacity(response.hits.len());
    for hit in &response.hits {
        let body = hit.source.clone().unwrap_or(Value::Null);
        let value: Box<dyn Any + Send + Sync> = match registry.entry_for_doc_type(&hit.doc_type) {
            Some(entry) => {
                (entry.decode)(&body).map_err(|source| AcorusError::Deserialization {
                    id: hit.id.clone(),
                    target: entry.entity_name,
                    body: body.to_string(),
                    source,
                })?
            }
            None => {
                warn!(
                    "unregistered document type '{}' for hit '{}', keeping it opaque",
                    hit.doc_type, hit.id
                );
                Box::new(body)
            }
        };
        items.push(AnyEntity {
            doc_type: hit.doc_type.clone(),
            value,
        });
        item_types.push(hit.doc_type.clone());
    }

    Ok(SearchPage {
        to: from + items.len() - 1,
        items,
        item_types,
        from,
        total: response.total,
        took_ms: response.took_ms,
    })
}

/// The first hit, or `None` when the response is empty.
///
/// "Not found" is an explicit signal here, not an error.
pub fn first<T: Entity>(response: RawResponse) -> Result<Option<T>> {
    match response.hits.first() {
        Some(hit) => decode_hit::<T>(hit).map(Some),
        None => Ok(None),
    }
}

/// All hits as a plain list, without the pagination envelope.
pub fn items<T: Entity>(response: RawResponse) -> Result<Vec<T>> {
    response.hits.iter().map(decode_hit::<T>).collect()
}

fn decode_hit<T: Entity>(hit: &RawHit) -> Result<T> {
    let body = hit.source.clone().unwrap_or(Value::Null);
    serde_json::from_value(body.clone()).map_err(|source| AcorusError::Deserialization {
        id: hit.id.clone(),
        target: std::any::type_name::<T>(),
        body: body.to_string(),
        source,
    })
}
