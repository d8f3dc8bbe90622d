//! Bulk delete-by-query coordination.
//!
//! Engines without an atomic delete-by-query primitive are driven by an
//! iterative fetch-ids / bulk-delete loop. Deletes may not be visible to
//! an immediately following read of the same query, so the loop also
//! terminates when one batch covered everything the fetch reported;
//! without that second condition a lagging engine would serve the same
//! tombstoned hits forever.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use log::debug;

use crate::engine::SearchEngine;
use crate::error::{AcorusError, Result};
use crate::executor::QueryExecutor;
use crate::query::CompiledQuery;

/// Page size of each identifier fetch in the delete loop.
pub const DELETE_PAGE_SIZE: usize = 1000;

/// Cooperative cancellation flag for long-running delete loops.
///
/// Cloned tokens share the flag. The loop checks it between iterations;
/// cancellation is not an error, the confirmed-deletion count is returned
/// as usual.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// True once cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Delete every document matching the query, in batches of
/// [`DELETE_PAGE_SIZE`]. Returns the number of confirmed deletions.
///
/// A failed bulk delete aborts the loop as
/// [`AcorusError::PartialDeletion`] carrying the confirmed count, so
/// callers can decide whether to resume; partial deletion is a retryable
/// state, not corruption.
pub fn delete_by_query(
    executor: &QueryExecutor,
    engine: &dyn SearchEngine,
    collection: &str,
    doc_type: &str,
    query: &CompiledQuery,
    cancel: Option<&CancelToken>,
) -> Result<u64> {
    let mut deleted: u64 = 0;

    let mut response = executor.fetch_ids(query, DELETE_PAGE_SIZE)?;
    while !response.hits.is_empty() {
        if cancel.is_some_and(CancelToken::is_cancelled) {
            debug!("delete-by-query cancelled after {deleted} deletions");
            return Ok(deleted);
        }

        let ids: Vec<String> = response.hits.iter().map(|hit| hit.id.clone()).collect();
        engine
            .bulk_delete(collection, doc_type, &ids)
            .map_err(|source| AcorusError::PartialDeletion {
                deleted,
                source: Box::new(source),
            })?;
        deleted += ids.len() as u64;
        debug!(
            "deleted batch of {} from '{collection}' ({deleted} so far, {} reported)",
            ids.len(),
            response.total
        );

        // The batch covered everything the fetch reported; re-querying
        // could keep returning the same not-yet-invisible documents.
        if response.total == ids.len() as u64 {
            break;
        }

        // A re-query failure at this point has already deleted documents;
        // keep the count attached so callers can resume.
        response = match executor.fetch_ids(query, DELETE_PAGE_SIZE) {
            Ok(response) => response,
            Err(source) => {
                return Err(AcorusError::PartialDeletion {
                    deleted,
                    source: Box::new(source),
                });
            }
        };
    }

    Ok(deleted)
}
