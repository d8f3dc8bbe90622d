use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde::Deserialize;
use serde_json::json;

use acorus::{
    AcorusError, CancelToken, EngineRequest, EntityMapping, Filters, MemoryEngine, QueryNode,
    RawResponse, SearchClient, SearchEngine, TypeRegistry,
};

#[derive(Debug, Clone, PartialEq, Deserialize)]
struct Widget {
    id: String,
    color: Option<String>,
}

fn registry() -> Arc<TypeRegistry> {
    Arc::new(
        TypeRegistry::builder()
            .register::<Widget>(EntityMapping::new("widgets", "widget"))
            .build(),
    )
}

fn seed_widgets(engine: &MemoryEngine, count: usize, color: &str) {
    for i in 0..count {
        engine.index(
            "widgets",
            "widget",
            json!({"id": format!("{color}-{i}"), "color": color}),
        );
    }
}

#[test]
fn test_delete_by_query_leaves_non_matching_documents() -> acorus::Result<()> {
    let engine = Arc::new(MemoryEngine::new());
    seed_widgets(&engine, 2, "red");
    seed_widgets(&engine, 1, "blue");
    let client = SearchClient::new(registry(), engine);

    let filters = Filters::new().with("color", ["red"]);
    let page = client.search::<Widget>(None, &filters, None, 0, 10)?;
    assert_eq!(page.total, 2);
    assert_eq!(page.len(), 2);

    let deleted = client.delete_by_query::<Widget>(&filters)?;
    assert_eq!(deleted, 2);
    assert_eq!(client.count::<Widget>(&Filters::new())?, 1);
    Ok(())
}

#[test]
fn test_delete_by_query_is_idempotent() -> acorus::Result<()> {
    let engine = Arc::new(MemoryEngine::new());
    seed_widgets(&engine, 5, "red");
    let client = SearchClient::new(registry(), engine);

    let filters = Filters::new().with("color", ["red"]);
    assert_eq!(client.delete_by_query::<Widget>(&filters)?, 5);
    assert_eq!(client.delete_by_query::<Widget>(&filters)?, 0);
    Ok(())
}

#[test]
fn test_delete_by_query_pages_through_large_match_sets() -> acorus::Result<()> {
    let engine = Arc::new(MemoryEngine::new());
    seed_widgets(&engine, 2500, "red");
    let client = SearchClient::new(registry(), engine);

    let deleted = client.delete_by_query::<Widget>(&Filters::new())?;
    assert_eq!(deleted, 2500);
    assert_eq!(client.count::<Widget>(&Filters::new())?, 0);
    Ok(())
}

#[test]
fn test_delete_terminates_against_lagging_visibility() -> acorus::Result<()> {
    // Deleted documents keep matching searches for a while; the loop must
    // stop on the batch-covered-total condition instead of spinning.
    let engine = Arc::new(MemoryEngine::with_visibility_lag(10));
    seed_widgets(&engine, 800, "red");
    let client = SearchClient::new(registry(), engine.clone());

    let deleted = client.delete_by_query::<Widget>(&Filters::new())?;
    assert_eq!(deleted, 800);
    assert_eq!(engine.stored_count("widgets"), 0);
    Ok(())
}

/// Engine whose bulk deletes start failing after a budget of successful
/// calls, to exercise partial-deletion reporting.
struct FlakyEngine {
    inner: MemoryEngine,
    deletes_allowed: AtomicUsize,
}

impl SearchEngine for FlakyEngine {
    fn search(&self, request: &EngineRequest) -> acorus::Result<RawResponse> {
        self.inner.search(request)
    }

    fn count(
        &self,
        collections: &[String],
        doc_types: &[String],
        query: &QueryNode,
    ) -> acorus::Result<u64> {
        self.inner.count(collections, doc_types, query)
    }

    fn bulk_delete(&self, collection: &str, doc_type: &str, ids: &[String]) -> acorus::Result<()> {
        if self.deletes_allowed.load(Ordering::SeqCst) == 0 {
            return Err(AcorusError::engine("bulk write refused"));
        }
        self.deletes_allowed.fetch_sub(1, Ordering::SeqCst);
        self.inner.bulk_delete(collection, doc_type, ids)
    }
}

#[test]
fn test_failed_bulk_delete_reports_partial_deletion() {
    let inner = MemoryEngine::new();
    seed_widgets(&inner, 1500, "red");
    let engine = Arc::new(FlakyEngine {
        inner,
        deletes_allowed: AtomicUsize::new(1),
    });
    let client = SearchClient::new(registry(), engine);

    match client.delete_by_query::<Widget>(&Filters::new()) {
        Err(AcorusError::PartialDeletion { deleted, .. }) => assert_eq!(deleted, 1000),
        other => panic!("expected partial deletion, got {other:?}"),
    }
}

#[test]
fn test_cancelled_delete_returns_confirmed_count() -> acorus::Result<()> {
    let engine = Arc::new(MemoryEngine::new());
    seed_widgets(&engine, 3, "red");
    let client = SearchClient::new(registry(), engine);

    let token = CancelToken::new();
    token.cancel();
    let deleted = client.delete_by_query_with_cancel::<Widget>(&Filters::new(), &token)?;
    assert_eq!(deleted, 0);
    assert_eq!(client.count::<Widget>(&Filters::new())?, 3);

    // A fresh token lets the loop run to completion.
    let token = CancelToken::new();
    let deleted = client.delete_by_query_with_cancel::<Widget>(&Filters::new(), &token)?;
    assert_eq!(deleted, 3);
    Ok(())
}
