//! In-process reference engine.
//!
//! Stores JSON documents per collection and evaluates the engine-neutral
//! query tree directly. Useful for tests and for embedding the adapter
//! without an external engine. Deletions can be given an artificial
//! visibility lag to reproduce the stale-read behavior of eventually
//! consistent engines.

use std::cmp::Ordering;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::Instant;

use ahash::{AHashMap, AHashSet};
use parking_lot::RwLock;
use serde_json::Value;
use uuid::Uuid;

use crate::engine::response::{RawAggregation, RawHit, RawResponse, TermsBucket};
use crate::engine::{EngineRequest, SearchEngine};
use crate::error::{AcorusError, Result};
use crate::query::{QueryNode, ScoreFunction, Sort, SortOrder, TermsAggregation};
use crate::util::{lookup_path, path_scalars, project, scalar_to_string};

#[derive(Debug, Clone)]
struct StoredDocument {
    id: String,
    doc_type: String,
    source: Value,
    /// Search-op number at which the document was bulk-deleted.
    deleted_at: Option<u64>,
}

/// In-memory search engine.
#[derive(Debug, Default)]
pub struct MemoryEngine {
    collections: RwLock<AHashMap<String, Vec<StoredDocument>>>,
    /// Counts search calls; drives tombstone visibility.
    search_ops: AtomicU64,
    /// Number of search calls a deleted document stays visible for.
    visibility_lag: u64,
}

impl MemoryEngine {
    /// Engine with immediately visible deletions.
    pub fn new() -> Self {
        Self::default()
    }

    /// Engine whose deleted documents keep matching searches for `lag`
    /// subsequent search calls, like a stale index segment would.
    pub fn with_visibility_lag(lag: u64) -> Self {
        Self {
            visibility_lag: lag,
            ..Self::default()
        }
    }

    /// Index one document, upserting by id.
    ///
    /// The id is taken from the document's `id` field when present,
    /// otherwise a fresh UUID is assigned. Returns the id.
    pub fn index(&self, collection: &str, doc_type: &str, document: Value) -> String {
        let id = document
            .get("id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let mut guard = self.collections.write();
        let docs = guard.entry(collection.to_string()).or_default();
        docs.retain(|doc| doc.id != id);
        docs.push(StoredDocument {
            id: id.clone(),
            doc_type: doc_type.to_string(),
            source: document,
            deleted_at: None,
        });
        id
    }

    /// Index a batch of documents, upserting by id.
    pub fn index_all(
        &self,
        collection: &str,
        doc_type: &str,
        documents: impl IntoIterator<Item = Value>,
    ) -> Vec<String> {
        documents
            .into_iter()
            .map(|doc| self.index(collection, doc_type, doc))
            .collect()
    }

    /// Number of documents physically stored in a collection, tombstones
    /// excluded and visibility lag ignored.
    pub fn stored_count(&self, collection: &str) -> usize {
        self.collections
            .read()
            .get(collection)
            .map(|docs| docs.iter().filter(|d| d.deleted_at.is_none()).count())
            .unwrap_or(0)
    }

    fn visible(&self, doc: &StoredDocument, op: u64) -> bool {
        match doc.deleted_at {
            None => true,
            Some(at) => op <= at + self.visibility_lag,
        }
    }
}

impl SearchEngine for MemoryEngine {
    fn search(&self, request: &EngineRequest) -> Result<RawResponse> {
        let started = Instant::now();
        validate(&request.query)?;
        let op = self.search_ops.fetch_add(1, AtomicOrdering::SeqCst) + 1;

        let guard = self.collections.read();
        let mut matched: Vec<(&StoredDocument, f64)> = Vec::new();
        for collection in &request.collections {
            let Some(docs) = guard.get(collection) else {
                continue;
            };
            for doc in docs {
                if !self.visible(doc, op) {
                    continue;
                }
                if !request.doc_types.is_empty()
                    && !request.doc_types.iter().any(|t| t == &doc.doc_type)
                {
                    continue;
                }
                if let Some(score) = evaluate(&request.query, doc) {
                    matched.push((doc, adjust_score(score, request.score.as_ref(), doc)));
                }
            }
        }

        order_hits(&mut matched, request.sort.as_ref());

        let aggregations = request
            .aggregations
            .iter()
            .map(|agg| terms_buckets(&matched, agg))
            .collect();

        let total = matched.len() as u64;
        let hits = matched
            .into_iter()
            .skip(request.from)
            .take(request.size)
            .map(|(doc, _)| RawHit {
                id: doc.id.clone(),
                doc_type: doc.doc_type.clone(),
                source: if request.ids_only {
                    None
                } else {
                    Some(project(&doc.source, request.projection.as_ref()))
                },
            })
            .collect();

        Ok(RawResponse {
            hits,
            total,
            took_ms: started.elapsed().as_millis() as u64,
            aggregations,
        })
    }

    fn count(
        &self,
        collections: &[String],
        doc_types: &[String],
        query: &QueryNode,
    ) -> Result<u64> {
        validate(query)?;
        // Count as the next search would see the data.
        let op = self.search_ops.load(AtomicOrdering::SeqCst) + 1;

        let guard = self.collections.read();
        let mut count = 0;
        for collection in collections {
            let Some(docs) = guard.get(collection) else {
                continue;
            };
            for doc in docs {
                if !self.visible(doc, op) {
                    continue;
                }
                if !doc_types.is_empty() && !doc_types.iter().any(|t| t == &doc.doc_type) {
                    continue;
                }
                if evaluate(query, doc).is_some() {
                    count += 1;
                }
            }
        }
        Ok(count)
    }

    fn bulk_delete(&self, collection: &str, doc_type: &str, ids: &[String]) -> Result<()> {
        let ids: AHashSet<&str> = ids.iter().map(String::as_str).collect();
        let at = self.search_ops.load(AtomicOrdering::SeqCst);

        let mut guard = self.collections.write();
        let Some(docs) = guard.get_mut(collection) else {
            return Ok(());
        };
        if self.visibility_lag == 0 {
            docs.retain(|doc| !(doc.doc_type == doc_type && ids.contains(doc.id.as_str())));
        } else {
            for doc in docs.iter_mut() {
                if doc.doc_type == doc_type
                    && ids.contains(doc.id.as_str())
                    && doc.deleted_at.is_none()
                {
                    doc.deleted_at = Some(at);
                }
            }
        }
        Ok(())
    }
}

/// Reject queries the engine cannot evaluate, mirroring the query
/// validation a real engine performs on its side.
fn validate(node: &QueryNode) -> Result<()> {
    match node {
        QueryNode::MatchAll | QueryNode::Text { .. } | QueryNode::Ids { .. } => Ok(()),
        QueryNode::Prefix { field, .. }
        | QueryNode::Term { field, .. }
        | QueryNode::Terms { field, .. }
        | QueryNode::Exists { field } => {
            if field.is_empty() {
                Err(AcorusError::query_rejected("empty field name"))
            } else {
                Ok(())
            }
        }
        QueryNode::Range { field, min, max } => {
            if field.is_empty() {
                Err(AcorusError::query_rejected("empty field name"))
            } else if min.is_none() && max.is_none() {
                Err(AcorusError::query_rejected(
                    "range query needs at least one bound",
                ))
            } else {
                Ok(())
            }
        }
        QueryNode::Bool {
            must,
            should,
            must_not,
        } => must
            .iter()
            .chain(should)
            .chain(must_not)
            .try_for_each(validate),
    }
}

/// Evaluate a query node against a document.
///
/// Returns the relevance score on match, `None` otherwise. Structured
/// predicates score 1; text queries score the number of matched terms.
fn evaluate(node: &QueryNode, doc: &StoredDocument) -> Option<f64> {
    match node {
        QueryNode::MatchAll => Some(1.0),
        QueryNode::Ids { values } => values.iter().any(|v| v == &doc.id).then_some(1.0),
        QueryNode::Text { query } => {
            let matched = query
                .split_whitespace()
                .filter(|term| contains_text(&doc.source, &term.to_lowercase()))
                .count();
            (matched > 0).then_some(matched as f64)
        }
        QueryNode::Prefix { field, prefix } => {
            let prefix = prefix.to_lowercase();
            path_scalars(&doc.source, field)
                .iter()
                .filter_map(|v| v.as_str())
                .any(|s| s.to_lowercase().starts_with(&prefix))
                .then_some(1.0)
        }
        QueryNode::Term { field, value } => path_scalars(&doc.source, field)
            .into_iter()
            .filter_map(scalar_to_string)
            .any(|s| s == *value)
            .then_some(1.0),
        QueryNode::Terms { field, values } => path_scalars(&doc.source, field)
            .into_iter()
            .filter_map(scalar_to_string)
            .any(|s| values.iter().any(|v| *v == s))
            .then_some(1.0),
        QueryNode::Range { field, min, max } => path_scalars(&doc.source, field)
            .iter()
            .filter_map(|v| v.as_f64())
            .any(|n| min.is_none_or(|m| n >= m) && max.is_none_or(|m| n <= m))
            .then_some(1.0),
        QueryNode::Exists { field } => lookup_path(&doc.source, field)
            .is_some_and(|v| !v.is_null())
            .then_some(1.0),
        QueryNode::Bool {
            must,
            should,
            must_not,
        } => {
            let mut score = 0.0;
            for clause in must {
                score += evaluate(clause, doc)?;
            }
            if !should.is_empty() {
                let mut any = false;
                for clause in should {
                    if let Some(s) = evaluate(clause, doc) {
                        score += s;
                        any = true;
                    }
                }
                if must.is_empty() && !any {
                    return None;
                }
            }
            for clause in must_not {
                if evaluate(clause, doc).is_some() {
                    return None;
                }
            }
            Some(if score == 0.0 { 1.0 } else { score })
        }
    }
}

fn contains_text(value: &Value, term: &str) -> bool {
    match value {
        Value::String(s) => s.to_lowercase().contains(term),
        Value::Array(items) => items.iter().any(|v| contains_text(v, term)),
        Value::Object(map) => map.values().any(|v| contains_text(v, term)),
        _ => false,
    }
}

fn adjust_score(base: f64, score: Option<&ScoreFunction>, doc: &StoredDocument) -> f64 {
    match score {
        Some(function) => {
            let factor = lookup_path(&doc.source, &function.field)
                .and_then(Value::as_f64)
                .unwrap_or(function.missing);
            base * factor
        }
        None => base,
    }
}

fn order_hits(matched: &mut [(&StoredDocument, f64)], sort: Option<&Sort>) {
    match sort {
        Some(sort) => {
            matched.sort_by(|a, b| {
                let a = lookup_path(&a.0.source, &sort.field);
                let b = lookup_path(&b.0.source, &sort.field);
                match (a, b) {
                    (Some(a), Some(b)) => {
                        let ordering = compare_values(a, b);
                        match sort.order {
                            SortOrder::Asc => ordering,
                            SortOrder::Desc => ordering.reverse(),
                        }
                    }
                    // Missing values sort last regardless of direction.
                    (Some(_), None) => Ordering::Less,
                    (None, Some(_)) => Ordering::Greater,
                    (None, None) => Ordering::Equal,
                }
            });
        }
        None => {
            // Score descending; stable, so ties keep insertion order.
            matched.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
        }
    }
}

fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(a), Value::Number(b)) => a
            .as_f64()
            .partial_cmp(&b.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::String(a), Value::String(b)) => a.cmp(b),
        (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
        _ => Ordering::Equal,
    }
}

fn terms_buckets(matched: &[(&StoredDocument, f64)], agg: &TermsAggregation) -> RawAggregation {
    let mut counts: AHashMap<String, u64> = AHashMap::new();
    for (doc, _) in matched {
        for value in path_scalars(&doc.source, &agg.field) {
            if let Some(key) = scalar_to_string(value) {
                *counts.entry(key).or_default() += 1;
            }
        }
    }

    let mut buckets: Vec<TermsBucket> = counts
        .into_iter()
        .map(|(key, doc_count)| TermsBucket { key, doc_count })
        .collect();
    buckets.sort_by(|a, b| b.doc_count.cmp(&a.doc_count).then_with(|| a.key.cmp(&b.key)));
    buckets.truncate(agg.size);

    RawAggregation::Terms {
        name: agg.name.clone(),
        buckets,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn request(query: QueryNode) -> EngineRequest {
        EngineRequest {
            collections: vec!["widgets".to_string()],
            doc_types: Vec::new(),
            query,
            score: None,
            sort: None,
            projection: None,
            aggregations: Vec::new(),
            from: 0,
            size: 10,
            ids_only: false,
        }
    }

    fn seeded() -> MemoryEngine {
        let engine = MemoryEngine::new();
        engine.index(
            "widgets",
            "widget",
            json!({"id": "1", "name": "red sprocket", "color": "red", "weight": 2.5}),
        );
        engine.index(
            "widgets",
            "widget",
            json!({"id": "2", "name": "blue sprocket", "color": "blue", "weight": 7.0}),
        );
        engine.index(
            "widgets",
            "widget",
            json!({"id": "3", "name": "red flange", "color": "red", "weight": 4.0}),
        );
        engine
    }

    #[test]
    fn test_match_all_and_pagination() {
        let engine = seeded();
        let mut req = request(QueryNode::MatchAll);
        req.size = 2;
        let page = engine.search(&req).unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.hits.len(), 2);

        req.from = 10;
        let past_end = engine.search(&req).unwrap();
        assert_eq!(past_end.total, 3);
        assert!(past_end.hits.is_empty());
    }

    #[test]
    fn test_term_and_range_queries() {
        let engine = seeded();
        let red = engine.search(&request(QueryNode::term("color", "red"))).unwrap();
        assert_eq!(red.total, 2);

        let heavy = engine
            .search(&request(QueryNode::range("weight", Some(3.0), None)))
            .unwrap();
        assert_eq!(heavy.total, 2);
    }

    #[test]
    fn test_text_query_scores_by_matched_terms() {
        let engine = seeded();
        let page = engine
            .search(&request(QueryNode::Text {
                query: "red sprocket".to_string(),
            }))
            .unwrap();
        // Doc 1 matches both terms and must rank first.
        assert_eq!(page.hits[0].id, "1");
        assert_eq!(page.total, 3);
    }

    #[test]
    fn test_score_function_multiplies() {
        let engine = seeded();
        let mut req = request(QueryNode::term("color", "red"));
        req.score = Some(ScoreFunction::field_value("weight"));
        let page = engine.search(&req).unwrap();
        // Doc 3 (weight 4.0) beats doc 1 (weight 2.5).
        assert_eq!(page.hits[0].id, "3");
    }

    #[test]
    fn test_sort_by_field() {
        let engine = seeded();
        let mut req = request(QueryNode::MatchAll);
        req.sort = Some(Sort::desc("weight"));
        let page = engine.search(&req).unwrap();
        let ids: Vec<&str> = page.hits.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, vec!["2", "3", "1"]);
    }

    #[test]
    fn test_rejects_malformed_queries() {
        let engine = seeded();
        assert!(matches!(
            engine.search(&request(QueryNode::term("", "x"))),
            Err(AcorusError::QueryRejected(_))
        ));
        assert!(matches!(
            engine.search(&request(QueryNode::range("weight", None, None))),
            Err(AcorusError::QueryRejected(_))
        ));
    }

    #[test]
    fn test_bulk_delete_with_lag_keeps_tombstones_visible() {
        let engine = MemoryEngine::with_visibility_lag(2);
        engine.index("widgets", "widget", json!({"id": "1", "color": "red"}));

        let req = request(QueryNode::MatchAll);
        assert_eq!(engine.search(&req).unwrap().total, 1);
        engine
            .bulk_delete("widgets", "widget", &["1".to_string()])
            .unwrap();

        // Still visible for two more searches, then gone.
        assert_eq!(engine.search(&req).unwrap().total, 1);
        assert_eq!(engine.search(&req).unwrap().total, 1);
        assert_eq!(engine.search(&req).unwrap().total, 0);
        assert_eq!(engine.stored_count("widgets"), 0);
    }

    #[test]
    fn test_terms_aggregation_buckets() {
        let engine = seeded();
        let mut req = request(QueryNode::MatchAll);
        req.aggregations = vec![TermsAggregation::of_field("color")];
        let page = engine.search(&req).unwrap();
        match &page.aggregations[0] {
            RawAggregation::Terms { name, buckets } => {
                assert_eq!(name, "color");
                assert_eq!(buckets[0].key, "red");
                assert_eq!(buckets[0].doc_count, 2);
                assert_eq!(buckets[1].key, "blue");
                assert_eq!(buckets[1].doc_count, 1);
            }
            other => panic!("expected terms aggregation, got {other:?}"),
        }
    }
}
