//! Fluent query construction.

use log::warn;

use crate::query::{
    CompiledQuery, Filters, Projection, QueryNode, ScoreFunction, Sort, TermsAggregation,
};
use crate::registry::EntityMapping;

/// Accumulates query intent and compiles it into a [`CompiledQuery`].
///
/// A builder is owned by a single call site; create one per request via
/// [`crate::SearchClient::query`] and friends. Every method returns the
/// builder for chaining. [`QueryBuilder::compile`] snapshots the current
/// state, so a builder can keep being mutated and compiled again without
/// affecting queries already in flight.
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    targets: Vec<EntityMapping>,
    text: Option<String>,
    suggest: Option<(String, String)>,
    filters: Filters,
    custom: Option<QueryNode>,
    score: Option<ScoreFunction>,
    sort: Option<Sort>,
    profile: Option<String>,
    facets: bool,
}

impl QueryBuilder {
    /// Create a builder over the given target mappings.
    ///
    /// The target list fixes which collections and document types the
    /// compiled query addresses; an empty list compiles to a query with no
    /// collections, which matches nothing on any engine.
    pub fn new(targets: Vec<EntityMapping>) -> Self {
        Self {
            targets,
            text: None,
            suggest: None,
            filters: Filters::new(),
            custom: None,
            score: None,
            sort: None,
            profile: None,
            facets: false,
        }
    }

    /// Set the free-text relevance query. Blank text compiles to match-all.
    pub fn text(mut self, query: impl Into<String>) -> Self {
        self.text = Some(query.into());
        self
    }

    /// Set a prefix relevance query against one field, for suggestions.
    pub fn suggest(mut self, field: impl Into<String>, prefix: impl Into<String>) -> Self {
        self.suggest = Some((field.into(), prefix.into()));
        self
    }

    /// Add simple filters. Calling multiple times accumulates: later calls
    /// add further required fields and further accepted values.
    pub fn filters(mut self, filters: &Filters) -> Self {
        self.filters.merge(filters);
        self
    }

    /// Add accepted values for a single filter field.
    pub fn filter<I, S>(mut self, field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.filters.insert(field, values);
        self
    }

    /// Set the custom filter tree, ANDed with the simple filters.
    /// A later call replaces the previous tree.
    pub fn custom_filter(mut self, node: QueryNode) -> Self {
        self.custom = Some(node);
        self
    }

    /// Multiply base relevance by a numeric document field (missing
    /// values count as 1).
    pub fn score_by_field(mut self, field: impl Into<String>) -> Self {
        self.score = Some(ScoreFunction::field_value(field));
        self
    }

    /// Set the field sort.
    pub fn sort(mut self, sort: Sort) -> Self {
        self.sort = Some(sort);
        self
    }

    /// Select a named projection profile from the target mappings.
    ///
    /// A name no target declares is reported with a warning at compile time
    /// and the query falls back to returning full documents; it never fails
    /// the request.
    pub fn projection(mut self, profile: impl Into<String>) -> Self {
        self.profile = Some(profile.into());
        self
    }

    /// Request one terms aggregation per facet field declared by the
    /// target mappings.
    pub fn faceted(mut self) -> Self {
        self.facets = true;
        self
    }

    /// Snapshot the accumulated state into an immutable [`CompiledQuery`].
    pub fn compile(&self) -> CompiledQuery {
        let mut clauses: Vec<QueryNode> = Vec::new();

        let base = if let Some((field, prefix)) = &self.suggest {
            Some(QueryNode::Prefix {
                field: field.clone(),
                prefix: prefix.clone(),
            })
        } else {
            match &self.text {
                Some(text) if !text.trim().is_empty() => Some(QueryNode::Text {
                    query: text.clone(),
                }),
                _ => None,
            }
        };

        for (field, values) in self.filters.iter() {
            match values {
                [] => {}
                [value] => clauses.push(QueryNode::term(field, value.clone())),
                values => clauses.push(QueryNode::terms(field, values.iter().cloned())),
            }
        }
        if let Some(custom) = &self.custom {
            clauses.push(custom.clone());
        }

        let query = match (base, clauses.is_empty()) {
            (None, true) => QueryNode::MatchAll,
            (Some(base), true) => base,
            (base, false) => {
                let mut must = Vec::with_capacity(clauses.len() + 1);
                must.extend(base);
                must.append(&mut clauses);
                QueryNode::Bool {
                    must,
                    should: Vec::new(),
                    must_not: Vec::new(),
                }
            }
        };

        let projection = self.profile.as_ref().and_then(|name| {
            let found = self.targets.iter().find_map(|m| m.profile(name));
            if found.is_none() {
                warn!("unknown projection profile '{name}', returning full documents");
            }
            found.cloned()
        });

        let mut aggregations: Vec<TermsAggregation> = Vec::new();
        if self.facets {
            for mapping in &self.targets {
                for field in mapping.facet_fields() {
                    if aggregations.iter().all(|a| a.name != *field) {
                        aggregations.push(TermsAggregation::of_field(field.clone()));
                    }
                }
            }
        }

        let mut collections: Vec<String> = Vec::new();
        for mapping in &self.targets {
            if !collections.iter().any(|c| c == mapping.collection()) {
                collections.push(mapping.collection().to_string());
            }
        }
        let doc_types = self
            .targets
            .iter()
            .map(|m| m.doc_type().to_string())
            .collect();

        CompiledQuery {
            collections,
            doc_types,
            query,
            score: self.score.clone(),
            sort: self.sort.clone(),
            projection,
            aggregations,
        }
    }
}
