//! Query model: filters, sort, score adjustment, the engine-neutral query
//! tree, and the compiled query snapshot produced by [`builder::QueryBuilder`].

pub mod builder;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Default number of buckets requested per facet.
pub const DEFAULT_FACET_SIZE: usize = 10;

/// Simple per-field value filters.
///
/// Values OR together within a field; fields AND together. An empty filter
/// set matches all documents.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Filters {
    fields: BTreeMap<String, Vec<String>>,
}

impl Filters {
    /// Create an empty filter set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add accepted values for a field, keeping any previously added values.
    pub fn with<I, S>(mut self, field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.insert(field, values);
        self
    }

    /// Add accepted values for a field, keeping any previously added values.
    pub fn insert<I, S>(&mut self, field: impl Into<String>, values: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields
            .entry(field.into())
            .or_default()
            .extend(values.into_iter().map(Into::into));
    }

    /// Merge another filter set into this one (additive per field).
    pub fn merge(&mut self, other: &Filters) {
        for (field, values) in &other.fields {
            self.insert(field, values.iter().cloned());
        }
    }

    /// True when no field has any accepted value.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterate fields and their accepted values in field-name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }
}

/// Named include/exclude field-path sets controlling which parts of a
/// document are returned.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Projection {
    /// Field paths to return. Empty means the full document.
    pub includes: Vec<String>,
    /// Field paths to strip from the returned document.
    pub excludes: Vec<String>,
}

impl Projection {
    /// Add an included field path.
    pub fn include(mut self, path: impl Into<String>) -> Self {
        self.includes.push(path.into());
        self
    }

    /// Add an excluded field path.
    pub fn exclude(mut self, path: impl Into<String>) -> Self {
        self.excludes.push(path.into());
        self
    }

    /// True when the projection selects the full document.
    pub fn is_empty(&self) -> bool {
        self.includes.is_empty() && self.excludes.is_empty()
    }
}

/// Sort order for a field sort.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

/// Field sort specification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sort {
    pub field: String,
    pub order: SortOrder,
}

impl Sort {
    /// Ascending sort on a field.
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            order: SortOrder::Asc,
        }
    }

    /// Descending sort on a field.
    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            order: SortOrder::Desc,
        }
    }
}

/// Relevance adjustment that multiplies the base score by a numeric
/// document field, so callers can boost preferred documents without
/// altering filter semantics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreFunction {
    /// Numeric field whose value scales the base score.
    pub field: String,
    /// Value assumed for documents missing the field.
    pub missing: f64,
}

impl ScoreFunction {
    /// Multiply the base score by `field`, defaulting to 1 when absent.
    pub fn field_value(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            missing: 1.0,
        }
    }
}

/// A terms-bucket aggregation request attached to a query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TermsAggregation {
    pub name: String,
    pub field: String,
    /// Maximum number of buckets to return.
    pub size: usize,
}

impl TermsAggregation {
    /// Aggregation named after the field it buckets.
    pub fn of_field(field: impl Into<String>) -> Self {
        let field = field.into();
        Self {
            name: field.clone(),
            field,
            size: DEFAULT_FACET_SIZE,
        }
    }
}

/// Engine-neutral query tree.
///
/// Custom filter expressions supplied by callers are ordinary nodes; the
/// adapter does not validate field references, that is left to the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QueryNode {
    /// Matches every document.
    MatchAll,
    /// Free-text relevance query over the document's text content.
    Text { query: String },
    /// Prefix relevance query against one field, used for suggestions.
    Prefix { field: String, prefix: String },
    /// Exact identifier lookup.
    Ids { values: Vec<String> },
    /// Field equals one literal value.
    Term { field: String, value: String },
    /// Field equals any of the literal values.
    Terms { field: String, values: Vec<String> },
    /// Numeric range over a field; at least one bound must be present.
    Range {
        field: String,
        min: Option<f64>,
        max: Option<f64>,
    },
    /// Field is present and non-null.
    Exists { field: String },
    /// Boolean combination of sub-queries.
    Bool {
        #[serde(default)]
        must: Vec<QueryNode>,
        #[serde(default)]
        should: Vec<QueryNode>,
        #[serde(default)]
        must_not: Vec<QueryNode>,
    },
}

impl QueryNode {
    /// Field equals the literal value.
    pub fn term(field: impl Into<String>, value: impl Into<String>) -> Self {
        QueryNode::Term {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Field equals any of the literal values.
    pub fn terms<I, S>(field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        QueryNode::Terms {
            field: field.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Numeric range over a field.
    pub fn range(field: impl Into<String>, min: Option<f64>, max: Option<f64>) -> Self {
        QueryNode::Range {
            field: field.into(),
            min,
            max,
        }
    }

    /// Field is present and non-null.
    pub fn exists(field: impl Into<String>) -> Self {
        QueryNode::Exists {
            field: field.into(),
        }
    }

    /// Exact identifier lookup.
    pub fn ids<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        QueryNode::Ids {
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// All sub-queries must match.
    pub fn all(nodes: impl IntoIterator<Item = QueryNode>) -> Self {
        QueryNode::Bool {
            must: nodes.into_iter().collect(),
            should: Vec::new(),
            must_not: Vec::new(),
        }
    }

    /// At least one sub-query must match.
    pub fn any(nodes: impl IntoIterator<Item = QueryNode>) -> Self {
        QueryNode::Bool {
            must: Vec::new(),
            should: nodes.into_iter().collect(),
            must_not: Vec::new(),
        }
    }

    /// The sub-query must not match.
    pub fn not(node: QueryNode) -> Self {
        QueryNode::Bool {
            must: Vec::new(),
            should: Vec::new(),
            must_not: vec![node],
        }
    }
}

/// Immutable snapshot of a fully-built query.
///
/// Produced by [`builder::QueryBuilder::compile`]; later mutation of the
/// builder does not affect an already-compiled query. Serializable as the
/// engine-neutral wire form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompiledQuery {
    /// Target collections, in registration order, deduplicated.
    pub collections: Vec<String>,
    /// Target document-type names; empty means any.
    pub doc_types: Vec<String>,
    /// The query tree.
    pub query: QueryNode,
    /// Optional relevance adjustment.
    pub score: Option<ScoreFunction>,
    /// Optional field sort.
    pub sort: Option<Sort>,
    /// Optional source projection.
    pub projection: Option<Projection>,
    /// Requested facet aggregations.
    pub aggregations: Vec<TermsAggregation>,
}
