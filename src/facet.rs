//! Facet extraction from bucketed aggregation results.

use std::collections::HashMap;

use log::debug;

use crate::engine::response::{RawAggregation, RawResponse};
use crate::result::FacetEntry;

/// Parse bucketed aggregation results into a facet table.
///
/// Only terms-bucket aggregations are recognized; any other aggregation
/// kind degrades gracefully: it is skipped and reported at diagnostic
/// level. A response without aggregations yields an empty map, not a
/// missing value.
pub fn extract_facets(response: &RawResponse) -> HashMap<String, Vec<FacetEntry>> {
    let mut facets = HashMap::new();
    for aggregation in &response.aggregations {
        match aggregation {
            RawAggregation::Terms { name, buckets } => {
                let entries = buckets
                    .iter()
                    .map(|bucket| FacetEntry {
                        value: bucket.key.clone(),
                        count: bucket.doc_count,
                    })
                    .collect();
                facets.insert(name.clone(), entries);
            }
            RawAggregation::Other { name, kind } => {
                debug!("aggregation '{name}' of kind '{kind}' is not a terms facet, ignored");
            }
        }
    }
    facets
}

#[cfg(test)]
mod tests {
    use crate::engine::response::TermsBucket;

    use super::*;

    #[test]
    fn test_no_aggregations_yields_empty_map() {
        let facets = extract_facets(&RawResponse::empty());
        assert!(facets.is_empty());
    }

    #[test]
    fn test_non_terms_aggregations_are_skipped() {
        let response = RawResponse {
            aggregations: vec![
                RawAggregation::Terms {
                    name: "color".to_string(),
                    buckets: vec![TermsBucket {
                        key: "red".to_string(),
                        doc_count: 2,
                    }],
                },
                RawAggregation::Other {
                    name: "weight_stats".to_string(),
                    kind: "stats".to_string(),
                },
            ],
            ..RawResponse::empty()
        };
        let facets = extract_facets(&response);
        assert_eq!(facets.len(), 1);
        assert_eq!(facets["color"][0].value, "red");
        assert_eq!(facets["color"][0].count, 2);
    }
}
