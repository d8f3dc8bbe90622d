use std::sync::Arc;

use serde::Deserialize;
use serde_json::json;

use acorus::{EntityMapping, Filters, MemoryEngine, SearchClient, SearchPage, TypeRegistry};

#[derive(Debug, Clone, PartialEq, Deserialize)]
struct Widget {
    id: String,
    color: Option<String>,
    size: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
struct Gadget {
    id: String,
    label: String,
}

fn seeded_client() -> SearchClient {
    let registry = Arc::new(
        TypeRegistry::builder()
            .register::<Widget>(
                EntityMapping::new("widgets", "widget").with_facets(["color", "size"]),
            )
            .register::<Gadget>(EntityMapping::new("gadgets", "gadget"))
            .build(),
    );

    let engine = Arc::new(MemoryEngine::new());
    engine.index(
        "widgets",
        "widget",
        json!({"id": "1", "color": "red", "size": "s"}),
    );
    engine.index(
        "widgets",
        "widget",
        json!({"id": "2", "color": "red", "size": "xl"}),
    );
    engine.index(
        "widgets",
        "widget",
        json!({"id": "3", "color": "blue", "size": "xl"}),
    );
    engine.index("gadgets", "gadget", json!({"id": "g1", "label": "gizmo"}));
    SearchClient::new(registry, engine)
}

#[test]
fn test_faceted_search_counts_declared_fields() -> acorus::Result<()> {
    let client = seeded_client();
    let result = client.faceted_search::<Widget>(None, &Filters::new(), None, 0, 10)?;

    assert_eq!(result.page.total, 3);
    assert_eq!(result.facets.len(), 2);

    let colors = &result.facets["color"];
    assert_eq!(colors[0].value, "red");
    assert_eq!(colors[0].count, 2);
    assert_eq!(colors[1].value, "blue");
    assert_eq!(colors[1].count, 1);

    let sizes = &result.facets["size"];
    assert_eq!(sizes[0].value, "xl");
    assert_eq!(sizes[0].count, 2);
    Ok(())
}

#[test]
fn test_facets_follow_the_filtered_match_set() -> acorus::Result<()> {
    let client = seeded_client();
    let filters = Filters::new().with("size", ["xl"]);
    let result = client.faceted_search::<Widget>(None, &filters, None, 0, 10)?;

    assert_eq!(result.page.total, 2);
    let colors = &result.facets["color"];
    assert_eq!(colors.len(), 2);
    assert!(colors.iter().all(|entry| entry.count == 1));
    Ok(())
}

#[test]
fn test_type_without_facet_fields_yields_empty_map() -> acorus::Result<()> {
    let client = seeded_client();
    let result = client.faceted_search::<Gadget>(None, &Filters::new(), None, 0, 10)?;
    assert_eq!(result.page.total, 1);
    assert!(result.facets.is_empty());
    Ok(())
}

#[test]
fn test_zero_hit_faceted_search_keeps_empty_buckets() -> acorus::Result<()> {
    let client = seeded_client();
    let filters = Filters::new().with("color", ["green"]);
    let result = client.faceted_search::<Widget>(None, &filters, None, 0, 10)?;

    assert_eq!(result.page, SearchPage::empty());
    // The aggregations were still requested and returned, just with no
    // buckets: the facet map is present and empty per facet.
    assert!(result.facets["color"].is_empty());
    Ok(())
}
