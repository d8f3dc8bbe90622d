//! JSON document helpers shared by the engines and materializers.

use serde_json::{Map, Value};

use crate::query::Projection;

/// Look up a dot-separated field path inside a JSON document.
pub(crate) fn lookup_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = value;
    for segment in path.split('.') {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

/// Collect the scalar values reachable at a field path.
///
/// An array at the path yields its elements, so multi-valued fields (tags)
/// behave like repeated scalars.
pub(crate) fn path_scalars<'a>(value: &'a Value, path: &str) -> Vec<&'a Value> {
    match lookup_path(value, path) {
        Some(Value::Array(items)) => items.iter().collect(),
        Some(Value::Null) | None => Vec::new(),
        Some(v) => vec![v],
    }
}

/// Render a scalar JSON value as the string form used for term matching
/// and facet keys. Objects and arrays have no scalar form.
pub(crate) fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Apply a projection to a document body.
///
/// An empty include set keeps the full document; excludes are applied after
/// includes. Paths that do not exist in the document are ignored.
pub(crate) fn project(source: &Value, projection: Option<&Projection>) -> Value {
    let Some(projection) = projection else {
        return source.clone();
    };
    if projection.is_empty() {
        return source.clone();
    }

    let mut result = if projection.includes.is_empty() {
        source.clone()
    } else {
        let mut picked = Value::Object(Map::new());
        for path in &projection.includes {
            if let Some(value) = lookup_path(source, path) {
                insert_path(&mut picked, path, value.clone());
            }
        }
        picked
    };

    for path in &projection.excludes {
        remove_path(&mut result, path);
    }

    result
}

fn insert_path(target: &mut Value, path: &str, value: Value) {
    let mut current = target;
    let segments: Vec<&str> = path.split('.').collect();
    for segment in &segments[..segments.len() - 1] {
        if !current.is_object() {
            *current = Value::Object(Map::new());
        }
        current = match current {
            Value::Object(map) => map
                .entry(segment.to_string())
                .or_insert_with(|| Value::Object(Map::new())),
            _ => return,
        };
    }
    if !current.is_object() {
        *current = Value::Object(Map::new());
    }
    if let Some(map) = current.as_object_mut() {
        map.insert(segments[segments.len() - 1].to_string(), value);
    }
}

fn remove_path(target: &mut Value, path: &str) {
    let segments: Vec<&str> = path.split('.').collect();
    let mut current = target;
    for segment in &segments[..segments.len() - 1] {
        match current.as_object_mut().and_then(|m| m.get_mut(*segment)) {
            Some(next) => current = next,
            None => return,
        }
    }
    if let Some(map) = current.as_object_mut() {
        map.remove(segments[segments.len() - 1]);
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_lookup_path_nested() {
        let doc = json!({"a": {"b": {"c": 42}}});
        assert_eq!(lookup_path(&doc, "a.b.c"), Some(&json!(42)));
        assert_eq!(lookup_path(&doc, "a.x"), None);
    }

    #[test]
    fn test_path_scalars_flattens_arrays() {
        let doc = json!({"tags": ["red", "blue"]});
        let values = path_scalars(&doc, "tags");
        assert_eq!(values.len(), 2);
    }

    #[test]
    fn test_project_includes_and_excludes() {
        let doc = json!({"id": "1", "name": "widget", "meta": {"secret": true, "kept": 1}});
        let projection = Projection::default()
            .include("id")
            .include("meta")
            .exclude("meta.secret");
        let projected = project(&doc, Some(&projection));
        assert_eq!(projected, json!({"id": "1", "meta": {"kept": 1}}));
    }

    #[test]
    fn test_project_empty_keeps_everything() {
        let doc = json!({"id": "1", "name": "widget"});
        assert_eq!(project(&doc, Some(&Projection::default())), doc);
        assert_eq!(project(&doc, None), doc);
    }
}
