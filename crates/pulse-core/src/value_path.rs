//! Dotted-path lookups over serialized records, used to build search matches from a field list.
//!
//! Only the search helpers walk values dynamically; everything else uses typed fields.

use crate::adapter::SearchMatch;
use serde::Serialize;
use serde_json::Value;

/// Follows `path` (`"meta.tags.0"`) through objects and arrays.
pub fn resolve<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return Some(value);
    }
    path.split('.').try_fold(value, |current, segment| match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

/// Searchable text in `value`: strings, numbers and booleans, flattening arrays.
pub fn text_fragments(value: &Value) -> Vec<String> {
    match value {
        Value::String(s) => vec![s.clone()],
        Value::Number(n) => vec![n.to_string()],
        Value::Bool(b) => vec![b.to_string()],
        Value::Array(items) => items.iter().flat_map(text_fragments).collect(),
        Value::Null | Value::Object(_) => Vec::new(),
    }
}

/// Which fields of a record collection are searchable and how matches are labeled.
#[derive(Debug, Clone)]
pub struct SearchIndex<'a> {
    pub kind: &'a str,
    pub label_path: &'a str,
    pub fields: &'a [&'a str],
}

/// Case-insensitive substring search over `records`. At most one match per (record, field).
pub fn search_records<T: Serialize>(records: &[T], index: &SearchIndex<'_>, query: &str) -> Vec<SearchMatch> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return Vec::new();
    }
    let mut matches = Vec::new();
    for record in records {
        let Ok(value) = serde_json::to_value(record) else { continue };
        let label = resolve(&value, index.label_path)
            .and_then(|v| text_fragments(v).into_iter().next())
            .unwrap_or_default();
        for field in index.fields {
            let Some(found) = resolve(&value, field) else { continue };
            if let Some(hit) = text_fragments(found)
                .into_iter()
                .find(|text| text.to_lowercase().contains(&needle))
            {
                matches.push(SearchMatch {
                    kind: index.kind.to_string(),
                    label: label.clone(),
                    value: hit,
                    field: (*field).to_string(),
                });
            }
        }
    }
    matches
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn resolve_walks_objects_and_arrays() {
        let v = json!({"meta": {"tags": ["work", "ideas"]}, "title": "Plan"});
        assert_eq!(resolve(&v, "meta.tags.1"), Some(&json!("ideas")));
        assert_eq!(resolve(&v, "title"), Some(&json!("Plan")));
        assert_eq!(resolve(&v, "meta.missing"), None);
        assert_eq!(resolve(&v, "title.0"), None);
    }

    #[test]
    fn search_matches_each_field_once() {
        let records = vec![
            json!({"title": "Garden plan", "content": "plant tomatoes", "tags": ["garden", "spring"]}),
            json!({"title": "Groceries", "content": "milk", "tags": []}),
        ];
        let index = SearchIndex {
            kind: "note",
            label_path: "title",
            fields: &["title", "content", "tags"],
        };
        let hits = search_records(&records, &index, "GARDEN");
        assert_eq!(hits.len(), 2);
        assert!(hits.iter().all(|m| m.label == "Garden plan" && m.kind == "note"));
        assert_eq!(hits[1].field, "tags");
        assert!(search_records(&records, &index, "  ").is_empty());
    }
}
