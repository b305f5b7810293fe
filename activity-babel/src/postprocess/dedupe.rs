//! Duplicate suppression
//!
//! When the same post arrives through more than one source (a feed and a
//! per-post fetch, say), keep the first occurrence of each identity and drop
//! the rest. Objects with no identity at all are kept; there is nothing to
//! match them on.

use std::collections::HashSet;

use activity_model::Object;

/// Drop later duplicates, where identity is the object's id falling back to
/// its first URL. Order is otherwise preserved.
pub fn dedupe(objects: &[Object]) -> Vec<Object> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut out = Vec::new();

    for obj in objects {
        let key = obj
            .id
            .as_deref()
            .or_else(|| obj.first_url())
            .map(str::to_string);
        match key {
            Some(key) => {
                if seen.insert(key) {
                    out.push(obj.clone());
                }
            }
            None => out.push(obj.clone()),
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(value: serde_json::Value) -> Object {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_dedupe_by_id_first_wins() {
        let objects = vec![
            obj(json!({"id": "tag:x,1", "content": "first"})),
            obj(json!({"id": "tag:x,1", "content": "second"})),
            obj(json!({"id": "tag:x,2"})),
        ];
        let out = dedupe(&objects);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].content.as_deref(), Some("first"));
    }

    #[test]
    fn test_dedupe_falls_back_to_url() {
        let objects = vec![
            obj(json!({"url": "http://x/1"})),
            obj(json!({"url": "http://x/1"})),
        ];
        assert_eq!(dedupe(&objects).len(), 1);
    }

    #[test]
    fn test_identity_less_objects_kept() {
        let objects = vec![
            obj(json!({"content": "a"})),
            obj(json!({"content": "a"})),
        ];
        assert_eq!(dedupe(&objects).len(), 2);
    }
}
