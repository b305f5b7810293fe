//! Merge two partial fetches of the same object
//!
//! Providers often return a base object and a separately fetched enrichment
//! (reaction tallies, reply collections) for the same id. `merge_by_id`
//! unions the two into one object: scalars follow the declared precedence,
//! lists concatenate and de-duplicate.
//!
//! The original behavior this replaces resolved conflicting non-null scalars
//! by call order, which was ambiguous. Precedence is therefore an explicit
//! parameter here, never an accident of argument position.

use activity_model::Object;
use serde_json::{Map, Value};

use crate::error::ConvertError;

/// Which side wins when both carry a non-null scalar for the same field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Precedence {
    /// The first argument's scalars win.
    #[default]
    First,
    /// The second argument's scalars win.
    Second,
}

/// Merge `b` into `a`, which must share the same id.
///
/// Scalar fields prefer the non-null value, with `precedence` breaking
/// genuine conflicts. List fields concatenate, de-duplicate by
/// `(objectType, id-or-url)` identity, and sort by that identity, which
/// makes the merge idempotent and order-independent. Nested objects merge
/// recursively.
pub fn merge_by_id(a: &Object, b: &Object, precedence: Precedence) -> Result<Object, ConvertError> {
    if a.id.is_some() && b.id.is_some() && a.id != b.id {
        return Err(ConvertError::Validation(format!(
            "refusing to merge objects with different ids: {:?} vs {:?}",
            a.id, b.id
        )));
    }

    let (first, second) = match precedence {
        Precedence::First => (a, b),
        Precedence::Second => (b, a),
    };

    let left = serde_json::to_value(first)?;
    let right = serde_json::to_value(second)?;
    let merged = merge_values(left, right);
    Ok(serde_json::from_value(merged)?)
}

fn merge_values(left: Value, right: Value) -> Value {
    match (left, right) {
        (Value::Null, right) => right,
        (left, Value::Null) => left,
        (Value::Object(l), Value::Object(r)) => Value::Object(merge_maps(l, r)),
        (Value::Array(l), Value::Array(r)) => Value::Array(merge_lists(l, r)),
        // scalar conflict: the precedence side was placed on the left
        (left, _) => left,
    }
}

fn merge_maps(mut left: Map<String, Value>, right: Map<String, Value>) -> Map<String, Value> {
    for (key, r_val) in right {
        match left.remove(&key) {
            Some(l_val) => {
                left.insert(key, merge_values(l_val, r_val));
            }
            None => {
                left.insert(key, r_val);
            }
        }
    }
    left
}

fn merge_lists(left: Vec<Value>, right: Vec<Value>) -> Vec<Value> {
    let mut merged: Vec<Value> = Vec::new();
    let mut keys: Vec<String> = Vec::new();

    for item in left.into_iter().chain(right) {
        let key = identity_key(&item);
        if !keys.contains(&key) {
            keys.push(key);
            merged.push(item);
        }
    }

    // identity-sorted, so merge order can't influence the result
    let mut keyed: Vec<(String, Value)> = merged
        .into_iter()
        .map(|item| (identity_key(&item), item))
        .collect();
    keyed.sort_by(|(ka, _), (kb, _)| ka.cmp(kb));
    keyed.into_iter().map(|(_, item)| item).collect()
}

/// De-duplication identity for list items: `(objectType, id-or-url)` for
/// objects, the value itself otherwise.
fn identity_key(item: &Value) -> String {
    match item {
        Value::Object(map) => {
            let object_type = map.get("objectType").and_then(Value::as_str).unwrap_or("");
            let id = map
                .get("id")
                .or_else(|| map.get("url"))
                .and_then(Value::as_str)
                .map(str::to_string)
                // identity-less items fall back to their full serialization
                .unwrap_or_else(|| item.to_string());
            format!("{object_type}\u{0}{id}")
        }
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(value: serde_json::Value) -> Object {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_merge_fills_missing_fields_both_ways() {
        let base = obj(json!({"id": "tag:x,1", "content": "hello"}));
        let enriched = obj(json!({
            "id": "tag:x,1",
            "likes": {"totalItems": 3, "items": [{"verb": "like", "id": "tag:x,like1"}]},
        }));

        let merged = merge_by_id(&base, &enriched, Precedence::First).unwrap();
        assert_eq!(merged.content.as_deref(), Some("hello"));
        assert_eq!(merged.likes.as_ref().unwrap().total_items, Some(3));
    }

    #[test]
    fn test_merge_scalar_conflict_follows_precedence() {
        let a = obj(json!({"id": "tag:x,1", "content": "from a"}));
        let b = obj(json!({"id": "tag:x,1", "content": "from b"}));

        let first = merge_by_id(&a, &b, Precedence::First).unwrap();
        assert_eq!(first.content.as_deref(), Some("from a"));

        let second = merge_by_id(&a, &b, Precedence::Second).unwrap();
        assert_eq!(second.content.as_deref(), Some("from b"));
    }

    #[test]
    fn test_merge_lists_concat_and_dedupe() {
        let a = obj(json!({
            "id": "tag:x,1",
            "tags": [
                {"objectType": "hashtag", "url": "http://x/t/rust"},
                {"objectType": "mention", "url": "http://x/ann"},
            ],
        }));
        let b = obj(json!({
            "id": "tag:x,1",
            "tags": [
                {"objectType": "hashtag", "url": "http://x/t/rust"},
                {"objectType": "mention", "url": "http://x/bob"},
            ],
        }));

        let merged = merge_by_id(&a, &b, Precedence::First).unwrap();
        assert_eq!(merged.tags.len(), 3);
    }

    #[test]
    fn test_merge_idempotent() {
        let a = obj(json!({
            "id": "tag:x,1",
            "content": "hello",
            "tags": [{"objectType": "hashtag", "displayName": "rust"}],
        }));
        assert_eq!(merge_by_id(&a, &a, Precedence::First).unwrap(), a);
    }

    #[test]
    fn test_merge_list_fields_commutative() {
        let a = obj(json!({
            "id": "tag:x,1",
            "attachments": [{"objectType": "image", "url": "http://x/1.jpg"}],
        }));
        let b = obj(json!({
            "id": "tag:x,1",
            "attachments": [{"objectType": "image", "url": "http://x/2.jpg"}],
        }));

        let ab = merge_by_id(&a, &b, Precedence::First).unwrap();
        let ba = merge_by_id(&b, &a, Precedence::First).unwrap();
        assert_eq!(ab.attachments, ba.attachments);
    }

    #[test]
    fn test_merge_rejects_different_ids() {
        let a = obj(json!({"id": "tag:x,1"}));
        let b = obj(json!({"id": "tag:x,2"}));
        assert!(merge_by_id(&a, &b, Precedence::First).is_err());
    }
}
