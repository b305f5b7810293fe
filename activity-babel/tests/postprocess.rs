//! Postprocessing pipeline tests over parsed canonical objects

use std::collections::HashMap;

use activity_babel::postprocess::{audience, dedupe, linkify, merge_by_id, Precedence, Visibility};
use activity_model::Object;
use serde_json::json;

fn obj(value: serde_json::Value) -> Object {
    serde_json::from_value(value).unwrap()
}

#[test]
fn test_base_fetch_merged_with_reaction_fetch() {
    // a provider returns the post body and its like tally in two fetches
    let base = obj(json!({
        "id": "tag:x,2013:1",
        "objectType": "note",
        "content": "the post body",
    }));
    let reactions = obj(json!({
        "id": "tag:x,2013:1",
        "likes": {
            "totalItems": 2,
            "items": [
                {"verb": "like", "id": "tag:x,2013:1_like_ann"},
                {"verb": "like", "id": "tag:x,2013:1_like_bob"},
            ],
        },
    }));

    let merged = merge_by_id(&base, &reactions, Precedence::First).unwrap();
    assert_eq!(merged.content.as_deref(), Some("the post body"));
    let likes = merged.likes.unwrap();
    assert_eq!(likes.total_items, Some(2));
    assert_eq!(likes.items.len(), 2);
}

#[test]
fn test_linkify_then_convert_to_record() {
    use activity_babel::{Format, Options};

    let post = obj(json!({
        "objectType": "note",
        "content": "morning @ann",
    }));
    let mut lookup = HashMap::new();
    lookup.insert("ann".to_string(), "did:plc:ann123".to_string());

    let linked = linkify(&post, &lookup);
    assert_eq!(linked.tags.len(), 1);

    // the inserted span flows through to a byte-offset facet
    let out = activity_babel::formats::bluesky::BlueskyFormat
        .from_canonical(&[linked], &Options::new())
        .unwrap();
    let record: serde_json::Value = serde_json::from_str(&out.value).unwrap();
    assert_eq!(
        record["facets"][0]["features"][0]["did"],
        "did:plc:ann123"
    );
}

#[test]
fn test_audience_classification() {
    let public = obj(json!({
        "objectType": "note",
        "to": [{"objectType": "group", "alias": "@public"}],
    }));
    let unlisted = obj(json!({
        "objectType": "note",
        "to": [{"objectType": "group", "alias": "@unlisted"}],
    }));
    let private = obj(json!({
        "objectType": "note",
        "to": ["https://x/ann"],
    }));

    assert_eq!(audience(&public), Visibility::Public);
    assert_eq!(audience(&unlisted), Visibility::Unlisted);
    assert_eq!(audience(&private), Visibility::Private);
}

#[test]
fn test_dedupe_across_merged_sources() {
    let from_feed = obj(json!({"id": "tag:x,1", "content": "from the feed"}));
    let from_fetch = obj(json!({"id": "tag:x,1", "content": "from the fetch"}));
    let other = obj(json!({"id": "tag:x,2"}));

    let out = dedupe(&[from_feed.clone(), from_fetch, other]);
    assert_eq!(out.len(), 2);
    assert_eq!(out[0], from_feed);
}

#[test]
fn test_postprocess_returns_new_objects() {
    let post = obj(json!({
        "objectType": "note",
        "content": "hello #rust",
    }));
    let before = post.clone();
    let _ = linkify(&post, &HashMap::new());
    let _ = audience(&post);
    assert_eq!(post, before);
}
