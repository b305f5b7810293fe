//! End-to-end conversion tests through the registry
//!
//! These drive whole conversions the way callers do: a raw external
//! document in one format, a raw external document out in another, always
//! through the canonical pivot.

use activity_babel::{FormatRegistry, Options};
use serde_json::{json, Value};

fn registry() -> FormatRegistry {
    FormatRegistry::with_defaults()
}

#[test]
fn test_atom_entry_to_canonical() {
    // an Atom entry with a title that just previews the content parses as a
    // plain note
    let doc = r#"<entry xmlns="http://www.w3.org/2005/Atom">
        <title>Hello</title>
        <content>Hello world</content>
        <author><name>Ann</name></author>
    </entry>"#;

    let parsed = registry()
        .to_canonical(doc, "atom", &Options::new())
        .unwrap();
    let activity = &parsed.value[0];
    let obj = activity.first_object().unwrap();

    assert_eq!(obj.object_type.as_deref(), Some("note"));
    assert_eq!(obj.content.as_deref(), Some("Hello world"));
    let actor = activity.actor.as_deref().unwrap().to_object();
    assert_eq!(actor.display_name.as_deref(), Some("Ann"));
}

#[test]
fn test_minimal_hentry_to_canonical() {
    let doc = r#"<div class="h-entry"><p class="p-name">hi</p></div>"#;
    let parsed = registry()
        .to_canonical(doc, "mf2-html", &Options::new())
        .unwrap();
    let obj = &parsed.value[0];
    assert_eq!(obj.object_type.as_deref(), Some("note"));
    assert_eq!(obj.content.as_deref(), Some("hi"));
}

#[test]
fn test_canonical_mention_to_record_facet() {
    // byte range of the derived facet, sliced from the UTF-8 text, must be
    // exactly the mention
    let doc = json!({
        "objectType": "note",
        "content": "hi @ann",
        "tags": [{"objectType": "mention", "url": "https://x/ann",
                  "startIndex": 3, "length": 4}],
    })
    .to_string();

    let out = registry()
        .convert(&doc, "as1", "bluesky", &Options::new())
        .unwrap();
    let record: Value = serde_json::from_str(&out.value).unwrap();

    let text = record["text"].as_str().unwrap();
    let start = record["facets"][0]["index"]["byteStart"].as_u64().unwrap() as usize;
    let end = record["facets"][0]["index"]["byteEnd"].as_u64().unwrap() as usize;
    assert_eq!(&text[start..end], "@ann");
}

#[test]
fn test_atom_to_mf2_html_through_pivot() {
    let doc = r#"<entry xmlns="http://www.w3.org/2005/Atom">
        <id>tag:x,2013:1</id>
        <title>Hello</title>
        <content>Hello world</content>
        <author><name>Ann</name></author>
    </entry>"#;

    let out = registry()
        .convert(doc, "atom", "mf2-html", &Options::new())
        .unwrap();
    assert!(out.value.contains("h-entry"));
    assert!(out.value.contains("Hello world"));
    assert!(out.value.contains("Ann"));
}

#[test]
fn test_as2_note_to_rss_item() {
    let doc = json!({
        "@context": "https://www.w3.org/ns/activitystreams",
        "type": "Note",
        "id": "http://x/post/1",
        "url": "http://x/post/1",
        "content": "<p>big news</p>",
        "published": "2013-02-10T14:04:03+00:00",
        "attributedTo": {"type": "Person", "name": "Ann"},
    })
    .to_string();

    let out = registry()
        .convert(&doc, "as2", "rss", &Options::new())
        .unwrap();
    assert!(out.value.contains("<rss version=\"2.0\""));
    assert!(out.value.contains("<content:encoded><![CDATA[<p>big news</p>]]></content:encoded>"));
    assert!(out.value.contains("<guid isPermaLink=\"true\">http://x/post/1</guid>"));
}

#[test]
fn test_nostr_note_to_as2() {
    let doc = json!({
        "kind": 1,
        "pubkey": "ab12ab12ab12ab12ab12ab12ab12ab12ab12ab12ab12ab12ab12ab12ab12ab12",
        "created_at": 1672531200,
        "content": "hello from the relay",
        "tags": [["t", "rust"]],
    })
    .to_string();

    let out = registry()
        .convert(&doc, "nostr", "as2", &Options::new())
        .unwrap();
    let value: Value = serde_json::from_str(&out.value).unwrap();
    assert_eq!(value["type"], "Note");
    assert_eq!(value["content"], "hello from the relay");
    assert_eq!(value["tag"][0]["type"], "Hashtag");
}

#[test]
fn test_convert_unknown_format_errors() {
    let result = registry().convert("{}", "as1", "gopher", &Options::new());
    assert!(result.is_err());
}

#[test]
fn test_determinism_across_calls() {
    let doc = json!({
        "objectType": "note",
        "content": "same in, same out #always",
        "url": "http://x/post/9",
    })
    .to_string();

    let registry = registry();
    for target in ["as2", "mf2-json", "atom", "rss", "json-feed", "bluesky", "nostr", "xml"] {
        let first = registry
            .convert(&doc, "as1", target, &Options::new())
            .unwrap();
        let second = registry
            .convert(&doc, "as1", target, &Options::new())
            .unwrap();
        assert_eq!(first.value, second.value, "{target} output not deterministic");
    }
}

#[test]
fn test_canonical_survives_pivot_formats() {
    // round-trip through each self-inverse format, comparing canonical
    // objects modulo each format's documented exclusions
    let doc = json!({
        "objectType": "note",
        "id": "tag:x,2013:1",
        "url": "http://x/post/1",
        "content": "plain words here",
        "published": "2013-02-10T14:04:03+00:00",
    })
    .to_string();

    let registry = registry();
    let original = registry
        .to_canonical(&doc, "as1", &Options::new())
        .unwrap()
        .value;

    for format in ["as1", "xml", "mf2-json"] {
        let rendered = registry
            .from_canonical(&original, format, &Options::new())
            .unwrap();
        let back = registry
            .to_canonical(&rendered.value, format, &Options::new())
            .unwrap();
        let obj = &back.value[0];
        assert_eq!(obj.content.as_deref(), Some("plain words here"), "{format}");
        assert_eq!(obj.url.as_deref(), Some("http://x/post/1"), "{format}");
        assert_eq!(
            obj.published.as_deref(),
            Some("2013-02-10T14:04:03+00:00"),
            "{format}"
        );
    }
}

#[test]
fn test_warnings_surface_through_convert() {
    // an unsupported record type on the input side must show up in the
    // warning side channel, not vanish
    let doc = json!({"$type": "app.bsky.feed.generator"}).to_string();
    let result = registry().to_canonical(&doc, "bluesky", &Options::new()).unwrap();
    assert!(result.value.is_empty());
    assert!(result
        .warnings
        .iter()
        .any(|w| w.message.contains("app.bsky.feed.generator")));
}
