//! Record parsing (AT lexicon records → canonical)

use activity_model::{Object, Reference, Tag};
use serde_json::{Map, Value};

use super::facet::facet_to_tag;
use super::{FOLLOW, LIKE, POST, PROFILE, REPOST};
use crate::error::ConvertError;
use crate::warnings::{Conversion, Report};

pub fn parse(doc: &str) -> Result<Conversion<Vec<Object>>, ConvertError> {
    let value: Value = serde_json::from_str(doc)?;
    let mut report = Report::new("bluesky");

    let record = value
        .as_object()
        .ok_or_else(|| ConvertError::Parse("expected a record object".to_string()))?;
    let record_type = record
        .get("$type")
        .and_then(Value::as_str)
        .ok_or_else(|| ConvertError::Parse("record has no $type".to_string()))?;

    let objects = match record_type {
        t if t == POST => vec![parse_post(record, &mut report)],
        t if t == PROFILE => vec![parse_profile(record)],
        t if t == LIKE => vec![parse_subject_activity(record, "like")],
        t if t == REPOST => vec![parse_subject_activity(record, "share")],
        t if t == FOLLOW => vec![parse_follow(record)],
        other => {
            report.warn("$type", format!("unsupported record type {other}, dropped"));
            Vec::new()
        }
    };

    Ok(report.finish(objects))
}

fn parse_post(record: &Map<String, Value>, report: &mut Report) -> Object {
    let mut obj = Object::of_type("note");

    let text = record
        .get("text")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    obj.published = record
        .get("createdAt")
        .and_then(Value::as_str)
        .map(str::to_string);

    // facets come back as span tags, byte offsets re-derived as codepoints
    for facet in record
        .get("facets")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
    {
        if let Some(tag) = facet_to_tag(facet, &text, report) {
            obj.tags.push(tag);
        }
    }

    // standalone hashtags have no position in the text
    for name in record
        .get("tags")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
    {
        obj.tags.push(Tag {
            object_type: Some("hashtag".to_string()),
            display_name: Some(name.to_string()),
            ..Tag::default()
        });
    }

    obj.content = Some(text).filter(|t| !t.is_empty());

    if let Some(parent) = record
        .get("reply")
        .and_then(|r| r.get("parent"))
        .and_then(|p| p.get("uri"))
        .and_then(Value::as_str)
    {
        obj.in_reply_to.push(Reference::Id(parent.to_string()));
        obj.object_type = Some("comment".to_string());
    }

    if let Some(embed) = record.get("embed") {
        parse_embed(embed, &mut obj, report);
    }

    obj
}

fn parse_embed(embed: &Value, obj: &mut Object, report: &mut Report) {
    match embed.get("$type").and_then(Value::as_str) {
        Some(t) if t == super::EMBED_IMAGES => {
            for image in embed
                .get("images")
                .and_then(Value::as_array)
                .into_iter()
                .flatten()
            {
                let mut img = Object::of_type("image");
                img.display_name = image
                    .get("alt")
                    .and_then(Value::as_str)
                    .filter(|alt| !alt.is_empty())
                    .map(str::to_string);
                // blob refs address content, not locations; the CDN URL
                // needs repo context this record doesn't carry
                if let Some(cid) = image
                    .get("image")
                    .and_then(|b| b.get("ref"))
                    .and_then(|r| r.get("$link"))
                    .and_then(Value::as_str)
                {
                    img.extra
                        .insert("blobCid".to_string(), Value::String(cid.to_string()));
                }
                obj.image.push(Reference::object(img));
            }
        }
        Some(t) if t == super::EMBED_EXTERNAL => {
            if let Some(external) = embed.get("external") {
                let mut att = Object::of_type("link");
                att.url = external
                    .get("uri")
                    .and_then(Value::as_str)
                    .map(str::to_string);
                att.display_name = external
                    .get("title")
                    .and_then(Value::as_str)
                    .filter(|t| !t.is_empty())
                    .map(str::to_string);
                att.summary = external
                    .get("description")
                    .and_then(Value::as_str)
                    .filter(|d| !d.is_empty())
                    .map(str::to_string);
                obj.attachments.push(att);
            }
        }
        Some(t) if t == super::EMBED_RECORD => {
            if let Some(uri) = embed
                .get("record")
                .and_then(|r| r.get("uri"))
                .and_then(Value::as_str)
            {
                let mut att = Object::of_type("note");
                att.id = Some(uri.to_string());
                att.url = Some(uri.to_string());
                obj.attachments.push(att);
            }
        }
        other => report.warn("embed", format!("unsupported embed type {other:?}, dropped")),
    }
}

fn parse_profile(record: &Map<String, Value>) -> Object {
    let mut obj = Object::of_type("person");
    obj.display_name = record
        .get("displayName")
        .and_then(Value::as_str)
        .map(str::to_string);
    obj.summary = record
        .get("description")
        .and_then(Value::as_str)
        .map(str::to_string);
    obj
}

fn parse_subject_activity(record: &Map<String, Value>, verb: &str) -> Object {
    let mut obj = Object::of_type("activity");
    obj.verb = Some(verb.to_string());
    if let Some(uri) = record
        .get("subject")
        .and_then(|s| s.get("uri"))
        .and_then(Value::as_str)
    {
        obj.objects.push(Reference::Id(uri.to_string()));
    }
    obj.published = record
        .get("createdAt")
        .and_then(Value::as_str)
        .map(str::to_string);
    obj
}

fn parse_follow(record: &Map<String, Value>) -> Object {
    let mut obj = Object::of_type("activity");
    obj.verb = Some("follow".to_string());
    if let Some(did) = record.get("subject").and_then(Value::as_str) {
        obj.objects.push(Reference::Id(did.to_string()));
    }
    obj.published = record
        .get("createdAt")
        .and_then(Value::as_str)
        .map(str::to_string);
    obj
}

#[cfg(test)]
mod tests {
    use super::super::BlueskyFormat;
    use crate::format::{Blob, BlobResolver, Format, Options};
    use serde_json::{json, Value};
    use std::collections::HashMap;

    fn canonical(value: serde_json::Value) -> Vec<activity_model::Object> {
        vec![serde_json::from_value(value).unwrap()]
    }

    #[test]
    fn test_mention_facet_byte_slice_is_the_mention() {
        let objs = canonical(json!({
            "objectType": "note",
            "content": "hi @ann",
            "tags": [{"objectType": "mention", "url": "https://x/ann",
                      "startIndex": 3, "length": 4}],
        }));
        let out = BlueskyFormat
            .from_canonical(&objs, &Options::new())
            .unwrap()
            .value;
        let record: Value = serde_json::from_str(&out).unwrap();

        assert_eq!(record["$type"], "app.bsky.feed.post");
        let facet = &record["facets"][0];
        let text = record["text"].as_str().unwrap();
        let start = facet["index"]["byteStart"].as_u64().unwrap() as usize;
        let end = facet["index"]["byteEnd"].as_u64().unwrap() as usize;
        assert_eq!(&text.as_bytes()[start..end], b"@ann");
    }

    #[test]
    fn test_facet_bytes_with_multibyte_content() {
        let objs = canonical(json!({
            "objectType": "note",
            "content": "😀😀 @ann",
            "tags": [{"objectType": "mention", "url": "did:plc:abc",
                      "startIndex": 3, "length": 4}],
        }));
        let out = BlueskyFormat
            .from_canonical(&objs, &Options::new())
            .unwrap()
            .value;
        let record: Value = serde_json::from_str(&out).unwrap();

        let facet = &record["facets"][0];
        assert_eq!(facet["features"][0]["$type"], "app.bsky.richtext.facet#mention");
        assert_eq!(facet["features"][0]["did"], "did:plc:abc");
        let text = record["text"].as_str().unwrap();
        let start = facet["index"]["byteStart"].as_u64().unwrap() as usize;
        let end = facet["index"]["byteEnd"].as_u64().unwrap() as usize;
        assert_eq!(&text[start..end], "@ann");
    }

    #[test]
    fn test_post_round_trip_with_facets() {
        let objs = canonical(json!({
            "objectType": "note",
            "content": "reading about #rust today",
            "published": "2024-01-01T00:00:00.000Z",
            "tags": [{"objectType": "hashtag", "displayName": "rust",
                      "startIndex": 14, "length": 5}],
        }));
        let out = BlueskyFormat
            .from_canonical(&objs, &Options::new())
            .unwrap()
            .value;
        let back = BlueskyFormat.to_canonical(&out, &Options::new()).unwrap();
        let obj = &back.value[0];

        assert_eq!(obj.content.as_deref(), Some("reading about #rust today"));
        assert_eq!(obj.published.as_deref(), Some("2024-01-01T00:00:00.000Z"));
        let tag = &obj.tags[0];
        assert_eq!(tag.object_type.as_deref(), Some("hashtag"));
        assert_eq!(tag.display_name.as_deref(), Some("rust"));
        assert_eq!((tag.start_index, tag.length), (Some(14), Some(5)));
    }

    #[test]
    fn test_truncation_appends_permalink_with_facet() {
        let long = "word ".repeat(100);
        let objs = canonical(json!({
            "objectType": "note",
            "url": "https://x/post/1",
            "content": long,
        }));
        let out = BlueskyFormat
            .from_canonical(&objs, &Options::new())
            .unwrap()
            .value;
        let record: Value = serde_json::from_str(&out).unwrap();
        let text = record["text"].as_str().unwrap();

        assert!(text.ends_with("https://x/post/1"));
        assert!(text.contains('…'));
        assert!(activity_model::text::grapheme_len(text) <= 300);

        // last facet links the appended permalink
        let facets = record["facets"].as_array().unwrap();
        let last = facets.last().unwrap();
        assert_eq!(last["features"][0]["uri"], "https://x/post/1");
    }

    #[test]
    fn test_reply_without_at_uri_is_validation_error() {
        let objs = canonical(json!({
            "objectType": "comment",
            "content": "me too",
            "inReplyTo": "https://example.com/post/1",
        }));
        let result = BlueskyFormat.from_canonical(&objs, &Options::new());
        assert!(matches!(
            result,
            Err(crate::error::ConvertError::Validation(_))
        ));
    }

    #[test]
    fn test_reply_with_at_uri() {
        let objs = canonical(json!({
            "objectType": "comment",
            "content": "me too",
            "inReplyTo": "at://did:plc:abc/app.bsky.feed.post/123",
        }));
        let out = BlueskyFormat
            .from_canonical(&objs, &Options::new())
            .unwrap()
            .value;
        let record: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(
            record["reply"]["parent"]["uri"],
            "at://did:plc:abc/app.bsky.feed.post/123"
        );
    }

    #[test]
    fn test_images_preferred_over_external_embed() {
        let mut blobs: HashMap<String, Blob> = HashMap::new();
        blobs.insert(
            "https://x/cat.jpg".to_string(),
            Blob {
                cid: "bafyCat".to_string(),
                mime_type: "image/jpeg".to_string(),
                size: 1234,
            },
        );
        let mut options = Options::new();
        options.blobs = Some(&blobs as &dyn BlobResolver);

        let objs = canonical(json!({
            "objectType": "note",
            "content": "cat + link",
            "image": [{"url": "https://x/cat.jpg", "displayName": "a cat"}],
            "attachments": [{"objectType": "article",
                             "url": "https://example.com/story",
                             "displayName": "A story"}],
        }));
        let out = BlueskyFormat.from_canonical(&objs, &options).unwrap();
        let record: Value = serde_json::from_str(&out.value).unwrap();

        assert_eq!(record["embed"]["$type"], "app.bsky.embed.images");
        assert_eq!(record["embed"]["images"][0]["image"]["ref"]["$link"], "bafyCat");
        assert_eq!(record["embed"]["images"][0]["alt"], "a cat");
        // the external link moved into the text instead
        assert!(record["text"].as_str().unwrap().contains("https://example.com/story"));
    }

    #[test]
    fn test_like_record() {
        let objs = canonical(json!({
            "objectType": "activity",
            "verb": "like",
            "object": "at://did:plc:abc/app.bsky.feed.post/123",
        }));
        let out = BlueskyFormat
            .from_canonical(&objs, &Options::new())
            .unwrap()
            .value;
        let record: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(record["$type"], "app.bsky.feed.like");
        assert_eq!(
            record["subject"]["uri"],
            "at://did:plc:abc/app.bsky.feed.post/123"
        );

        let back = BlueskyFormat.to_canonical(&out, &Options::new()).unwrap();
        assert_eq!(back.value[0].verb.as_deref(), Some("like"));
    }

    #[test]
    fn test_profile_truncates_display_name() {
        let long_name = "n".repeat(100);
        let objs = canonical(json!({
            "objectType": "person",
            "displayName": long_name,
            "summary": "plain bio",
        }));
        let out = BlueskyFormat
            .from_canonical(&objs, &Options::new())
            .unwrap()
            .value;
        let record: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(record["$type"], "app.bsky.actor.profile");
        let name = record["displayName"].as_str().unwrap();
        assert!(activity_model::text::grapheme_len(name) <= 64);
        assert_eq!(record["description"], "plain bio");
    }

    #[test]
    fn test_unknown_record_type_drops_with_warning() {
        let doc = json!({"$type": "app.bsky.feed.generator", "did": "did:web:x"}).to_string();
        let parsed = BlueskyFormat.to_canonical(&doc, &Options::new()).unwrap();
        assert!(parsed.value.is_empty());
        assert!(!parsed.warnings.is_empty());
    }
}
