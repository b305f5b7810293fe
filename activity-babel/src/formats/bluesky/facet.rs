//! Facet offset translation
//!
//! Canonical span tags count codepoints; facets count UTF-8 bytes of the
//! post text. The two are not interchangeable, so every facet's index is
//! re-derived against the encoded text here, and byte ranges coming back in
//! are snapped to codepoint boundaries before they become span tags.
//! Corrections are logged and reported, never silently applied.

use activity_model::text::{byte_span, char_span};
use activity_model::Tag;
use serde_json::{json, Value};

use super::{did_from_url, FACET, FACET_LINK, FACET_MENTION, FACET_TAG};
use crate::warnings::Report;

/// Build a facet for one span tag against `text`, or None when the tag
/// can't be expressed (no feature to carry, or span entirely outside the
/// kept text).
///
/// `text_byte_end` bounds facets to the portion of the text that survived
/// truncation.
pub(super) fn tag_to_facet(
    tag: &Tag,
    text: &str,
    text_byte_end: usize,
    report: &mut Report,
) -> Option<Value> {
    let (start, len) = (tag.start_index?, tag.length?);
    let (range, snapped) = byte_span(text, start, len);
    if snapped {
        report.warn(
            "facets.index",
            format!("span {start}+{len} fell outside the text, snapped to byte range {range:?}"),
        );
    }
    if range.start >= text_byte_end {
        report.warn(
            "facets.index",
            format!("span at byte {} is past the truncated text, dropped", range.start),
        );
        return None;
    }
    let byte_end = range.end.min(text_byte_end);

    let feature = feature_for(tag, report)?;
    Some(json!({
        "$type": FACET,
        "index": {
            "byteStart": range.start,
            "byteEnd": byte_end,
        },
        "features": [feature],
    }))
}

fn feature_for(tag: &Tag, report: &mut Report) -> Option<Value> {
    let name = tag
        .display_name
        .as_deref()
        .map(|n| n.trim().trim_start_matches(['@', '#']).to_string());

    match tag.object_type.as_deref() {
        Some("hashtag") => {
            let name = name.filter(|n| !n.is_empty())?;
            Some(json!({"$type": FACET_TAG, "tag": name}))
        }
        Some("mention") => {
            let url = tag.url.as_deref().or(tag.id.as_deref())?;
            match did_from_url(url) {
                Some(did) => Some(json!({"$type": FACET_MENTION, "did": did})),
                // keep the profile link when the DID can't be derived
                None => Some(json!({"$type": FACET_LINK, "uri": url})),
            }
        }
        Some("link" | "article") | None => {
            let url = tag.url.as_deref().or(tag.id.as_deref())?;
            Some(json!({"$type": FACET_LINK, "uri": url}))
        }
        Some(other) => {
            report.warn("facets", format!("no facet feature for tag type '{other}'"));
            None
        }
    }
}

/// Convert one inbound facet back to a canonical span tag.
pub(super) fn facet_to_tag(facet: &Value, text: &str, report: &mut Report) -> Option<Tag> {
    let index = facet.get("index")?;
    let byte_start = index.get("byteStart").and_then(Value::as_u64)? as usize;
    let byte_end = index.get("byteEnd").and_then(Value::as_u64)? as usize;

    let ((start, len), snapped) = char_span(text, byte_start, byte_end);
    if snapped {
        report.warn(
            "facets.index",
            format!(
                "byte range {byte_start}..{byte_end} does not fall on codepoint boundaries, snapped"
            ),
        );
    }

    let feature = facet.get("features").and_then(|f| f.as_array()?.first())?;
    let mut tag = Tag {
        start_index: Some(start),
        length: Some(len),
        ..Tag::default()
    };
    match feature.get("$type").and_then(Value::as_str) {
        Some(t) if t == FACET_MENTION => {
            tag.object_type = Some("mention".to_string());
            tag.url = feature
                .get("did")
                .and_then(Value::as_str)
                .map(str::to_string);
        }
        Some(t) if t == FACET_TAG => {
            tag.object_type = Some("hashtag".to_string());
            tag.display_name = feature
                .get("tag")
                .and_then(Value::as_str)
                .map(str::to_string);
        }
        Some(t) if t == FACET_LINK => {
            tag.object_type = Some("link".to_string());
            tag.url = feature
                .get("uri")
                .and_then(Value::as_str)
                .map(str::to_string);
        }
        other => {
            report.warn("facets.features", format!("unknown feature {other:?}, dropped"));
            return None;
        }
    }

    // carry the covered text as the display name when the feature has none
    if tag.display_name.is_none() {
        let (range, _) = byte_span(text, start, len);
        tag.display_name = Some(text[range].to_string()).filter(|t| !t.is_empty());
    }

    Some(tag)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::warnings::Report;

    fn mention(start: usize, len: usize) -> Tag {
        Tag {
            object_type: Some("mention".to_string()),
            url: Some("did:plc:abc".to_string()),
            display_name: Some("@ann".to_string()),
            start_index: Some(start),
            length: Some(len),
            ..Tag::default()
        }
    }

    #[test]
    fn test_ascii_offsets_match_bytes() {
        let text = "hi @ann";
        let mut report = Report::new("bluesky");
        let facet = tag_to_facet(&mention(3, 4), text, text.len(), &mut report).unwrap();

        assert_eq!(facet["index"]["byteStart"], 3);
        assert_eq!(facet["index"]["byteEnd"], 7);
        assert_eq!(&text.as_bytes()[3..7], b"@ann");
    }

    #[test]
    fn test_multibyte_prefix_shifts_byte_offsets() {
        // the emoji is 1 codepoint but 4 UTF-8 bytes
        let text = "😀 @ann yo";
        let mut report = Report::new("bluesky");
        let facet = tag_to_facet(&mention(2, 4), text, text.len(), &mut report).unwrap();

        let start = facet["index"]["byteStart"].as_u64().unwrap() as usize;
        let end = facet["index"]["byteEnd"].as_u64().unwrap() as usize;
        assert_eq!(&text[start..end], "@ann");
        assert!(report.finish(()).warnings.is_empty());
    }

    #[test]
    fn test_round_trip_through_bytes() {
        let text = "héllo @ann 😀";
        let mut report = Report::new("bluesky");
        let facet = tag_to_facet(&mention(6, 4), text, text.len(), &mut report).unwrap();
        let tag = facet_to_tag(&facet, text, &mut report).unwrap();

        assert_eq!(tag.start_index, Some(6));
        assert_eq!(tag.length, Some(4));
        assert_eq!(tag.object_type.as_deref(), Some("mention"));
    }

    #[test]
    fn test_out_of_bounds_span_snaps_with_warning() {
        let text = "short";
        let mut report = Report::new("bluesky");
        let _ = tag_to_facet(&mention(3, 99), text, text.len(), &mut report);
        let warnings = report.finish(()).warnings;
        assert!(!warnings.is_empty());
    }

    #[test]
    fn test_mid_codepoint_byte_range_snaps() {
        let text = "a😀b";
        let mut report = Report::new("bluesky");
        let facet = serde_json::json!({
            "$type": super::FACET,
            "index": {"byteStart": 2, "byteEnd": 5},
            "features": [{"$type": super::FACET_LINK, "uri": "http://x/"}],
        });
        let tag = facet_to_tag(&facet, text, &mut report).unwrap();
        assert_eq!((tag.start_index, tag.length), (Some(1), Some(1)));
        assert!(!report.finish(()).warnings.is_empty());
    }

    #[test]
    fn test_hashtag_feature() {
        let tag = Tag {
            object_type: Some("hashtag".to_string()),
            display_name: Some("#rust".to_string()),
            start_index: Some(0),
            length: Some(5),
            ..Tag::default()
        };
        let mut report = Report::new("bluesky");
        let facet = tag_to_facet(&tag, "#rust rules", 11, &mut report).unwrap();
        assert_eq!(facet["features"][0]["$type"], super::FACET_TAG);
        assert_eq!(facet["features"][0]["tag"], "rust");
    }
}
