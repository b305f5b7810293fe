//! Mention and hashtag linkification
//!
//! Scans plain-text content for @-mention and #hashtag substrings that no
//! existing span tag already covers, and inserts span tags for them.
//! Mentions only become tags when the caller's lookup resolves the handle to
//! a profile URL; hashtags always become tags. Inserted spans never overlap
//! existing ones.

use std::collections::HashMap;

use activity_model::{Object, Tag};
use once_cell::sync::Lazy;
use regex::Regex;

/// `@handle` or `@user@instance.example`, preceded by start-of-text or
/// whitespace.
static MENTION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:^|\s)(@[A-Za-z0-9][A-Za-z0-9_.-]*(?:@[A-Za-z0-9][A-Za-z0-9.-]*)?)").unwrap()
});

/// `#hashtag`, including the fullwidth `＃` variant.
static HASHTAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?:^|\s)[#＃](\w+)\b").unwrap());

/// Actor lookup data for mention resolution: handle (without the leading
/// `@`) to profile URL.
pub type MentionLookup = HashMap<String, String>;

/// Return a copy of `obj` with mention and hashtag span tags added for
/// every match in `content` not already covered by an existing span.
pub fn linkify(obj: &Object, mentions: &MentionLookup) -> Object {
    let content = match obj.content.as_deref() {
        Some(content) if !content.is_empty() => content,
        _ => return obj.clone(),
    };

    let mut covered: Vec<(usize, usize)> = obj
        .tags
        .iter()
        .filter_map(|t| Some((t.start_index?, t.start_index? + t.length?)))
        .collect();

    let mut new_tags: Vec<Tag> = Vec::new();

    for caps in MENTION_RE.captures_iter(content) {
        let m = caps.get(1).unwrap();
        let handle_text = m.as_str();
        // strip the leading @, and an @instance suffix if present
        let handle = handle_text[1..]
            .split('@')
            .next()
            .unwrap_or_default()
            .to_string();
        let url = mentions
            .get(handle_text.trim_start_matches('@'))
            .or_else(|| mentions.get(&handle));
        let Some(url) = url else {
            continue;
        };

        if let Some(span) = claim_span(content, m.start(), m.end(), &mut covered) {
            new_tags.push(Tag {
                object_type: Some("mention".to_string()),
                url: Some(url.clone()),
                display_name: Some(handle_text.to_string()),
                start_index: Some(span.0),
                length: Some(span.1),
                ..Tag::default()
            });
        }
    }

    for caps in HASHTAG_RE.captures_iter(content) {
        let name = caps.get(1).unwrap();
        // the span covers the # marker too
        let start = name.start() - prefix_len(content, name.start());
        if let Some(span) = claim_span(content, start, name.end(), &mut covered) {
            new_tags.push(Tag {
                object_type: Some("hashtag".to_string()),
                display_name: Some(name.as_str().to_string()),
                start_index: Some(span.0),
                length: Some(span.1),
                ..Tag::default()
            });
        }
    }

    if new_tags.is_empty() {
        return obj.clone();
    }

    let mut out = obj.clone();
    out.tags.extend(new_tags);
    out
}

/// Byte length of the `#`/`＃` marker immediately before `pos`.
fn prefix_len(content: &str, pos: usize) -> usize {
    content[..pos]
        .chars()
        .next_back()
        .map(char::len_utf8)
        .unwrap_or(0)
}

/// Convert a byte match to a codepoint span and reserve it, unless it
/// overlaps an already-covered range.
fn claim_span(
    content: &str,
    byte_start: usize,
    byte_end: usize,
    covered: &mut Vec<(usize, usize)>,
) -> Option<(usize, usize)> {
    let start = content[..byte_start].chars().count();
    let end = start + content[byte_start..byte_end].chars().count();

    let overlaps = covered.iter().any(|&(s, e)| start < e && s < end);
    if overlaps {
        return None;
    }
    covered.push((start, end));
    Some((start, end - start))
}
