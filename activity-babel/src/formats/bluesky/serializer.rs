//! Record serialization (canonical → AT lexicon records)

use activity_model::text::{ellipsize, fit_bytes, grapheme_len, truncate, TruncateOptions};
use activity_model::{Object, Reference};
use serde_json::{json, Map, Value};

use super::facet::tag_to_facet;
use super::{
    at_uri_from_ref, did_from_url, EMBED_EXTERNAL, EMBED_IMAGES, EMBED_RECORD, FACET, FACET_LINK,
    FOLLOW, LIKE, MAX_DESCRIPTION_GRAPHEMES, MAX_DISPLAY_NAME_GRAPHEMES, MAX_IMAGES,
    MAX_POST_BYTES, MAX_POST_GRAPHEMES, POST, PROFILE, REPOST, STRONG_REF,
};
use crate::dom;
use crate::error::ConvertError;
use crate::format::Options;
use crate::warnings::{Conversion, Report};

/// Placeholder timestamp for objects that never carried one; records
/// require `createdAt` and this crate doesn't read clocks.
const EPOCH: &str = "1970-01-01T00:00:00.000Z";

pub fn serialize(objects: &[Object], options: &Options) -> Result<Conversion<String>, ConvertError> {
    let mut report = Report::new("bluesky");

    let activity = objects.first().ok_or_else(|| {
        ConvertError::Validation("nothing to serialize: no canonical objects given".to_string())
    })?;
    if objects.len() > 1 {
        report.warn("objects", "record formats emit one record; extra objects dropped");
    }

    let obj = if activity.verb_or_post() == "post" {
        activity.first_object().unwrap_or_else(|| activity.clone())
    } else {
        activity.clone()
    };

    let record = match obj.type_tag() {
        Some(t) if activity_model::ACTOR_TYPES.contains(&t) => profile(&obj, options, &mut report),
        Some("like" | "favorite") => subject_record(LIKE, &obj)?,
        Some("share") => subject_record(REPOST, &obj)?,
        Some("follow") => follow(&obj)?,
        Some(t) if activity_model::POST_TYPES.contains(&t) => post(&obj, options, &mut report)?,
        other => {
            return Err(ConvertError::Validation(format!(
                "no record type for object type {other:?}"
            )))
        }
    };

    let doc = serde_json::to_string_pretty(&record)?;
    Ok(report.finish(doc))
}

fn profile(obj: &Object, options: &Options, report: &mut Report) -> Value {
    let mut record = Map::new();
    record.insert("$type".to_string(), json!(PROFILE));

    if let Some(name) = obj.display_name.as_deref() {
        record.insert(
            "displayName".to_string(),
            json!(ellipsize(name, MAX_DISPLAY_NAME_GRAPHEMES)),
        );
    }
    if let Some(summary) = obj.summary.as_deref() {
        let description = if dom::looks_like_html(summary) {
            dom::html_to_text(summary)
        } else {
            summary.to_string()
        };
        record.insert(
            "description".to_string(),
            json!(ellipsize(&description, MAX_DESCRIPTION_GRAPHEMES)),
        );
    }

    // banner is the featured image, avatar the first plain one
    let mut avatar = None;
    let mut banner = None;
    for image in &obj.image {
        let image = image.to_object();
        let featured = image.object_type.as_deref() == Some("featured");
        let url = image.first_url().or(image.id.as_deref()).map(str::to_string);
        if featured && banner.is_none() {
            banner = url;
        } else if !featured && avatar.is_none() {
            avatar = url;
        }
    }
    for (field, url) in [("avatar", avatar), ("banner", banner)] {
        if let Some(url) = url {
            match resolve_blob(&url, options, report) {
                Some(blob) => {
                    record.insert(field.to_string(), blob);
                }
                None => report.warn(field, format!("no blob for {url}, omitted")),
            }
        }
    }

    Value::Object(record)
}

fn subject_record(record_type: &str, obj: &Object) -> Result<Value, ConvertError> {
    let target = obj.objects.first().and_then(Reference::id).ok_or_else(|| {
        ConvertError::Validation(format!("{record_type} requires a target object"))
    })?;
    let uri = at_uri_from_ref(target).ok_or_else(|| {
        ConvertError::Validation(format!(
            "{record_type} target '{target}' has no at:// identifier"
        ))
    })?;

    Ok(json!({
        "$type": record_type,
        "subject": strong_ref(&uri),
        "createdAt": obj.published.as_deref().unwrap_or(EPOCH),
    }))
}

fn follow(obj: &Object) -> Result<Value, ConvertError> {
    let target = obj.objects.first().and_then(Reference::id).ok_or_else(|| {
        ConvertError::Validation("follow requires a target actor".to_string())
    })?;
    let did = did_from_url(target).ok_or_else(|| {
        ConvertError::Validation(format!("follow target '{target}' has no DID"))
    })?;

    Ok(json!({
        "$type": FOLLOW,
        "subject": did,
        "createdAt": obj.published.as_deref().unwrap_or(EPOCH),
    }))
}

fn post(obj: &Object, options: &Options, report: &mut Report) -> Result<Value, ConvertError> {
    let raw_content = obj.content.clone().unwrap_or_default();
    let content_was_html = dom::looks_like_html(&raw_content);
    let base_text = if content_was_html {
        dom::html_to_text(&raw_content)
    } else {
        raw_content
    };

    // settle the single-embed question before the text, since losing an
    // embed can mean appending a link
    let quote = obj.attachments.iter().find_map(|att| {
        let candidate = att.id.as_deref().or(att.first_url())?;
        at_uri_from_ref(candidate)
    });
    let images: Vec<Object> = obj.image.iter().map(Reference::to_object).collect();
    let external = obj.attachments.iter().find(|att| {
        matches!(att.object_type.as_deref(), Some("article" | "link"))
            && att.first_url().is_some()
            && att
                .first_url()
                .map(|u| at_uri_from_ref(u).is_none())
                .unwrap_or(true)
    });

    // truncate in graphemes, then enforce the separate byte limit
    let link = obj.permalink();
    let truncate_options = options.truncate.clone().unwrap_or(TruncateOptions {
        max_graphemes: MAX_POST_GRAPHEMES,
        link_length: link.map(grapheme_len).unwrap_or(0),
        include_link: options.include_link,
    });
    let mut text = truncate(&base_text, link, &truncate_options);
    text = fit_bytes(&text, MAX_POST_BYTES);

    // both images and an external link: keep the images, put the link in
    // the text
    let fold_external = !images.is_empty() && external.is_some() && quote.is_none();
    if fold_external {
        let url = external.and_then(|att| att.first_url()).unwrap_or_default();
        if !text.contains(url) {
            let appended = format!("{text} {url}");
            if appended.len() <= MAX_POST_BYTES && grapheme_len(&appended) <= MAX_POST_GRAPHEMES {
                text = appended;
            } else {
                report.warn("embed", "no room to append external link, dropped");
            }
        }
        report.warn(
            "embed",
            "images and external link both present; kept images, linked the external",
        );
    }

    // facets index into the surviving prefix of the base text
    let text_byte_end = common_prefix_bytes(&base_text, &text);
    let mut facets: Vec<Value> = Vec::new();
    let mut standalone_tags: Vec<String> = Vec::new();

    for tag in &obj.tags {
        if tag.is_span() {
            if content_was_html {
                report.warn(
                    "facets",
                    "span offsets refer to HTML content, re-anchoring by name",
                );
            } else {
                if let Some(facet) = tag_to_facet(tag, &base_text, text_byte_end, report) {
                    facets.push(facet);
                }
                continue;
            }
        }

        // offsetless (or re-anchored) tags: find them in the text by name
        match tag.object_type.as_deref() {
            Some("hashtag") | None => {
                let Some(name) = tag
                    .display_name
                    .as_deref()
                    .map(|n| n.trim_start_matches('#').to_string())
                    .filter(|n| !n.is_empty())
                else {
                    continue;
                };
                let needle = format!("#{name}");
                match text.find(&needle) {
                    Some(at) if at < text_byte_end => facets.push(json!({
                        "$type": FACET,
                        "index": {"byteStart": at, "byteEnd": at + needle.len()},
                        "features": [{"$type": super::FACET_TAG, "tag": name}],
                    })),
                    _ => standalone_tags.push(name),
                }
            }
            Some("mention") => {
                let needle = tag.display_name.clone().unwrap_or_default();
                let target = tag.url.as_deref().or(tag.id.as_deref()).unwrap_or_default();
                match (text.find(needle.as_str()), did_from_url(target)) {
                    (Some(at), Some(did)) if !needle.is_empty() && at < text_byte_end => {
                        facets.push(json!({
                            "$type": FACET,
                            "index": {"byteStart": at, "byteEnd": at + needle.len()},
                            "features": [{"$type": super::FACET_MENTION, "did": did}],
                        }))
                    }
                    _ => report.warn("facets", format!("mention '{needle}' not locatable, dropped")),
                }
            }
            _ => {}
        }
    }

    // the appended permalink gets a link facet so it stays clickable
    if let Some(link) = link {
        if text.len() > link.len() && text.ends_with(link) {
            facets.push(json!({
                "$type": FACET,
                "index": {
                    "byteStart": text.len() - link.len(),
                    "byteEnd": text.len(),
                },
                "features": [{"$type": FACET_LINK, "uri": link}],
            }));
        }
    }

    let mut record = Map::new();
    record.insert("$type".to_string(), json!(POST));
    record.insert("text".to_string(), json!(text));
    record.insert(
        "createdAt".to_string(),
        json!(obj.published.as_deref().unwrap_or(EPOCH)),
    );
    if !facets.is_empty() {
        record.insert("facets".to_string(), Value::Array(facets));
    }
    if !standalone_tags.is_empty() {
        record.insert("tags".to_string(), json!(standalone_tags));
    }

    if let Some(reply_to) = obj.in_reply_to.first() {
        let target = reply_to.id().ok_or_else(|| {
            ConvertError::Validation("reply target carries no identifier".to_string())
        })?;
        let uri = at_uri_from_ref(target).ok_or_else(|| {
            ConvertError::Validation(format!(
                "reply target '{target}' has no at:// identifier in this protocol"
            ))
        })?;
        // without a fetch the thread root is unknowable; the parent stands in
        report.warn("reply.root", "thread root unknown, using parent");
        record.insert(
            "reply".to_string(),
            json!({
                "root": strong_ref(&uri),
                "parent": strong_ref(&uri),
            }),
        );
    }

    if let Some(embed) = build_embed(quote, &images, external, options, report) {
        record.insert("embed".to_string(), embed);
    }

    Ok(Value::Object(record))
}

/// One embed per record: quoted record, then images, then external link.
fn build_embed(
    quote: Option<String>,
    images: &[Object],
    external: Option<&Object>,
    options: &Options,
    report: &mut Report,
) -> Option<Value> {
    if let Some(uri) = quote {
        return Some(json!({
            "$type": EMBED_RECORD,
            "record": strong_ref(&uri),
        }));
    }

    if !images.is_empty() {
        let mut image_values = Vec::new();
        for image in images.iter().take(MAX_IMAGES) {
            let Some(url) = image.first_url().or(image.id.as_deref()) else {
                continue;
            };
            match resolve_blob(url, options, report) {
                Some(blob) => image_values.push(json!({
                    "image": blob,
                    "alt": image.display_name.as_deref().unwrap_or(""),
                })),
                None => report.warn("embed.images", format!("no blob for {url}, skipped")),
            }
        }
        if images.len() > MAX_IMAGES {
            report.warn(
                "embed.images",
                format!("{} images, only {MAX_IMAGES} embedded", images.len()),
            );
        }
        if !image_values.is_empty() {
            return Some(json!({
                "$type": EMBED_IMAGES,
                "images": image_values,
            }));
        }
    }

    if let Some(att) = external {
        return Some(json!({
            "$type": EMBED_EXTERNAL,
            "external": {
                "uri": att.first_url().unwrap_or_default(),
                "title": att.display_name.as_deref()
                    .or(att.title.as_deref())
                    .unwrap_or(""),
                "description": att.summary.as_deref().unwrap_or(""),
            },
        }));
    }

    None
}

fn strong_ref(uri: &str) -> Value {
    // the content hash half of a strong ref needs a fetch this crate
    // doesn't perform; callers fill it before writing the record
    json!({
        "$type": STRONG_REF,
        "uri": uri,
        "cid": "",
    })
}

fn resolve_blob(url: &str, options: &Options, _report: &mut Report) -> Option<Value> {
    let blob = options.blobs?.resolve(url)?;
    Some(json!({
        "$type": "blob",
        "ref": {"$link": blob.cid},
        "mimeType": blob.mime_type,
        "size": blob.size,
    }))
}

/// Byte length of the shared prefix, floored to a codepoint boundary.
fn common_prefix_bytes(a: &str, b: &str) -> usize {
    let mut end = a
        .as_bytes()
        .iter()
        .zip(b.as_bytes())
        .take_while(|(x, y)| x == y)
        .count();
    while end > 0 && !b.is_char_boundary(end) {
        end -= 1;
    }
    end
}
