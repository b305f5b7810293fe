//! Event parsing (relay events → canonical)

use activity_model::{Object, Reference, Tag};
use chrono::{TimeZone, Utc};
use serde_json::Value;

use super::event::{
    id_to_uri, Event, KIND_ARTICLE, KIND_CONTACTS, KIND_DELETE, KIND_GENERIC_REPOST, KIND_NOTE,
    KIND_PROFILE, KIND_REACTION, KIND_REPOST,
};
use crate::error::ConvertError;
use crate::warnings::{Conversion, Report};

pub fn parse(doc: &str) -> Result<Conversion<Vec<Object>>, ConvertError> {
    let event: Event = serde_json::from_str(doc)?;
    let mut report = Report::new("nostr");
    let objects = event_to_object(&event, &mut report).into_iter().collect();
    Ok(report.finish(objects))
}

pub(super) fn event_to_object(event: &Event, report: &mut Report) -> Option<Object> {
    let mut obj = Object::new();

    match event.kind {
        KIND_PROFILE => {
            obj.object_type = Some("person".to_string());
            obj.id = Some(id_to_uri(&event.pubkey));

            let profile: Value = if event.content.is_empty() {
                Value::Null
            } else {
                serde_json::from_str(&event.content).unwrap_or_else(|e| {
                    report.warn("content", format!("profile metadata is not JSON: {e}"));
                    Value::Null
                })
            };
            if let Some(profile) = profile.as_object() {
                obj.display_name = profile
                    .get("display_name")
                    .or_else(|| profile.get("name"))
                    .and_then(Value::as_str)
                    .map(str::to_string);
                obj.summary = profile
                    .get("about")
                    .and_then(Value::as_str)
                    .map(str::to_string);
                obj.username = profile
                    .get("nip05")
                    .and_then(Value::as_str)
                    .map(|n| n.trim_start_matches("_@").to_string());
                if let Some(website) = profile.get("website").and_then(Value::as_str) {
                    obj.url = Some(website.to_string());
                }
                if let Some(picture) = profile.get("picture").and_then(Value::as_str) {
                    obj.image.push(Reference::Id(picture.to_string()));
                }
                if let Some(banner) = profile.get("banner").and_then(Value::as_str) {
                    let mut featured = Object::of_type("featured");
                    featured.url = Some(banner.to_string());
                    obj.image.push(Reference::object(featured));
                }
            }
        }

        KIND_NOTE | KIND_ARTICLE => {
            obj.object_type = Some(if event.kind == KIND_ARTICLE {
                "article".to_string()
            } else {
                "note".to_string()
            });
            obj.content = Some(event.content.clone()).filter(|c| !c.is_empty());
            if let Some(id) = event.id.as_deref() {
                obj.id = Some(id_to_uri(id));
            }
            if !event.pubkey.is_empty() {
                obj.author = Some(Box::new(Reference::Id(id_to_uri(&event.pubkey))));
            }

            for tag in &event.tags {
                let (name, values) = match tag.split_first() {
                    Some(split) => split,
                    None => continue,
                };
                match (name.as_str(), values) {
                    ("e", [id, ..]) if tag.last().map(String::as_str) == Some("reply") => {
                        obj.in_reply_to.push(Reference::Id(id_to_uri(id)));
                    }
                    ("t", names) => {
                        for hashtag in names {
                            obj.tags.push(Tag {
                                object_type: Some("hashtag".to_string()),
                                display_name: Some(hashtag.clone()),
                                ..Tag::default()
                            });
                        }
                    }
                    ("title", [title, ..]) => obj.title = Some(title.clone()),
                    ("subject", [subject, ..]) => {
                        if obj.title.is_none() {
                            obj.title = Some(subject.clone());
                        }
                    }
                    ("summary", [summary, ..]) => obj.summary = Some(summary.clone()),
                    ("location", [location, ..]) => {
                        let mut place = Object::of_type("place");
                        place.display_name = Some(location.clone());
                        obj.location = Some(Box::new(place));
                    }
                    ("imeta", fields) => parse_imeta(fields, &mut obj, report),
                    _ => {}
                }
            }
        }

        KIND_REPOST | KIND_GENERIC_REPOST => {
            obj.object_type = Some("activity".to_string());
            obj.verb = Some("share".to_string());
            if let Some(id) = event.id.as_deref() {
                obj.id = Some(id_to_uri(id));
            }
            for tag in event.tags_named("e") {
                if tag.last().map(String::as_str) == Some("mention") && tag.len() >= 2 {
                    obj.objects = vec![Reference::Id(id_to_uri(&tag[1]))];
                }
            }
            // reposts may inline the reposted event as JSON content
            if event.content.starts_with('{') {
                match serde_json::from_str::<Event>(&event.content) {
                    Ok(inner) => {
                        if let Some(inner_obj) = event_to_object(&inner, report) {
                            obj.objects = vec![Reference::object(inner_obj)];
                        }
                    }
                    Err(e) => report.warn("content", format!("embedded repost is not an event: {e}")),
                }
            }
        }

        KIND_REACTION => {
            obj.object_type = Some("activity".to_string());
            if let Some(id) = event.id.as_deref() {
                obj.id = Some(id_to_uri(id));
            }
            match event.content.as_str() {
                "+" | "" => obj.verb = Some("like".to_string()),
                "-" => obj.verb = Some("dislike".to_string()),
                emoji => {
                    obj.verb = Some("react".to_string());
                    obj.content = Some(emoji.to_string());
                }
            }
            for tag in event.tags_named("e") {
                if tag.len() >= 2 {
                    obj.objects = vec![Reference::Id(id_to_uri(&tag[1]))];
                }
            }
        }

        KIND_DELETE => {
            obj.object_type = Some("activity".to_string());
            obj.verb = Some("delete".to_string());
            obj.content = Some(event.content.clone()).filter(|c| !c.is_empty());
            for tag in event.tags_named("e") {
                if tag.len() >= 2 {
                    obj.objects.push(Reference::Id(id_to_uri(&tag[1])));
                }
            }
        }

        KIND_CONTACTS => {
            obj.object_type = Some("activity".to_string());
            obj.verb = Some("follow".to_string());
            for tag in event.tags_named("p") {
                if tag.len() < 2 {
                    continue;
                }
                let id = id_to_uri(&tag[1]);
                let petname = tag.get(3).filter(|n| !n.is_empty());
                obj.objects.push(match petname {
                    Some(name) => {
                        let mut followed = Object::new();
                        followed.id = Some(id);
                        followed.display_name = Some(name.clone());
                        Reference::object(followed)
                    }
                    None => Reference::Id(id),
                });
            }
        }

        other => {
            report.warn("kind", format!("unsupported event kind {other}, dropped"));
            return None;
        }
    }

    if event.created_at != 0 {
        if let Some(when) = Utc.timestamp_opt(event.created_at, 0).single() {
            obj.published = Some(when.to_rfc3339());
        }
    }

    if obj.object_type.as_deref() == Some("activity") && !event.pubkey.is_empty() {
        obj.actor = Some(Box::new(Reference::Id(id_to_uri(&event.pubkey))));
    }

    Some(obj)
}

/// `imeta` media tags: space-separated `key value` fields per entry.
fn parse_imeta(fields: &[String], obj: &mut Object, report: &mut Report) {
    let mut url = None;
    let mut alt = None;
    let mut mime: Option<String> = None;
    for field in fields {
        match field.split_once(' ') {
            Some(("url", value)) => url = Some(value.to_string()),
            Some(("alt", value)) => alt = Some(value.to_string()),
            Some(("m", value)) => mime = Some(value.to_string()),
            _ => {}
        }
    }
    let Some(url) = url else {
        report.warn("imeta", "media tag without url, dropped");
        return;
    };

    let media_kind = mime
        .as_deref()
        .and_then(|m| m.split('/').next())
        .unwrap_or("image")
        .to_string();
    match media_kind.as_str() {
        "audio" | "video" => obj.attachments.push(Object {
            object_type: Some(media_kind.clone()),
            display_name: alt,
            mime_type: mime,
            stream: Some(Box::new(Reference::Id(url.clone()))),
            ..Object::default()
        }),
        _ => {
            let mut image = Object::of_type("image");
            image.url = Some(url.clone());
            image.display_name = alt;
            image.mime_type = mime;
            obj.image.push(Reference::object(image));
        }
    }

    // the URL was only in the text as a fallback rendering of the media
    if let Some(content) = obj.content.take() {
        let stripped = content.replace(&url, "").trim_end().to_string();
        obj.content = Some(stripped).filter(|c| !c.is_empty());
    }
}
