//! Event serialization (canonical → relay events)

use activity_model::{Object, Reference};
use chrono::DateTime;
use serde_json::{json, Map, Value};

use super::event::{
    event_id, uri_to_id, Event, KIND_ARTICLE, KIND_CONTACTS, KIND_DELETE, KIND_NOTE,
    KIND_PROFILE, KIND_REACTION, KIND_REPOST,
};
use crate::dom;
use crate::error::ConvertError;
use crate::warnings::{Conversion, Report};

pub fn serialize(objects: &[Object]) -> Result<Conversion<String>, ConvertError> {
    let mut report = Report::new("nostr");
    let obj = objects.first().ok_or_else(|| {
        ConvertError::Validation("nothing to serialize: no canonical objects given".to_string())
    })?;
    if objects.len() > 1 {
        report.warn("objects", "event formats emit one event; extra objects dropped");
    }

    let event = to_event(obj, &mut report)?;
    let doc = serde_json::to_string_pretty(&event)?;
    Ok(report.finish(doc))
}

pub(super) fn to_event(obj: &Object, report: &mut Report) -> Result<Event, ConvertError> {
    // post/update activities are conduits for their inner object
    if matches!(obj.verb_or_post(), "post" | "update") && !obj.is_actor() {
        if let Some(inner) = obj.first_object() {
            return to_event(&inner, report);
        }
    }

    let type_tag = obj.type_tag().map(str::to_string);
    let mut event = Event::new(KIND_NOTE);
    event.pubkey = obj
        .owner_id()
        .map(|owner| uri_to_id(&owner))
        .unwrap_or_default();

    if let Some(published) = obj.published.as_deref() {
        match DateTime::parse_from_rfc3339(published) {
            Ok(when) => event.created_at = when.timestamp(),
            Err(_) => report.warn("created_at", format!("unparseable timestamp '{published}'")),
        }
    }

    match type_tag.as_deref() {
        Some(t) if activity_model::ACTOR_TYPES.contains(&t) => {
            event.kind = KIND_PROFILE;
            if let Some(id) = obj.id.as_deref() {
                event.pubkey = uri_to_id(id);
            }

            let mut profile = Map::new();
            if let Some(name) = obj.display_name.as_deref() {
                profile.insert("name".to_string(), json!(name));
            }
            if let Some(about) = obj.summary.as_deref() {
                profile.insert("about".to_string(), json!(about));
            }
            if let Some(website) = obj.first_url() {
                profile.insert("website".to_string(), json!(website));
            }
            if let Some(username) = obj.username.as_deref() {
                if username.contains('@') {
                    profile.insert("nip05".to_string(), json!(username));
                } else if username.contains('.') {
                    profile.insert("nip05".to_string(), json!(format!("_@{username}")));
                }
            }
            for image in &obj.image {
                let image = image.to_object();
                let field = if image.object_type.as_deref() == Some("featured") {
                    "banner"
                } else {
                    "picture"
                };
                if let Some(url) = image.first_url().or(image.id.as_deref()) {
                    profile.entry(field.to_string()).or_insert(json!(url));
                }
            }
            // profile metadata rides as a JSON string; keys sorted, unicode
            // unescaped
            event.content = serde_json::to_string(&Value::Object(profile))?;
        }

        Some(t @ ("note" | "article" | "comment")) => {
            event.kind = if t == "article" { KIND_ARTICLE } else { KIND_NOTE };

            let content = obj
                .content
                .as_deref()
                .or(obj.summary.as_deref())
                .or(obj.display_name.as_deref())
                .unwrap_or_default();
            event.content = if dom::looks_like_html(content) {
                dom::html_to_text(content)
            } else {
                content.to_string()
            };

            if let Some(reply_to) = obj.in_reply_to.first() {
                let target = reply_to.to_object();
                if let Some(id) = target.id.as_deref() {
                    let parent = uri_to_id(id);
                    event.push_tag(["e", parent.as_str(), "", "reply"]);
                    if let Some(author) = target.author.as_deref().and_then(Reference::id) {
                        let author_key = uri_to_id(author);
                        event.push_tag(["p", author_key.as_str()]);
                    }
                } else {
                    report.warn("tags.e", "reply target has no id, dropped");
                }
            }

            if t == "article" && event.created_at != 0 {
                let created = event.created_at.to_string();
                event.push_tag(["published_at", created.as_str()]);
            }
            if let Some(title) = obj.title.as_deref().or_else(|| {
                (t == "article").then_some(obj.display_name.as_deref()).flatten()
            }) {
                event.push_tag(["title", title]);
                event.push_tag(["subject", title]);
            }
            if let Some(summary) = obj.summary.as_deref() {
                if obj.content.is_some() {
                    event.push_tag(["summary", summary]);
                }
            }

            for tag in &obj.tags {
                if tag.object_type.as_deref() == Some("hashtag") {
                    if let Some(name) = tag.display_name.as_deref() {
                        event.push_tag(["t", name.trim_start_matches('#')]);
                    }
                }
            }

            if let Some(location) = obj.location.as_deref().and_then(|l| l.display_name.as_deref())
            {
                event.push_tag(["location", location]);
            }

            // media: imeta tags, with the URL surfaced in the text so
            // clients without NIP-92 still show it
            let media = obj.image.iter().map(Reference::to_object).chain(
                obj.attachments
                    .iter()
                    .filter(|att| {
                        matches!(att.object_type.as_deref(), Some("audio" | "video"))
                    })
                    .map(|att| {
                        let mut media = att.clone();
                        if let Some(stream) = att.stream.as_deref() {
                            media.url = stream.id().map(str::to_string);
                        }
                        media
                    }),
            );
            for item in media {
                let Some(url) = item.first_url().or(item.id.as_deref()).map(str::to_string)
                else {
                    continue;
                };
                let mut imeta = vec!["imeta".to_string(), format!("url {url}")];
                if let Some(alt) = item.display_name.as_deref() {
                    imeta.push(format!("alt {alt}"));
                }
                if let Some(mime) = item.mime_type.as_deref() {
                    imeta.push(format!("m {mime}"));
                }
                event.tags.push(imeta);
                if !event.content.contains(&url) {
                    if !event.content.is_empty() {
                        event.content.push(' ');
                    }
                    event.content.push_str(&url);
                }
            }
        }

        Some("share") => {
            event.kind = KIND_REPOST;
            if let Some(inner) = obj.first_object() {
                if inner.content.is_some() || inner.object_type.is_some() {
                    let inner_event = to_event(&inner, report)?;
                    event.content = serde_json::to_string(&inner_event)?;
                    event.push_tag([
                        "e",
                        inner_event.id.as_deref().unwrap_or_default(),
                        "",
                        "mention",
                    ]);
                    event.push_tag(["p", inner_event.pubkey.as_str()]);
                } else if let Some(id) = inner.id.as_deref() {
                    let reposted = uri_to_id(id);
                    event.push_tag(["e", reposted.as_str(), "", "mention"]);
                }
            }
        }

        Some(t @ ("like" | "dislike" | "react")) => {
            event.kind = KIND_REACTION;
            event.content = match t {
                "like" => "+".to_string(),
                "dislike" => "-".to_string(),
                _ => obj.content.clone().unwrap_or_default(),
            };
            if let Some(target) = obj.objects.first().and_then(Reference::id) {
                let target_id = uri_to_id(target);
                event.push_tag(["e", target_id.as_str()]);
            }
        }

        Some("delete") => {
            event.kind = KIND_DELETE;
            for target in &obj.objects {
                if let Some(id) = target.id() {
                    let target_id = uri_to_id(id);
                    event.push_tag(["e", target_id.as_str()]);
                }
            }
        }

        Some("follow") => {
            event.kind = KIND_CONTACTS;
            for target in &obj.objects {
                let followed = target.to_object();
                let Some(id) = followed.id.as_deref() else {
                    continue;
                };
                let key = uri_to_id(id);
                event.push_tag([
                    "p",
                    key.as_str(),
                    "",
                    followed.display_name.as_deref().unwrap_or(""),
                ]);
            }
        }

        other => {
            return Err(ConvertError::Validation(format!(
                "no event kind for object type {other:?}"
            )))
        }
    }

    if !event.pubkey.is_empty() {
        event.id = Some(event_id(&event));
    }
    Ok(event)
}
