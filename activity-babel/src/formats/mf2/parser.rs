//! Microformats parsing (mf2 HTML/JSON → canonical)
//!
//! HTML goes through a small class-vocabulary parser into the mf2 property
//! tree (`{"type": [...], "properties": {...}, "children": [...]}`), then
//! the tree maps onto canonical objects. Properties are accepted in both
//! singular and list-valued form.

use activity_model::{Collection, Object, Reference, Tag};
use markup5ever_rcdom::Handle;
use serde_json::{json, Map, Value};

use super::discovery::{discover, Cues};
use crate::dom;
use crate::error::ConvertError;
use crate::warnings::{Conversion, Report};

pub fn parse_json(doc: &str) -> Result<Conversion<Vec<Object>>, ConvertError> {
    let value: Value = serde_json::from_str(doc)?;
    let mut report = Report::new("mf2-json");

    let items = match &value {
        Value::Object(map) if map.contains_key("items") => map
            .get("items")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default(),
        Value::Array(items) => items.clone(),
        Value::Object(_) => vec![value.clone()],
        _ => {
            return Err(ConvertError::Parse(
                "expected a microformats item or items list".to_string(),
            ))
        }
    };

    let objects = items
        .iter()
        .filter_map(|item| item_to_object(item, &mut report))
        .collect();
    Ok(report.finish(objects))
}

pub fn parse_html(doc: &str) -> Result<Conversion<Vec<Object>>, ConvertError> {
    let tree = dom::parse_html(doc);
    let mut report = Report::new("mf2-html");

    let roots = dom::find_elements(&tree.document, &|node| {
        dom::classes(node).iter().any(|c| c.starts_with("h-"))
    });
    if roots.is_empty() {
        report.warn("document", "no microformats roots found");
    }

    let objects = roots
        .iter()
        .map(element_to_item)
        .filter_map(|item| item_to_object(&item, &mut report))
        .collect();
    Ok(report.finish(objects))
}

/// Parse one `h-*` element into the mf2 property tree.
fn element_to_item(el: &Handle) -> Value {
    let types: Vec<String> = dom::classes(el)
        .into_iter()
        .filter(|c| c.starts_with("h-"))
        .collect();

    let mut properties: Map<String, Value> = Map::new();
    let mut children: Vec<Value> = Vec::new();
    for child in el.children.borrow().iter() {
        collect_properties(child, &mut properties, &mut children);
    }

    let mut item = Map::new();
    item.insert("type".to_string(), json!(types));
    item.insert("properties".to_string(), Value::Object(properties));
    if !children.is_empty() {
        item.insert("children".to_string(), Value::Array(children));
    }
    Value::Object(item)
}

fn collect_properties(
    node: &Handle,
    properties: &mut Map<String, Value>,
    children: &mut Vec<Value>,
) {
    if !dom::is_element(node) {
        return;
    }

    let classes = dom::classes(node);
    let is_item = classes.iter().any(|c| c.starts_with("h-"));
    let prop_classes: Vec<(&str, String)> = classes
        .iter()
        .filter_map(|c| {
            for prefix in ["p-", "u-", "dt-", "e-"] {
                if let Some(name) = c.strip_prefix(prefix) {
                    return Some((&prefix[..prefix.len() - 1], name.to_string()));
                }
            }
            None
        })
        .collect();

    if is_item {
        // nested microformat: becomes a property value (with its text as
        // "value") or a child, and scopes off everything inside it
        let mut item = element_to_item(node);
        if prop_classes.is_empty() {
            children.push(item);
        } else {
            if let Value::Object(map) = &mut item {
                map.insert("value".to_string(), json!(dom::text_content(node).trim()));
            }
            for (_, name) in &prop_classes {
                push_property(properties, name, item.clone());
            }
        }
        return;
    }

    for (prefix, name) in &prop_classes {
        let value = match *prefix {
            "p" => json!(dom::text_content(node).trim()),
            "u" => url_value(node),
            "dt" => json!(dom::attr(node, "datetime")
                .unwrap_or_else(|| dom::text_content(node).trim().to_string())),
            _ => json!({
                "html": dom::serialize_children(node).unwrap_or_default().trim(),
                "value": dom::text_content(node).trim(),
            }),
        };
        push_property(properties, name, value);
    }

    for child in node.children.borrow().iter() {
        collect_properties(child, properties, children);
    }
}

fn url_value(node: &Handle) -> Value {
    let tag = dom::tag_name(node).unwrap_or_default();
    match tag.as_str() {
        "a" | "link" | "area" => json!(dom::attr(node, "href").unwrap_or_default()),
        "img" => {
            let src = dom::attr(node, "src").unwrap_or_default();
            match dom::attr(node, "alt").filter(|alt| !alt.is_empty()) {
                Some(alt) => json!({"value": src, "alt": alt}),
                None => json!(src),
            }
        }
        "audio" | "video" | "source" | "iframe" => {
            json!(dom::attr(node, "src").unwrap_or_default())
        }
        "data" | "abbr" => json!(dom::attr(node, "value")
            .or_else(|| dom::attr(node, "title"))
            .unwrap_or_else(|| dom::text_content(node).trim().to_string())),
        _ => json!(dom::text_content(node).trim().to_string()),
    }
}

fn push_property(properties: &mut Map<String, Value>, name: &str, value: Value) {
    match properties.get_mut(name) {
        Some(Value::Array(values)) => values.push(value),
        _ => {
            properties.insert(name.to_string(), Value::Array(vec![value]));
        }
    }
}

/// Map one mf2 item onto a canonical object.
pub(super) fn item_to_object(item: &Value, report: &mut Report) -> Option<Object> {
    let map = match item.as_object() {
        Some(map) => map,
        None => {
            report.warn("item", format!("expected object, dropped {item}"));
            return None;
        }
    };

    let types: Vec<String> = list(map.get("type"))
        .iter()
        .filter_map(Value::as_str)
        .map(str::to_string)
        .collect();
    let empty = Map::new();
    let props = map
        .get("properties")
        .and_then(Value::as_object)
        .unwrap_or(&empty);

    let name = first_text(props, "name");
    let content_values = list(props.get("content"));
    let content_prop = content_values.first();
    let (content_html, content_text) = match content_prop {
        Some(Value::Object(content)) => (
            content.get("html").and_then(Value::as_str).map(str::to_string),
            content.get("value").and_then(Value::as_str).map(str::to_string),
        ),
        Some(Value::String(text)) => (None, Some(text.clone())),
        _ => (None, None),
    };
    let content = content_html.clone().or_else(|| content_text.clone());

    let mut obj = Object::new();

    // explicit types first, discovery when the type doesn't say
    if types.iter().any(|t| t == "h-card") {
        obj.object_type = Some("person".to_string());
    } else if types.iter().any(|t| t == "h-event") {
        obj.object_type = Some("event".to_string());
    } else if types.iter().any(|t| t == "h-geo" || t == "h-adr") {
        obj.object_type = Some("place".to_string());
    } else {
        let rsvp = first_text(props, "rsvp");
        let cues = Cues {
            in_reply_to: has(props, "in-reply-to"),
            rsvp: rsvp.as_deref(),
            like_of: has(props, "like-of"),
            repost_of: has(props, "repost-of"),
            checkin: has(props, "checkin"),
            has_photo: has(props, "photo"),
            has_media: has(props, "video") || has(props, "audio"),
            name: name.as_deref(),
            content: content_text.as_deref().or(content.as_deref()),
        };
        let found = discover(&cues);
        obj.object_type = Some(found.object_type.to_string());
        obj.verb = found.verb;
    }

    obj.id = first_text(props, "uid");
    obj.display_name = name.clone();
    obj.summary = first_text(props, "summary").or_else(|| first_text(props, "note"));
    obj.content = content;
    obj.published = first_text(props, "published");
    obj.updated = first_text(props, "updated");
    obj.username = first_text(props, "nickname");

    let urls = string_urls(props.get("url"));
    obj.url = urls.first().cloned();
    obj.urls = if urls.len() > 1 { urls } else { Vec::new() };

    // author: a URL string or a nested h-card
    if let Some(author) = list(props.get("author")).first() {
        let author_ref = match author {
            Value::String(url) => Some(Reference::Id(url.clone())),
            Value::Object(_) => item_to_object(author, report).map(Reference::object),
            _ => None,
        };
        obj.author = author_ref.map(Box::new);
    }

    // photos, with alt text; plain strings and {value, alt} both appear
    for photo in list(props.get("photo")) {
        let (url, alt) = match &photo {
            Value::String(url) => (Some(url.clone()), None),
            Value::Object(photo_map) => (
                photo_map
                    .get("value")
                    .or_else(|| photo_map.get("url"))
                    .and_then(Value::as_str)
                    .map(str::to_string),
                photo_map.get("alt").and_then(Value::as_str).map(str::to_string),
            ),
            _ => (None, None),
        };
        if let Some(url) = url {
            obj.image.push(Reference::object(Object {
                object_type: Some("image".to_string()),
                url: Some(url),
                display_name: alt,
                ..Object::default()
            }));
        }
    }

    // audio and video become media attachments with a stream
    for media_type in ["audio", "video"] {
        for url in string_urls(props.get(media_type)) {
            obj.attachments.push(Object {
                object_type: Some(media_type.to_string()),
                stream: Some(Box::new(Reference::Id(url))),
                ..Object::default()
            });
        }
    }

    // quoted/embedded entries ride along as children
    for child in list(map.get("children"))
        .iter()
        .chain(list(props.get("quotation-of")).iter())
    {
        if let Value::Object(child_map) = child {
            let child_types = list(child_map.get("type"));
            let is_cite = child_types
                .iter()
                .filter_map(Value::as_str)
                .any(|t| t == "h-cite");
            if is_cite {
                if let Some(quoted) = item_to_object(child, report) {
                    obj.attachments.push(quoted);
                }
            }
        }
    }

    // categories: plain strings are hashtags, nested h-cards are person tags
    for category in list(props.get("category")) {
        match &category {
            Value::String(cat) => obj.tags.push(Tag {
                object_type: Some("hashtag".to_string()),
                display_name: Some(cat.trim_start_matches('#').to_string()),
                ..Tag::default()
            }),
            Value::Object(_) => {
                if let Some(person) = item_to_object(&category, report) {
                    obj.tags.push(Tag {
                        object_type: person.object_type.clone(),
                        url: person.url.clone(),
                        display_name: person.display_name.clone(),
                        ..Tag::default()
                    });
                }
            }
            other => report.warn("category", format!("dropped {other}")),
        }
    }

    // replies
    let comments: Vec<Object> = list(props.get("comment"))
        .iter()
        .filter_map(|c| item_to_object(c, report))
        .collect();
    if !comments.is_empty() {
        obj.replies = Some(Collection {
            total_items: Some(comments.len() as u64),
            items: comments,
        });
    }

    // location, including latitude/longitude from nested geo properties
    if let Some(location) = list(props.get("location")).first() {
        let loc = match location {
            Value::String(text) => Some(Object {
                object_type: Some("place".to_string()),
                display_name: Some(text.clone()),
                ..Object::default()
            }),
            Value::Object(_) => item_to_object(location, report).map(|mut loc| {
                loc.object_type = Some("place".to_string());
                loc
            }),
            _ => None,
        };
        obj.location = loc.map(Box::new);
    }
    if let Some(lat) = first_text(props, "latitude").and_then(|v| v.parse().ok()) {
        obj.latitude = Some(lat);
    }
    if let Some(lon) = first_text(props, "longitude").and_then(|v| v.parse().ok()) {
        obj.longitude = Some(lon);
    }

    // activity targets and reply threading
    let in_reply_tos = target_references(props.get("in-reply-to"), report);
    match obj.verb.as_deref() {
        Some(verb) if verb.starts_with("rsvp-") => {
            // RSVP targets arrive as in-reply-to; the target is an event
            obj.objects = in_reply_tos
                .into_iter()
                .map(|r| {
                    let mut event = r.to_object();
                    event.object_type = Some("event".to_string());
                    Reference::object(event)
                })
                .collect();
        }
        Some("like") => obj.objects = target_references(props.get("like-of"), report),
        Some("share") => obj.objects = target_references(props.get("repost-of"), report),
        _ => obj.in_reply_to = in_reply_tos,
    }

    // an activity's h-card belongs on actor, not author
    if obj.object_type.as_deref() == Some("activity") {
        obj.actor = obj.author.take();
    }

    // a note whose only text arrived as p-name reads as content
    if obj.object_type.as_deref() == Some("note")
        && obj.content.is_none()
        && obj.display_name.is_some()
    {
        obj.content = obj.display_name.take();
    }

    Some(obj)
}

/// Reply/like/repost targets: URL strings or cited entries.
fn target_references(value: Option<&Value>, report: &mut Report) -> Vec<Reference> {
    list(value)
        .iter()
        .filter_map(|target| match target {
            Value::String(url) => Some(Reference::Id(url.clone())),
            Value::Object(_) => item_to_object(target, report).map(|cited| {
                match cited.permalink() {
                    // collapse citation shells down to their identity
                    Some(url) if is_shell(&cited) => Reference::Id(url.to_string()),
                    _ => Reference::object(cited),
                }
            }),
            _ => None,
        })
        .collect()
}

/// Whether a cited object carries nothing beyond its identity.
fn is_shell(obj: &Object) -> bool {
    obj.content.is_none() && obj.display_name.is_none() && obj.author.is_none()
}

fn has(props: &Map<String, Value>, name: &str) -> bool {
    !list(props.get(name)).is_empty()
}

/// First value of a property as text, looking through `{value}` wrappers.
/// Properties are accepted in both singular and list-valued form.
fn first_text(props: &Map<String, Value>, name: &str) -> Option<String> {
    let values = list(props.get(name));
    let first = values.first()?;
    let text = match first {
        Value::String(s) => s.clone(),
        Value::Object(map) => map.get("value").and_then(Value::as_str)?.to_string(),
        _ => return None,
    };
    Some(text).filter(|t| !t.is_empty())
}

fn string_urls(value: Option<&Value>) -> Vec<String> {
    list(value)
        .iter()
        .filter_map(|v| match v {
            Value::String(s) => Some(s.clone()),
            Value::Object(map) => map
                .get("value")
                .or_else(|| map.get("url"))
                .and_then(Value::as_str)
                .map(str::to_string),
            _ => None,
        })
        .filter(|u| !u.is_empty())
        .collect()
}

fn list(value: Option<&Value>) -> Vec<Value> {
    match value {
        Some(Value::Array(items)) => items.clone(),
        Some(Value::Null) | None => Vec::new(),
        Some(other) => vec![other.clone()],
    }
}
