//! AS2 parsing (AS2 JSON → canonical)

use activity_model::{Collection, Object, Reference, Tag};
use serde_json::{Map, Value};

use super::{type_to_object_type, type_to_verb, PUBLICS};
use crate::error::ConvertError;
use crate::warnings::{Conversion, Report};

pub fn parse(doc: &str) -> Result<Conversion<Vec<Object>>, ConvertError> {
    let value: Value = serde_json::from_str(doc)?;
    let mut report = Report::new("as2");

    let objects = match value {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| convert_value(&item, &mut report))
            .collect(),
        Value::Object(ref map)
            if matches!(
                map.get("type").and_then(Value::as_str),
                Some("Collection") | Some("OrderedCollection")
            ) =>
        {
            let items = map
                .get("orderedItems")
                .or_else(|| map.get("items"))
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default();
            items
                .iter()
                .filter_map(|item| convert_value(item, &mut report))
                .collect()
        }
        other => convert_value(&other, &mut report).into_iter().collect(),
    };

    Ok(report.finish(objects))
}

fn convert_value(value: &Value, report: &mut Report) -> Option<Object> {
    match value {
        Value::Object(map) => Some(convert_object(map, report)),
        other => {
            report.warn("item", format!("expected object, dropped {other}"));
            None
        }
    }
}

fn convert_object(map: &Map<String, Value>, report: &mut Report) -> Object {
    let mut obj = Object::new();
    let as2_type = map.get("type").and_then(Value::as_str);

    if let Some(as2_type) = as2_type {
        if let Some(verb) = type_to_verb(as2_type) {
            obj.object_type = Some("activity".to_string());
            obj.verb = Some(verb.to_string());
        } else if let Some(object_type) = type_to_object_type(as2_type) {
            obj.object_type = Some(object_type.to_string());
        } else {
            // unknown types pass through lowercased rather than being dropped
            obj.object_type = Some(as2_type.to_lowercase());
        }
    }

    obj.id = str_field(map, "id");
    obj.display_name = str_field(map, "name");
    obj.summary = str_field(map, "summary");
    obj.content = str_field(map, "content");
    obj.published = str_field(map, "published");
    obj.updated = str_field(map, "updated");
    obj.username = str_field(map, "preferredUsername");

    let urls = string_list(map.get("url"));
    obj.url = urls.first().cloned();
    obj.urls = if urls.len() > 1 { urls } else { Vec::new() };

    if let Some(author) = map.get("attributedTo") {
        obj.author = reference(author, report).map(Box::new);
    }
    if let Some(actor) = map.get("actor") {
        obj.actor = reference(actor, report).map(Box::new);
    }
    for inner in list(map.get("object")) {
        if let Some(inner_ref) = reference(&inner, report) {
            obj.objects.push(inner_ref);
        }
    }
    for reply_to in list(map.get("inReplyTo")) {
        if let Some(reply_ref) = reference(&reply_to, report) {
            obj.in_reply_to.push(reply_ref);
        }
    }

    // icon falls in with image; AS2 actors split the two, the canonical
    // model doesn't
    for img in list(map.get("image")).iter().chain(list(map.get("icon")).iter()) {
        if let Some(img_ref) = reference(img, report) {
            obj.image.push(img_ref);
        }
    }

    for att in list(map.get("attachment")) {
        if let Value::Object(att_map) = &att {
            obj.attachments.push(convert_object(att_map, report));
        }
    }

    for tag in list(map.get("tag")) {
        if let Some(tag) = convert_tag(&tag) {
            obj.tags.push(tag);
        } else {
            report.warn("tag", format!("unsupported tag shape: {tag}"));
        }
    }

    for (field, target) in [("to", &mut obj.to), ("cc", &mut obj.cc)] {
        for entry in list(map.get(field)) {
            target.push(convert_audience(&entry));
        }
    }

    if let Some(Value::Object(replies)) = map.get("replies") {
        obj.replies = Some(convert_collection(replies, report));
    }

    if let Some(Value::Object(location)) = map.get("location") {
        obj.location = Some(Box::new(convert_object(location, report)));
    }

    obj
}

fn convert_tag(value: &Value) -> Option<Tag> {
    let map = value.as_object()?;
    let tag_type = map.get("type").and_then(Value::as_str)?;
    let name = map.get("name").and_then(Value::as_str);
    let href = map
        .get("href")
        .or_else(|| map.get("url"))
        .or_else(|| map.get("id"))
        .and_then(Value::as_str);

    match tag_type {
        "Hashtag" | "Tag" => Some(Tag {
            object_type: Some("hashtag".to_string()),
            display_name: name.map(|n| n.trim_start_matches('#').to_string()),
            url: href.map(str::to_string),
            ..Tag::default()
        }),
        "Mention" => Some(Tag {
            object_type: Some("mention".to_string()),
            display_name: name.map(str::to_string),
            url: href.map(str::to_string),
            ..Tag::default()
        }),
        _ => None,
    }
}

fn convert_audience(value: &Value) -> Reference {
    let id = match value {
        Value::String(s) => s.as_str(),
        Value::Object(map) => map.get("id").and_then(Value::as_str).unwrap_or_default(),
        _ => "",
    };
    if PUBLICS.contains(&id) {
        let mut group = Object::of_type("group");
        group
            .extra
            .insert("alias".to_string(), Value::String("@public".to_string()));
        return Reference::object(group);
    }
    match value {
        Value::String(s) => Reference::Id(s.clone()),
        Value::Object(_) => Reference::Id(id.to_string()),
        other => Reference::Id(other.to_string()),
    }
}

fn convert_collection(map: &Map<String, Value>, report: &mut Report) -> Collection {
    let items = map
        .get("orderedItems")
        .or_else(|| map.get("items"))
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    Collection {
        total_items: map.get("totalItems").and_then(Value::as_u64),
        items: items
            .iter()
            .filter_map(|item| convert_value(item, report))
            .collect(),
    }
}

/// An AS2 reference value: bare IRI string or nested object.
fn reference(value: &Value, report: &mut Report) -> Option<Reference> {
    match value {
        Value::String(s) => Some(Reference::Id(s.clone())),
        Value::Object(map) => Some(Reference::object(convert_object(map, report))),
        other => {
            report.warn("reference", format!("dropped non-reference value {other}"));
            None
        }
    }
}

fn str_field(map: &Map<String, Value>, field: &str) -> Option<String> {
    map.get(field).and_then(Value::as_str).map(str::to_string)
}

fn list(value: Option<&Value>) -> Vec<Value> {
    match value {
        Some(Value::Array(items)) => items.clone(),
        Some(Value::Null) | None => Vec::new(),
        Some(other) => vec![other.clone()],
    }
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    list(value)
        .iter()
        .filter_map(|v| match v {
            Value::String(s) => Some(s.clone()),
            Value::Object(map) => map.get("href").and_then(Value::as_str).map(str::to_string),
            _ => None,
        })
        .collect()
}
