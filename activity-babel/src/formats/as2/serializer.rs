//! AS2 serialization (canonical → AS2 JSON)

use activity_model::{Collection, Object, Reference, Tag};
use serde_json::{json, Map, Value};

use super::{object_type_to_type, verb_to_type, CONTEXT, PUBLIC_AUDIENCE};
use crate::error::ConvertError;
use crate::warnings::{Conversion, Report};

pub fn serialize(objects: &[Object]) -> Result<Conversion<String>, ConvertError> {
    let mut report = Report::new("as2");

    let value = match objects {
        [] => {
            return Err(ConvertError::Validation(
                "nothing to serialize: no canonical objects given".to_string(),
            ))
        }
        [single] => {
            let mut map = convert_object(single, &mut report);
            with_context(&mut map);
            Value::Object(map)
        }
        many => {
            let items: Vec<Value> = many
                .iter()
                .map(|obj| Value::Object(convert_object(obj, &mut report)))
                .collect();
            let mut map = Map::new();
            map.insert("type".to_string(), json!("OrderedCollection"));
            map.insert("totalItems".to_string(), json!(items.len()));
            map.insert("orderedItems".to_string(), Value::Array(items));
            with_context(&mut map);
            Value::Object(map)
        }
    };

    let doc = serde_json::to_string_pretty(&value)?;
    Ok(report.finish(doc))
}

fn with_context(map: &mut Map<String, Value>) {
    let mut with = Map::new();
    with.insert("@context".to_string(), json!(CONTEXT));
    with.append(map);
    *map = with;
}

fn convert_object(obj: &Object, report: &mut Report) -> Map<String, Value> {
    let mut map = Map::new();

    let as2_type = if let Some(verb) = obj.verb.as_deref() {
        match verb_to_type(verb) {
            Some(t) => Some(t.to_string()),
            None => {
                report.warn("verb", format!("no AS2 activity type for verb '{verb}'"));
                None
            }
        }
    } else {
        obj.object_type.as_deref().map(|t| {
            object_type_to_type(t)
                .map(str::to_string)
                // unknown open tags go out capitalized rather than dropped
                .unwrap_or_else(|| capitalize(t))
        })
    };
    if let Some(as2_type) = as2_type {
        map.insert("type".to_string(), json!(as2_type));
    }

    put_str(&mut map, "id", obj.id.as_deref());
    put_str(&mut map, "name", obj.display_name.as_deref());
    put_str(&mut map, "summary", obj.summary.as_deref());
    put_str(&mut map, "content", obj.content.as_deref());
    put_str(&mut map, "published", obj.published.as_deref());
    put_str(&mut map, "updated", obj.updated.as_deref());
    put_str(&mut map, "preferredUsername", obj.username.as_deref());

    let urls = obj.all_urls();
    match urls.len() {
        0 => {}
        1 => {
            map.insert("url".to_string(), json!(urls[0]));
        }
        _ => {
            map.insert("url".to_string(), json!(urls));
        }
    }

    if let Some(author) = obj.author.as_deref() {
        map.insert("attributedTo".to_string(), reference(author, report));
    }
    if let Some(actor) = obj.actor.as_deref() {
        map.insert("actor".to_string(), reference(actor, report));
    }
    match obj.objects.as_slice() {
        [] => {}
        [single] => {
            map.insert("object".to_string(), reference(single, report));
        }
        many => {
            let refs: Vec<Value> = many.iter().map(|r| reference(r, report)).collect();
            map.insert("object".to_string(), Value::Array(refs));
        }
    }

    if let Some(first) = obj.in_reply_to.first() {
        if let Some(id) = first.id() {
            map.insert("inReplyTo".to_string(), json!(id));
        }
    }

    if !obj.image.is_empty() {
        let images: Vec<Value> = obj
            .image
            .iter()
            .filter_map(|img| {
                let img = img.to_object();
                img.first_url().or(img.id.as_deref()).map(|url| {
                    json!({"type": "Image", "url": url})
                })
            })
            .collect();
        if !images.is_empty() {
            map.insert("image".to_string(), Value::Array(images));
        }
    }

    if !obj.attachments.is_empty() {
        let atts: Vec<Value> = obj
            .attachments
            .iter()
            .map(|att| Value::Object(convert_object(att, report)))
            .collect();
        map.insert("attachment".to_string(), Value::Array(atts));
    }

    let tags: Vec<Value> = obj.tags.iter().filter_map(convert_tag).collect();
    if !tags.is_empty() {
        map.insert("tag".to_string(), Value::Array(tags));
    }

    for (field, refs) in [("to", &obj.to), ("cc", &obj.cc)] {
        let values: Vec<Value> = refs.iter().map(audience_value).collect();
        if !values.is_empty() {
            map.insert(field.to_string(), Value::Array(values));
        }
    }

    if let Some(replies) = &obj.replies {
        map.insert("replies".to_string(), collection(replies, report));
    }

    if let Some(location) = &obj.location {
        let mut loc = convert_object(location, report);
        loc.entry("type".to_string()).or_insert(json!("Place"));
        if let Some(lat) = obj.latitude.or(location.latitude) {
            loc.insert("latitude".to_string(), json!(lat));
        }
        if let Some(lon) = obj.longitude.or(location.longitude) {
            loc.insert("longitude".to_string(), json!(lon));
        }
        map.insert("location".to_string(), Value::Object(loc));
    }

    map
}

fn convert_tag(tag: &Tag) -> Option<Value> {
    match tag.object_type.as_deref() {
        Some("hashtag") => {
            let name = tag.display_name.as_deref()?;
            let mut out = Map::new();
            out.insert("type".to_string(), json!("Hashtag"));
            out.insert("name".to_string(), json!(format!("#{name}")));
            if let Some(url) = tag.url.as_deref() {
                out.insert("href".to_string(), json!(url));
            }
            Some(Value::Object(out))
        }
        Some("mention") => {
            let mut out = Map::new();
            out.insert("type".to_string(), json!("Mention"));
            out.insert("href".to_string(), json!(tag.url.as_deref()?));
            if let Some(name) = tag.display_name.as_deref() {
                out.insert("name".to_string(), json!(name));
            }
            Some(Value::Object(out))
        }
        // offsetless categories and received reactions have no AS2 tag shape
        _ => None,
    }
}

fn audience_value(entry: &Reference) -> Value {
    if let Some(obj) = entry.as_object() {
        if let Some(alias) = obj.extra.get("alias").and_then(Value::as_str) {
            if alias == "@public" || alias == "@unlisted" {
                return json!(PUBLIC_AUDIENCE);
            }
        }
    }
    json!(entry.id().unwrap_or_default())
}

fn collection(coll: &Collection, report: &mut Report) -> Value {
    let items: Vec<Value> = coll
        .items
        .iter()
        .map(|item| Value::Object(convert_object(item, report)))
        .collect();
    let mut map = Map::new();
    map.insert("type".to_string(), json!("Collection"));
    if let Some(total) = coll.total_items {
        map.insert("totalItems".to_string(), json!(total));
    }
    if !items.is_empty() {
        map.insert("items".to_string(), Value::Array(items));
    }
    Value::Object(map)
}

fn reference(entry: &Reference, report: &mut Report) -> Value {
    match entry {
        Reference::Id(id) => json!(id),
        Reference::Object(obj) => Value::Object(convert_object(obj, report)),
    }
}

fn put_str(map: &mut Map<String, Value>, field: &str, value: Option<&str>) {
    if let Some(value) = value {
        if !value.is_empty() {
            map.insert(field.to_string(), json!(value));
        }
    }
}

fn capitalize(tag: &str) -> String {
    let mut chars = tag.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
