//! Microformats serialization (canonical → mf2 JSON/HTML)
//!
//! Canonical objects map onto the mf2 property tree, and the HTML flavor
//! renders that tree as elements carrying the class vocabulary. Rendering
//! builds an RcDom and serializes it, so markup in content fields survives
//! as markup instead of being re-escaped.

use activity_model::{Object, Reference, Tag};
use markup5ever_rcdom::Handle;
use serde_json::{json, Map, Value};

use crate::dom;
use crate::error::ConvertError;
use crate::warnings::{Conversion, Report};

pub fn serialize_json(objects: &[Object]) -> Result<Conversion<String>, ConvertError> {
    let mut report = Report::new("mf2-json");
    let items: Vec<Value> = objects
        .iter()
        .map(|obj| object_to_item(obj, "h-entry", &mut report))
        .collect();

    let value = match items.as_slice() {
        [single] => single.clone(),
        _ => json!({ "items": items }),
    };
    let doc = serde_json::to_string_pretty(&value)?;
    Ok(report.finish(doc))
}

pub fn serialize_html(objects: &[Object]) -> Result<Conversion<String>, ConvertError> {
    let mut report = Report::new("mf2-html");
    let mut out = String::new();
    for obj in objects {
        let item = object_to_item(obj, "h-entry", &mut report);
        let node = render_item(&item)?;
        out.push_str(&dom::serialize_node(&node)?);
        out.push('\n');
    }
    Ok(report.finish(out))
}

/// Map a canonical object onto an mf2 item.
fn object_to_item(obj: &Object, entry_class: &str, report: &mut Report) -> Value {
    // a post activity is just a conduit for its object; fold the actor in
    // as the author when the object doesn't name one
    if obj.verb_or_post() == "post" && !obj.is_actor() {
        if let Some(mut inner) = obj.first_object() {
            if inner.author.is_none() {
                inner.author = obj.actor.clone().or_else(|| obj.author.clone());
            }
            if inner.id.is_none() {
                inner.id = obj.id.clone();
            }
            return object_to_item(&inner, entry_class, report);
        }
    }

    let types: Vec<String> = match obj.object_type.as_deref() {
        Some("person" | "group" | "organization" | "application" | "service") => {
            vec!["h-card".to_string()]
        }
        Some("event") => vec!["h-event".to_string()],
        Some("place") => vec!["h-card".to_string(), "p-location".to_string()],
        _ => vec![entry_class.to_string()],
    };

    let mut props: Map<String, Value> = Map::new();

    put(&mut props, "uid", obj.id.as_deref());
    put(&mut props, "name", obj.display_name.as_deref());
    put(&mut props, "summary", obj.summary.as_deref());
    put(&mut props, "published", obj.published.as_deref());
    put(&mut props, "updated", obj.updated.as_deref());
    put(&mut props, "nickname", obj.username.as_deref());

    let urls: Vec<Value> = obj.all_urls().iter().map(|u| json!(u)).collect();
    if !urls.is_empty() {
        props.insert("url".to_string(), Value::Array(urls));
    }

    if let Some(content) = obj.content.as_deref() {
        let value = if dom::looks_like_html(content) {
            json!({"html": content, "value": dom::html_to_text(content)})
        } else {
            json!(content)
        };
        props.insert("content".to_string(), Value::Array(vec![value]));
    }

    if let Some(author) = obj.author.as_deref().or(obj.actor.as_deref()) {
        let card = match author {
            Reference::Id(url) => json!(url),
            Reference::Object(author) => object_to_item(author, "h-card", report),
        };
        props.insert("author".to_string(), Value::Array(vec![card]));
    }

    let photos: Vec<Value> = obj
        .image
        .iter()
        .filter_map(|img| {
            let img = img.to_object();
            let url = img.first_url().or(img.id.as_deref())?.to_string();
            Some(match img.display_name.as_deref() {
                Some(alt) => json!({"value": url, "alt": alt}),
                None => json!(url),
            })
        })
        .collect();
    if !photos.is_empty() {
        props.insert("photo".to_string(), Value::Array(photos));
    }

    // media attachments become u-audio/u-video; note and article attachments
    // become cited children
    let mut children: Vec<Value> = Vec::new();
    for att in &obj.attachments {
        match att.object_type.as_deref() {
            Some(media @ ("audio" | "video")) => {
                let url = att
                    .stream
                    .as_deref()
                    .and_then(|s| s.id().map(str::to_string))
                    .or_else(|| att.first_url().map(str::to_string));
                if let Some(url) = url {
                    push(&mut props, media, json!(url));
                } else {
                    report.warn("attachments", format!("{media} attachment without stream URL"));
                }
            }
            Some("note" | "article" | "link") => {
                children.push(object_to_item(att, "h-cite", report));
            }
            Some("image") => {
                if let Some(url) = att.first_url() {
                    push(&mut props, "photo", json!(url));
                }
            }
            other => report.warn(
                "attachments",
                format!("dropped attachment of type {other:?}"),
            ),
        }
    }

    for tag in &obj.tags {
        if let Some(category) = tag_to_category(tag) {
            push(&mut props, "category", category);
        }
    }

    if let Some(replies) = &obj.replies {
        let comments: Vec<Value> = replies
            .items
            .iter()
            .map(|c| object_to_item(c, "h-cite", report))
            .collect();
        if !comments.is_empty() {
            props.insert("comment".to_string(), Value::Array(comments));
        }
    }

    if let Some(location) = &obj.location {
        props.insert(
            "location".to_string(),
            Value::Array(vec![object_to_item(location, "h-card", report)]),
        );
    }
    if let Some(lat) = obj.latitude {
        props.insert("latitude".to_string(), json!([lat.to_string()]));
    }
    if let Some(lon) = obj.longitude {
        props.insert("longitude".to_string(), json!([lon.to_string()]));
    }

    // activity verbs surface as their dedicated properties
    let target_ids: Vec<Value> = obj
        .objects
        .iter()
        .filter_map(|r| r.id().map(|id| json!(id)))
        .collect();
    match obj.verb.as_deref() {
        Some("like") => {
            props.insert("like-of".to_string(), Value::Array(target_ids));
        }
        Some("share") => {
            props.insert("repost-of".to_string(), Value::Array(target_ids));
        }
        Some(rsvp) if rsvp.starts_with("rsvp-") => {
            props.insert(
                "rsvp".to_string(),
                json!([rsvp.trim_start_matches("rsvp-")]),
            );
            props.insert("in-reply-to".to_string(), Value::Array(target_ids));
        }
        Some("follow") => {
            props.insert("follow-of".to_string(), Value::Array(target_ids));
        }
        _ => {}
    }

    if !obj.in_reply_to.is_empty() && !props.contains_key("in-reply-to") {
        let replies_to: Vec<Value> = obj
            .in_reply_to
            .iter()
            .filter_map(|r| r.id().map(|id| json!(id)))
            .collect();
        props.insert("in-reply-to".to_string(), Value::Array(replies_to));
    }

    let mut item = Map::new();
    item.insert("type".to_string(), json!(types));
    item.insert("properties".to_string(), Value::Object(props));
    if !children.is_empty() {
        item.insert("children".to_string(), Value::Array(children));
    }
    Value::Object(item)
}

fn tag_to_category(tag: &Tag) -> Option<Value> {
    match tag.object_type.as_deref() {
        Some("hashtag") => tag.display_name.as_deref().map(|name| json!(name)),
        Some("person") => Some(json!({
            "type": ["h-card"],
            "properties": {
                "name": tag.display_name.as_deref().map(|n| json!([n])).unwrap_or(json!([])),
                "url": tag.url.as_deref().map(|u| json!([u])).unwrap_or(json!([])),
            },
        })),
        // span tags surface inside content, not as categories
        _ => None,
    }
}

/// Render one mf2 item as HTML elements carrying the class vocabulary.
fn render_item(item: &Value) -> Result<Handle, ConvertError> {
    let map = item.as_object().cloned().unwrap_or_default();
    let types: Vec<String> = map
        .get("type")
        .and_then(Value::as_array)
        .map(|t| t.iter().filter_map(Value::as_str).map(str::to_string).collect())
        .unwrap_or_else(|| vec!["h-entry".to_string()]);
    let empty = Map::new();
    let props = map
        .get("properties")
        .and_then(Value::as_object)
        .unwrap_or(&empty);

    let root_tag = if types.iter().any(|t| t == "h-card") {
        "span"
    } else {
        "article"
    };
    let root = dom::create_element(root_tag, vec![("class", &types.join(" "))]);

    if let Some(uid) = first_str(props, "uid") {
        let span = dom::create_element("span", vec![("class", "p-uid")]);
        dom::append(&span, dom::create_text(uid));
        dom::append(&root, span);
    }

    for published in ["published", "updated"] {
        if let Some(when) = first_str(props, published) {
            let class = format!("dt-{published}");
            let time = dom::create_element("time", vec![("class", &class), ("datetime", when)]);
            dom::append(&time, dom::create_text(when));
            dom::append(&root, time);
        }
    }

    if let Some(author) = props.get("author").and_then(|v| v.as_array()?.first()) {
        let wrapper = dom::create_element("span", vec![("class", "p-author h-card")]);
        match author {
            Value::String(url) => {
                let a = dom::create_element("a", vec![("class", "u-url"), ("href", url)]);
                dom::append(&wrapper, a);
            }
            Value::Object(card) => render_card_into(&wrapper, card),
            _ => {}
        }
        dom::append(&root, wrapper);
    }

    // name: linked when we have a URL, plain otherwise
    let url = first_str(props, "url");
    if let Some(name) = first_str(props, "name") {
        match url {
            Some(url) => {
                let a = dom::create_element(
                    "a",
                    vec![("class", "p-name u-url"), ("href", url)],
                );
                dom::append(&a, dom::create_text(name));
                dom::append(&root, a);
            }
            None => {
                let span = dom::create_element("span", vec![("class", "p-name")]);
                dom::append(&span, dom::create_text(name));
                dom::append(&root, span);
            }
        }
    } else if let Some(url) = url {
        let a = dom::create_element("a", vec![("class", "u-url"), ("href", url)]);
        dom::append(&root, a);
    }

    if let Some(summary) = first_str(props, "summary") {
        let span = dom::create_element("span", vec![("class", "p-summary")]);
        dom::append(&span, dom::create_text(summary));
        dom::append(&root, span);
    }

    if let Some(rsvp) = first_str(props, "rsvp") {
        let data = dom::create_element("data", vec![("class", "p-rsvp"), ("value", rsvp)]);
        dom::append(&data, dom::create_text(rsvp));
        dom::append(&root, data);
    }

    if let Some(content) = props.get("content").and_then(|v| v.as_array()?.first()) {
        let div = dom::create_element("div", vec![("class", "e-content")]);
        match content {
            Value::Object(content) => {
                if let Some(html) = content.get("html").and_then(Value::as_str) {
                    dom::append_html(&div, html);
                }
            }
            Value::String(text) => dom::append(&div, dom::create_text(text)),
            _ => {}
        }
        dom::append(&root, div);
    }

    for (prop, class) in [
        ("in-reply-to", "u-in-reply-to"),
        ("like-of", "u-like-of"),
        ("repost-of", "u-repost-of"),
        ("follow-of", "u-follow-of"),
    ] {
        for target in all_strs(props, prop) {
            let a = dom::create_element("a", vec![("class", class), ("href", target)]);
            dom::append(&root, a);
        }
    }

    for photo in props.get("photo").and_then(Value::as_array).into_iter().flatten() {
        let (src, alt) = match photo {
            Value::String(url) => (url.clone(), None),
            Value::Object(photo) => (
                photo
                    .get("value")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                photo.get("alt").and_then(Value::as_str),
            ),
            _ => continue,
        };
        let mut attrs = vec![("class", "u-photo"), ("src", src.as_str())];
        if let Some(alt) = alt {
            attrs.push(("alt", alt));
        }
        dom::append(&root, dom::create_element("img", attrs));
    }

    for (prop, tag) in [("video", "video"), ("audio", "audio")] {
        for src in all_strs(props, prop) {
            let class = format!("u-{prop}");
            let el = dom::create_element(tag, vec![("class", &class), ("src", src), ("controls", "")]);
            dom::append(&root, el);
        }
    }

    for category in props.get("category").and_then(Value::as_array).into_iter().flatten() {
        match category {
            Value::String(name) => {
                let span = dom::create_element("span", vec![("class", "p-category")]);
                dom::append(&span, dom::create_text(name));
                dom::append(&root, span);
            }
            Value::Object(_) => {
                let card = render_item(category)?;
                // retag as a category
                if let markup5ever_rcdom::NodeData::Element { attrs, .. } = &card.data {
                    for attr in attrs.borrow_mut().iter_mut() {
                        if &*attr.name.local == "class" {
                            attr.value = format!("u-category {}", attr.value).into();
                        }
                    }
                }
                dom::append(&root, card);
            }
            _ => {}
        }
    }

    if let Some(location) = props.get("location").and_then(|v| v.as_array()?.first()) {
        if let Value::Object(_) = location {
            let rendered = render_item(location)?;
            if let markup5ever_rcdom::NodeData::Element { attrs, .. } = &rendered.data {
                for attr in attrs.borrow_mut().iter_mut() {
                    if &*attr.name.local == "class" {
                        attr.value = "p-location h-card".to_string().into();
                    }
                }
            }
            dom::append(&root, rendered);
        }
    }

    for comment in props.get("comment").and_then(Value::as_array).into_iter().flatten() {
        let rendered = render_item(comment)?;
        if let markup5ever_rcdom::NodeData::Element { attrs, .. } = &rendered.data {
            for attr in attrs.borrow_mut().iter_mut() {
                if &*attr.name.local == "class" {
                    attr.value = format!("p-comment {}", attr.value).into();
                }
            }
        }
        dom::append(&root, rendered);
    }

    for child in map.get("children").and_then(Value::as_array).into_iter().flatten() {
        dom::append(&root, render_item(child)?);
    }

    Ok(root)
}

/// An h-card's inner fields, rendered into an existing wrapper element.
fn render_card_into(wrapper: &Handle, card: &Map<String, Value>) {
    let empty = Map::new();
    let props = card
        .get("properties")
        .and_then(Value::as_object)
        .unwrap_or(&empty);
    let name = first_str(props, "name");
    let url = first_str(props, "url");

    match (name, url) {
        (Some(name), Some(url)) => {
            let a = dom::create_element("a", vec![("class", "p-name u-url"), ("href", url)]);
            dom::append(&a, dom::create_text(name));
            dom::append(wrapper, a);
        }
        (Some(name), None) => {
            let span = dom::create_element("span", vec![("class", "p-name")]);
            dom::append(&span, dom::create_text(name));
            dom::append(wrapper, span);
        }
        (None, Some(url)) => {
            let a = dom::create_element("a", vec![("class", "u-url"), ("href", url)]);
            dom::append(wrapper, a);
        }
        (None, None) => {}
    }

    if let Some(photo) = first_str(props, "photo") {
        dom::append(
            wrapper,
            dom::create_element("img", vec![("class", "u-photo"), ("src", photo)]),
        );
    }
}

fn put(props: &mut Map<String, Value>, name: &str, value: Option<&str>) {
    if let Some(value) = value {
        if !value.is_empty() {
            props.insert(name.to_string(), json!([value]));
        }
    }
}

fn push(props: &mut Map<String, Value>, name: &str, value: Value) {
    match props.get_mut(name) {
        Some(Value::Array(values)) => values.push(value),
        _ => {
            props.insert(name.to_string(), Value::Array(vec![value]));
        }
    }
}

fn first_str<'a>(props: &'a Map<String, Value>, name: &str) -> Option<&'a str> {
    let first = props.get(name)?.as_array()?.first()?;
    match first {
        Value::String(s) if !s.is_empty() => Some(s),
        Value::Object(map) => map.get("value").and_then(Value::as_str),
        _ => None,
    }
}

fn all_strs<'a>(props: &'a Map<String, Value>, name: &str) -> Vec<&'a str> {
    props
        .get(name)
        .and_then(Value::as_array)
        .map(|values| {
            values
                .iter()
                .filter_map(|v| match v {
                    Value::String(s) if !s.is_empty() => Some(s.as_str()),
                    Value::Object(map) => map.get("value").and_then(Value::as_str),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default()
}
