//! JSON Feed 1.1 conversion (JSON Feed ⇄ canonical)
//!
//! JSON Feed spec: https://jsonfeed.org/version/1.1

use activity_model::{Object, Reference};
use serde_json::{json, Map, Value};

use super::entry_object;
use crate::dom;
use crate::error::ConvertError;
use crate::format::Options;
use crate::warnings::{Conversion, Report};

const VERSION: &str = "https://jsonfeed.org/version/1.1";

/// Attachment object types JSON Feed can express.
const ATTACHMENT_TYPES: &[&str] = &["audio", "image", "video"];

pub fn serialize(objects: &[Object], options: &Options) -> Result<Conversion<String>, ConvertError> {
    let mut report = Report::new("json-feed");

    let feed_actor = objects
        .iter()
        .find_map(|o| o.author_or_actor())
        .unwrap_or_default();

    let mut items: Vec<Value> = Vec::new();
    for activity in objects {
        if activity.is_actor() {
            report.warn("items", "skipped actor object in feed position");
            continue;
        }
        items.push(write_item(activity, &mut report));
    }

    let mut feed = Map::new();
    feed.insert("version".to_string(), json!(VERSION));
    let title = options
        .title
        .clone()
        .or_else(|| feed_actor.display_name.clone())
        .or_else(|| feed_actor.username.clone())
        .unwrap_or_else(|| "JSON Feed".to_string());
    feed.insert("title".to_string(), json!(title));
    if let Some(home) = options.home_page_url.as_deref().or(feed_actor.first_url()) {
        feed.insert("home_page_url".to_string(), json!(home));
    }
    if let Some(feed_url) = options.feed_url.as_deref() {
        feed.insert("feed_url".to_string(), json!(feed_url));
    }
    if let Some(author) = author_value(&feed_actor) {
        feed.insert("authors".to_string(), json!([author]));
    }
    feed.insert("items".to_string(), Value::Array(items));

    let doc = serde_json::to_string_pretty(&Value::Object(feed))?;
    Ok(report.finish(doc))
}

fn write_item(activity: &Object, report: &mut Report) -> Value {
    let obj = entry_object(activity);
    let mut item = Map::new();

    if let Some(id) = obj.id.as_deref().or(obj.first_url()) {
        item.insert("id".to_string(), json!(id));
    }
    if let Some(url) = obj.first_url() {
        item.insert("url".to_string(), json!(url));
    }
    if let Some(image) = obj.image.first().map(Reference::to_object) {
        if let Some(image_url) = image.first_url().or(image.id.as_deref()) {
            item.insert("image".to_string(), json!(image_url));
        }
    }

    // a title only when it's a real title, not the content's first line
    let title = obj.title.as_deref().or(obj.display_name.as_deref());
    if let Some(title) = title {
        let body = obj.content.as_deref().unwrap_or_default();
        if !dom::html_to_text(body).starts_with(title.trim()) {
            item.insert("title".to_string(), json!(title));
        }
    }

    if let Some(summary) = obj.summary.as_deref() {
        item.insert("summary".to_string(), json!(summary));
    }
    match obj.content.as_deref() {
        Some(content) if dom::looks_like_html(content) => {
            item.insert("content_html".to_string(), json!(content));
        }
        Some(content) => {
            item.insert("content_text".to_string(), json!(content));
        }
        None => {
            item.insert("content_text".to_string(), json!(""));
        }
    }

    if let Some(published) = obj.published.as_deref() {
        item.insert("date_published".to_string(), json!(published));
    }
    if let Some(updated) = obj.updated.as_deref() {
        item.insert("date_modified".to_string(), json!(updated));
    }

    if let Some(author) = obj.author_or_actor().as_ref().and_then(author_value) {
        item.insert("authors".to_string(), json!([author]));
    }

    let mut attachments: Vec<Value> = Vec::new();
    for att in &obj.attachments {
        let att_type = att.object_type.as_deref().unwrap_or_default();
        if !ATTACHMENT_TYPES.contains(&att_type) {
            continue;
        }
        let url = att
            .stream
            .as_deref()
            .and_then(|s| s.id().map(str::to_string))
            .or_else(|| att.first_url().map(str::to_string));
        let Some(url) = url else {
            report.warn("attachments", format!("{att_type} attachment without URL"));
            continue;
        };
        let mut attachment = Map::new();
        attachment.insert("url".to_string(), json!(url));
        if let Some(mime) = att.mime_type.as_deref() {
            attachment.insert("mime_type".to_string(), json!(mime));
        }
        if let Some(title) = att.title.as_deref().or(att.display_name.as_deref()) {
            attachment.insert("title".to_string(), json!(title));
        }
        attachments.push(Value::Object(attachment));
    }
    if !attachments.is_empty() {
        item.insert("attachments".to_string(), Value::Array(attachments));
    }

    Value::Object(item)
}

fn author_value(actor: &Object) -> Option<Value> {
    let name = actor
        .display_name
        .as_deref()
        .or(actor.username.as_deref());
    let url = actor.first_url();
    let avatar = actor
        .image
        .first()
        .map(Reference::to_object)
        .and_then(|img| img.first_url().or(img.id.as_deref()).map(str::to_string));

    if name.is_none() && url.is_none() && avatar.is_none() {
        return None;
    }
    let mut author = Map::new();
    if let Some(name) = name {
        author.insert("name".to_string(), json!(name));
    }
    if let Some(url) = url {
        author.insert("url".to_string(), json!(url));
    }
    if let Some(avatar) = avatar {
        author.insert("avatar".to_string(), json!(avatar));
    }
    Some(Value::Object(author))
}

pub fn parse(doc: &str) -> Result<Conversion<Vec<Object>>, ConvertError> {
    let value: Value = serde_json::from_str(doc)?;
    let mut report = Report::new("json-feed");
    let feed = value
        .as_object()
        .ok_or_else(|| ConvertError::Parse("expected a JSON Feed object".to_string()))?;

    let feed_author = feed
        .get("authors")
        .and_then(|a| a.as_array()?.first().cloned())
        .or_else(|| feed.get("author").cloned())
        .and_then(|a| parse_author(&a));

    let mut activities = Vec::new();
    for item in feed
        .get("items")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default()
    {
        let Some(item) = item.as_object() else {
            report.warn("items", format!("dropped non-object item {item}"));
            continue;
        };
        activities.push(parse_item(item, feed_author.as_ref(), &mut report));
    }

    Ok(report.finish(activities))
}

fn parse_item(item: &Map<String, Value>, feed_author: Option<&Object>, report: &mut Report) -> Object {
    let title = item.get("title").and_then(Value::as_str);
    let mut obj = Object::of_type(if title.is_some() { "article" } else { "note" });

    obj.id = item
        .get("id")
        .map(|id| match id {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .filter(|id| !id.is_empty());
    obj.url = item
        .get("url")
        .and_then(Value::as_str)
        .map(str::to_string);
    obj.display_name = title.map(str::to_string);
    obj.summary = item
        .get("summary")
        .and_then(Value::as_str)
        .map(str::to_string);
    obj.content = item
        .get("content_html")
        .or_else(|| item.get("content_text"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .filter(|c| !c.is_empty());
    obj.published = item
        .get("date_published")
        .and_then(Value::as_str)
        .map(str::to_string);
    obj.updated = item
        .get("date_modified")
        .and_then(Value::as_str)
        .map(str::to_string);

    if let Some(image) = item.get("image").and_then(Value::as_str) {
        let mut img = Object::of_type("image");
        img.url = Some(image.to_string());
        obj.image.push(Reference::object(img));
    }

    let author = item
        .get("authors")
        .and_then(|a| a.as_array()?.first().cloned())
        .or_else(|| item.get("author").cloned())
        .and_then(|a| parse_author(&a))
        .or_else(|| feed_author.cloned());
    if let Some(author) = author {
        obj.author = Some(Box::new(Reference::object(author)));
    }

    for attachment in item
        .get("attachments")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default()
    {
        let Some(attachment) = attachment.as_object() else {
            report.warn("attachments", "dropped non-object attachment");
            continue;
        };
        let url = attachment
            .get("url")
            .and_then(Value::as_str)
            .unwrap_or_default();
        let mime = attachment
            .get("mime_type")
            .and_then(Value::as_str)
            .unwrap_or_default();
        let media = mime.split('/').next().unwrap_or_default();

        let mut att = Object::new();
        att.title = attachment
            .get("title")
            .and_then(Value::as_str)
            .map(str::to_string);
        att.mime_type = Some(mime.to_string()).filter(|m| !m.is_empty());
        if matches!(media, "audio" | "video") {
            att.object_type = Some(media.to_string());
            att.stream = Some(Box::new(Reference::Id(url.to_string())));
        } else {
            att.object_type = Some("image".to_string());
            att.url = Some(url.to_string()).filter(|u| !u.is_empty());
        }
        obj.attachments.push(att);
    }

    obj
}

fn parse_author(value: &Value) -> Option<Object> {
    let map = value.as_object()?;
    let mut author = Object::of_type("person");
    author.display_name = map.get("name").and_then(Value::as_str).map(str::to_string);
    author.url = map.get("url").and_then(Value::as_str).map(str::to_string);
    if let Some(avatar) = map.get("avatar").and_then(Value::as_str) {
        let mut img = Object::of_type("image");
        img.url = Some(avatar.to_string());
        author.image.push(Reference::object(img));
    }
    if author.display_name.is_none() && author.url.is_none() && author.image.is_empty() {
        return None;
    }
    Some(author)
}
