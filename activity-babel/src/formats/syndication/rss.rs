//! RSS 2.0 conversion (RSS XML ⇄ canonical)
//!
//! Emission keeps feed validators happy: every item carries a `guid`, HTML
//! content rides in a CDATA-wrapped `content:encoded` block (with its
//! namespace declared), audio/video attachments become enclosures so
//! podcast clients pick them up. Parsing is lenient about which of
//! `description` / `content:encoded` carries the body.

use activity_model::text::ellipsize;
use activity_model::{Object, Reference, Tag};
use markup5ever_rcdom::Handle;

use super::{entry_object, to_rfc2822, to_rfc3339};
use crate::dom;
use crate::error::ConvertError;
use crate::format::Options;
use crate::warnings::{Conversion, Report};
use crate::xml_writer::XmlWriter;

const NS_CONTENT: &str = "http://purl.org/rss/1.0/modules/content/";
const NS_ATOM: &str = "http://www.w3.org/2005/Atom";

pub fn serialize(objects: &[Object], options: &Options) -> Result<Conversion<String>, ConvertError> {
    let mut report = Report::new("rss");
    let mut w = XmlWriter::new();

    w.open(
        "rss",
        &[
            ("version", "2.0"),
            ("xmlns:content", NS_CONTENT),
            ("xmlns:atom", NS_ATOM),
        ],
    );
    w.open("channel", &[]);

    let feed_actor = objects
        .iter()
        .find_map(|o| o.author_or_actor())
        .unwrap_or_default();

    let title = options
        .title
        .clone()
        .or_else(|| feed_actor.display_name.clone())
        .unwrap_or_else(|| "-".to_string());
    w.element("title", &[], &title);

    if let Some(home) = options.home_page_url.as_deref().or(feed_actor.first_url()) {
        w.element("link", &[], home);
    }
    // description is required by the spec, even when there's nothing to say
    w.element(
        "description",
        &[],
        feed_actor.summary.as_deref().unwrap_or("-"),
    );
    if let Some(feed_url) = options.feed_url.as_deref() {
        w.empty(
            "atom:link",
            &[
                ("href", feed_url),
                ("rel", "self"),
                ("type", "application/rss+xml"),
            ],
        );
    }

    let latest = objects
        .iter()
        .map(entry_object)
        .filter_map(|o| o.published.clone())
        .max()
        .and_then(|iso| to_rfc2822(&iso));
    if let Some(latest) = latest {
        w.element("lastBuildDate", &[], &latest);
    }

    for activity in objects {
        if activity.is_actor() {
            report.warn("item", "skipped actor object in feed position");
            continue;
        }
        write_item(&mut w, activity, &mut report);
    }

    Ok(report.finish(w.finish()))
}

fn write_item(w: &mut XmlWriter, activity: &Object, report: &mut Report) {
    let obj = entry_object(activity);

    w.open("item", &[]);

    let title = obj
        .title
        .clone()
        .or_else(|| obj.display_name.clone())
        .or_else(|| {
            obj.content
                .as_deref()
                .map(|c| ellipsize(&dom::html_to_text(c), 100))
        });
    if let Some(title) = title {
        w.element("title", &[], &title);
    }

    if let Some(url) = obj.first_url() {
        w.element("link", &[], url);
        w.element("guid", &[("isPermaLink", "true")], url);
    } else if let Some(id) = obj.id.as_deref() {
        w.element("guid", &[("isPermaLink", "false")], id);
    } else {
        report.warn("item.guid", "item has neither url nor id");
    }

    if let Some(summary) = obj.summary.as_deref() {
        w.element("description", &[], summary);
    }
    if let Some(content) = obj.content.as_deref() {
        w.element_cdata("content:encoded", &[], content);
    }

    if let Some(author) = obj.author_or_actor() {
        // RSS <author> wants an email address; a plain name doesn't qualify
        match author.extra.get("email").and_then(serde_json::Value::as_str) {
            Some(email) => {
                let name = author.display_name.as_deref().unwrap_or_default();
                let value = if name.is_empty() {
                    email.to_string()
                } else {
                    format!("{email} ({name})")
                };
                w.element("author", &[], &value);
            }
            None => {
                if let Some(name) = author.display_name.as_deref() {
                    report.warn("item.author", format!("no email for author '{name}', omitted"));
                }
            }
        }
    }

    if let Some(pub_date) = obj
        .published
        .as_deref()
        .or(obj.updated.as_deref())
        .and_then(to_rfc2822)
    {
        w.element("pubDate", &[], &pub_date);
    }

    for tag in &obj.tags {
        if tag.is_span() {
            continue;
        }
        let skip = matches!(
            tag.object_type.as_deref(),
            Some("article" | "person" | "mention")
        ) || matches!(tag.verb.as_deref(), Some("like" | "react" | "share"));
        if skip {
            continue;
        }
        if let Some(name) = tag.display_name.as_deref() {
            w.element("category", &[], name);
        }
    }

    // audio and video attachments become enclosures; feed readers only
    // expect one per item
    let mut has_enclosure = false;
    for att in &obj.attachments {
        let media = matches!(att.object_type.as_deref(), Some("audio" | "video"));
        let url = att
            .stream
            .as_deref()
            .and_then(|s| s.id().map(str::to_string))
            .or_else(|| att.first_url().map(str::to_string));
        if let (true, Some(url)) = (media, url) {
            if has_enclosure {
                report.warn("item.enclosure", format!("second enclosure {url} skipped"));
                continue;
            }
            has_enclosure = true;
            let mime = att.mime_type.clone().unwrap_or_else(|| guess_mime(&url));
            w.empty(
                "enclosure",
                &[("url", &url), ("type", &mime), ("length", "0")],
            );
        }
    }
    for img in &obj.image {
        let img = img.to_object();
        if let Some(url) = img.first_url().or(img.id.as_deref()) {
            let mime = img.mime_type.clone().unwrap_or_else(|| guess_mime(url));
            w.empty("enclosure", &[("url", url), ("type", &mime), ("length", "0")]);
        }
    }

    w.close();
}

/// Minimal extension-based media type sniffing for enclosures.
fn guess_mime(url: &str) -> String {
    let ext = url.rsplit('.').next().unwrap_or_default().to_lowercase();
    let mime = match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "mp3" => "audio/mpeg",
        "ogg" => "audio/ogg",
        "wav" => "audio/wav",
        "mp4" => "video/mp4",
        "mov" => "video/quicktime",
        "webm" => "video/webm",
        _ => "application/octet-stream",
    };
    mime.to_string()
}

pub fn parse(doc: &str) -> Result<Conversion<Vec<Object>>, ConvertError> {
    let tree = dom::parse_xml(doc)?;
    let mut report = Report::new("rss");
    let root = dom::root_element(&tree)
        .ok_or_else(|| ConvertError::Parse("empty RSS document".to_string()))?;

    if dom::tag_name(&root).as_deref() != Some("rss") {
        return Err(ConvertError::Parse(format!(
            "expected <rss> root, got {:?}",
            dom::tag_name(&root)
        )));
    }
    let channel = dom::find_first(&root, "channel")
        .ok_or_else(|| ConvertError::Parse("missing <channel>".to_string()))?;

    let feed_actor = parse_channel_actor(&channel);
    let activities = dom::children_named(&channel, "item")
        .iter()
        .map(|item| parse_item(item, &feed_actor, &mut report))
        .collect();
    Ok(report.finish(activities))
}

fn parse_channel_actor(channel: &Handle) -> Object {
    let mut actor = Object::new();
    actor.display_name = child_text(channel, "title");
    actor.url = child_text(channel, "link");
    actor.summary = child_text(channel, "description");
    actor
}

fn parse_item(item: &Handle, feed_actor: &Object, report: &mut Report) -> Object {
    let mut obj = Object::of_type("note");

    let url = child_text(item, "link");
    let guid = child_text(item, "guid");
    obj.id = guid.clone().or_else(|| url.clone());
    obj.url = url.or(guid);

    // the body may live in content:encoded or description; prefer the
    // richer one
    let encoded = child_text(item, "encoded");
    let description = child_text(item, "description");
    let content = encoded.or(description);
    let title = child_text(item, "title");

    let (display_name, content) = match (title, content) {
        (Some(t), Some(c)) => {
            let stem = t.trim_end_matches('…').trim_end_matches("...").trim();
            if dom::html_to_text(&c).starts_with(stem) {
                (None, Some(c))
            } else {
                obj.object_type = Some("article".to_string());
                (Some(t), Some(c))
            }
        }
        (title, content) => (title, content),
    };
    obj.display_name = display_name;
    obj.content = content;

    if let Some(raw) = child_text(item, "pubDate") {
        obj.published = to_rfc3339(&raw).or(Some(raw));
    }

    for category in dom::children_named(item, "category") {
        let term = dom::text_content(&category).trim().to_string();
        if !term.is_empty() {
            obj.tags.push(Tag {
                display_name: Some(term),
                ..Tag::default()
            });
        }
    }

    for enclosure in dom::children_named(item, "enclosure") {
        let Some(url) = dom::attr(&enclosure, "url").filter(|u| !u.is_empty()) else {
            report.warn("enclosure", "missing url");
            continue;
        };
        let mime = dom::attr(&enclosure, "type").unwrap_or_else(|| guess_mime(&url));
        match mime.split('/').next().unwrap_or_default() {
            "image" => {
                let mut image = Object::of_type("image");
                image.url = Some(url);
                image.mime_type = Some(mime);
                obj.image.push(Reference::object(image));
            }
            media @ ("audio" | "video") => {
                obj.attachments.push(Object {
                    object_type: Some(media.to_string()),
                    stream: Some(Box::new(Reference::Id(url))),
                    mime_type: Some(mime),
                    ..Object::default()
                });
            }
            _ => report.warn("enclosure", format!("unsupported media type {mime}")),
        }
    }

    let author = match child_text(item, "author") {
        Some(raw) => {
            // "email (Name)" per the RSS spec
            let mut author = Object::of_type("person");
            let (email, name) = match raw.split_once('(') {
                Some((email, name)) => (
                    email.trim().to_string(),
                    Some(name.trim_end_matches(')').trim().to_string()),
                ),
                None => (raw.trim().to_string(), None),
            };
            author.display_name = name;
            author
                .extra
                .insert("email".to_string(), serde_json::Value::String(email));
            author
        }
        None => feed_actor.clone(),
    };

    let mut activity = Object::of_type("activity");
    activity.verb = Some("post".to_string());
    activity.id = obj.id.clone();
    activity.url = obj.url.clone();
    obj.author = Some(Box::new(Reference::object(author.clone())));
    activity.actor = Some(Box::new(Reference::object(author)));
    activity.objects = vec![Reference::object(obj)];
    activity
}

fn child_text(node: &Handle, tag: &str) -> Option<String> {
    dom::children_named(node, tag)
        .first()
        .map(|c| dom::text_content(c).trim().to_string())
        .filter(|t| !t.is_empty())
}
