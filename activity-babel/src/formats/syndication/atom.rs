//! Atom conversion (Atom XML ⇄ canonical)
//!
//! Emission follows the Atom spec's required elements (id, title, updated)
//! plus the activity extension namespace for object types and verbs. HTML
//! content goes out CDATA-wrapped. Parsing accepts a whole `<feed>` or a
//! bare `<entry>`.

use activity_model::text::ellipsize;
use activity_model::{Object, Reference, Tag};
use markup5ever_rcdom::Handle;

use super::{entry_object, to_rfc3339};
use crate::dom;
use crate::error::ConvertError;
use crate::format::Options;
use crate::warnings::{Conversion, Report};
use crate::xml_writer::XmlWriter;

const NS_ATOM: &str = "http://www.w3.org/2005/Atom";
const NS_ACTIVITY: &str = "http://activitystrea.ms/spec/1.0/";
const NS_GEORSS: &str = "http://www.georss.org/georss";
const NS_THREAD: &str = "http://purl.org/syndication/thread/1.0";
const SCHEMA_PREFIX: &str = "http://activitystrea.ms/schema/1.0/";

pub fn serialize(objects: &[Object], options: &Options) -> Result<Conversion<String>, ConvertError> {
    let mut report = Report::new("atom");
    let mut w = XmlWriter::new();

    w.open(
        "feed",
        &[
            ("xml:lang", "en"),
            ("xmlns", NS_ATOM),
            ("xmlns:activity", NS_ACTIVITY),
            ("xmlns:georss", NS_GEORSS),
            ("xmlns:thr", NS_THREAD),
        ],
    );

    let feed_url = options.feed_url.as_deref();
    let home = options.home_page_url.as_deref();
    let feed_actor = objects
        .iter()
        .find_map(|o| o.author_or_actor())
        .unwrap_or_default();

    w.element("id", &[], feed_url.or(home).unwrap_or("urn:syndication:feed"));
    let title = options.title.clone().unwrap_or_else(|| {
        format!(
            "User feed for {}",
            feed_actor.display_name.as_deref().unwrap_or("Unknown")
        )
    });
    w.element("title", &[], &title);

    let updated = objects
        .iter()
        .map(entry_object)
        .filter_map(|o| o.published.clone())
        .max()
        .unwrap_or_else(|| "1970-01-01T00:00:00Z".to_string());
    w.element("updated", &[], &updated);

    if let Some(feed_url) = feed_url {
        w.empty(
            "link",
            &[("rel", "self"), ("type", "application/atom+xml"), ("href", feed_url)],
        );
    }
    if let Some(home) = home {
        w.empty(
            "link",
            &[("rel", "alternate"), ("type", "text/html"), ("href", home)],
        );
    }

    write_author(&mut w, &feed_actor);

    for activity in objects {
        if activity.is_actor() {
            report.warn("entry", "skipped actor object in feed position");
            continue;
        }
        write_entry(&mut w, activity, &mut report);
    }

    Ok(report.finish(w.finish()))
}

fn write_author(w: &mut XmlWriter, actor: &Object) {
    w.open("author", &[]);
    w.element(
        "activity:object-type",
        &[],
        &format!("{SCHEMA_PREFIX}person"),
    );
    if let Some(url) = actor.first_url() {
        w.element("uri", &[], url);
    }
    if let Some(name) = actor.display_name.as_deref() {
        w.element("name", &[], name);
    }
    w.close();
}

fn write_entry(w: &mut XmlWriter, activity: &Object, report: &mut Report) {
    let obj = entry_object(activity);

    w.open("entry", &[]);

    if let Some(author) = obj.author_or_actor().or_else(|| activity.author_or_actor()) {
        write_author(w, &author);
    }

    let object_type = obj.object_type.as_deref().unwrap_or("note");
    w.element(
        "activity:object-type",
        &[],
        &format!("{SCHEMA_PREFIX}{object_type}"),
    );
    w.element(
        "activity:verb",
        &[],
        &format!("{SCHEMA_PREFIX}{}", activity.verb_or_post()),
    );

    let id = obj.id.as_deref().or(obj.url.as_deref());
    match id {
        Some(id) => w.element("id", &[], id),
        None => report.warn("entry.id", "entry has neither id nor url"),
    }

    // Atom requires a plain-text title on every entry
    let title = obj
        .title
        .clone()
        .or_else(|| obj.display_name.clone())
        .or_else(|| {
            obj.content
                .as_deref()
                .map(|c| ellipsize(&dom::html_to_text(c), 100))
        })
        .unwrap_or_else(|| "Untitled".to_string());
    w.element("title", &[], &title);

    if let Some(summary) = obj.summary.as_deref() {
        w.element("summary", &[], summary);
    }

    if let Some(content) = obj.content.as_deref() {
        w.element_cdata("content", &[("type", "html")], content);
    }

    if let Some(published) = obj.published.as_deref() {
        w.element("published", &[], published);
    }
    if let Some(updated) = obj.updated.as_deref().or(obj.published.as_deref()) {
        w.element("updated", &[], updated);
    }

    for reply_to in &obj.in_reply_to {
        let target = reply_to.to_object();
        let mut attrs: Vec<(&str, &str)> = Vec::new();
        if let Some(id) = target.id.as_deref() {
            attrs.push(("ref", id));
        }
        if let Some(url) = target.permalink() {
            attrs.push(("href", url));
        }
        if !attrs.is_empty() {
            w.empty("thr:in-reply-to", &attrs);
        }
    }

    if let Some(url) = obj.first_url() {
        w.empty(
            "link",
            &[("rel", "alternate"), ("type", "text/html"), ("href", url)],
        );
    }

    for tag in &obj.tags {
        if tag.is_span() {
            continue;
        }
        if let Some(name) = tag.display_name.as_deref() {
            w.empty("category", &[("term", name)]);
        }
    }

    if let (Some(lat), Some(lon)) = (obj.latitude, obj.longitude) {
        w.element("georss:point", &[], &format!("{lat} {lon}"));
    }

    w.close();
}

pub fn parse(doc: &str) -> Result<Conversion<Vec<Object>>, ConvertError> {
    let tree = dom::parse_xml(doc)?;
    let mut report = Report::new("atom");
    let root = dom::root_element(&tree)
        .ok_or_else(|| ConvertError::Parse("empty Atom document".to_string()))?;

    let (entries, feed_author) = match dom::tag_name(&root).as_deref() {
        Some("feed") => {
            let author = dom::children_named(&root, "author")
                .first()
                .map(parse_author);
            (dom::children_named(&root, "entry"), author)
        }
        Some("entry") => (vec![root], None),
        other => {
            return Err(ConvertError::Parse(format!(
                "expected <feed> or <entry> root, got {other:?}"
            )))
        }
    };

    let activities = entries
        .iter()
        .map(|entry| parse_entry(entry, feed_author.as_ref(), &mut report))
        .collect();
    Ok(report.finish(activities))
}

fn parse_author(author: &Handle) -> Object {
    let mut actor = Object::of_type("person");
    if let Some(name) = dom::children_named(author, "name").first() {
        let name = dom::text_content(name).trim().to_string();
        actor.display_name = Some(name).filter(|n| !n.is_empty());
    }
    if let Some(uri) = dom::children_named(author, "uri").first() {
        let uri = dom::text_content(uri).trim().to_string();
        actor.url = Some(uri).filter(|u| !u.is_empty());
    }
    actor
}

fn parse_entry(entry: &Handle, feed_author: Option<&Object>, report: &mut Report) -> Object {
    let mut obj = Object::of_type("note");

    let title = dom::children_named(entry, "title")
        .first()
        .map(|t| dom::text_content(t).trim().to_string())
        .filter(|t| !t.is_empty());

    let content = dom::children_named(entry, "content")
        .first()
        .map(|c| dom::text_content(c).trim().to_string())
        .filter(|c| !c.is_empty());

    // a title that just starts the content off is presentation, not a title
    let title = match (&title, &content) {
        (Some(t), Some(c)) => {
            let stem = t.trim_end_matches('…').trim_end_matches("...");
            if c.starts_with(stem.trim()) {
                None
            } else {
                obj.object_type = Some("article".to_string());
                title.clone()
            }
        }
        (Some(_), None) => {
            // only a title: treat it as note text below
            title.clone()
        }
        _ => None,
    };
    obj.display_name = title;
    obj.content = content.or_else(|| {
        // entries with only a <title> read as short notes
        obj.display_name.take()
    });

    if let Some(summary) = dom::children_named(entry, "summary").first() {
        let summary = dom::text_content(summary).trim().to_string();
        obj.summary = Some(summary).filter(|s| !s.is_empty());
    }

    if let Some(id) = dom::children_named(entry, "id").first() {
        let id = dom::text_content(id).trim().to_string();
        obj.id = Some(id).filter(|i| !i.is_empty());
    }

    for link in dom::children_named(entry, "link") {
        let rel = dom::attr(&link, "rel").unwrap_or_else(|| "alternate".to_string());
        if rel == "alternate" {
            obj.url = dom::attr(&link, "href").filter(|h| !h.is_empty());
        }
    }

    if let Some(published) = dom::children_named(entry, "published").first() {
        let raw = dom::text_content(published).trim().to_string();
        obj.published = to_rfc3339(&raw).or(Some(raw));
    }
    if let Some(updated) = dom::children_named(entry, "updated").first() {
        let raw = dom::text_content(updated).trim().to_string();
        obj.updated = to_rfc3339(&raw).or(Some(raw));
    }

    // activity extension elements refine the defaults
    let mut verb = "post".to_string();
    if let Some(type_el) = dom::children_named(entry, "object-type").first() {
        if let Some(object_type) = schema_suffix(&dom::text_content(type_el)) {
            obj.object_type = Some(object_type);
        }
    }
    if let Some(verb_el) = dom::children_named(entry, "verb").first() {
        if let Some(parsed) = schema_suffix(&dom::text_content(verb_el)) {
            verb = parsed;
        }
    }

    for reply in dom::children_named(entry, "in-reply-to") {
        let id = dom::attr(&reply, "ref");
        let href = dom::attr(&reply, "href");
        match (id, href) {
            (Some(id), href) => {
                let mut target = Object::new();
                target.id = Some(id);
                target.url = href;
                obj.in_reply_to.push(Reference::object(target));
            }
            (None, Some(href)) => obj.in_reply_to.push(Reference::Id(href)),
            (None, None) => report.warn("thr:in-reply-to", "missing both ref and href"),
        }
    }

    for category in dom::children_named(entry, "category") {
        if let Some(term) = dom::attr(&category, "term").filter(|t| !t.is_empty()) {
            obj.tags.push(Tag {
                display_name: Some(term),
                ..Tag::default()
            });
        }
    }

    if let Some(point) = dom::children_named(entry, "point").first() {
        let text = dom::text_content(point);
        let mut parts = text.split_whitespace();
        if let (Some(lat), Some(lon)) = (parts.next(), parts.next()) {
            obj.latitude = lat.parse().ok();
            obj.longitude = lon.parse().ok();
        }
    }

    let author = dom::children_named(entry, "author")
        .first()
        .map(parse_author)
        .filter(|a| a.display_name.is_some() || a.url.is_some())
        .or_else(|| feed_author.cloned());
    obj.author = author
        .clone()
        .map(|a| Box::new(Reference::object(a)));

    let mut activity = Object::of_type("activity");
    activity.verb = Some(verb);
    activity.id = obj.id.clone();
    activity.url = obj.url.clone();
    activity.actor = author.map(|a| Box::new(Reference::object(a)));
    activity.objects = vec![Reference::object(obj)];
    activity
}

/// The tail segment of an activity schema IRI, eg `.../schema/1.0/note`.
fn schema_suffix(text: &str) -> Option<String> {
    let text = text.trim();
    let suffix = text.rsplit('/').next().unwrap_or(text);
    Some(suffix.to_string()).filter(|s| !s.is_empty())
}
