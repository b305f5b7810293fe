//! Canonical object definitions
//!
//! The canonical model is the pivot every wire format converts through. It is
//! a deliberately loose tree: every field is optional, reference fields accept
//! either a bare id string or a nested object, and keys we don't recognize are
//! preserved verbatim in an extension bag so they survive a round trip.
//!
//! The serde representation is the canonical JSON dialect itself (camelCase
//! field names), so `serde_json::from_str::<Object>` doubles as the parser for
//! the passthrough format.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ShapeError;

/// Object types that can act (post, follow, be followed)
pub const ACTOR_TYPES: &[&str] = &["application", "group", "organization", "person", "service"];

/// Object types that hold post-like content
pub const POST_TYPES: &[&str] = &["article", "bookmark", "comment", "link", "mention", "note"];

/// Verbs whose `object` field names the activity's target
pub const VERBS_WITH_OBJECT: &[&str] = &[
    "accept",
    "block",
    "flag",
    "follow",
    "invite",
    "like",
    "react",
    "reject",
    "rsvp-interested",
    "rsvp-maybe",
    "rsvp-no",
    "rsvp-yes",
    "share",
    "stop-following",
    "undo",
];

/// Verbs that wrap an inner object rather than being interesting themselves
pub const CRUD_VERBS: &[&str] = &["delete", "post", "undo", "update"];

/// RSVP verbs, in priority order
pub const RSVP_VERBS: &[&str] = &["rsvp-yes", "rsvp-no", "rsvp-maybe", "rsvp-interested", "invite"];

/// A reference to another object: either a bare id/URL string or a fully
/// nested object. Both shapes are syntactically valid anywhere a reference
/// occurs, and every consumer resolves them through the same three accessors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Reference {
    Id(String),
    Object(Box<Object>),
}

impl Reference {
    pub fn object(obj: Object) -> Self {
        Reference::Object(Box::new(obj))
    }

    /// The referenced id: the string itself for a bare reference, otherwise
    /// the nested object's `id` falling back to its `url`.
    pub fn id(&self) -> Option<&str> {
        match self {
            Reference::Id(s) => Some(s),
            Reference::Object(o) => o.id.as_deref().or(o.url.as_deref()),
        }
    }

    /// The nested object, if this reference carries one.
    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Reference::Id(_) => None,
            Reference::Object(o) => Some(o),
        }
    }

    /// Resolve to an owned object. A bare id string becomes `{id: ...}`, the
    /// same normalization every adapter relies on.
    pub fn to_object(&self) -> Object {
        match self {
            Reference::Id(s) => Object {
                id: Some(s.clone()),
                ..Object::default()
            },
            Reference::Object(o) => (**o).clone(),
        }
    }
}

impl From<&str> for Reference {
    fn from(id: &str) -> Self {
        Reference::Id(id.to_string())
    }
}

impl From<Object> for Reference {
    fn from(obj: Object) -> Self {
        Reference::object(obj)
    }
}

/// A tag attached to an object. Tags with `start_index`/`length` are span
/// tags: the range, counted in codepoints of `content`, marks an inline
/// mention, hashtag or embedded link. Tags without offsets are unordered
/// metadata (categories, received likes and reposts).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Tag {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verb: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_index: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub length: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<Box<Reference>>,
    #[serde(flatten, skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,
}

impl Tag {
    /// Whether this tag annotates a text span.
    pub fn is_span(&self) -> bool {
        self.start_index.is_some() && self.length.is_some()
    }

    /// The tag's identity for de-duplication: `(objectType, id-or-url)`.
    pub fn dedupe_key(&self) -> (Option<&str>, Option<&str>) {
        (
            self.object_type.as_deref(),
            self.id.as_deref().or(self.url.as_deref()),
        )
    }
}

/// A collection of related objects, eg replies to a post.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Collection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_items: Option<u64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<Object>,
}

impl Collection {
    pub fn is_empty(&self) -> bool {
        self.total_items.is_none() && self.items.is_empty()
    }
}

/// The canonical activity/object record.
///
/// Field processing order never affects output shape; adapters read whichever
/// fields they understand and ignore the rest. Unknown keys land in `extra`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Object {
    /// Open type tag: `note`, `article`, `person`, `activity`, ... Unknown
    /// values are preserved, never rejected.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object_type: Option<String>,
    /// Open activity verb: `post`, `like`, `share`, `rsvp-yes`, ... Absent
    /// implies `post`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verb: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(
        deserialize_with = "lenient::url",
        skip_serializing_if = "Option::is_none"
    )]
    pub url: Option<String>,
    #[serde(
        deserialize_with = "lenient::urls",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub urls: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// Rich text; may contain inline HTML markup.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<Box<Reference>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actor: Option<Box<Reference>>,
    /// The target(s) of an activity, eg the liked post. AS1 says singular;
    /// real data sometimes carries a list, so we tolerate both on input and
    /// serialize a single element back as a bare value.
    #[serde(
        rename = "object",
        with = "one_or_many",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub objects: Vec<Reference>,
    #[serde(
        rename = "inReplyTo",
        with = "one_or_many",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub in_reply_to: Vec<Reference>,
    #[serde(with = "one_or_many", skip_serializing_if = "Vec::is_empty")]
    pub image: Vec<Reference>,
    /// Media stream (audio/video source) for media objects.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream: Option<Box<Reference>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Object>,
    /// Audience targeting; drives public/unlisted/private classification.
    #[serde(with = "one_or_many", skip_serializing_if = "Vec::is_empty")]
    pub to: Vec<Reference>,
    #[serde(with = "one_or_many", skip_serializing_if = "Vec::is_empty")]
    pub cc: Vec<Reference>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<Box<Object>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replies: Option<Collection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub likes: Option<Collection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shares: Option<Collection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    /// Extension bag: unrecognized keys, preserved verbatim through
    /// conversions.
    #[serde(flatten, skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,
}

impl Object {
    pub fn new() -> Self {
        Object::default()
    }

    /// Shorthand constructor for the common case.
    pub fn of_type(object_type: &str) -> Self {
        Object {
            object_type: Some(object_type.to_string()),
            ..Object::default()
        }
    }

    /// The effective type: `objectType` unless it is the generic `activity`
    /// wrapper, in which case the verb discriminates.
    pub fn type_tag(&self) -> Option<&str> {
        match self.object_type.as_deref() {
            Some("activity") | None => self.verb.as_deref().or(self.object_type.as_deref()),
            some => some,
        }
    }

    /// The effective verb; absent implies `post`.
    pub fn verb_or_post(&self) -> &str {
        self.verb.as_deref().unwrap_or("post")
    }

    pub fn is_activity(&self) -> bool {
        self.object_type.as_deref() == Some("activity") || self.verb.is_some()
    }

    pub fn is_actor(&self) -> bool {
        matches!(self.object_type.as_deref(), Some(t) if ACTOR_TYPES.contains(&t))
    }

    /// First target object, resolved to a full (possibly minimal) object.
    pub fn first_object(&self) -> Option<Object> {
        self.objects.first().map(Reference::to_object)
    }

    /// The activity's author or actor, resolved. Prefers `author`.
    pub fn author_or_actor(&self) -> Option<Object> {
        self.author
            .as_deref()
            .or(self.actor.as_deref())
            .map(Reference::to_object)
    }

    /// The id of whoever owns this object: author, then actor, then the
    /// object's own id for actor types, then the inner object's owner for
    /// CRUD verbs.
    pub fn owner_id(&self) -> Option<String> {
        if let Some(owner) = self.author.as_deref().or(self.actor.as_deref()) {
            if let Some(id) = owner.id() {
                return Some(id.to_string());
            }
        }
        if self.is_actor() {
            if let Some(id) = &self.id {
                return Some(id.clone());
            }
        }
        if CRUD_VERBS.contains(&self.verb_or_post()) {
            if let Some(inner) = self.first_object() {
                return inner.owner_id();
            }
        }
        None
    }

    /// First URL: `url`, then the first of `urls`.
    pub fn first_url(&self) -> Option<&str> {
        self.url
            .as_deref()
            .or_else(|| self.urls.first().map(String::as_str))
    }

    /// Permalink for linking back to the source: `url`, falling back to `id`.
    pub fn permalink(&self) -> Option<&str> {
        self.first_url().or(self.id.as_deref())
    }

    /// Unique URLs, order preserved.
    pub fn all_urls(&self) -> Vec<&str> {
        let mut seen = BTreeSet::new();
        self.url
            .as_deref()
            .into_iter()
            .chain(self.urls.iter().map(String::as_str))
            .filter(|u| !u.is_empty() && seen.insert(*u))
            .collect()
    }

    /// Check the model invariants this crate can verify locally: span tag
    /// offsets must lie within the codepoint bounds of `content`.
    pub fn validate(&self) -> Result<(), ShapeError> {
        let content_len = self.content.as_deref().map(|c| c.chars().count());
        for (i, tag) in self.tags.iter().enumerate() {
            if let (Some(start), Some(len)) = (tag.start_index, tag.length) {
                let bound = content_len.ok_or_else(|| {
                    ShapeError::new(format!("tags[{i}]"), "span tag without content")
                })?;
                if start + len > bound {
                    return Err(ShapeError::new(
                        format!("tags[{i}].startIndex"),
                        format!("span {}..{} outside content of {} chars", start, start + len, bound),
                    ));
                }
            }
        }
        for (i, att) in self.attachments.iter().enumerate() {
            att.validate()
                .map_err(|e| ShapeError::new(format!("attachments[{i}].{}", e.field), e.reason))?;
        }
        Ok(())
    }

    /// Public / private classification from the audience targeting fields.
    ///
    /// Returns `Some(true)` for public (the default when no audience is
    /// given), `Some(false)` for private, `None` when the audience is
    /// explicitly unknown.
    pub fn is_public(&self) -> Option<bool> {
        let inner = self.first_object();
        let own: Vec<&Reference> = self.to.iter().chain(self.cc.iter()).collect();
        let inner_refs: Vec<&Reference> = inner
            .iter()
            .flat_map(|o| o.to.iter().chain(o.cc.iter()))
            .collect();

        let to_cc = if CRUD_VERBS.contains(&self.verb_or_post()) && !inner_refs.is_empty() {
            inner_refs
        } else if own.is_empty() {
            inner_refs
        } else {
            own
        };

        if to_cc.is_empty() {
            return Some(true);
        }

        let mut saw_alias = false;
        let mut saw_unknown = false;
        for entry in &to_cc {
            let obj = entry.as_object();
            let alias = obj
                .and_then(|o| o.extra.get("alias"))
                .and_then(Value::as_str);
            if let Some(alias) = alias {
                saw_alias = true;
                if alias == "@public" || alias == "@unlisted" {
                    return Some(true);
                }
            }
            if let Some(id) = entry.id() {
                if is_audience(id) && audience_is_public(id) {
                    return Some(true);
                }
            }
            if obj.and_then(|o| o.object_type.as_deref()) == Some("unknown") {
                saw_unknown = true;
            }
        }

        if saw_unknown && !saw_alias {
            return None;
        }
        Some(false)
    }
}

/// Whether a value is a "special" audience sentinel rather than a real
/// recipient, eg `@public`, the AS2 Public collection, or a followers
/// collection URL.
pub fn is_audience(val: &str) -> bool {
    if val.is_empty() {
        return false;
    }
    let lower = val.to_lowercase();
    matches!(lower.as_str(), "public" | "unlisted" | "private")
        || lower.starts_with("https://www.w3.org/")
        || lower.starts_with("https://w3.org/")
        || lower.starts_with('@')
        || lower.starts_with("as:")
        || lower.ends_with("#public")
        || lower.ends_with("/followers")
        || lower.ends_with("/following")
}

/// Whether an audience sentinel means "visible to everyone".
pub fn audience_is_public(val: &str) -> bool {
    let lower = val.to_lowercase();
    matches!(lower.as_str(), "public" | "unlisted" | "@public" | "@unlisted" | "as:public")
        || lower.ends_with("#public")
}

mod one_or_many {
    //! Accept a bare value or a list for list-valued fields, and write a
    //! single element back as a bare value.

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<T, S>(items: &[T], serializer: S) -> Result<S::Ok, S::Error>
    where
        T: Serialize,
        S: Serializer,
    {
        if items.len() == 1 {
            items[0].serialize(serializer)
        } else {
            items.serialize(serializer)
        }
    }

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<Vec<T>, D::Error>
    where
        T: Deserialize<'de>,
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum OneOrMany<T> {
            One(T),
            Many(Vec<T>),
        }

        Ok(match OneOrMany::deserialize(deserializer)? {
            OneOrMany::One(item) => vec![item],
            OneOrMany::Many(items) => items,
        })
    }
}

mod lenient {
    //! Lenient URL field parsing: providers emit `url` as a string, as
    //! `{"value": ...}`, or as a list of either.

    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    fn from_value(val: &Value) -> Option<String> {
        match val {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Object(map) => map
                .get("value")
                .or_else(|| map.get("url"))
                .and_then(Value::as_str)
                .map(str::to_string),
            _ => None,
        }
    }

    pub fn url<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let val = Value::deserialize(deserializer)?;
        Ok(match &val {
            Value::Array(items) => items.iter().find_map(from_value),
            other => from_value(other),
        })
    }

    pub fn urls<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let val = Value::deserialize(deserializer)?;
        Ok(match &val {
            Value::Array(items) => items.iter().filter_map(from_value).collect(),
            other => from_value(other).into_iter().collect(),
        })
    }
}

impl fmt::Display for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = self.type_tag().unwrap_or("object");
        match self.id.as_deref().or(self.url.as_deref()) {
            Some(id) => write!(f, "{tag}({id})"),
            None => write!(f, "{tag}"),
        }
    }
}
