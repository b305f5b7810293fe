//! Audience classification
//!
//! Derives a visibility class from the `to`/`cc` audience targeting fields,
//! matched against the well-known "public" sentinel values (`@public` /
//! `@unlisted` aliases, the AS2 Public collection, followers collections).

use activity_model::{is_audience, Object, Reference, CRUD_VERBS};
use serde_json::Value;

/// Visibility of an object, as its audience targeting declares it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Public,
    Unlisted,
    /// Addressed to specific recipients or followers only.
    Private,
    /// Audience present but not classifiable.
    Unknown,
}

/// Classify an object's visibility from its audience fields.
///
/// Activities with CRUD verbs are classified by their inner object's
/// audience. No audience at all means public, the convention the canonical
/// model inherits from its sources.
pub fn audience(obj: &Object) -> Visibility {
    let inner = obj.first_object();
    let own: Vec<&Reference> = obj.to.iter().chain(obj.cc.iter()).collect();
    let inner_refs: Vec<&Reference> = inner
        .iter()
        .flat_map(|o| o.to.iter().chain(o.cc.iter()))
        .collect();

    let to_cc = if CRUD_VERBS.contains(&obj.verb_or_post()) && !inner_refs.is_empty() {
        inner_refs
    } else if own.is_empty() {
        inner_refs
    } else {
        own
    };

    if to_cc.is_empty() {
        return Visibility::Public;
    }

    let mut saw_recipient = false;
    let mut saw_unknown = false;
    for entry in to_cc {
        for value in sentinel_values(entry) {
            let lower = value.to_lowercase();
            if lower == "@public" || lower == "public" || lower.ends_with("#public") {
                return Visibility::Public;
            }
            if lower == "@unlisted" || lower == "unlisted" {
                return Visibility::Unlisted;
            }
            if is_audience(&value) || !value.is_empty() {
                saw_recipient = true;
            }
        }
        if entry
            .as_object()
            .and_then(|o| o.object_type.as_deref())
            .map(|t| t == "unknown")
            .unwrap_or(false)
        {
            saw_unknown = true;
        }
    }

    if saw_recipient {
        Visibility::Private
    } else if saw_unknown {
        Visibility::Unknown
    } else {
        Visibility::Private
    }
}

/// The values a single audience entry can carry a sentinel in: its alias,
/// then its id/URL.
fn sentinel_values(entry: &Reference) -> Vec<String> {
    let mut values = Vec::new();
    if let Some(obj) = entry.as_object() {
        if let Some(alias) = obj.extra.get("alias").and_then(Value::as_str) {
            values.push(alias.to_string());
        }
    }
    if let Some(id) = entry.id() {
        values.push(id.to_string());
    }
    values
}
