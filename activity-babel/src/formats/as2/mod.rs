//! Activity-JSON-2 format (ActivityPub flavored)
//!
//! The typed cousin of the canonical model: capitalized `type` values, verbs
//! as activity types (`Create`, `Announce`, `Like`), `attributedTo` instead
//! of `author`, and audience targeting against the well-known Public
//! collection IRI. Conversion is table-driven in both directions so the two
//! stay inverses of each other.

mod parser;
mod serializer;

use activity_model::Object;

use crate::error::ConvertError;
use crate::format::{Format, Options};
use crate::warnings::Conversion;

pub const CONTEXT: &str = "https://www.w3.org/ns/activitystreams";

/// The AS2 public audience collection.
pub const PUBLIC_AUDIENCE: &str = "https://www.w3.org/ns/activitystreams#Public";

/// Values accepted as meaning "public" on input.
pub const PUBLICS: &[&str] = &[PUBLIC_AUDIENCE, "as:Public", "Public"];

/// objectType ↔ type, in canonical → AS2 direction.
///
/// `hashtag → Tag` and `mention → Mention` aren't both in the AS2 spec
/// proper, but they're what the fediverse emits and are needed for a correct
/// round trip.
pub const OBJECT_TYPE_TO_TYPE: &[(&str, &str)] = &[
    ("application", "Application"),
    ("article", "Article"),
    ("audio", "Audio"),
    ("bookmark", "Note"),
    ("collection", "Collection"),
    ("comment", "Note"),
    ("event", "Event"),
    ("group", "Group"),
    ("hashtag", "Tag"),
    ("image", "Image"),
    ("link", "Link"),
    ("mention", "Mention"),
    ("note", "Note"),
    ("organization", "Organization"),
    ("page", "Page"),
    ("person", "Person"),
    ("place", "Place"),
    ("question", "Question"),
    ("service", "Service"),
    ("video", "Video"),
];

/// verb ↔ activity type, in canonical → AS2 direction.
pub const VERB_TO_TYPE: &[(&str, &str)] = &[
    ("accept", "Accept"),
    ("block", "Block"),
    ("delete", "Delete"),
    ("favorite", "Like"),
    ("flag", "Flag"),
    ("follow", "Follow"),
    ("invite", "Invite"),
    ("like", "Like"),
    ("post", "Create"),
    ("react", "Like"),
    ("reject", "Reject"),
    ("rsvp-maybe", "TentativeAccept"),
    ("rsvp-no", "Reject"),
    ("rsvp-yes", "Accept"),
    ("share", "Announce"),
    ("stop-following", "Undo"),
    ("undo", "Undo"),
    ("update", "Update"),
];

pub(crate) fn object_type_to_type(object_type: &str) -> Option<&'static str> {
    OBJECT_TYPE_TO_TYPE
        .iter()
        .find(|(from, _)| *from == object_type)
        .map(|(_, to)| *to)
}

pub(crate) fn type_to_object_type(as2_type: &str) -> Option<&'static str> {
    // inverted table with the ambiguous entries pinned
    match as2_type {
        "Note" => Some("note"),
        "Tag" => Some("hashtag"),
        other => OBJECT_TYPE_TO_TYPE
            .iter()
            .find(|(_, to)| *to == other)
            .map(|(from, _)| *from),
    }
}

pub(crate) fn verb_to_type(verb: &str) -> Option<&'static str> {
    VERB_TO_TYPE
        .iter()
        .find(|(from, _)| *from == verb)
        .map(|(_, to)| *to)
}

pub(crate) fn type_to_verb(as2_type: &str) -> Option<&'static str> {
    // inverted table with the ambiguous entries pinned
    match as2_type {
        "Accept" => Some("accept"),
        "Like" => Some("like"),
        "Reject" => Some("reject"),
        "Undo" => Some("undo"),
        other => VERB_TO_TYPE
            .iter()
            .find(|(_, to)| *to == other)
            .map(|(from, _)| *from),
    }
}

pub struct As2Format;

impl Format for As2Format {
    fn name(&self) -> &str {
        "as2"
    }

    fn description(&self) -> &str {
        "ActivityStreams 2 JSON"
    }

    fn supports_to_canonical(&self) -> bool {
        true
    }

    fn supports_from_canonical(&self) -> bool {
        true
    }

    fn to_canonical(
        &self,
        doc: &str,
        _options: &Options,
    ) -> Result<Conversion<Vec<Object>>, ConvertError> {
        parser::parse(doc)
    }

    fn from_canonical(
        &self,
        objects: &[Object],
        _options: &Options,
    ) -> Result<Conversion<String>, ConvertError> {
        serializer::serialize(objects)
    }
}
