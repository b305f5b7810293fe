//! Relay event envelope
//!
//! Events are flat signed JSON: `{id, pubkey, created_at, kind, tags,
//! content, sig}` with tags as bracketed `[name, ...values]` string arrays.
//! The envelope round-trips through serde exactly; nothing reorders or
//! rewrites tag arrays.
//!
//! The event id is the lowercase hex sha256 of the canonical serialization
//! `[0, pubkey, created_at, kind, tags, content]` with non-ASCII characters
//! left unescaped. Recomputing it validates an inbound event's integrity;
//! checking the schnorr signature against the pubkey needs key material and
//! belongs to the caller.

use serde::{Deserialize, Serialize};
use serde_json::json;
use sha2::{Digest, Sha256};

// Event kinds
pub const KIND_PROFILE: u32 = 0;
pub const KIND_NOTE: u32 = 1;
pub const KIND_CONTACTS: u32 = 3;
pub const KIND_DELETE: u32 = 5;
pub const KIND_REPOST: u32 = 6;
pub const KIND_REACTION: u32 = 7;
pub const KIND_GENERIC_REPOST: u32 = 16;
pub const KIND_ARTICLE: u32 = 30023;

/// A relay event, signed or draft.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Event {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub pubkey: String,
    #[serde(default)]
    pub created_at: i64,
    pub kind: u32,
    #[serde(default)]
    pub tags: Vec<Vec<String>>,
    #[serde(default)]
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sig: Option<String>,
}

impl Event {
    pub fn new(kind: u32) -> Self {
        Event {
            kind,
            ..Event::default()
        }
    }

    /// First tag with the given name.
    pub fn tag(&self, name: &str) -> Option<&[String]> {
        self.tags
            .iter()
            .find(|t| t.first().map(String::as_str) == Some(name))
            .map(Vec::as_slice)
    }

    /// All tags with the given name.
    pub fn tags_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a [String]> {
        self.tags
            .iter()
            .filter(move |t| t.first().map(String::as_str) == Some(name))
            .map(Vec::as_slice)
    }

    pub fn push_tag<I, S>(&mut self, values: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.push(values.into_iter().map(Into::into).collect());
    }

    /// Whether the event's id matches its contents.
    pub fn id_is_valid(&self) -> bool {
        self.id.as_deref() == Some(event_id(self).as_str())
    }
}

/// Compute an event's id: hex sha256 of the canonical serialization array.
pub fn event_id(event: &Event) -> String {
    let serialized = json!([
        0,
        event.pubkey,
        event.created_at,
        event.kind,
        event.tags,
        event.content,
    ]);
    // serde_json writes compact arrays and leaves non-ASCII unescaped,
    // which is exactly the canonical form
    let bytes = serde_json::to_string(&serialized).expect("serializing a JSON array");
    hex(&Sha256::digest(bytes.as_bytes()))
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Strip the URI scheme off a canonical id, leaving the raw hex id.
pub fn uri_to_id(uri: &str) -> String {
    uri.trim_start_matches("nostr:").to_string()
}

/// Wrap a raw hex id as a canonical URI.
pub fn id_to_uri(id: &str) -> String {
    format!("nostr:{id}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Event {
        Event {
            id: None,
            pubkey: "a".repeat(64),
            created_at: 1672531200,
            kind: KIND_NOTE,
            tags: vec![vec!["t".to_string(), "rust".to_string()]],
            content: "hello nostr".to_string(),
            sig: None,
        }
    }

    #[test]
    fn test_event_id_is_hex_sha256() {
        let id = event_id(&sample());
        assert_eq!(id.len(), 64);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_event_id_deterministic_and_content_sensitive() {
        let event = sample();
        assert_eq!(event_id(&event), event_id(&event));

        let mut changed = sample();
        changed.content.push('!');
        assert_ne!(event_id(&event), event_id(&changed));
    }

    #[test]
    fn test_event_id_unicode_not_escaped() {
        // ids over unicode content must hash the raw characters
        let mut a = sample();
        a.content = "caf\u{e9}".to_string();
        let mut b = sample();
        b.content = "cafe\u{301}".to_string();
        assert_ne!(event_id(&a), event_id(&b));
    }

    #[test]
    fn test_envelope_round_trips_exactly() {
        let mut event = sample();
        event.id = Some(event_id(&event));
        event.sig = Some("f".repeat(128));
        event.tags.push(vec![
            "e".to_string(),
            "b".repeat(64),
            "".to_string(),
            "reply".to_string(),
        ]);

        let json = serde_json::to_string(&event).unwrap();
        let back: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
        // tag arrays keep their bracketed [name, ...values] shape
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["tags"][1][0], "e");
        assert_eq!(value["tags"][1][3], "reply");
    }

    #[test]
    fn test_id_validation() {
        let mut event = sample();
        event.id = Some(event_id(&event));
        assert!(event.id_is_valid());

        event.content = "tampered".to_string();
        assert!(!event.id_is_valid());
    }
}
