//! Relay-event protocol format (signed JSON events)
//!
//! A federated relay network where everything is a flat signed event: kind
//! 0 profiles, kind 1 notes, kind 3 contact lists, kinds 5/6/7 for deletes,
//! reposts and reactions, kind 30023 long-form articles. The envelope and
//! its `[name, ...values]` tag arrays round-trip exactly (see [event]).
//!
//! Canonical ids for relay entities use the `nostr:` scheme over the raw
//! hex event/key ids. Signing needs key material and stays with the
//! caller; this adapter computes and checks event *ids* (content hashes)
//! only.
//!
//! Queries against a live relay stream through [stream::Subscription], the
//! one place in this crate that blocks on I/O.

pub mod event;
mod parser;
mod serializer;
pub mod stream;

use activity_model::Object;

use crate::error::ConvertError;
use crate::format::{Format, Options};
use crate::warnings::Conversion;

pub use event::{event_id, Event};
pub use stream::{Filter, RelayTransport, Subscription, SubscriptionState};

pub struct NostrFormat;

impl Format for NostrFormat {
    fn name(&self) -> &str {
        "nostr"
    }

    fn description(&self) -> &str {
        "Relay protocol signed JSON events"
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

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn canonical(value: serde_json::Value) -> Vec<Object> {
        vec![serde_json::from_value(value).unwrap()]
    }

    const PUBKEY: &str =
        "ab12ab12ab12ab12ab12ab12ab12ab12ab12ab12ab12ab12ab12ab12ab12ab12";

    #[test]
    fn test_note_to_event() {
        let objs = canonical(json!({
            "objectType": "note",
            "content": "hello nostr",
            "published": "2023-01-01T00:00:00+00:00",
            "author": format!("nostr:{PUBKEY}"),
            "tags": [{"objectType": "hashtag", "displayName": "rust"}],
        }));
        let out = NostrFormat
            .from_canonical(&objs, &Options::new())
            .unwrap()
            .value;
        let event: Value = serde_json::from_str(&out).unwrap();

        assert_eq!(event["kind"], 1);
        assert_eq!(event["content"], "hello nostr");
        assert_eq!(event["pubkey"], PUBKEY);
        assert_eq!(event["created_at"], 1672531200);
        assert_eq!(event["tags"][0], json!(["t", "rust"]));
        // pubkey present, so the id is filled in
        assert_eq!(event["id"].as_str().unwrap().len(), 64);
    }

    #[test]
    fn test_note_round_trip() {
        let objs = canonical(json!({
            "objectType": "note",
            "content": "hello nostr",
            "published": "2023-01-01T00:00:00+00:00",
            "author": format!("nostr:{PUBKEY}"),
        }));
        let out = NostrFormat
            .from_canonical(&objs, &Options::new())
            .unwrap()
            .value;
        let back = NostrFormat.to_canonical(&out, &Options::new()).unwrap();
        let obj = &back.value[0];

        assert_eq!(obj.object_type.as_deref(), Some("note"));
        assert_eq!(obj.content.as_deref(), Some("hello nostr"));
        assert_eq!(
            obj.author.as_deref().and_then(|a| a.id()),
            Some(format!("nostr:{PUBKEY}").as_str())
        );
        assert_eq!(obj.published.as_deref(), Some("2023-01-01T00:00:00+00:00"));
    }

    #[test]
    fn test_profile_round_trip() {
        let objs = canonical(json!({
            "objectType": "person",
            "id": format!("nostr:{PUBKEY}"),
            "displayName": "Ann",
            "summary": "writes software",
            "url": "https://ann.example/",
        }));
        let out = NostrFormat
            .from_canonical(&objs, &Options::new())
            .unwrap()
            .value;
        let event: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(event["kind"], 0);
        let profile: Value =
            serde_json::from_str(event["content"].as_str().unwrap()).unwrap();
        assert_eq!(profile["name"], "Ann");
        assert_eq!(profile["about"], "writes software");

        let back = NostrFormat.to_canonical(&out, &Options::new()).unwrap();
        let obj = &back.value[0];
        assert_eq!(obj.object_type.as_deref(), Some("person"));
        assert_eq!(obj.display_name.as_deref(), Some("Ann"));
        assert_eq!(obj.url.as_deref(), Some("https://ann.example/"));
    }

    #[test]
    fn test_like_round_trip() {
        let target = "cd34cd34cd34cd34cd34cd34cd34cd34cd34cd34cd34cd34cd34cd34cd34cd34";
        let objs = canonical(json!({
            "objectType": "activity",
            "verb": "like",
            "actor": format!("nostr:{PUBKEY}"),
            "object": format!("nostr:{target}"),
        }));
        let out = NostrFormat
            .from_canonical(&objs, &Options::new())
            .unwrap()
            .value;
        let event: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(event["kind"], 7);
        assert_eq!(event["content"], "+");
        assert_eq!(event["tags"][0], json!(["e", target]));

        let back = NostrFormat.to_canonical(&out, &Options::new()).unwrap();
        let obj = &back.value[0];
        assert_eq!(obj.verb.as_deref(), Some("like"));
        assert_eq!(
            obj.objects[0].id(),
            Some(format!("nostr:{target}").as_str())
        );
    }

    #[test]
    fn test_reply_tag_round_trip() {
        let parent = "ef56ef56ef56ef56ef56ef56ef56ef56ef56ef56ef56ef56ef56ef56ef56ef56";
        let objs = canonical(json!({
            "objectType": "comment",
            "content": "same here",
            "author": format!("nostr:{PUBKEY}"),
            "inReplyTo": format!("nostr:{parent}"),
        }));
        let out = NostrFormat
            .from_canonical(&objs, &Options::new())
            .unwrap()
            .value;
        let event: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(event["tags"][0], json!(["e", parent, "", "reply"]));

        let back = NostrFormat.to_canonical(&out, &Options::new()).unwrap();
        assert_eq!(
            back.value[0].in_reply_to[0].id(),
            Some(format!("nostr:{parent}").as_str())
        );
    }

    #[test]
    fn test_follow_with_petnames() {
        let followed = "9999999999999999999999999999999999999999999999999999999999999999";
        let objs = canonical(json!({
            "objectType": "activity",
            "verb": "follow",
            "actor": format!("nostr:{PUBKEY}"),
            "object": {"id": format!("nostr:{followed}"), "displayName": "Bob"},
        }));
        let out = NostrFormat
            .from_canonical(&objs, &Options::new())
            .unwrap()
            .value;
        let event: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(event["kind"], 3);
        assert_eq!(event["tags"][0], json!(["p", followed, "", "Bob"]));

        let back = NostrFormat.to_canonical(&out, &Options::new()).unwrap();
        let obj = &back.value[0];
        assert_eq!(obj.verb.as_deref(), Some("follow"));
        let bob = obj.objects[0].to_object();
        assert_eq!(bob.display_name.as_deref(), Some("Bob"));
    }

    #[test]
    fn test_event_without_kind_is_parse_error() {
        assert!(NostrFormat
            .to_canonical(r#"{"content": "no kind"}"#, &Options::new())
            .is_err());
    }
}
