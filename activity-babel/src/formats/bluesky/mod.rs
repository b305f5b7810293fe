//! Typed-record protocol format (AT lexicon records)
//!
//! Records are JSON with exact `$type` discriminators from the published
//! lexicon (`app.bsky.feed.post`, `app.bsky.actor.profile`, ...). Three
//! things set this adapter apart from the JSON dialects:
//!
//! - rich-text "facets" address text by **UTF-8 byte offset**, so canonical
//!   codepoint spans are re-derived against the encoded text (see [facet]);
//! - length limits bind the *encoded byte size* of fields as well as their
//!   grapheme count;
//! - media rides as content-addressed blob references that only the caller
//!   can mint (uploads happen outside this crate), threaded in through
//!   [BlobResolver](crate::format::BlobResolver).
//!
//! A record can carry at most one rich embed. When a post has both images
//! and an external link, images win and the link is appended to the text,
//! which loses less than dropping the images would.

pub mod facet;
mod parser;
mod serializer;

use activity_model::Object;

use crate::error::ConvertError;
use crate::format::{Format, Options};
use crate::warnings::Conversion;

/// Lexicon `$type` strings.
pub const POST: &str = "app.bsky.feed.post";
pub const LIKE: &str = "app.bsky.feed.like";
pub const REPOST: &str = "app.bsky.feed.repost";
pub const FOLLOW: &str = "app.bsky.graph.follow";
pub const PROFILE: &str = "app.bsky.actor.profile";
pub const FACET: &str = "app.bsky.richtext.facet";
pub const FACET_MENTION: &str = "app.bsky.richtext.facet#mention";
pub const FACET_LINK: &str = "app.bsky.richtext.facet#link";
pub const FACET_TAG: &str = "app.bsky.richtext.facet#tag";
pub const EMBED_IMAGES: &str = "app.bsky.embed.images";
pub const EMBED_EXTERNAL: &str = "app.bsky.embed.external";
pub const EMBED_RECORD: &str = "app.bsky.embed.record";
pub const STRONG_REF: &str = "com.atproto.repo.strongRef";

/// Post text limits from the `app.bsky.feed.post` lexicon: grapheme count
/// and UTF-8 byte length are separate constraints.
pub const MAX_POST_GRAPHEMES: usize = 300;
pub const MAX_POST_BYTES: usize = 3000;

/// Profile field limits, in graphemes.
pub const MAX_DISPLAY_NAME_GRAPHEMES: usize = 64;
pub const MAX_DESCRIPTION_GRAPHEMES: usize = 256;

/// Most images a single image embed may carry.
pub const MAX_IMAGES: usize = 4;

pub struct BlueskyFormat;

impl Format for BlueskyFormat {
    fn name(&self) -> &str {
        "bluesky"
    }

    fn description(&self) -> &str {
        "AT protocol lexicon records"
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
        options: &Options,
    ) -> Result<Conversion<String>, ConvertError> {
        serializer::serialize(objects, options)
    }
}

/// Extract a DID from the reference shapes profile links come in: a bare
/// DID, an `at://` URI, or a profile page URL.
pub(crate) fn did_from_url(url: &str) -> Option<String> {
    if url.starts_with("did:") {
        return Some(url.to_string());
    }
    if let Some(rest) = url.strip_prefix("at://") {
        let authority = rest.split('/').next().unwrap_or_default();
        if authority.starts_with("did:") {
            return Some(authority.to_string());
        }
        return None;
    }
    for prefix in [
        "https://bsky.app/profile/",
        "https://staging.bsky.app/profile/",
    ] {
        if let Some(rest) = url.strip_prefix(prefix) {
            let id = rest.split(['/', '?']).next().unwrap_or_default();
            if id.starts_with("did:") {
                return Some(id.to_string());
            }
        }
    }
    None
}

/// An `at://` record URI for reply/like/repost subjects, from the id/url
/// shapes the canonical model carries.
pub(crate) fn at_uri_from_ref(value: &str) -> Option<String> {
    if value.starts_with("at://") {
        return Some(value.to_string());
    }
    // https://bsky.app/profile/<did>/post/<rkey> → at://<did>/app.bsky.feed.post/<rkey>
    for prefix in [
        "https://bsky.app/profile/",
        "https://staging.bsky.app/profile/",
    ] {
        if let Some(rest) = value.strip_prefix(prefix) {
            let mut parts = rest.split('/');
            let repo = parts.next().unwrap_or_default();
            if parts.next() == Some("post") {
                if let Some(rkey) = parts.next().filter(|r| !r.is_empty()) {
                    if repo.starts_with("did:") {
                        return Some(format!("at://{repo}/{POST}/{rkey}"));
                    }
                }
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_did_from_url_shapes() {
        assert_eq!(did_from_url("did:plc:abc"), Some("did:plc:abc".to_string()));
        assert_eq!(
            did_from_url("at://did:plc:abc/app.bsky.feed.post/123"),
            Some("did:plc:abc".to_string())
        );
        assert_eq!(
            did_from_url("https://bsky.app/profile/did:plc:abc"),
            Some("did:plc:abc".to_string())
        );
        assert_eq!(did_from_url("https://bsky.app/profile/ann.example"), None);
        assert_eq!(did_from_url("https://example.com/ann"), None);
    }

    #[test]
    fn test_at_uri_from_ref_shapes() {
        assert_eq!(
            at_uri_from_ref("at://did:plc:abc/app.bsky.feed.post/123"),
            Some("at://did:plc:abc/app.bsky.feed.post/123".to_string())
        );
        assert_eq!(
            at_uri_from_ref("https://bsky.app/profile/did:plc:abc/post/123"),
            Some("at://did:plc:abc/app.bsky.feed.post/123".to_string())
        );
        assert_eq!(at_uri_from_ref("https://example.com/post/1"), None);
    }
}
