//! Format trait definition
//!
//! This module defines the core Format trait that all format adapters
//! implement. The trait provides a uniform interface for converting between
//! an external document and the canonical model. Formats can support either
//! direction or both.
//!
//! Adapters never talk to each other: every conversion goes external →
//! canonical → external through the [registry](crate::registry), so adding a
//! format means writing one adapter, not one per format pair.

use std::collections::HashMap;

use activity_model::text::{IncludeLink, TruncateOptions};
use activity_model::Object;
use serde::{Deserialize, Serialize};

use crate::error::ConvertError;
use crate::warnings::Conversion;

/// A content-addressed reference to uploaded binary media in the
/// typed-record protocol. Produced by the caller's upload step; this crate
/// never performs uploads itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Blob {
    /// Content hash digest, eg a CID
    pub cid: String,
    pub mime_type: String,
    pub size: u64,
}

/// Maps a source media URL to its uploaded blob reference.
///
/// `from_canonical` on blob-carrying formats consults this to fill media
/// fields; media without a resolution degrades to a warning, not an error.
pub trait BlobResolver {
    fn resolve(&self, url: &str) -> Option<Blob>;
}

impl BlobResolver for HashMap<String, Blob> {
    fn resolve(&self, url: &str) -> Option<Blob> {
        self.get(url).cloned()
    }
}

/// Options threaded through every conversion call.
///
/// All tunables travel here explicitly; there is no ambient configuration
/// surface in this crate.
#[derive(Default)]
pub struct Options<'a> {
    /// Whether emitted post text links back to the source object.
    pub include_link: IncludeLink,
    /// Override an adapter's default length limit.
    pub truncate: Option<TruncateOptions>,
    /// Feed title, for feed-shaped targets.
    pub title: Option<String>,
    /// URL of the feed document itself (`rel="self"`).
    pub feed_url: Option<String>,
    /// Home page the feed belongs to.
    pub home_page_url: Option<String>,
    /// Blob resolution for content-addressed media fields.
    pub blobs: Option<&'a dyn BlobResolver>,
}

impl Options<'_> {
    pub fn new() -> Self {
        Options::default()
    }
}

/// Trait for activity formats
///
/// Implementors provide conversion between an external document and the
/// canonical model, in either or both directions.
///
/// Both directions are deterministic and pure: identical inputs yield
/// identical outputs, nothing is cached, and calls are safe to run
/// concurrently. `to_canonical` drops unsupported constructs with a warning
/// and only fails on malformed required structure; `from_canonical` degrades
/// gracefully when the target can't express a field, and only fails when the
/// omission would change the meaning of the result.
pub trait Format: Send + Sync {
    /// The name of this format (e.g., "as2", "atom", "bluesky")
    fn name(&self) -> &str;

    /// Optional description of this format
    fn description(&self) -> &str {
        ""
    }

    /// Whether this format supports external → canonical conversion
    fn supports_to_canonical(&self) -> bool {
        false
    }

    /// Whether this format supports canonical → external conversion
    fn supports_from_canonical(&self) -> bool {
        false
    }

    /// Parse an external document into canonical objects.
    ///
    /// Feed-shaped formats return one object per entry; single-object
    /// formats return one.
    fn to_canonical(
        &self,
        _doc: &str,
        _options: &Options,
    ) -> Result<Conversion<Vec<Object>>, ConvertError> {
        Err(ConvertError::NotSupported(format!(
            "format '{}' does not support conversion to canonical",
            self.name()
        )))
    }

    /// Render canonical objects as an external document.
    fn from_canonical(
        &self,
        _objects: &[Object],
        _options: &Options,
    ) -> Result<Conversion<String>, ConvertError> {
        Err(ConvertError::NotSupported(format!(
            "format '{}' does not support conversion from canonical",
            self.name()
        )))
    }
}
