//! Format implementations
//!
//! This module contains all format adapters that convert between the
//! canonical model and the external wire formats. Each adapter lives in its
//! own submodule and knows nothing about the others.

pub mod as1;
pub mod as2;
pub mod bluesky;
pub mod mf2;
pub mod nostr;
pub mod syndication;
pub mod xml;

pub use as1::As1Format;
pub use as2::As2Format;
pub use bluesky::BlueskyFormat;
pub use mf2::{Mf2HtmlFormat, Mf2JsonFormat};
pub use nostr::NostrFormat;
pub use syndication::{AtomFormat, JsonFeedFormat, RssFormat};
pub use xml::XmlFormat;
