//! Multi-format social activity interop
//!
//!     This crate converts structured social activity data (posts, replies,
//!     likes, shares, profiles, reactions) between a canonical in-memory
//!     representation and the external wire formats people actually publish
//!     in. The canonical model lives in the companion activity-model crate;
//!     this crate is the conversion machinery around it.
//!
//! Architecture
//!
//!     - Format trait: uniform interface for all formats (to/from canonical)
//!     - FormatRegistry: centralized discovery, selection and dispatch
//!     - Format implementations: one adapter per wire format
//!     - Postprocess: pure canonical-to-canonical transformations
//!
//!     Every conversion is external → canonical → external. Adapters are
//!     mutually decoupled and never see each other's formats; adding a
//!     format means writing one adapter, not one converter per format pair.
//!
//!     The file structure:
//!     .
//!     ├── error.rs                # ConvertError taxonomy
//!     ├── warnings.rs             # the non-fatal warning side channel
//!     ├── format.rs               # Format trait + Options definition
//!     ├── registry.rs             # FormatRegistry for discovery and dispatch
//!     ├── dom.rs                  # shared html5ever/rcdom plumbing
//!     ├── xml_writer.rs           # hand-rolled XML emission
//!     ├── formats
//!     │   ├── <format>
//!     │   │   ├── parser.rs       # external → canonical
//!     │   │   ├── serializer.rs   # canonical → external
//!     │   │   └── mod.rs
//!     ├── postprocess             # merge, linkify, audience, dedupe
//!     ├── lib.rs
//!
//! Conversion Contract
//!
//!     Both directions are pure, deterministic functions of their inputs:
//!     no caches, no clocks, no shared state, safe to call from any number
//!     of threads at once. The single exception is the relay subscription
//!     stream (formats::nostr::stream), which blocks on a caller-supplied
//!     socket with a caller-supplied timeout.
//!
//!     Conversions are best-effort. Recognized-but-unsupported constructs
//!     are dropped and reported through the warning side channel on every
//!     result (see warnings::Conversion); hard errors are reserved for
//!     malformed input and for mappings whose omission would change the
//!     meaning of the output.
//!
//! Format Selection
//!
//!     The adapters cover the dialects social content actually travels in:
//!     two activity JSON dialects (as1 canonical, as2 typed), microformats
//!     HTML and its parsed JSON, the three syndication formats feed readers
//!     expect (atom, rss, json-feed), one content-addressed typed-record
//!     protocol (bluesky), one signed-event relay protocol (nostr), and a
//!     plain XML rendering for everything else.

pub mod dom;
pub mod error;
pub mod format;
pub mod formats;
pub mod postprocess;
pub mod registry;
pub mod warnings;
pub mod xml_writer;

pub use error::ConvertError;
pub use format::{Blob, BlobResolver, Format, Options};
pub use registry::FormatRegistry;
pub use warnings::{Conversion, Warning};
