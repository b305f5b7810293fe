//! Canonical activity model
//!
//!     This crate owns the pivot representation that every wire format in the
//!     companion activity-babel crate converts through: a loose, deeply
//!     optional tree of activities, posts, actors and tags, plus the text
//!     utilities the adapters share.
//!
//! The Model
//!
//!     An [Object](object::Object) is a bag of well-known optional fields with
//!     an extension map for everything else. Two design points carry most of
//!     the weight:
//!
//!     - Reference duality: anywhere another object is referenced (actor,
//!       author, object, audience, image), the value may be a bare id string
//!       or a nested object. [Reference](object::Reference) is the two-case
//!       union, and its accessors are the only resolution path - no ad hoc
//!       type sniffing in adapters.
//!     - Open tags: objectType and verb are open string tags. Unknown values
//!       pass through untouched, as do unrecognized keys (the `extra` bag).
//!
//!     Objects are values. Nothing in this crate or its consumers mutates a
//!     canonical object in place; transformations return new objects. There
//!     is no cache and no session state here - objects are created per
//!     conversion call and dropped after use.
//!
//! Text Units
//!
//!     The [text] module is where grapheme counts, codepoint offsets and
//!     UTF-8 byte offsets get converted into each other. Span tags count in
//!     codepoints, platform length limits count in graphemes, record
//!     protocols count in bytes. Mixing these up produces subtly corrupted
//!     mentions, so all of the arithmetic is concentrated there and property
//!     tested.

pub mod error;
pub mod object;
pub mod text;

pub use error::ShapeError;
pub use object::{is_audience, Collection, Object, Reference, Tag};
pub use object::{ACTOR_TYPES, CRUD_VERBS, POST_TYPES, RSVP_VERBS, VERBS_WITH_OBJECT};
