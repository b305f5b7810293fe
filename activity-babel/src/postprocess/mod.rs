//! Postprocessing pipeline
//!
//! Pure transformations on canonical objects, applied between the two legs
//! of a conversion. Every function here returns a new value; canonical
//! objects are never mutated in place.
//!
//! - [merge]: union two partial fetches of the same object by id
//! - [linkify]: surface @-mentions and #hashtags as span tags
//! - [audience]: classify public/unlisted/private visibility
//! - [dedupe]: suppress duplicate objects across merged sources

pub mod audience;
pub mod dedupe;
pub mod linkify;
pub mod merge;

pub use audience::{audience, Visibility};
pub use dedupe::dedupe;
pub use linkify::{linkify, MentionLookup};
pub use merge::{merge_by_id, Precedence};
