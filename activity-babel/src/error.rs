//! Conversion error taxonomy
//!
//! Errors here are the *fatal* cases: input that is not well-formed for its
//! stated format, canonical objects that violate model invariants, and
//! mappings that would produce a semantically wrong result in the target
//! format. Everything non-fatal (a construct we recognize but don't support,
//! a field the target can't express) travels as a
//! [Warning](crate::warnings::Warning) instead, so callers always get a
//! best-effort result unless correctness is at stake.

use std::fmt;

use activity_model::ShapeError;

/// Error that can occur during a conversion
#[derive(Debug, Clone, PartialEq)]
pub enum ConvertError {
    /// Input document is not well-formed for its stated format
    Parse(String),
    /// Canonical object violates a model invariant
    Shape(ShapeError),
    /// A required semantic mapping has no target-format equivalent,
    /// eg a reply whose target can't be identified in the target protocol
    Validation(String),
    /// The format doesn't support the requested direction
    NotSupported(String),
    /// Format not found in registry
    FormatNotFound(String),
}

impl fmt::Display for ConvertError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConvertError::Parse(msg) => write!(f, "parse error: {msg}"),
            ConvertError::Shape(err) => write!(f, "{err}"),
            ConvertError::Validation(msg) => write!(f, "validation error: {msg}"),
            ConvertError::NotSupported(msg) => write!(f, "{msg}"),
            ConvertError::FormatNotFound(name) => write!(f, "format '{name}' not found"),
        }
    }
}

impl std::error::Error for ConvertError {}

impl From<ShapeError> for ConvertError {
    fn from(err: ShapeError) -> Self {
        ConvertError::Shape(err)
    }
}

impl From<serde_json::Error> for ConvertError {
    fn from(err: serde_json::Error) -> Self {
        ConvertError::Parse(err.to_string())
    }
}
