//! Shape errors for the canonical model
//!
//! A `ShapeError` reports a canonical object that violates one of the model
//! invariants, eg a span tag whose offsets point outside its content, or a
//! field that deserialized into the wrong kind of value. Callers decide
//! whether to drop the offending field or abort the conversion.

use std::fmt;

/// Error raised when a canonical object violates a model invariant
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeError {
    /// Name of the offending field, eg `tags[2].startIndex`
    pub field: String,
    /// Human-readable description of the violation
    pub reason: String,
}

impl ShapeError {
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ShapeError {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for ShapeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid shape in '{}': {}", self.field, self.reason)
    }
}

impl std::error::Error for ShapeError {}
