//! Non-fatal warning side channel
//!
//! Conversions are best-effort: constructs the adapter recognizes but can't
//! carry over are dropped, and the drop is reported alongside the result
//! rather than through ambient logging alone. Every adapter call returns a
//! [Conversion], pairing its primary value with the warnings accumulated
//! while producing it.

use std::fmt;

/// A non-fatal problem encountered during conversion
#[derive(Debug, Clone, PartialEq)]
pub struct Warning {
    /// Name of the format that reported the problem
    pub format: String,
    /// The offending field or construct
    pub field: String,
    pub message: String,
}

impl Warning {
    pub fn new(
        format: impl Into<String>,
        field: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Warning {
            format: format.into(),
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.format, self.field, self.message)
    }
}

/// A conversion result with its warning side channel
#[derive(Debug, Clone, PartialEq)]
pub struct Conversion<T> {
    pub value: T,
    pub warnings: Vec<Warning>,
}

impl<T> Conversion<T> {
    /// A clean result with no warnings.
    pub fn clean(value: T) -> Self {
        Conversion {
            value,
            warnings: Vec::new(),
        }
    }

    pub fn with_warnings(value: T, warnings: Vec<Warning>) -> Self {
        Conversion { value, warnings }
    }

    /// Transform the value, keeping the warnings.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Conversion<U> {
        Conversion {
            value: f(self.value),
            warnings: self.warnings,
        }
    }

    /// Fold another conversion's warnings into this one, returning its value.
    pub fn absorb<U>(&mut self, other: Conversion<U>) -> U {
        self.warnings.extend(other.warnings);
        other.value
    }
}

/// Accumulates warnings while an adapter walks a document.
#[derive(Debug, Default)]
pub struct Report {
    format: &'static str,
    warnings: Vec<Warning>,
}

impl Report {
    pub fn new(format: &'static str) -> Self {
        Report {
            format,
            warnings: Vec::new(),
        }
    }

    /// Record a dropped or degraded construct. Also traces it, so operators
    /// see the same signal without plumbing.
    pub fn warn(&mut self, field: impl Into<String>, message: impl Into<String>) {
        let warning = Warning::new(self.format, field, message);
        tracing::warn!(format = self.format, field = %warning.field, "{}", warning.message);
        self.warnings.push(warning);
    }

    pub fn finish<T>(self, value: T) -> Conversion<T> {
        Conversion::with_warnings(value, self.warnings)
    }
}
