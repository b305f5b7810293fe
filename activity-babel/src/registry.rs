//! Format registry for format discovery and dispatch
//!
//! This module provides a centralized registry for all available formats.
//! Formats can be registered and retrieved by name, and the registry is the
//! top-level conversion entry point: [`FormatRegistry::convert`] always goes
//! through the canonical pivot, never building direct format-to-format
//! shortcuts.

use std::collections::HashMap;

use activity_model::Object;

use crate::error::ConvertError;
use crate::format::{Format, Options};
use crate::warnings::Conversion;

/// Registry of activity formats
///
/// # Examples
///
/// ```ignore
/// let registry = FormatRegistry::with_defaults();
/// let out = registry.convert(atom_doc, "atom", "mf2-html", &Options::new())?;
/// ```
pub struct FormatRegistry {
    formats: HashMap<String, Box<dyn Format>>,
}

impl FormatRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        FormatRegistry {
            formats: HashMap::new(),
        }
    }

    /// Register a format
    ///
    /// If a format with the same name already exists, it will be replaced.
    pub fn register<F: Format + 'static>(&mut self, format: F) {
        self.formats
            .insert(format.name().to_string(), Box::new(format));
    }

    /// Get a format by name
    pub fn get(&self, name: &str) -> Result<&dyn Format, ConvertError> {
        self.formats
            .get(name)
            .map(|f| f.as_ref())
            .ok_or_else(|| ConvertError::FormatNotFound(name.to_string()))
    }

    /// Check if a format exists
    pub fn has(&self, name: &str) -> bool {
        self.formats.contains_key(name)
    }

    /// List all available format names (sorted)
    pub fn list_formats(&self) -> Vec<String> {
        let mut names: Vec<_> = self.formats.keys().cloned().collect();
        names.sort();
        names
    }

    /// Parse an external document into canonical objects using the named
    /// format
    pub fn to_canonical(
        &self,
        doc: &str,
        format: &str,
        options: &Options,
    ) -> Result<Conversion<Vec<Object>>, ConvertError> {
        let fmt = self.get(format)?;
        if !fmt.supports_to_canonical() {
            return Err(ConvertError::NotSupported(format!(
                "format '{format}' does not support conversion to canonical"
            )));
        }
        fmt.to_canonical(doc, options)
    }

    /// Render canonical objects using the named format
    pub fn from_canonical(
        &self,
        objects: &[Object],
        format: &str,
        options: &Options,
    ) -> Result<Conversion<String>, ConvertError> {
        let fmt = self.get(format)?;
        if !fmt.supports_from_canonical() {
            return Err(ConvertError::NotSupported(format!(
                "format '{format}' does not support conversion from canonical"
            )));
        }
        fmt.from_canonical(objects, options)
    }

    /// Convert a document from one format to another, through the canonical
    /// pivot. Warnings from both legs are concatenated in order.
    pub fn convert(
        &self,
        doc: &str,
        from: &str,
        to: &str,
        options: &Options,
    ) -> Result<Conversion<String>, ConvertError> {
        let mut parsed = self.to_canonical(doc, from, options)?;
        let rendered = self.from_canonical(&parsed.value, to, options)?;
        let value = parsed.absorb(rendered);
        Ok(Conversion::with_warnings(value, parsed.warnings))
    }

    /// Create a registry with all built-in formats
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();

        registry.register(crate::formats::as1::As1Format);
        registry.register(crate::formats::as2::As2Format);
        registry.register(crate::formats::mf2::Mf2JsonFormat);
        registry.register(crate::formats::mf2::Mf2HtmlFormat);
        registry.register(crate::formats::syndication::AtomFormat);
        registry.register(crate::formats::syndication::RssFormat);
        registry.register(crate::formats::syndication::JsonFeedFormat);
        registry.register(crate::formats::bluesky::BlueskyFormat);
        registry.register(crate::formats::nostr::NostrFormat);
        registry.register(crate::formats::xml::XmlFormat);

        registry
    }
}

impl Default for FormatRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::warnings::Warning;

    // Test format
    struct TestFormat;
    impl Format for TestFormat {
        fn name(&self) -> &str {
            "test"
        }
        fn supports_to_canonical(&self) -> bool {
            true
        }
        fn supports_from_canonical(&self) -> bool {
            true
        }
        fn to_canonical(
            &self,
            _doc: &str,
            _options: &Options,
        ) -> Result<Conversion<Vec<Object>>, ConvertError> {
            Ok(Conversion::with_warnings(
                vec![Object::of_type("note")],
                vec![Warning::new("test", "in", "dropped")],
            ))
        }
        fn from_canonical(
            &self,
            objects: &[Object],
            _options: &Options,
        ) -> Result<Conversion<String>, ConvertError> {
            Ok(Conversion::with_warnings(
                format!("{} objects", objects.len()),
                vec![Warning::new("test", "out", "degraded")],
            ))
        }
    }

    struct WriteOnlyFormat;
    impl Format for WriteOnlyFormat {
        fn name(&self) -> &str {
            "write-only"
        }
        fn supports_from_canonical(&self) -> bool {
            true
        }
    }

    #[test]
    fn test_registry_register_and_get() {
        let mut registry = FormatRegistry::new();
        registry.register(TestFormat);

        assert!(registry.has("test"));
        assert!(registry.get("test").is_ok());
        assert_eq!(registry.list_formats(), vec!["test"]);
    }

    #[test]
    fn test_registry_get_nonexistent() {
        let registry = FormatRegistry::new();
        match registry.get("nonexistent") {
            Err(ConvertError::FormatNotFound(name)) => assert_eq!(name, "nonexistent"),
            Err(e) => panic!("expected FormatNotFound, got {e:?}"),
            Ok(_) => panic!("expected FormatNotFound, got Ok(_)"),
        }
    }

    #[test]
    fn test_registry_rejects_unsupported_direction() {
        let mut registry = FormatRegistry::new();
        registry.register(WriteOnlyFormat);

        let result = registry.to_canonical("doc", "write-only", &Options::new());
        assert!(matches!(result, Err(ConvertError::NotSupported(_))));
    }

    #[test]
    fn test_convert_pivots_and_merges_warnings() {
        let mut registry = FormatRegistry::new();
        registry.register(TestFormat);

        let out = registry
            .convert("doc", "test", "test", &Options::new())
            .unwrap();
        assert_eq!(out.value, "1 objects");
        assert_eq!(out.warnings.len(), 2);
        assert_eq!(out.warnings[0].field, "in");
        assert_eq!(out.warnings[1].field, "out");
    }

    #[test]
    fn test_registry_with_defaults() {
        let registry = FormatRegistry::with_defaults();
        for name in [
            "as1", "as2", "atom", "bluesky", "json-feed", "mf2-html", "mf2-json", "nostr", "rss",
            "xml",
        ] {
            assert!(registry.has(name), "missing format {name}");
        }
    }
}
