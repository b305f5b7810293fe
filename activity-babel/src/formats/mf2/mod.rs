//! Microformats2 format (HTML and JSON)
//!
//! Microformats embed structured data in HTML class names (`h-entry`,
//! `p-name`, `u-url`, `dt-published`, `e-content`, ...). The JSON flavor is
//! the parsed property tree those classes describe; the HTML flavor is a
//! page carrying them. Both route through the same property-tree
//! representation internally, so `mf2-html` is parse + the `mf2-json`
//! mapping, and emission is the `mf2-json` mapping + an RcDom render.
//!
//! Microformats have no explicit activity/verb field, so classification
//! falls to [discovery], the fixed-precedence post-type heuristic.

pub mod discovery;
mod parser;
mod serializer;

use activity_model::Object;

use crate::error::ConvertError;
use crate::format::{Format, Options};
use crate::warnings::Conversion;

pub struct Mf2JsonFormat;

impl Format for Mf2JsonFormat {
    fn name(&self) -> &str {
        "mf2-json"
    }

    fn description(&self) -> &str {
        "Parsed microformats2 JSON"
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
        parser::parse_json(doc)
    }

    fn from_canonical(
        &self,
        objects: &[Object],
        _options: &Options,
    ) -> Result<Conversion<String>, ConvertError> {
        serializer::serialize_json(objects)
    }
}

pub struct Mf2HtmlFormat;

impl Format for Mf2HtmlFormat {
    fn name(&self) -> &str {
        "mf2-html"
    }

    fn description(&self) -> &str {
        "HTML with embedded microformats2"
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
        parser::parse_html(doc)
    }

    fn from_canonical(
        &self,
        objects: &[Object],
        _options: &Options,
    ) -> Result<Conversion<String>, ConvertError> {
        serializer::serialize_html(objects)
    }
}
