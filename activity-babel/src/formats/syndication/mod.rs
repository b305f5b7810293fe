//! Syndication formats: Atom, RSS 2.0, JSON Feed
//!
//! Feed-shaped formats with one entry per canonical activity. Emission is
//! bit-precise where feed consumers demand it: Atom declares its namespaces
//! and wraps HTML content in CDATA, RSS 2.0 emits `guid` and
//! `content:encoded` blocks, JSON Feed targets version 1.1. Parsing is
//! deliberately lenient, in the tradition of feed readers.

mod atom;
mod jsonfeed;
mod rss;

use activity_model::Object;
use chrono::{DateTime, NaiveDate, NaiveTime};

use crate::error::ConvertError;
use crate::format::{Format, Options};
use crate::warnings::Conversion;

pub struct AtomFormat;

impl Format for AtomFormat {
    fn name(&self) -> &str {
        "atom"
    }

    fn description(&self) -> &str {
        "Atom syndication XML"
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
        atom::parse(doc)
    }

    fn from_canonical(
        &self,
        objects: &[Object],
        options: &Options,
    ) -> Result<Conversion<String>, ConvertError> {
        atom::serialize(objects, options)
    }
}

pub struct RssFormat;

impl Format for RssFormat {
    fn name(&self) -> &str {
        "rss"
    }

    fn description(&self) -> &str {
        "RSS 2.0 XML"
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
        rss::parse(doc)
    }

    fn from_canonical(
        &self,
        objects: &[Object],
        options: &Options,
    ) -> Result<Conversion<String>, ConvertError> {
        rss::serialize(objects, options)
    }
}

pub struct JsonFeedFormat;

impl Format for JsonFeedFormat {
    fn name(&self) -> &str {
        "json-feed"
    }

    fn description(&self) -> &str {
        "JSON Feed 1.1"
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
        jsonfeed::parse(doc)
    }

    fn from_canonical(
        &self,
        objects: &[Object],
        options: &Options,
    ) -> Result<Conversion<String>, ConvertError> {
        jsonfeed::serialize(objects, options)
    }
}

/// For activities with a plain `post` verb the entry is the inner object;
/// other verbs are themselves the entry.
pub(crate) fn entry_object(activity: &Object) -> Object {
    if matches!(activity.verb_or_post(), "post" | "create") {
        if let Some(inner) = activity.first_object() {
            return inner;
        }
    }
    activity.clone()
}

/// Lenient timestamp parsing for feed input: RFC 3339, RFC 2822, or a bare
/// date.
pub(crate) fn parse_datetime(raw: &str) -> Option<DateTime<chrono::FixedOffset>> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed);
    }
    if let Ok(parsed) = DateTime::parse_from_rfc2822(raw) {
        return Some(parsed);
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(
            date.and_time(NaiveTime::MIN)
                .and_utc()
                .fixed_offset(),
        );
    }
    None
}

/// Canonical timestamp → RFC 2822, the dialect RSS wants.
pub(crate) fn to_rfc2822(iso: &str) -> Option<String> {
    parse_datetime(iso).map(|dt| dt.to_rfc2822())
}

/// Any accepted timestamp → RFC 3339, the dialect the canonical model and
/// Atom want.
pub(crate) fn to_rfc3339(raw: &str) -> Option<String> {
    parse_datetime(raw).map(|dt| dt.to_rfc3339())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_datetime_flavors() {
        assert!(parse_datetime("2013-02-10T14:04:03+00:00").is_some());
        assert!(parse_datetime("Sun, 10 Feb 2013 14:04:03 +0000").is_some());
        assert!(parse_datetime("2013-02-10").is_some());
        assert!(parse_datetime("not a date").is_none());
    }

    #[test]
    fn test_rfc2822_round_trip() {
        let rfc2822 = to_rfc2822("2013-02-10T14:04:03+00:00").unwrap();
        assert_eq!(rfc2822, "Sun, 10 Feb 2013 14:04:03 +0000");
        let back = to_rfc3339(&rfc2822).unwrap();
        assert_eq!(back, "2013-02-10T14:04:03+00:00");
    }
}
