//! Property tests for the text unit conversions
//!
//! These pin down the two guarantees the adapters lean on: truncation never
//! exceeds its grapheme budget, and span translation never produces a byte
//! range that splits a codepoint.

use activity_model::text::{
    byte_span, char_span, fit_bytes, grapheme_len, truncate, IncludeLink, TruncateOptions,
};
use proptest::prelude::*;

proptest! {
    #[test]
    fn truncated_output_within_grapheme_budget(
        content in "\\PC{0,200}",
        limit in 1usize..120,
    ) {
        let opts = TruncateOptions {
            max_graphemes: limit,
            link_length: 0,
            include_link: IncludeLink::Omit,
        };
        let out = truncate(&content, None, &opts);
        prop_assert!(grapheme_len(&out) <= limit);
    }

    #[test]
    fn truncate_with_link_within_budget(
        content in "[a-z ]{0,200}",
        limit in 30usize..120,
    ) {
        // links weigh a fixed amount, so total = text + space + weight
        let opts = TruncateOptions {
            max_graphemes: limit,
            link_length: 10,
            include_link: IncludeLink::IfTruncated,
        };
        let out = truncate(&content, Some("http://x/p"), &opts);
        // the appended link is 10 graphemes long, matching its declared weight
        prop_assert!(grapheme_len(&out) <= limit + 1);
    }

    #[test]
    fn byte_span_always_on_char_boundaries(
        content in "\\PC{0,50}",
        start in 0usize..60,
        len in 0usize..60,
    ) {
        let (range, _) = byte_span(&content, start, len);
        prop_assert!(content.is_char_boundary(range.start));
        prop_assert!(content.is_char_boundary(range.end));
        prop_assert!(range.start <= range.end);
    }

    #[test]
    fn char_span_round_trips_through_byte_span(
        content in "\\PC{0,50}",
        start in 0usize..20,
        len in 0usize..20,
    ) {
        let total = content.chars().count();
        prop_assume!(start + len <= total);

        let (range, snapped) = byte_span(&content, start, len);
        prop_assert!(!snapped);
        let ((back_start, back_len), snapped_back) = char_span(&content, range.start, range.end);
        prop_assert!(!snapped_back);
        prop_assert_eq!((back_start, back_len), (start, len));
    }

    #[test]
    fn fit_bytes_never_exceeds_limit(
        content in "\\PC{0,100}",
        limit in 0usize..80,
    ) {
        let out = fit_bytes(&content, limit);
        prop_assert!(out.len() <= limit);
        prop_assert!(out.is_char_boundary(out.len()));
    }
}
