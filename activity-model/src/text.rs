//! Span and text utilities
//!
//! Three different ways of counting text coexist in this codebase, and they
//! are *not* interchangeable:
//!
//! - **graphemes**: user-perceived characters, used for platform post-length
//!   limits (a five-codepoint emoji family counts as one).
//! - **codepoints**: the unit of span tag offsets in the canonical model.
//! - **UTF-8 bytes**: the unit of the typed-record protocol's facet offsets
//!   and record size limits.
//!
//! Everything that crosses between these units goes through this module, so
//! the boundary arithmetic lives in exactly one place.

use unicode_segmentation::UnicodeSegmentation;

/// Ellipsis appended to shortened text.
pub const ELLIPSIS: &str = "…";

/// Assumed display length of a shortened link, in characters. Matches the
/// weight big platforms give wrapped URLs regardless of their real length.
pub const DEFAULT_LINK_LENGTH: usize = 23;

/// Number of user-perceived characters (grapheme clusters).
pub fn grapheme_len(text: &str) -> usize {
    text.graphemes(true).count()
}

/// Whether to append a permalink to emitted post text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IncludeLink {
    /// Never append the link.
    Omit,
    /// Always append the link, truncated or not.
    Always,
    /// Append the link only when the text had to be shortened.
    #[default]
    IfTruncated,
}

/// Options for [`truncate`].
#[derive(Debug, Clone, PartialEq)]
pub struct TruncateOptions {
    /// Maximum output length in graphemes.
    pub max_graphemes: usize,
    /// How many graphemes a link counts for, regardless of its real length.
    pub link_length: usize,
    pub include_link: IncludeLink,
}

impl TruncateOptions {
    pub fn new(max_graphemes: usize) -> Self {
        TruncateOptions {
            max_graphemes,
            link_length: DEFAULT_LINK_LENGTH,
            include_link: IncludeLink::IfTruncated,
        }
    }
}

/// Shorten `content` to fit a platform's character limit, counted in
/// graphemes.
///
/// When the content is over the limit it is cut at the last whole-word
/// boundary that leaves room for the ellipsis and (when a link is appended)
/// the link itself plus a separating space. The link should be the source
/// object's `url`, falling back to its `id`.
pub fn truncate(content: &str, link: Option<&str>, opts: &TruncateOptions) -> String {
    let count = grapheme_len(content);
    let link_cost = match (link, opts.include_link) {
        (Some(_), IncludeLink::Always | IncludeLink::IfTruncated) => opts.link_length + 1,
        _ => 0,
    };

    let fits = count <= opts.max_graphemes;
    let append_always = matches!(opts.include_link, IncludeLink::Always) && link.is_some();

    if fits && !append_always {
        return content.to_string();
    }

    if fits && append_always {
        // content fits on its own; re-check with the link's weight included
        if count + link_cost <= opts.max_graphemes {
            return format!("{} {}", content, link.unwrap());
        }
    }

    let budget = opts.max_graphemes.saturating_sub(link_cost);
    let short = shorten_to(content, budget);
    match (link, opts.include_link) {
        (Some(link), IncludeLink::Always | IncludeLink::IfTruncated) => {
            if short.is_empty() {
                link.to_string()
            } else {
                format!("{short} {link}")
            }
        }
        _ => short,
    }
}

/// Cut text to at most `budget` graphemes, ellipsized at a word boundary.
fn shorten_to(content: &str, budget: usize) -> String {
    if grapheme_len(content) <= budget {
        return content.trim_end().to_string();
    }
    if budget <= 1 {
        return if budget == 0 { String::new() } else { ELLIPSIS.to_string() };
    }

    // window of at most budget - 1 graphemes, leaving room for the ellipsis
    let window_end = content
        .grapheme_indices(true)
        .nth(budget - 1)
        .map(|(i, _)| i)
        .unwrap_or(content.len());
    let window = &content[..window_end];

    // keep the whole window when it already ends on a word boundary,
    // otherwise cut at the last whitespace inside it; a single unbroken word
    // gets hard-cut instead
    let at_boundary = content[window_end..]
        .chars()
        .next()
        .map_or(true, char::is_whitespace);
    let cut = if at_boundary {
        window.trim_end()
    } else {
        match window.rfind(char::is_whitespace) {
            Some(i) if !window[..i].trim_end().is_empty() => window[..i].trim_end(),
            _ => window,
        }
    };

    format!("{cut}{ELLIPSIS}")
}

/// Plain ellipsis shortening without link handling, for titles and the like.
pub fn ellipsize(text: &str, max_graphemes: usize) -> String {
    shorten_to(text, max_graphemes)
}

/// Translate a codepoint span into a UTF-8 byte range of the same text.
///
/// Returns the byte range plus whether the span had to be snapped back into
/// bounds. Offsets past the end of the text clamp to the end; this never
/// produces a range that splits a codepoint.
pub fn byte_span(content: &str, start: usize, len: usize) -> (std::ops::Range<usize>, bool) {
    let mut offsets: Vec<usize> = content.char_indices().map(|(i, _)| i).collect();
    offsets.push(content.len());
    let last = offsets.len() - 1;

    let snapped = start > last || start + len > last;
    let start_cp = start.min(last);
    let end_cp = (start + len).min(last);

    (offsets[start_cp]..offsets[end_cp], snapped)
}

/// Translate a UTF-8 byte range back into a codepoint span `(start, len)`.
///
/// Byte offsets that fall inside a multi-byte codepoint are snapped back to
/// the nearest preceding boundary; the flag reports whether that happened so
/// callers can log the correction.
pub fn char_span(content: &str, byte_start: usize, byte_end: usize) -> ((usize, usize), bool) {
    let mut snapped = false;

    let mut snap = |target: usize| -> usize {
        let mut clamped = target.min(content.len());
        if clamped < target {
            snapped = true;
        }
        while clamped > 0 && !content.is_char_boundary(clamped) {
            clamped -= 1;
            snapped = true;
        }
        clamped
    };

    let start_b = snap(byte_start);
    let end_b = snap(byte_end.max(byte_start));

    let start_cp = content[..start_b].chars().count();
    let len_cp = content[start_b..end_b].chars().count();
    ((start_cp, len_cp), snapped)
}

/// Enforce a byte-length limit on the UTF-8 encoding of `text`, cutting at
/// grapheme boundaries and appending an ellipsis when anything was removed.
///
/// This is a different limit from [`truncate`]: record protocols bound the
/// *encoded size* of a field, syndication targets bound what a human sees.
pub fn fit_bytes(text: &str, max_bytes: usize) -> String {
    if text.len() <= max_bytes {
        return text.to_string();
    }
    if max_bytes < ELLIPSIS.len() {
        return String::new();
    }

    let budget = max_bytes - ELLIPSIS.len();
    let mut end = 0;
    for (i, g) in text.grapheme_indices(true) {
        if i + g.len() > budget {
            break;
        }
        end = i + g.len();
    }

    let mut out = text[..end].trim_end().to_string();
    out.push_str(ELLIPSIS);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grapheme_len_counts_clusters() {
        assert_eq!(grapheme_len("abc"), 3);
        // flag emoji: two codepoints, one grapheme
        assert_eq!(grapheme_len("🇺🇸"), 1);
        // family emoji with ZWJ joins: many codepoints, one grapheme
        assert_eq!(grapheme_len("👨‍👩‍👧‍👦"), 1);
    }

    #[test]
    fn test_truncate_no_op_when_under_limit() {
        let opts = TruncateOptions::new(280);
        assert_eq!(truncate("hello world", None, &opts), "hello world");
    }

    #[test]
    fn test_truncate_cuts_at_word_boundary() {
        let opts = TruncateOptions {
            max_graphemes: 10,
            link_length: 0,
            include_link: IncludeLink::Omit,
        };
        let out = truncate("hello big wide world", None, &opts);
        assert_eq!(out, "hello big…");
        assert!(grapheme_len(&out) <= 10);
    }

    #[test]
    fn test_truncate_appends_link_when_truncated() {
        let opts = TruncateOptions {
            max_graphemes: 20,
            link_length: 5,
            include_link: IncludeLink::IfTruncated,
        };
        let out = truncate(
            "a very long post that will not fit at all",
            Some("http://x/p"),
            &opts,
        );
        assert!(out.ends_with(" http://x/p"), "got {out:?}");
        assert!(out.contains(ELLIPSIS));
    }

    #[test]
    fn test_truncate_always_appends_link_even_untruncated() {
        let opts = TruncateOptions {
            max_graphemes: 40,
            link_length: 5,
            include_link: IncludeLink::Always,
        };
        assert_eq!(truncate("short", Some("http://x/p"), &opts), "short http://x/p");
    }

    #[test]
    fn test_truncate_hard_cuts_unbroken_word() {
        let opts = TruncateOptions {
            max_graphemes: 5,
            link_length: 0,
            include_link: IncludeLink::Omit,
        };
        let out = truncate("abcdefghij", None, &opts);
        assert_eq!(out, format!("abcd{ELLIPSIS}"));
    }

    #[test]
    fn test_byte_span_multibyte() {
        // "hi 😀x": 😀 is 4 bytes at byte offset 3
        let text = "hi 😀x";
        let (range, snapped) = byte_span(text, 3, 1);
        assert_eq!(range, 3..7);
        assert!(!snapped);
        assert_eq!(&text[range], "😀");
    }

    #[test]
    fn test_byte_span_clamps_out_of_bounds() {
        let (range, snapped) = byte_span("ab", 1, 5);
        assert_eq!(range, 1..2);
        assert!(snapped);
    }

    #[test]
    fn test_char_span_inverse_of_byte_span() {
        let text = "héllo 😀 wörld";
        let (range, _) = byte_span(text, 6, 1); // the emoji
        let ((start, len), snapped) = char_span(text, range.start, range.end);
        assert_eq!((start, len), (6, 1));
        assert!(!snapped);
    }

    #[test]
    fn test_char_span_snaps_mid_codepoint() {
        let text = "a😀b"; // 😀 occupies bytes 1..5
        let ((start, len), snapped) = char_span(text, 2, 5);
        assert!(snapped);
        // snapped back to the emoji's own boundary
        assert_eq!((start, len), (1, 1));
    }

    #[test]
    fn test_fit_bytes_respects_grapheme_boundaries() {
        let text = "aa👨‍👩‍👧‍👦bb"; // the family cluster is 25 bytes
        let out = fit_bytes(text, 10);
        assert!(out.len() <= 10);
        assert_eq!(out, format!("aa{ELLIPSIS}"));
    }

    #[test]
    fn test_fit_bytes_no_op_when_under_limit() {
        assert_eq!(fit_bytes("short", 100), "short");
    }
}
