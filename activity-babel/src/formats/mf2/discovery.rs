//! Post-type discovery
//!
//! Microformats entries carry no explicit activity type, so the type is
//! inferred from structural cues in a fixed precedence order:
//!
//!   reply > RSVP > like/reaction > share/repost > check-in >
//!   media-only > article-vs-note
//!
//! The order is a deliberate tie-break: explicit markup (a reply target, an
//! RSVP value) always outranks content-shape heuristics, and the
//! article-vs-note split at the bottom is decided by a title that isn't just
//! the content's first line, or by sheer content length.

use activity_model::text::grapheme_len;

/// Content longer than this many graphemes classifies as an article even
/// without a distinct title.
pub const ARTICLE_CONTENT_THRESHOLD: usize = 400;

/// Structural cues extracted from an entry, in the shape the precedence
/// rules consume.
#[derive(Debug, Clone, Default)]
pub struct Cues<'a> {
    pub in_reply_to: bool,
    /// The RSVP value (`yes`, `no`, `maybe`, `interested`), when present.
    pub rsvp: Option<&'a str>,
    pub like_of: bool,
    pub repost_of: bool,
    pub checkin: bool,
    pub has_photo: bool,
    pub has_media: bool,
    pub name: Option<&'a str>,
    pub content: Option<&'a str>,
}

/// The discovered classification: an objectType and, for activities, a verb.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostType {
    pub object_type: &'static str,
    pub verb: Option<String>,
}

impl PostType {
    fn plain(object_type: &'static str) -> Self {
        PostType {
            object_type,
            verb: None,
        }
    }

    fn activity(verb: impl Into<String>) -> Self {
        PostType {
            object_type: "activity",
            verb: Some(verb.into()),
        }
    }
}

/// Classify an entry by the fixed precedence order. Deterministic: the same
/// cues always produce the same classification.
pub fn discover(cues: &Cues) -> PostType {
    if cues.in_reply_to {
        return PostType::plain("comment");
    }
    if let Some(rsvp) = cues.rsvp {
        return PostType::activity(format!("rsvp-{rsvp}"));
    }
    if cues.like_of {
        return PostType::activity("like");
    }
    if cues.repost_of {
        return PostType::activity("share");
    }
    if cues.checkin {
        return PostType::activity("checkin");
    }

    let name = cues.name.map(str::trim).filter(|n| !n.is_empty());
    let content = cues.content.map(str::trim).filter(|c| !c.is_empty());

    if (cues.has_photo || cues.has_media) && name.is_none() && content.is_none() {
        return PostType::plain("image");
    }

    if is_article(name, content) {
        PostType::plain("article")
    } else {
        PostType::plain("note")
    }
}

/// A name that isn't simply the start of the content marks an article, as
/// does content long enough that no one would call it a note.
fn is_article(name: Option<&str>, content: Option<&str>) -> bool {
    if let (Some(name), Some(content)) = (name, content) {
        if !normalized(content).starts_with(&normalized(name)) {
            return true;
        }
    }
    let text = content.or(name).unwrap_or_default();
    grapheme_len(text) > ARTICLE_CONTENT_THRESHOLD
}

fn normalized(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reply_outranks_everything() {
        let cues = Cues {
            in_reply_to: true,
            rsvp: Some("yes"),
            like_of: true,
            ..Cues::default()
        };
        assert_eq!(discover(&cues).object_type, "comment");
    }

    #[test]
    fn test_rsvp_verb() {
        let cues = Cues {
            rsvp: Some("maybe"),
            ..Cues::default()
        };
        let found = discover(&cues);
        assert_eq!(found.object_type, "activity");
        assert_eq!(found.verb.as_deref(), Some("rsvp-maybe"));
    }

    #[test]
    fn test_like_before_repost() {
        let cues = Cues {
            like_of: true,
            repost_of: true,
            ..Cues::default()
        };
        assert_eq!(discover(&cues).verb.as_deref(), Some("like"));
    }

    #[test]
    fn test_photo_only_is_image() {
        let cues = Cues {
            has_photo: true,
            ..Cues::default()
        };
        assert_eq!(discover(&cues).object_type, "image");
    }

    #[test]
    fn test_photo_with_caption_is_note() {
        let cues = Cues {
            has_photo: true,
            content: Some("look at this"),
            ..Cues::default()
        };
        assert_eq!(discover(&cues).object_type, "note");
    }

    #[test]
    fn test_short_name_only_is_note() {
        let cues = Cues {
            name: Some("hi"),
            ..Cues::default()
        };
        assert_eq!(discover(&cues).object_type, "note");
    }

    #[test]
    fn test_distinct_title_is_article() {
        let cues = Cues {
            name: Some("On Burrowing"),
            content: Some("Owls, as it turns out, dig."),
            ..Cues::default()
        };
        assert_eq!(discover(&cues).object_type, "article");
    }

    #[test]
    fn test_name_as_content_prefix_is_note() {
        let cues = Cues {
            name: Some("Owls, as it turns"),
            content: Some("Owls, as it turns out, dig."),
            ..Cues::default()
        };
        assert_eq!(discover(&cues).object_type, "note");
    }

    #[test]
    fn test_long_content_is_article() {
        let long = "word ".repeat(200);
        let cues = Cues {
            content: Some(&long),
            ..Cues::default()
        };
        assert_eq!(discover(&cues).object_type, "article");
    }

    #[test]
    fn test_deterministic() {
        let cues = Cues {
            repost_of: true,
            ..Cues::default()
        };
        assert_eq!(discover(&cues), discover(&cues));
    }
}
