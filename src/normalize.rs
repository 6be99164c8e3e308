//! Text normalization shared by extraction and excerpt matching

use crate::entities::decode_entities;
use once_cell::sync::Lazy;
use regex::Regex;

static WHITESPACE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));

/// Trailing ellipsis markers, with or without the bracket form used by
/// auto-generated excerpts (`[…]`, `[...]`).
static TRAILING_ELLIPSIS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\s*(?:\[\s*(?:\x{2026}|\.{3})\s*\]|\x{2026}|\.{3})$")
        .expect("valid trailing ellipsis regex")
});

pub const ELLIPSIS: char = '\u{2026}';

/// Unescape entities, collapse every whitespace run (including non-breaking
/// spaces) to one space and trim.
pub fn collapse(text: &str) -> String {
    let decoded = decode_entities(text);
    WHITESPACE_RE
        .replace_all(&decoded, " ")
        .trim()
        .to_string()
}

/// Normalize a discovered fragment before it is stored
///
/// Any trailing ellipsis marker is rewritten to a single `…` so that the same
/// text truncated with `...` or `[&hellip;]` dedups to one fragment.
pub fn normalize_fragment(text: &str) -> String {
    let collapsed = collapse(text);
    let (body, had_ellipsis) = strip_trailing_ellipsis(&collapsed);
    if had_ellipsis {
        format!("{}{}", body, ELLIPSIS)
    } else {
        collapsed
    }
}

/// Normalize text for excerpt comparison
///
/// Returns the collapsed text with any trailing ellipsis removed, and whether
/// one was present.
pub fn normalize_for_excerpt(text: &str) -> (String, bool) {
    let collapsed = collapse(text);
    let (body, had_ellipsis) = strip_trailing_ellipsis(&collapsed);
    (body.to_string(), had_ellipsis)
}

fn strip_trailing_ellipsis(text: &str) -> (&str, bool) {
    match TRAILING_ELLIPSIS_RE.find(text) {
        Some(m) => (text[..m.start()].trim_end(), true),
        None => (text, false),
    }
}

/// Split `text` into (leading whitespace, body, trailing whitespace)
pub fn split_outer_whitespace(text: &str) -> (&str, &str, &str) {
    let body_start = text.len() - text.trim_start().len();
    let body_end = text.trim_end().len().max(body_start);
    (&text[..body_start], &text[body_start..body_end], &text[body_end..])
}
