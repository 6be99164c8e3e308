//! Markup-aware document splitting
//!
//! Localization must only ever touch renderable text. The tokenizer splits a
//! document on `<...>` boundaries into markup and text segments and marks text
//! inside `<script>` and `<style>` elements as ineligible. It deliberately
//! does not build a tree: segment boundaries are exactly the tag boundaries,
//! which is what fragment extraction and matching both assume.

use once_cell::sync::Lazy;
use regex::Regex;

static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").expect("valid tag regex"));

/// Elements whose content is never renderable text
const SUPPRESSING_ELEMENTS: &[&str] = &["script", "style"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentKind {
    /// An HTML tag, comment or doctype
    Markup,
    /// Text between tags
    Text,
}

/// A contiguous span of a document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment<'a> {
    pub text: &'a str,
    pub kind: SegmentKind,
    /// Whether substitution may rewrite this segment
    pub eligible: bool,
}

impl<'a> Segment<'a> {
    fn markup(text: &'a str) -> Self {
        Self {
            text,
            kind: SegmentKind::Markup,
            eligible: false,
        }
    }

    fn text(text: &'a str, eligible: bool) -> Self {
        Self {
            text,
            kind: SegmentKind::Text,
            eligible,
        }
    }

    pub fn is_markup(&self) -> bool {
        self.kind == SegmentKind::Markup
    }
}

/// Split `html` into markup and text segments
///
/// Concatenating the segment texts reproduces the input exactly. Input with
/// no tags (including the empty string) yields a single eligible text
/// segment.
///
/// # Example
/// ```ignore
/// let segments = split("<p>Hi</p><script>x</script>");
/// assert!(segments[1].eligible);   // "Hi"
/// assert!(!segments[4].eligible);  // "x"
/// ```
pub fn split(html: &str) -> Vec<Segment<'_>> {
    if html.is_empty() || !html.contains('<') {
        return vec![Segment::text(html, true)];
    }

    let mut segments = Vec::new();
    let mut suppressed_by: Option<&'static str> = None;
    let mut last = 0;

    for tag in TAG_RE.find_iter(html) {
        if tag.start() > last {
            segments.push(Segment::text(
                &html[last..tag.start()],
                suppressed_by.is_none(),
            ));
        }
        let markup = tag.as_str();
        match suppressed_by {
            Some(element) => {
                if is_closing_tag(markup, element) {
                    suppressed_by = None;
                }
            }
            None => suppressed_by = opening_suppressor(markup),
        }
        segments.push(Segment::markup(markup));
        last = tag.end();
    }

    if last < html.len() {
        segments.push(Segment::text(&html[last..], suppressed_by.is_none()));
    }

    if segments.is_empty() {
        return vec![Segment::text(html, true)];
    }
    segments
}

/// The element an opening tag starts suppression for, if any
fn opening_suppressor(tag: &str) -> Option<&'static str> {
    if tag.ends_with("/>") {
        return None;
    }
    SUPPRESSING_ELEMENTS
        .iter()
        .copied()
        .find(|element| tag_name_is(&tag[1..], element))
}

fn is_closing_tag(tag: &str, element: &str) -> bool {
    tag.strip_prefix("</")
        .is_some_and(|rest| tag_name_is(rest, element))
}

/// `rest` starts with `element` as a whole tag name (case-insensitive)
fn tag_name_is(rest: &str, element: &str) -> bool {
    let bytes = rest.as_bytes();
    if bytes.len() < element.len() || !bytes[..element.len()].eq_ignore_ascii_case(element.as_bytes())
    {
        return false;
    }
    match bytes.get(element.len()) {
        None => true,
        Some(b) => b.is_ascii_whitespace() || *b == b'>' || *b == b'/',
    }
}

/// Reassemble segments into a document
pub fn join<'a, I>(segments: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    segments.into_iter().collect()
}
