//! HTML entity decoding and entity-equivalence groups
//!
//! Rendered pages rarely contain the exact bytes of the captured text: a
//! renderer turns `'` into `&#8217;`, `--` into `&#8212;`, `&` into `&amp;`
//! and so on. This module knows those equivalences, both for decoding text
//! before comparison and for building tolerant match patterns.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::borrow::Cow;

static ENTITY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"&(#[0-9]{1,7}|#[xX][0-9a-fA-F]{1,6}|[A-Za-z][A-Za-z0-9]{1,31});")
        .expect("valid entity regex")
});

/// Named entities understood by [`decode_entities`]
const NAMED_ENTITIES: &[(&str, char)] = &[
    ("amp", '&'),
    ("lt", '<'),
    ("gt", '>'),
    ("quot", '"'),
    ("apos", '\''),
    ("nbsp", '\u{00A0}'),
    ("ndash", '\u{2013}'),
    ("mdash", '\u{2014}'),
    ("lsquo", '\u{2018}'),
    ("rsquo", '\u{2019}'),
    ("sbquo", '\u{201A}'),
    ("ldquo", '\u{201C}'),
    ("rdquo", '\u{201D}'),
    ("bdquo", '\u{201E}'),
    ("hellip", '\u{2026}'),
    ("bull", '\u{2022}'),
    ("middot", '\u{00B7}'),
    ("laquo", '\u{00AB}'),
    ("raquo", '\u{00BB}'),
    ("copy", '\u{00A9}'),
    ("reg", '\u{00AE}'),
    ("trade", '\u{2122}'),
    ("deg", '\u{00B0}'),
    ("times", '\u{00D7}'),
    ("euro", '\u{20AC}'),
    ("shy", '\u{00AD}'),
];

const APOSTROPHES: &[&str] = &[
    "'", "\u{2019}", "\u{2018}", "&#039;", "&#39;", "&#x27;", "&apos;", "&#8217;", "&#x2019;",
    "&rsquo;", "&#8216;", "&#x2018;", "&lsquo;",
];

const DOUBLE_QUOTES: &[&str] = &[
    "\"", "\u{201C}", "\u{201D}", "\u{201E}", "&quot;", "&#034;", "&#34;", "&#x22;", "&#8220;",
    "&#x201C;", "&ldquo;", "&#8221;", "&#x201D;", "&rdquo;", "&#8222;", "&bdquo;",
];

const AMPERSANDS: &[&str] = &["&", "&amp;", "&#038;", "&#38;", "&#x26;"];

const BULLETS: &[&str] = &["\u{2022}", "&bull;", "&#8226;", "&#x2022;"];

const MIDDOTS: &[&str] = &["\u{00B7}", "&middot;", "&#183;", "&#xB7;"];

const DASHES: &[&str] = &[
    "-", "&#45;", "\u{2013}", "&#8211;", "&#x2013;", "&ndash;", "\u{2014}", "&#8212;", "&#x2014;",
    "&mdash;",
];

const ELLIPSES: &[&str] = &["\u{2026}", "...", "&hellip;", "&#8230;", "&#x2026;"];

const LESS_THAN: &[&str] = &["<", "&lt;", "&#60;", "&#x3C;"];

const GREATER_THAN: &[&str] = &[">", "&gt;", "&#62;", "&#x3E;"];

/// Decode HTML character references in `text`
///
/// Numeric references (decimal and hex) and the common named references are
/// decoded. Unknown names and invalid code points are left untouched. Returns
/// the input unchanged (borrowed) when there is nothing to decode.
pub fn decode_entities(text: &str) -> Cow<'_, str> {
    if !text.contains('&') {
        return Cow::Borrowed(text);
    }
    ENTITY_RE.replace_all(text, |caps: &Captures| {
        let body = &caps[1];
        match decode_reference(body) {
            Some(c) => c.to_string(),
            None => caps[0].to_string(),
        }
    })
}

fn decode_reference(body: &str) -> Option<char> {
    if let Some(hex) = body.strip_prefix("#x").or_else(|| body.strip_prefix("#X")) {
        return u32::from_str_radix(hex, 16).ok().and_then(valid_code_point);
    }
    if let Some(dec) = body.strip_prefix('#') {
        return dec.parse::<u32>().ok().and_then(valid_code_point);
    }
    NAMED_ENTITIES
        .iter()
        .find(|(name, _)| *name == body)
        .map(|(_, c)| *c)
}

fn valid_code_point(cp: u32) -> Option<char> {
    if cp == 0 {
        return None;
    }
    char::from_u32(cp)
}

/// The equivalence group a character belongs to, if it has entity forms
///
/// Each group lists the literal character(s) a renderer may produce for the
/// same source character together with their decimal, hex and named
/// encodings.
pub fn equivalents(c: char) -> Option<&'static [&'static str]> {
    match c {
        '\'' | '\u{2019}' | '\u{2018}' => Some(APOSTROPHES),
        '"' | '\u{201C}' | '\u{201D}' | '\u{201E}' => Some(DOUBLE_QUOTES),
        '&' => Some(AMPERSANDS),
        '\u{2022}' => Some(BULLETS),
        '\u{00B7}' => Some(MIDDOTS),
        '-' | '\u{2013}' | '\u{2014}' => Some(DASHES),
        '\u{2026}' => Some(ELLIPSES),
        '<' => Some(LESS_THAN),
        '>' => Some(GREATER_THAN),
        _ => None,
    }
}

/// Equivalence group for a literal three-dot ellipsis
pub fn ellipsis_equivalents() -> &'static [&'static str] {
    ELLIPSES
}

/// Build a regex alternation matching any member of an equivalence group
///
/// Longer alternatives come first so an entity is consumed whole rather than
/// its leading `&` alone. Hex references match case-insensitively.
pub fn alternation(group: &[&str]) -> String {
    let mut members: Vec<&str> = group.to_vec();
    members.sort_by(|a, b| b.len().cmp(&a.len()).then(a.cmp(b)));
    let parts: Vec<String> = members
        .iter()
        .map(|m| {
            if m.starts_with("&#x") {
                format!("(?i:{})", regex::escape(m))
            } else {
                regex::escape(m)
            }
        })
        .collect();
    format!("(?:{})", parts.join("|"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_named_entities() {
        assert_eq!(decode_entities("Fish &amp; Chips"), "Fish & Chips");
        assert_eq!(decode_entities("&lt;b&gt;"), "<b>");
        assert_eq!(decode_entities("Wait&hellip;"), "Wait\u{2026}");
    }

    #[test]
    fn test_decode_numeric_entities() {
        assert_eq!(decode_entities("It&#8217;s"), "It\u{2019}s");
        assert_eq!(decode_entities("It&#x2019;s"), "It\u{2019}s");
        assert_eq!(decode_entities("a&#160;b"), "a\u{00A0}b");
    }

    #[test]
    fn test_decode_leaves_unknown_references() {
        assert_eq!(decode_entities("&bogus; &#0; & alone"), "&bogus; &#0; & alone");
    }

    #[test]
    fn test_decode_borrows_when_untouched() {
        assert!(matches!(decode_entities("plain text"), Cow::Borrowed(_)));
    }

    #[test]
    fn test_equivalents_groups() {
        assert!(equivalents('\'').unwrap().contains(&"&#8217;"));
        assert!(equivalents('\u{2019}').unwrap().contains(&"'"));
        assert!(equivalents('&').unwrap().contains(&"&amp;"));
        assert!(equivalents('a').is_none());
    }

    #[test]
    fn test_alternation_prefers_longer_members() {
        let re = Regex::new(&alternation(AMPERSANDS)).unwrap();
        let m = re.find("x &amp; y").unwrap();
        assert_eq!(m.as_str(), "&amp;");
    }

    #[test]
    fn test_alternation_hex_is_case_insensitive() {
        let re = Regex::new(&alternation(APOSTROPHES)).unwrap();
        assert!(re.is_match("&#X2019;"));
        assert!(re.is_match("&#x2019;"));
    }
}
