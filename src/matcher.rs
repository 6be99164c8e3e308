//! Locating candidate fragments inside a text segment
//!
//! Every candidate is first searched for literally. Only when a candidate has
//! no literal occurrence is a tolerant pattern tried, one that treats
//! whitespace runs and entity-encoded characters as equivalent to what the
//! captured text contains.

use crate::entities::{alternation, decode_entities, ellipsis_equivalents, equivalents};
use crate::normalize::normalize_for_excerpt;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

/// Whitespace as a renderer may emit it
const WHITESPACE_RUN: &str = r"(?:\s|&nbsp;|&#0*160;|&#[xX]0*[aA]0;)+";

/// A (search, replacement) pair active for one document pass
#[derive(Debug, Clone)]
pub struct Candidate {
    /// Text to look for, in the masked form of the document
    pub search: String,
    /// Search text normalized for excerpt comparison
    pub normalized_search: String,
    /// Text to put in its place, in masked form
    pub replacement: String,
    /// Lower means preferred on ties
    pub priority: usize,
    /// Tolerant pattern, `None` when the search text has nothing to tolerate
    pub pattern: Option<Regex>,
}

impl Candidate {
    pub fn new(search: String, replacement: String, priority: usize, pattern: Option<Regex>) -> Self {
        let (normalized_search, _) = normalize_for_excerpt(&search);
        Self {
            search,
            normalized_search,
            replacement,
            priority,
            pattern,
        }
    }

    pub fn byte_len(&self) -> usize {
        self.search.len()
    }
}

/// A located occurrence of a candidate within one segment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchInterval {
    pub start: usize,
    pub end: usize,
    pub replacement: String,
    pub priority: usize,
}

impl MatchInterval {
    pub fn weight(&self) -> usize {
        self.end - self.start
    }
}

/// Build the tolerant pattern for a search text
///
/// Returns `None` when the text contains neither whitespace nor any character
/// with entity equivalents; such candidates are matched literally only.
pub fn fuzzy_pattern(search: &str) -> Option<String> {
    let decoded = decode_entities(search);
    let text = decoded.as_ref();
    let mut pattern = String::with_capacity(text.len() * 2);
    let mut tolerant = false;
    let mut chars = text.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if c.is_whitespace() {
            while chars.peek().is_some_and(|(_, next)| next.is_whitespace()) {
                chars.next();
            }
            pattern.push_str(WHITESPACE_RUN);
            tolerant = true;
        } else if text[i..].starts_with("...") {
            chars.next();
            chars.next();
            pattern.push_str(&alternation(ellipsis_equivalents()));
            tolerant = true;
        } else if let Some(group) = equivalents(c) {
            pattern.push_str(&alternation(group));
            tolerant = true;
        } else {
            let mut buf = [0u8; 4];
            pattern.push_str(&regex::escape(c.encode_utf8(&mut buf)));
        }
    }

    tolerant.then_some(pattern)
}

/// Compiled tolerant patterns keyed by search text
///
/// Building and compiling a pattern is far more expensive than running it, and
/// the same fragments are searched for on every page of a site.
#[derive(Debug, Default)]
pub struct PatternCache {
    patterns: Mutex<HashMap<String, Option<Regex>>>,
}

impl PatternCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, search: &str) -> Option<Regex> {
        if let Ok(patterns) = self.patterns.lock() {
            if let Some(cached) = patterns.get(search) {
                return cached.clone();
            }
        }
        let compiled = fuzzy_pattern(search).and_then(|p| Regex::new(&p).ok());
        if let Ok(mut patterns) = self.patterns.lock() {
            patterns.insert(search.to_string(), compiled.clone());
        }
        compiled
    }

    pub fn len(&self) -> usize {
        self.patterns.lock().map(|p| p.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Byte ranges of every placeholder occurring in `text`
pub fn placeholder_spans(text: &str, placeholders: &[&str]) -> Vec<(usize, usize)> {
    placeholders
        .iter()
        .filter(|placeholder| !placeholder.is_empty())
        .flat_map(|placeholder| {
            text.match_indices(*placeholder)
                .map(|(start, found)| (start, start + found.len()))
        })
        .collect()
}

/// Whether `[start, end)` covers part, but not all, of some span
fn cuts_into(start: usize, end: usize, spans: &[(usize, usize)]) -> bool {
    spans
        .iter()
        .any(|&(s, e)| start < e && s < end && !(start <= s && e <= end))
}

/// Find every occurrence of every candidate in `segment`
///
/// Literal occurrences may overlap each other; the overlap resolver picks
/// among them later. Each interval is reported once, for the first candidate
/// in priority order that produced it. Occurrences that would rewrite part of
/// one of `placeholders` are dropped; a placeholder is replaced whole or not
/// at all.
pub fn find_intervals(
    segment: &str,
    candidates: &[Candidate],
    fuzzy: bool,
    placeholders: &[&str],
) -> Vec<MatchInterval> {
    let mut intervals = Vec::new();
    let mut seen: HashSet<(usize, usize)> = HashSet::new();
    let protected = placeholder_spans(segment, placeholders);

    for candidate in candidates {
        let mut found = false;
        for start in overlapping_occurrences(segment, &candidate.search) {
            let end = start + candidate.search.len();
            if cuts_into(start, end, &protected) {
                continue;
            }
            found = true;
            if seen.insert((start, end)) {
                intervals.push(MatchInterval {
                    start,
                    end,
                    replacement: candidate.replacement.clone(),
                    priority: candidate.priority,
                });
            }
        }
        if found || !fuzzy {
            continue;
        }
        let Some(pattern) = &candidate.pattern else {
            continue;
        };
        for m in pattern.find_iter(segment) {
            if m.start() == m.end() || cuts_into(m.start(), m.end(), &protected) {
                continue;
            }
            if seen.insert((m.start(), m.end())) {
                intervals.push(MatchInterval {
                    start: m.start(),
                    end: m.end(),
                    replacement: candidate.replacement.clone(),
                    priority: candidate.priority,
                });
            }
        }
    }

    intervals
}

/// Start offsets of all, possibly overlapping, occurrences of `needle`
fn overlapping_occurrences(haystack: &str, needle: &str) -> Vec<usize> {
    let mut starts = Vec::new();
    if needle.is_empty() || needle.len() > haystack.len() {
        return starts;
    }
    let mut from = 0;
    while let Some(pos) = haystack[from..].find(needle) {
        let start = from + pos;
        starts.push(start);
        let step = haystack[start..].chars().next().map_or(1, char::len_utf8);
        from = start + step;
        if from >= haystack.len() {
            break;
        }
    }
    starts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(search: &str, replacement: &str, priority: usize) -> Candidate {
        let pattern = fuzzy_pattern(search).and_then(|p| Regex::new(&p).ok());
        Candidate::new(search.to_string(), replacement.to_string(), priority, pattern)
    }

    #[test]
    fn test_exact_occurrences() {
        let candidates = vec![candidate("home", "maison", 0)];
        let intervals = find_intervals("home sweet home", &candidates, true, &[]);
        assert_eq!(intervals.len(), 2);
        assert_eq!((intervals[0].start, intervals[0].end), (0, 4));
        assert_eq!((intervals[1].start, intervals[1].end), (11, 15));
        assert_eq!(intervals[0].weight(), 4);
    }

    #[test]
    fn test_exact_occurrences_overlap() {
        assert_eq!(overlapping_occurrences("aaaa", "aa"), vec![0, 1, 2]);
        assert_eq!(overlapping_occurrences("été été", "été"), vec![0, 6]);
        assert!(overlapping_occurrences("a", "aa").is_empty());
    }

    #[test]
    fn test_identical_intervals_keep_first_candidate() {
        let candidates = vec![candidate("Hello", "Bonjour", 0), candidate("Hello", "Salut", 1)];
        let intervals = find_intervals("Hello", &candidates, true, &[]);
        assert_eq!(intervals.len(), 1);
        assert_eq!(intervals[0].replacement, "Bonjour");
    }

    #[test]
    fn test_fuzzy_entity_apostrophe() {
        let candidates = vec![candidate("It's great", "C'est super", 0)];
        let intervals = find_intervals("It&#8217;s great", &candidates, true, &[]);
        assert_eq!(intervals.len(), 1);
        assert_eq!((intervals[0].start, intervals[0].end), (0, 16));
    }

    #[test]
    fn test_fuzzy_whitespace_and_nbsp() {
        let candidates = vec![candidate("Fish & Chips", "Poisson frites", 0)];
        let intervals = find_intervals("Fish&nbsp;&amp;\n Chips", &candidates, true, &[]);
        assert_eq!(intervals.len(), 1);
        assert_eq!(intervals[0].end, "Fish&nbsp;&amp;\n Chips".len());
    }

    #[test]
    fn test_fuzzy_ellipsis_and_dashes() {
        let candidates = vec![candidate("Wait... now - go", "Attends", 0)];
        let intervals = find_intervals("Wait&hellip; now &#8211; go", &candidates, true, &[]);
        assert_eq!(intervals.len(), 1);
    }

    #[test]
    fn test_fuzzy_skipped_when_exact_found() {
        let candidates = vec![candidate("a b", "x", 0)];
        let intervals = find_intervals("a b a&nbsp;b", &candidates, true, &[]);
        assert_eq!(intervals.len(), 1);
        assert_eq!(intervals[0].start, 0);
    }

    #[test]
    fn test_fuzzy_disabled() {
        let candidates = vec![candidate("It's", "C'est", 0)];
        assert!(find_intervals("It&#8217;s", &candidates, false, &[]).is_empty());
    }

    #[test]
    fn test_occurrences_inside_placeholder_are_dropped() {
        let placeholder = "__anc0a1b2c3d4e_1__";
        let segment = format!("Buy {} now", placeholder);
        let candidates = vec![candidate("a", "un", 0), candidate("1", "one", 1)];
        let intervals = find_intervals(&segment, &candidates, true, &[placeholder]);
        assert!(intervals.is_empty());
    }

    #[test]
    fn test_occurrence_covering_whole_placeholder_is_kept() {
        let placeholder = "__anc0a1b2c3d4e_1__";
        let segment = format!("Buy {} now", placeholder);
        let search = format!("{} now", placeholder);
        let candidates = vec![candidate(&search, "maintenant", 0), candidate("now", "maint", 1)];
        let intervals = find_intervals(&segment, &candidates, true, &[placeholder]);
        assert_eq!(intervals.len(), 2);
        assert_eq!((intervals[0].start, intervals[0].end), (4, segment.len()));
    }

    #[test]
    fn test_fuzzy_match_cutting_placeholder_is_dropped() {
        let placeholder = "__anc0a1b2c3d4e_1__";
        let segment = format!("x{} y", placeholder);
        let candidates = vec![candidate("1__ y", "z", 0)];
        let intervals = find_intervals(&segment, &candidates, true, &[placeholder]);
        assert!(intervals.is_empty());
        assert!(!find_intervals(&segment, &candidates, true, &[]).is_empty());
    }

    #[test]
    fn test_placeholder_spans() {
        let spans = placeholder_spans("P1 and P1, P2", &["P1", "P2", ""]);
        assert_eq!(spans, vec![(0, 2), (7, 9), (11, 13)]);
    }

    #[test]
    fn test_no_pattern_for_plain_word() {
        assert!(fuzzy_pattern("Welcome").is_none());
        assert!(fuzzy_pattern("Welcome home").is_some());
        assert!(fuzzy_pattern("l'eau").is_some());
    }

    #[test]
    fn test_pattern_escapes_metacharacters() {
        let pattern = fuzzy_pattern("Price (USD) $5 ?").unwrap();
        let re = Regex::new(&pattern).unwrap();
        assert!(re.is_match("Price&nbsp;(USD) $5 ?"));
        assert!(!re.is_match("Price USD 5"));
    }

    #[test]
    fn test_pattern_cache_reuses_patterns() {
        let cache = PatternCache::new();
        assert!(cache.is_empty());
        assert!(cache.get("a b").is_some());
        assert!(cache.get("a b").is_some());
        assert!(cache.get("plain").is_none());
        assert_eq!(cache.len(), 2);
    }
}
