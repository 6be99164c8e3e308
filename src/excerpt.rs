//! Excerpt reconstruction
//!
//! Auto-generated summaries show only the beginning of a paragraph, usually
//! cut at a sentence boundary and followed by an ellipsis, while the captured
//! fragment is the whole paragraph. When a segment is a normalized prefix of
//! a known fragment, the translation is cut at about the same proportion so
//! the summary still reads naturally in the target language.

use crate::config::ExcerptConfig;
use crate::matcher::{Candidate, placeholder_spans};
use crate::normalize::{normalize_for_excerpt, split_outer_whitespace};

const SENTENCE_ENDS: &[char] = &['.', '!', '?', '\u{2026}', '\u{3002}', '\u{FF01}', '\u{FF1F}'];

/// Ends that need no following space to close a sentence
const CJK_SENTENCE_ENDS: &[char] = &['\u{3002}', '\u{FF01}', '\u{FF1F}'];

const CLOSERS: &[char] = &[
    '"', '\'', '\u{201D}', '\u{2019}', ')', ']', '\u{00BB}', '\u{300D}', '\u{300F}', '\u{FF09}',
];

/// Rebuild `segment` from the best candidate it is an excerpt of
///
/// Returns `None` when no candidate's normalized search text starts with the
/// segment's normalized text, or when the only such candidates are too weak a
/// match to trust. The rebuilt text never splits one of `placeholders` and
/// keeps every placeholder the segment shows; otherwise the segment is left
/// alone.
pub fn reconstruct(
    segment: &str,
    candidates: &[Candidate],
    config: &ExcerptConfig,
    ellipsis: &str,
    placeholders: &[&str],
) -> Option<String> {
    let (normalized, had_ellipsis) = normalize_for_excerpt(segment);
    if normalized.is_empty() {
        return None;
    }
    let segment_len = normalized.chars().count();

    let mut best: Option<(f64, &Candidate)> = None;
    for candidate in candidates {
        if candidate.normalized_search.is_empty()
            || !candidate.normalized_search.starts_with(&normalized)
        {
            continue;
        }
        let boundary = normalized.len();
        let splits_placeholder = placeholder_spans(&candidate.normalized_search, placeholders)
            .iter()
            .any(|&(start, end)| start < boundary && boundary < end);
        if splits_placeholder {
            continue;
        }
        let ratio = segment_len as f64 / candidate.normalized_search.chars().count() as f64;
        if ratio < config.min_ratio && !had_ellipsis {
            continue;
        }
        let better = match best {
            None => true,
            Some((best_ratio, current)) => {
                ratio > best_ratio
                    || (ratio == best_ratio && candidate.search.len() > current.search.len())
            }
        };
        if better {
            best = Some((ratio, candidate));
        }
    }

    let (ratio, candidate) = best?;
    let body = truncate_protecting(
        &candidate.replacement,
        ratio,
        had_ellipsis,
        config,
        ellipsis,
        placeholders,
    );
    if body.is_empty() {
        return None;
    }
    let keeps_placeholders = placeholders
        .iter()
        .filter(|placeholder| !placeholder.is_empty())
        .all(|&placeholder| segment.matches(placeholder).count() <= body.matches(placeholder).count());
    if !keeps_placeholders {
        return None;
    }
    let (leading, _, trailing) = split_outer_whitespace(segment);
    Some(format!("{}{}{}", leading, body, trailing))
}

/// Cut `translation` to roughly `ratio` of its length
pub fn truncate_translation(
    translation: &str,
    ratio: f64,
    had_ellipsis: bool,
    config: &ExcerptConfig,
    ellipsis: &str,
) -> String {
    truncate_protecting(translation, ratio, had_ellipsis, config, ellipsis, &[])
}

/// As [`truncate_translation`], moving a cut that lands inside a placeholder
/// back to where the placeholder starts
fn truncate_protecting(
    translation: &str,
    ratio: f64,
    had_ellipsis: bool,
    config: &ExcerptConfig,
    ellipsis: &str,
    placeholders: &[&str],
) -> String {
    let full = translation.trim();
    if ratio >= config.full_ratio {
        return full.to_string();
    }

    let chars: Vec<char> = full.chars().collect();
    let total = chars.len();
    if total == 0 {
        return String::new();
    }

    let target_ratio = ratio.clamp(config.min_target_ratio, config.max_target_ratio);
    let target = ((total as f64 * target_ratio).round() as usize).clamp(1, total);
    let cut = sentence_cut(&chars, target, config)
        .or_else(|| word_cut(&chars, target, config))
        .unwrap_or(target);
    let cut = placeholder_spans(full, placeholders)
        .into_iter()
        .map(|(start, end)| (full[..start].chars().count(), full[..end].chars().count()))
        .find(|&(start, end)| start < cut && cut < end)
        .map_or(cut, |(start, _)| start);
    if cut == 0 {
        return String::new();
    }

    let mut excerpt: String = chars[..cut].iter().collect();
    excerpt.truncate(excerpt.trim_end().len());

    let shortened = excerpt.chars().count() < total;
    if had_ellipsis || (shortened && !ends_sentence(&excerpt)) {
        excerpt.push_str(ellipsis);
    }
    excerpt
}

/// Char offsets just past each sentence end (and any closing quotes)
fn sentence_boundaries(chars: &[char]) -> Vec<usize> {
    let mut boundaries = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        if !SENTENCE_ENDS.contains(&chars[i]) {
            i += 1;
            continue;
        }
        let cjk = CJK_SENTENCE_ENDS.contains(&chars[i]);
        let mut end = i + 1;
        while end < chars.len() && SENTENCE_ENDS.contains(&chars[end]) {
            end += 1;
        }
        while end < chars.len() && CLOSERS.contains(&chars[end]) {
            end += 1;
        }
        if cjk || end == chars.len() || chars[end].is_whitespace() {
            boundaries.push(end);
        }
        i = end;
    }
    boundaries
}

fn sentence_cut(chars: &[char], target: usize, config: &ExcerptConfig) -> Option<usize> {
    let boundaries = sentence_boundaries(chars);
    let floor = target as f64 * config.sentence_floor;
    let ceiling = target as f64 * config.sentence_ceiling;

    let before = boundaries
        .iter()
        .copied()
        .filter(|&b| b <= target && b as f64 >= floor)
        .max();
    before.or_else(|| {
        boundaries
            .iter()
            .copied()
            .filter(|&b| b > target && b as f64 <= ceiling)
            .min()
    })
}

fn word_cut(chars: &[char], target: usize, config: &ExcerptConfig) -> Option<usize> {
    let floor = target as f64 * config.word_floor;
    (1..=target)
        .rev()
        .find(|&i| i == chars.len() || chars[i].is_whitespace())
        .filter(|&cut| cut as f64 >= floor)
}

fn ends_sentence(text: &str) -> bool {
    text.trim_end_matches(CLOSERS)
        .chars()
        .last()
        .is_some_and(|c| SENTENCE_ENDS.contains(&c))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(search: &str, replacement: &str) -> Candidate {
        Candidate::new(search.to_string(), replacement.to_string(), 0, None)
    }

    fn config() -> ExcerptConfig {
        ExcerptConfig::default()
    }

    /// A 100-character original
    fn hundred_chars() -> String {
        let text = "abcdefghi ".repeat(10);
        assert_eq!(text.len(), 100);
        text.trim_end().to_string() + "j"
    }

    #[test]
    fn test_low_ratio_with_ellipsis_is_accepted() {
        let original = hundred_chars();
        let prefix: String = original.chars().take(55).collect();
        let segment = format!("{}\u{2026}", prefix);
        let translation = "Une phrase traduite assez longue pour être coupée quelque part au milieu du texte final.";
        let result = reconstruct(&segment, &[candidate(&original, translation)], &config(), "\u{2026}", &[]);
        let result = result.expect("excerpt expected");
        assert!(!result.is_empty());
        assert!(result.ends_with('\u{2026}'));
    }

    #[test]
    fn test_low_ratio_without_ellipsis_is_rejected() {
        let original = hundred_chars();
        let prefix: String = original.chars().take(55).collect();
        let result = reconstruct(&prefix, &[candidate(&original, "Traduction")], &config(), "\u{2026}", &[]);
        assert!(result.is_none());
    }

    #[test]
    fn test_high_ratio_uses_full_translation() {
        let original = "a".repeat(100);
        let segment = "a".repeat(99);
        let result = reconstruct(&segment, &[candidate(&original, "Le renard.")], &config(), "\u{2026}", &[]);
        assert_eq!(result.as_deref(), Some("Le renard."));
    }

    #[test]
    fn test_not_a_prefix() {
        let result = reconstruct("Something else", &[candidate("The quick fox", "Le renard")], &config(), "\u{2026}", &[]);
        assert!(result.is_none());
    }

    #[test]
    fn test_empty_segment() {
        assert!(reconstruct("  \u{2026} ", &[candidate("x", "y")], &config(), "\u{2026}", &[]).is_none());
    }

    #[test]
    fn test_prefers_sentence_boundary() {
        let original = "First sentence is here. Second sentence follows after it.";
        let segment = "First sentence is here. Second [&hellip;]";
        let translation = "Première phrase est ici. Deuxième phrase suit.";
        let result = reconstruct(segment, &[candidate(original, translation)], &config(), "\u{2026}", &[]).unwrap();
        assert_eq!(result, "Première phrase est ici.\u{2026}");
    }

    #[test]
    fn test_preserves_outer_whitespace() {
        let original = "One two three four five six seven eight nine ten";
        let segment = "\n  One two three four five six seven eight\u{2026} ";
        let translation = "Un deux trois quatre cinq six sept huit neuf dix";
        let result = reconstruct(segment, &[candidate(original, translation)], &config(), "\u{2026}", &[]).unwrap();
        assert!(result.starts_with("\n  Un deux"));
        assert!(result.ends_with("\u{2026} "));
    }

    #[test]
    fn test_picks_highest_ratio_candidate() {
        let candidates = vec![
            candidate("Hello world and everyone else in the whole wide universe", "long"),
            candidate("Hello world and everyone", "court"),
        ];
        let result = reconstruct("Hello world and everyone", &candidates, &config(), "\u{2026}", &[]);
        assert_eq!(result.as_deref(), Some("court"));
    }

    const PLACEHOLDER: &str = "__anc0a1b2c3d4e_1__";

    #[test]
    fn test_truncate_never_splits_placeholder() {
        let translation = format!("Achetez{}maintenant", PLACEHOLDER);
        let cut = truncate_protecting(&translation, 0.5, false, &config(), "\u{2026}", &[PLACEHOLDER]);
        assert_eq!(cut, "Achetez\u{2026}");

        let raw = truncate_translation(&translation, 0.5, false, &config(), "\u{2026}");
        assert!(raw.contains("__anc") && !raw.contains(PLACEHOLDER));
    }

    #[test]
    fn test_excerpt_dropping_segment_placeholder_is_rejected() {
        let segment = format!("{} Buy fresh bread\u{2026}", PLACEHOLDER);
        let original = format!("{} Buy fresh bread every single morning", PLACEHOLDER);
        let translation = format!("Du pain frais chaque matin, tous les jours {}", PLACEHOLDER);
        let candidates = [candidate(&original, &translation)];

        let guarded = reconstruct(&segment, &candidates, &config(), "\u{2026}", &[PLACEHOLDER]);
        assert!(guarded.is_none());
        let unguarded = reconstruct(&segment, &candidates, &config(), "\u{2026}", &[]);
        assert_eq!(unguarded.as_deref(), Some("Du pain frais chaque matin, tous les\u{2026}"));
    }

    #[test]
    fn test_excerpt_keeps_leading_placeholder() {
        let segment = format!("{} Buy fresh bread\u{2026}", PLACEHOLDER);
        let original = format!("{} Buy fresh bread every single morning", PLACEHOLDER);
        let translation = format!("{} Du pain frais chaque matin, tous les jours", PLACEHOLDER);
        let result = reconstruct(&segment, &[candidate(&original, &translation)], &config(), "\u{2026}", &[PLACEHOLDER]);
        let result = result.expect("excerpt expected");
        assert!(result.starts_with(PLACEHOLDER));
        assert!(result.ends_with('\u{2026}'));
    }

    #[test]
    fn test_prefix_ending_inside_placeholder_is_not_an_excerpt() {
        let original = format!("Buy {} now", PLACEHOLDER);
        let translation = format!("Achetez {} maintenant", PLACEHOLDER);
        let result = reconstruct("Buy __anc0a\u{2026}", &[candidate(&original, &translation)], &config(), "\u{2026}", &[PLACEHOLDER]);
        assert!(result.is_none());
    }

    #[test]
    fn test_truncate_word_boundary_fallback() {
        let translation = "alpha beta gamma delta epsilon zeta eta theta iota kappa";
        let cut = truncate_translation(translation, 0.5, false, &config(), "\u{2026}");
        assert!(cut.ends_with('\u{2026}'));
        let body = cut.trim_end_matches('\u{2026}');
        assert!(translation.starts_with(body));
        assert!(translation[body.len()..].starts_with(' '));
    }

    #[test]
    fn test_truncate_raw_cut_without_spaces() {
        let translation = "いろはにほへとちりぬるをわかよたれそつねならむ";
        let cut = truncate_translation(translation, 0.5, false, &config(), "\u{2026}");
        assert!(cut.ends_with('\u{2026}'));
        assert!(cut.chars().count() < translation.chars().count() + 1);
    }

    #[test]
    fn test_truncate_cjk_sentence_boundary() {
        let translation = "これは最初の文です。これは二番目の文です。";
        let cut = truncate_translation(translation, 0.5, false, &config(), "\u{2026}");
        assert_eq!(cut, "これは最初の文です。");
    }

    #[test]
    fn test_sentence_boundaries_skip_decimals() {
        let chars: Vec<char> = "Costs 3.5 dollars. Done".chars().collect();
        assert_eq!(sentence_boundaries(&chars), vec![18]);
    }

    #[test]
    fn test_ends_sentence_with_closing_quote() {
        assert!(ends_sentence("He said \"stop.\""));
        assert!(!ends_sentence("He said"));
    }
}
