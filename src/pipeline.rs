//! Document-level localization
//!
//! Wires the pieces together for one document:
//!
//! 1. Mask shortcodes across the whole document
//! 2. Split the masked document into markup and text segments
//! 3. Build the candidate list once from the fragment/translation pairs
//! 4. For every eligible text segment, find matches and resolve overlaps, or
//!    fall back to excerpt reconstruction when nothing matched
//! 5. Reassemble and restore the shortcodes
//!
//! # Example
//!
//! ```ignore
//! use anchor_i18n::substitute;
//!
//! let html = substitute(
//!     "<p>Welcome home!</p>",
//!     "fr",
//!     &[("Welcome home!".to_string(), "Bienvenue!".to_string())],
//! );
//! assert_eq!(html, "<p>Bienvenue!</p>");
//! ```

use crate::config::LocalizerConfig;
use crate::excerpt;
use crate::html;
use crate::matcher::{Candidate, PatternCache, find_intervals};
use crate::overlap;
use crate::shortcode::{DirectiveGrammar, Shortcodes, apply_reverse, unmask};
use crate::store::TranslationStore;
use regex::Regex;
use std::collections::HashMap;
use tracing::{debug, trace};

/// Counters describing one localization pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocalizeReport {
    /// Candidates taking part in the pass
    pub candidates: usize,
    /// Pairs dropped because the translation lost a directive
    pub rejected: usize,
    /// Segments rewritten from direct matches
    pub matched_segments: usize,
    /// Segments rewritten as reconstructed excerpts
    pub excerpt_segments: usize,
}

/// A localized document and what happened to it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Localized {
    pub html: String,
    pub report: LocalizeReport,
}

/// Configured localization engine
///
/// A `Localizer` holds no per-document state; it can be shared between
/// threads and reused for any number of documents and languages.
#[derive(Debug, Default)]
pub struct Localizer {
    config: LocalizerConfig,
    shortcodes: Shortcodes,
    patterns: PatternCache,
}

impl Localizer {
    pub fn new(config: LocalizerConfig) -> Self {
        Self {
            config,
            shortcodes: Shortcodes::default(),
            patterns: PatternCache::new(),
        }
    }

    /// Use the host's directive grammar instead of the generic bracket one
    pub fn with_grammar(config: LocalizerConfig, grammar: &dyn DirectiveGrammar) -> Self {
        Self {
            config,
            shortcodes: Shortcodes::new(grammar),
            patterns: PatternCache::new(),
        }
    }

    pub fn config(&self) -> &LocalizerConfig {
        &self.config
    }

    pub fn shortcodes(&self) -> &Shortcodes {
        &self.shortcodes
    }

    /// Replace the original fragments found in `document` with their
    /// translations
    pub fn localize(&self, document: &str, target_language: &str, pairs: &[(String, String)]) -> String {
        self.localize_with_report(document, target_language, pairs).html
    }

    /// Localize `document` using the translations held by `store`
    pub fn localize_from_store(
        &self,
        document: &str,
        target_language: &str,
        store: &dyn TranslationStore,
    ) -> Localized {
        let pairs: Vec<(String, String)> = store
            .fragments()
            .into_iter()
            .filter_map(|fragment| {
                store
                    .find_translation(fragment.id, target_language)
                    .map(|t| (fragment.original_text, t.translated_text))
            })
            .collect();
        self.localize_with_report(document, target_language, &pairs)
    }

    pub fn localize_with_report(
        &self,
        document: &str,
        target_language: &str,
        pairs: &[(String, String)],
    ) -> Localized {
        let masked = self.shortcodes.mask(document);
        let mut report = LocalizeReport::default();
        let candidates = self.build_candidates(pairs, &masked.reverse, &mut report);
        report.candidates = candidates.len();

        if candidates.is_empty() {
            debug!(target_language, "no usable translations, document left unchanged");
            return Localized {
                html: document.to_string(),
                report,
            };
        }

        let placeholders: Vec<&str> = masked.placeholders.keys().map(String::as_str).collect();
        let segments = html::split(&masked.text);
        let mut output = String::with_capacity(masked.text.len());
        for segment in &segments {
            if !segment.eligible || segment.text.trim().is_empty() {
                output.push_str(segment.text);
                continue;
            }

            let intervals = find_intervals(
                segment.text,
                &candidates,
                self.config.fuzzy_matching,
                &placeholders,
            );
            if !intervals.is_empty() {
                report.matched_segments += 1;
                output.push_str(&overlap::resolve(segment.text, intervals));
                continue;
            }

            let rebuilt = if self.config.excerpt_matching {
                excerpt::reconstruct(
                    segment.text,
                    &candidates,
                    &self.config.excerpt,
                    &self.config.ellipsis,
                    &placeholders,
                )
            } else {
                None
            };
            match rebuilt {
                Some(text) => {
                    trace!(segment = segment.text, "segment rebuilt as excerpt");
                    report.excerpt_segments += 1;
                    output.push_str(&text);
                }
                None => output.push_str(segment.text),
            }
        }

        debug!(
            target_language,
            candidates = report.candidates,
            rejected = report.rejected,
            matched = report.matched_segments,
            excerpts = report.excerpt_segments,
            "document localized"
        );

        Localized {
            html: unmask(&output, &masked.placeholders),
            report,
        }
    }

    /// Turn fragment/translation pairs into match candidates
    ///
    /// Longer search texts take priority over shorter ones; pairs keep their
    /// input order among equal lengths.
    fn build_candidates(
        &self,
        pairs: &[(String, String)],
        reverse: &HashMap<String, String>,
        report: &mut LocalizeReport,
    ) -> Vec<Candidate> {
        let mut accepted: Vec<(String, String)> = Vec::new();
        for (original, translated) in pairs {
            if original.trim().is_empty() || translated.trim().is_empty() || original == translated {
                continue;
            }
            if self.shortcodes.is_directives_only(original) {
                continue;
            }
            if !self.shortcodes.translation_preserves(original, translated) {
                trace!(original = original.as_str(), "translation drops a directive, rejected");
                report.rejected += 1;
                continue;
            }
            accepted.push((apply_reverse(original, reverse), apply_reverse(translated, reverse)));
        }

        accepted.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
        accepted
            .into_iter()
            .enumerate()
            .map(|(priority, (search, replacement))| {
                let pattern = self.pattern_for(&search, reverse);
                Candidate::new(search, replacement, priority, pattern)
            })
            .collect()
    }

    fn pattern_for(&self, search: &str, reverse: &HashMap<String, String>) -> Option<Regex> {
        if !self.config.fuzzy_matching {
            return None;
        }
        // Placeholders differ per document, so masked texts are not worth caching.
        let masked = reverse.values().any(|placeholder| search.contains(placeholder.as_str()));
        if masked {
            crate::matcher::fuzzy_pattern(search).and_then(|p| Regex::new(&p).ok())
        } else {
            self.patterns.get(search)
        }
    }
}

/// Localize `document` with default settings
pub fn substitute(document: &str, target_language: &str, fragments: &[(String, String)]) -> String {
    Localizer::default().localize(document, target_language, fragments)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items
            .iter()
            .map(|(o, t)| (o.to_string(), t.to_string()))
            .collect()
    }

    #[test]
    fn test_substitute_simple() {
        let html = substitute("<p>Hello</p>", "fr", &pairs(&[("Hello", "Bonjour")]));
        assert_eq!(html, "<p>Bonjour</p>");
    }

    #[test]
    fn test_attributes_are_never_touched() {
        let html = substitute(
            "<a title=\"Hello\" href=\"/hello\">Hello</a>",
            "fr",
            &pairs(&[("Hello", "Bonjour")]),
        );
        assert_eq!(html, "<a title=\"Hello\" href=\"/hello\">Bonjour</a>");
    }

    #[test]
    fn test_identical_and_empty_pairs_are_skipped() {
        let localizer = Localizer::default();
        let result = localizer.localize_with_report(
            "<p>Same</p>",
            "fr",
            &pairs(&[("Same", "Same"), ("", "x"), ("y", "  ")]),
        );
        assert_eq!(result.html, "<p>Same</p>");
        assert_eq!(result.report.candidates, 0);
    }

    #[test]
    fn test_directives_only_fragment_is_skipped() {
        let localizer = Localizer::default();
        let result =
            localizer.localize_with_report("<p>[gallery]</p>", "fr", &pairs(&[("[gallery]", "[galerie]")]));
        assert_eq!(result.html, "<p>[gallery]</p>");
        assert_eq!(result.report.candidates, 0);
    }

    #[test]
    fn test_longer_fragment_takes_priority() {
        let html = substitute(
            "<p>Contact us today</p>",
            "fr",
            &pairs(&[("Contact", "Contact"), ("us", "nous"), ("Contact us today", "Contactez-nous")]),
        );
        assert_eq!(html, "<p>Contactez-nous</p>");
    }

    #[test]
    fn test_several_fragments_in_one_segment() {
        let html = substitute(
            "<p>Red and blue</p>",
            "fr",
            &pairs(&[("Red", "Rouge"), ("blue", "bleu")]),
        );
        assert_eq!(html, "<p>Rouge and bleu</p>");
    }

    #[test]
    fn test_excerpt_segment() {
        let original = "Our bakery opens every morning at seven. Fresh bread is baked on site daily.";
        let translated = "Notre boulangerie ouvre chaque matin à sept heures. Le pain frais est cuit sur place.";
        let localizer = Localizer::default();
        let result = localizer.localize_with_report(
            "<div class=\"excerpt\"><p>Our bakery opens every morning at seven. Fresh [&hellip;]</p></div>",
            "fr",
            &pairs(&[(original, translated)]),
        );
        assert_eq!(result.report.excerpt_segments, 1);
        assert!(result.html.contains("Notre boulangerie ouvre chaque matin à sept heures."));
        assert!(result.html.ends_with("\u{2026}</p></div>"));
    }

    #[test]
    fn test_excerpt_matching_can_be_disabled() {
        let config = LocalizerConfig {
            excerpt_matching: false,
            ..LocalizerConfig::default()
        };
        let localizer = Localizer::new(config);
        let document = "<p>Our bakery opens every&hellip;</p>";
        let html = localizer.localize(
            document,
            "fr",
            &pairs(&[("Our bakery opens every morning", "Notre boulangerie ouvre chaque matin")]),
        );
        assert_eq!(html, document);
    }

    #[test]
    fn test_rejected_translation_is_counted() {
        let localizer = Localizer::default();
        let result = localizer.localize_with_report(
            "<p>Buy [price] now</p>",
            "fr",
            &pairs(&[("Buy [price] now", "Achetez maintenant")]),
        );
        assert_eq!(result.html, "<p>Buy [price] now</p>");
        assert_eq!(result.report.rejected, 1);
    }

    #[test]
    fn test_registered_grammar() {
        let grammar = crate::shortcode::RegisteredDirectives::new(["price"]);
        let localizer = Localizer::with_grammar(LocalizerConfig::default(), &grammar);
        let html = localizer.localize(
            "<p>Buy [price] now</p>",
            "fr",
            &pairs(&[("Buy [price] now", "Achetez [price] maintenant")]),
        );
        assert_eq!(html, "<p>Achetez [price] maintenant</p>");
    }
}
