//! Batch machine translation of missing translations
//!
//! For every stored fragment without a translation in the target language:
//!
//! 1. Mask its shortcodes so the MT engine only sees opaque placeholders
//! 2. Send the masked texts in batches of `translation.batch_size`
//! 3. Restore the shortcodes in each result
//! 4. Reject results that lost a directive or came back empty; store the rest
//!
//! # Example
//!
//! ```ignore
//! use anchor_i18n::config::TranslationConfig;
//! use anchor_i18n::mt::{MockMode, MockTranslator, translate_missing};
//! use anchor_i18n::shortcode::Shortcodes;
//! use anchor_i18n::store::MemoryStore;
//!
//! let mut store = MemoryStore::new();
//! let translator = MockTranslator::new(MockMode::Suffix);
//! let report = translate_missing(
//!     &mut store,
//!     &translator,
//!     "fr",
//!     &TranslationConfig::default(),
//!     &Shortcodes::default(),
//! )
//! .await?;
//! println!("{} translated", report.translated);
//! ```

use crate::config::TranslationConfig;
use crate::error::Result;
use crate::mt::error::MtError;
use crate::mt::translator::{MachineTranslator, validate_locale};
use crate::shortcode::{MaskedText, Shortcodes, unmask};
use crate::store::TranslationStore;
use tracing::{debug, info, warn};

/// Outcome of one batch translation run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Fragments sent to the provider
    pub requested: usize,
    /// Translations written to the store
    pub translated: usize,
    /// Fragments that already had a translation
    pub skipped_existing: usize,
    /// Fragments made only of directives
    pub skipped_untranslatable: usize,
    /// Results dropped because they were empty or lost a directive
    pub rejected: usize,
}

struct Pending {
    fragment_id: u64,
    original: String,
    masked: MaskedText,
}

/// Fill in missing `target_language` translations using `translator`
///
/// With `config.overwrite` set, existing translations are replaced as well.
/// A provider failure aborts the run; translations stored by earlier batches
/// are kept.
pub async fn translate_missing<S>(
    store: &mut S,
    translator: &dyn MachineTranslator,
    target_language: &str,
    config: &TranslationConfig,
    shortcodes: &Shortcodes,
) -> Result<BatchReport>
where
    S: TranslationStore + ?Sized,
{
    validate_locale(target_language)?;
    validate_locale(&config.source_locale)?;

    let mut report = BatchReport::default();
    let mut pending = Vec::new();
    for fragment in store.fragments() {
        if shortcodes.is_directives_only(&fragment.original_text) {
            report.skipped_untranslatable += 1;
            continue;
        }
        if !config.overwrite && store.translation_exists(fragment.id, target_language) {
            report.skipped_existing += 1;
            continue;
        }
        let masked = shortcodes.mask(&fragment.original_text);
        pending.push(Pending {
            fragment_id: fragment.id,
            original: fragment.original_text,
            masked,
        });
    }
    report.requested = pending.len();

    if pending.is_empty() {
        debug!(target_language, "nothing to translate");
        return Ok(report);
    }

    for chunk in pending.chunks(config.batch_size.max(1)) {
        let texts: Vec<String> = chunk.iter().map(|p| p.masked.text.clone()).collect();
        let results = translator
            .translate_batch(&texts, &config.source_locale, target_language)
            .await?;
        if results.len() != texts.len() {
            return Err(MtError::TranslationError(format!(
                "{} returned {} translations for {} texts",
                translator.provider_name(),
                results.len(),
                texts.len()
            ))
            .into());
        }

        for (item, result) in chunk.iter().zip(results) {
            let restored = unmask(&result, &item.masked.placeholders);
            if restored.trim().is_empty() {
                report.rejected += 1;
                continue;
            }
            if !shortcodes.translation_preserves(&item.original, &restored) {
                warn!(
                    fragment_id = item.fragment_id,
                    "machine translation lost a directive, rejected"
                );
                report.rejected += 1;
                continue;
            }
            store.upsert_translation(item.fragment_id, target_language, restored.trim())?;
            report.translated += 1;
        }
        debug!(size = chunk.len(), "batch translated");
    }

    info!(
        provider = translator.provider_name(),
        target_language,
        requested = report.requested,
        translated = report.translated,
        rejected = report.rejected,
        "batch translation finished"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::mt::mock::{MockMode, MockTranslator};
    use crate::store::MemoryStore;
    use std::collections::HashMap;

    fn store_with(texts: &[&str]) -> MemoryStore {
        let mut store = MemoryStore::new();
        for text in texts {
            store.insert_fragment(text, "en");
        }
        store
    }

    fn config() -> TranslationConfig {
        TranslationConfig::default()
    }

    #[tokio::test]
    async fn test_translates_missing_fragments() {
        let mut store = store_with(&["Hello", "World"]);
        let translator = MockTranslator::new(MockMode::Suffix);
        let report = translate_missing(&mut store, &translator, "fr", &config(), &Shortcodes::default())
            .await
            .unwrap();
        assert_eq!(report.requested, 2);
        assert_eq!(report.translated, 2);
        assert_eq!(store.find_translation(1, "fr").unwrap().translated_text, "Hello_fr");
    }

    #[tokio::test]
    async fn test_existing_translations_are_skipped() {
        let mut store = store_with(&["Hello", "World"]);
        store.upsert_translation(1, "fr", "Bonjour").unwrap();
        let translator = MockTranslator::new(MockMode::Suffix);
        let report = translate_missing(&mut store, &translator, "fr", &config(), &Shortcodes::default())
            .await
            .unwrap();
        assert_eq!(report.skipped_existing, 1);
        assert_eq!(report.translated, 1);
        assert_eq!(store.find_translation(1, "fr").unwrap().translated_text, "Bonjour");
    }

    #[tokio::test]
    async fn test_overwrite_replaces_existing() {
        let mut store = store_with(&["Hello"]);
        store.upsert_translation(1, "fr", "Salut").unwrap();
        let translator = MockTranslator::new(MockMode::Suffix);
        let config = TranslationConfig {
            overwrite: true,
            ..config()
        };
        translate_missing(&mut store, &translator, "fr", &config, &Shortcodes::default())
            .await
            .unwrap();
        assert_eq!(store.find_translation(1, "fr").unwrap().translated_text, "Hello_fr");
        assert_eq!(store.translation_count(), 1);
    }

    #[tokio::test]
    async fn test_shortcodes_survive_translation() {
        let mut store = store_with(&["Buy [price id=\"3\"] now"]);
        let translator = MockTranslator::new(MockMode::Reorder);
        let report = translate_missing(&mut store, &translator, "fr", &config(), &Shortcodes::default())
            .await
            .unwrap();
        assert_eq!(report.translated, 1);
        let stored = store.find_translation(1, "fr").unwrap().translated_text;
        assert_eq!(stored, "now [price id=\"3\"] Buy");
    }

    #[tokio::test]
    async fn test_lost_directive_is_rejected() {
        let mut store = store_with(&["Buy [price] now", "Plain text"]);
        let translator = MockTranslator::new(MockMode::DropTokens);
        let report = translate_missing(&mut store, &translator, "fr", &config(), &Shortcodes::default())
            .await
            .unwrap();
        assert_eq!(report.rejected, 1);
        assert_eq!(report.translated, 1);
        assert!(!store.translation_exists(1, "fr"));
        assert!(store.translation_exists(2, "fr"));
    }

    #[tokio::test]
    async fn test_directives_only_fragments_are_not_sent() {
        let mut store = store_with(&["[gallery]", "Caption"]);
        let translator = MockTranslator::new(MockMode::Suffix);
        let report = translate_missing(&mut store, &translator, "fr", &config(), &Shortcodes::default())
            .await
            .unwrap();
        assert_eq!(report.skipped_untranslatable, 1);
        assert_eq!(report.requested, 1);
    }

    #[tokio::test]
    async fn test_batches_follow_batch_size() {
        let texts: Vec<String> = (0..7).map(|i| format!("Text {}", i)).collect();
        let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
        let mut store = store_with(&refs);
        let translator = MockTranslator::new(MockMode::Suffix);
        let config = TranslationConfig {
            batch_size: 3,
            ..config()
        };
        let report = translate_missing(&mut store, &translator, "de", &config, &Shortcodes::default())
            .await
            .unwrap();
        assert_eq!(report.translated, 7);
        assert_eq!(translator.calls(), 3);
    }

    #[tokio::test]
    async fn test_empty_result_is_rejected() {
        let mut store = store_with(&["Hello"]);
        let mut map = HashMap::new();
        map.insert(("Hello".to_string(), "fr".to_string()), "  ".to_string());
        let translator = MockTranslator::new(MockMode::Mappings(map));
        let report = translate_missing(&mut store, &translator, "fr", &config(), &Shortcodes::default())
            .await
            .unwrap();
        assert_eq!(report.rejected, 1);
        assert_eq!(store.translation_count(), 0);
    }

    #[tokio::test]
    async fn test_provider_error_propagates() {
        let mut store = store_with(&["Hello"]);
        let translator = MockTranslator::new(MockMode::Error("quota".to_string()));
        let result =
            translate_missing(&mut store, &translator, "fr", &config(), &Shortcodes::default()).await;
        assert!(matches!(result, Err(Error::Mt(MtError::TranslationError(_)))));
    }

    #[tokio::test]
    async fn test_invalid_target_language() {
        let mut store = store_with(&["Hello"]);
        let translator = MockTranslator::new(MockMode::Suffix);
        let result =
            translate_missing(&mut store, &translator, "f r", &config(), &Shortcodes::default()).await;
        assert!(matches!(result, Err(Error::Mt(MtError::InvalidLocale(_)))));
        assert_eq!(translator.calls(), 0);
    }
}
