//! Configuration passed explicitly to the localizer and the translation
//! workflow
//!
//! ```json
//! {
//!     "localizer": { "fuzzy_matching": true, "excerpt": { "min_ratio": 0.6 } },
//!     "translation": { "source_locale": "en", "batch_size": 50 }
//! }
//! ```
//!
//! Every field is optional. The DeepL API key is normally taken from the
//! `DEEPL_API_KEY` environment variable rather than written to the file.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const API_KEY_ENV: &str = "DEEPL_API_KEY";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub localizer: LocalizerConfig,
    pub translation: TranslationConfig,
}

impl Config {
    /// Load configuration from a JSON file, then apply environment overrides
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::io(path.display().to_string(), e))?;
        let mut config: Config = serde_json::from_str(&content)?;
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Defaults plus environment overrides
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env();
        config
    }

    fn apply_env(&mut self) {
        if let Ok(key) = std::env::var(API_KEY_ENV) {
            if !key.trim().is_empty() {
                self.translation.api_key = Some(key);
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.localizer.excerpt.validate()?;
        if self.translation.batch_size == 0 {
            return Err(Error::Config("translation.batch_size must be at least 1".to_string()));
        }
        Ok(())
    }
}

/// Tuning of the substitution pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalizerConfig {
    /// Try entity/whitespace tolerant patterns when a literal search fails
    pub fuzzy_matching: bool,
    /// Rebuild truncated excerpts from full-length fragments
    pub excerpt_matching: bool,
    /// Marker appended to reconstructed excerpts
    pub ellipsis: String,
    pub excerpt: ExcerptConfig,
}

impl Default for LocalizerConfig {
    fn default() -> Self {
        Self {
            fuzzy_matching: true,
            excerpt_matching: true,
            ellipsis: "\u{2026}".to_string(),
            excerpt: ExcerptConfig::default(),
        }
    }
}

/// Thresholds of excerpt reconstruction, as fractions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExcerptConfig {
    /// Below this share of the original, a prefix without a trailing
    /// ellipsis is not trusted as an excerpt
    pub min_ratio: f64,
    /// At or above this share the full translation is used
    pub full_ratio: f64,
    pub min_target_ratio: f64,
    pub max_target_ratio: f64,
    /// A sentence boundary before the target must keep this share of it
    pub sentence_floor: f64,
    /// A sentence boundary after the target may extend it up to this share
    pub sentence_ceiling: f64,
    /// A word boundary cut must keep this share of the target
    pub word_floor: f64,
}

impl Default for ExcerptConfig {
    fn default() -> Self {
        Self {
            min_ratio: 0.6,
            full_ratio: 0.98,
            min_target_ratio: 0.35,
            max_target_ratio: 0.97,
            sentence_floor: 0.65,
            sentence_ceiling: 1.35,
            word_floor: 0.6,
        }
    }
}

impl ExcerptConfig {
    pub fn validate(&self) -> Result<()> {
        let fractions = [
            ("min_ratio", self.min_ratio),
            ("full_ratio", self.full_ratio),
            ("min_target_ratio", self.min_target_ratio),
            ("max_target_ratio", self.max_target_ratio),
            ("sentence_floor", self.sentence_floor),
            ("word_floor", self.word_floor),
        ];
        for (name, value) in fractions {
            if !(0.0..=1.0).contains(&value) {
                return Err(Error::Config(format!(
                    "excerpt.{} must be between 0 and 1, got {}",
                    name, value
                )));
            }
        }
        if self.min_target_ratio > self.max_target_ratio {
            return Err(Error::Config(
                "excerpt.min_target_ratio exceeds excerpt.max_target_ratio".to_string(),
            ));
        }
        if self.sentence_ceiling < 1.0 {
            return Err(Error::Config(
                "excerpt.sentence_ceiling must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Settings of the machine translation workflow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslationConfig {
    pub api_key: Option<String>,
    pub endpoint: String,
    pub source_locale: String,
    /// Texts sent per provider request
    pub batch_size: usize,
    /// Lifetime of the cached language list
    pub language_cache_ttl_secs: u64,
    /// Replace translations that already exist
    pub overwrite: bool,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            endpoint: "https://api-free.deepl.com/v2".to_string(),
            source_locale: "en".to_string(),
            batch_size: 50,
            language_cache_ttl_secs: 24 * 60 * 60,
            overwrite: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert!(config.localizer.fuzzy_matching);
        assert_eq!(config.localizer.excerpt.min_ratio, 0.6);
        assert_eq!(config.translation.batch_size, 50);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"localizer": {"excerpt": {"min_ratio": 0.7}}}"#).unwrap();
        assert_eq!(config.localizer.excerpt.min_ratio, 0.7);
        assert_eq!(config.localizer.excerpt.full_ratio, 0.98);
        assert_eq!(config.translation.source_locale, "en");
    }

    #[test]
    fn test_validate_rejects_bad_fractions() {
        let mut config = Config::default();
        config.localizer.excerpt.min_ratio = 1.5;
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        let mut config = Config::default();
        config.localizer.excerpt.min_target_ratio = 0.9;
        config.localizer.excerpt.max_target_ratio = 0.5;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.translation.batch_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_file_missing() {
        let result = Config::from_file(Path::new("/nonexistent/anchor-i18n.json"));
        assert!(matches!(result, Err(Error::Io { .. })));
    }
}
