//! Machine translation trait and locale helpers
//!
//! The `MachineTranslator` trait keeps the batch workflow independent of any
//! particular provider (DeepL, the mock used in tests, ...).
//!
//! # Example
//!
//! ```ignore
//! use anchor_i18n::mt::{MachineTranslator, DeepLProvider};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let provider = DeepLProvider::from_env()?;
//!
//!     let result = provider.translate("Hello, world!", "en", "fr").await?;
//!     println!("{}", result); // "Bonjour, le monde !"
//!
//!     let texts = vec!["Hello".to_string(), "Goodbye".to_string()];
//!     let results = provider.translate_batch(&texts, "en", "fr").await?;
//!     println!("{:?}", results);
//!
//!     Ok(())
//! }
//! ```

use crate::mt::error::{MtError, MtResult};
use async_trait::async_trait;
use icu_locale::Locale;

/// Generic trait for machine translation providers
///
/// All methods are async to support I/O-bound operations like network requests.
#[async_trait]
pub trait MachineTranslator: Send + Sync {
    /// Translate a single text from source to target locale
    ///
    /// # Arguments
    ///
    /// * `text` - The text to translate
    /// * `source_locale` - Source language code (e.g., "en", "en-US")
    /// * `target_locale` - Target language code (e.g., "fr", "pt-BR")
    async fn translate(
        &self,
        text: &str,
        source_locale: &str,
        target_locale: &str,
    ) -> MtResult<String>;

    /// Translate multiple texts in one batch operation
    ///
    /// # Guarantees
    ///
    /// - Output order matches input order
    /// - Output length equals input length
    async fn translate_batch(
        &self,
        texts: &[String],
        source_locale: &str,
        target_locale: &str,
    ) -> MtResult<Vec<String>>;

    /// Name of this provider, for logging
    fn provider_name(&self) -> &str;
}

/// Normalize a locale code to its base language
///
/// - `en-US` → `en`
/// - `zh_Hans` → `zh`
/// - `PT-br` → `pt`
///
/// Codes that do not parse as BCP 47 fall back to the text before the first
/// separator, lowercased.
pub fn normalize_locale(locale: &str) -> String {
    let tag = locale.trim().replace('_', "-");
    match tag.parse::<Locale>() {
        Ok(parsed) => parsed.id.language.as_str().to_string(),
        Err(_) => tag.split('-').next().unwrap_or(&tag).to_lowercase(),
    }
}

/// Locale code in the form DeepL expects
///
/// DeepL wants upper-case codes and only accepts a region for a handful of
/// target languages (`EN-GB`, `PT-BR`, ...). Source languages never carry a
/// region.
pub fn provider_language_code(locale: &str, is_target: bool) -> String {
    let tag = locale.trim().replace('_', "-");
    let base = normalize_locale(&tag).to_uppercase();
    if !is_target {
        return base;
    }
    let region = tag
        .parse::<Locale>()
        .ok()
        .and_then(|parsed| parsed.id.region.map(|r| r.as_str().to_string()));
    match (base.as_str(), region.as_deref()) {
        ("EN", Some(r @ ("GB" | "US"))) => format!("EN-{}", r),
        ("PT", Some(r @ ("BR" | "PT"))) => format!("PT-{}", r),
        _ => base,
    }
}

/// Validate that a locale code is in acceptable format
///
/// Only ASCII letters, digits, hyphens and underscores are accepted.
pub fn validate_locale(locale: &str) -> MtResult<()> {
    if locale.is_empty() {
        return Err(MtError::InvalidLocale("Locale code is empty".to_string()));
    }

    if !locale
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(MtError::InvalidLocale(format!(
            "Invalid characters in locale code: {}",
            locale
        )));
    }

    Ok(())
}
