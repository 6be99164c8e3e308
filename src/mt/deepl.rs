//! DeepL API provider for machine translation
//!
//! # Authentication
//!
//! The provider sends the key in a `DeepL-Auth-Key` authorization header. It
//! is read from the `DEEPL_API_KEY` environment variable or from
//! [`TranslationConfig`](crate::config::TranslationConfig).
//!
//! # Example
//!
//! ```ignore
//! use anchor_i18n::mt::{DeepLProvider, LanguageKind, MachineTranslator};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let provider = DeepLProvider::from_env()?;
//!
//!     let result = provider.translate("Merhaba Dünya!", "tr", "en").await?;
//!     println!("{}", result);
//!
//!     // Cached for a day after the first call
//!     let names = provider.language_names(LanguageKind::Target, true).await?;
//!     println!("{:?}", names);
//!
//!     Ok(())
//! }
//! ```

use crate::config::{API_KEY_ENV, TranslationConfig};
use crate::mt::error::{MtError, MtResult};
use crate::mt::translator::{MachineTranslator, provider_language_code, validate_locale};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::debug;

pub const DEEPL_FREE_ENDPOINT: &str = "https://api-free.deepl.com/v2";

static PARENTHESES_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*\(.*\)").expect("valid parentheses regex"));

/// One entry of the `/languages` listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeepLLanguage {
    pub language: String,
    pub name: String,
    #[serde(default)]
    pub supports_formality: bool,
}

/// Which side of a translation a language listing describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LanguageKind {
    Source,
    Target,
}

impl LanguageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LanguageKind::Source => "source",
            LanguageKind::Target => "target",
        }
    }
}

#[derive(Debug, Deserialize)]
struct TranslateResponse {
    translations: Vec<TranslatedText>,
}

#[derive(Debug, Deserialize)]
struct TranslatedText {
    text: String,
}

#[derive(Debug, Clone)]
struct CachedLanguages {
    fetched_at: Instant,
    languages: Vec<DeepLLanguage>,
}

/// DeepL API v2 provider
///
/// Batches are split into requests of at most [`DeepLProvider::MAX_BATCH_SIZE`]
/// texts. Language listings are cached per [`LanguageKind`] for the configured
/// lifetime; clones share the cache.
#[derive(Clone)]
pub struct DeepLProvider {
    api_key: String,
    client: reqwest::Client,
    base_url: String,
    batch_size: usize,
    cache_ttl: Duration,
    languages: Arc<Mutex<HashMap<LanguageKind, CachedLanguages>>>,
}

impl DeepLProvider {
    /// DeepL accepts up to 50 texts per request
    pub const MAX_BATCH_SIZE: usize = 50;

    /// Characters per text; the whole request is capped at 128 KiB
    const MAX_CHARS_PER_STRING: usize = 30_000;

    /// Create a provider for the free API endpoint
    pub fn new(api_key: String) -> MtResult<Self> {
        if api_key.trim().is_empty() {
            return Err(MtError::ConfigError("API key cannot be empty".to_string()));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| MtError::NetworkError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            api_key,
            client,
            base_url: DEEPL_FREE_ENDPOINT.to_string(),
            batch_size: Self::MAX_BATCH_SIZE,
            cache_ttl: Duration::from_secs(24 * 60 * 60),
            languages: Arc::new(Mutex::new(HashMap::new())),
        })
    }

    /// Create a provider from the `DEEPL_API_KEY` environment variable
    pub fn from_env() -> MtResult<Self> {
        let api_key = std::env::var(API_KEY_ENV).map_err(|_| {
            MtError::ConfigError(format!("{} environment variable not set", API_KEY_ENV))
        })?;

        Self::new(api_key)
    }

    /// Create a provider from the translation settings
    pub fn from_config(config: &TranslationConfig) -> MtResult<Self> {
        let api_key = config.api_key.clone().ok_or_else(|| {
            MtError::ConfigError(format!(
                "no DeepL API key configured (set {} or translation.api_key)",
                API_KEY_ENV
            ))
        })?;
        let mut provider = Self::new(api_key)?;
        provider.base_url = config.endpoint.trim_end_matches('/').to_string();
        provider.batch_size = config.batch_size.clamp(1, Self::MAX_BATCH_SIZE);
        provider.cache_ttl = Duration::from_secs(config.language_cache_ttl_secs);
        Ok(provider)
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    fn auth_header(&self) -> String {
        format!("DeepL-Auth-Key {}", self.api_key)
    }

    fn chunk_batch(&self, texts: &[String]) -> Vec<Vec<String>> {
        texts.chunks(self.batch_size).map(|c| c.to_vec()).collect()
    }

    async fn translate_chunk(
        &self,
        texts: &[String],
        source_locale: &str,
        target_locale: &str,
    ) -> MtResult<Vec<String>> {
        let url = format!("{}/translate", self.base_url);
        let body = json!({
            "text": texts,
            "source_lang": provider_language_code(source_locale, false),
            "target_lang": provider_language_code(target_locale, true),
        });

        let response = self
            .client
            .post(&url)
            .header("Authorization", self.auth_header())
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        check_status(status, &text)?;

        let translations = parse_translations(&text)?;
        if translations.len() != texts.len() {
            return Err(MtError::TranslationError(format!(
                "expected {} translations, got {}",
                texts.len(),
                translations.len()
            )));
        }
        Ok(translations)
    }

    /// Languages DeepL supports on one side of a translation
    ///
    /// Served from the cache while it is fresh.
    pub async fn languages(&self, kind: LanguageKind) -> MtResult<Vec<DeepLLanguage>> {
        if let Some(cached) = self.cached_languages(kind) {
            return Ok(cached);
        }

        let url = format!("{}/languages?type={}", self.base_url, kind.as_str());
        let response = self
            .client
            .get(&url)
            .header("Authorization", self.auth_header())
            .send()
            .await?;
        let status = response.status();
        let text = response.text().await?;
        check_status(status, &text)?;

        let languages: Vec<DeepLLanguage> = serde_json::from_str(&text).map_err(|e| {
            MtError::TranslationError(format!("Failed to parse language list: {}", e))
        })?;
        if languages.is_empty() {
            return Err(MtError::TranslationError(
                "DeepL returned an empty language list".to_string(),
            ));
        }
        debug!(kind = kind.as_str(), count = languages.len(), "language list fetched");
        self.store_languages(kind, languages.clone());
        Ok(languages)
    }

    /// Display names of the supported languages
    ///
    /// With `no_parentheses`, qualifiers like "(British)" are stripped and the
    /// resulting duplicates removed.
    pub async fn language_names(
        &self,
        kind: LanguageKind,
        no_parentheses: bool,
    ) -> MtResult<Vec<String>> {
        let languages = self.languages(kind).await?;
        Ok(language_names(&languages, no_parentheses))
    }

    /// Map of language code to display name for target languages
    pub async fn language_codes(&self) -> MtResult<BTreeMap<String, String>> {
        let languages = self.languages(LanguageKind::Target).await?;
        Ok(language_codes(&languages))
    }

    fn cached_languages(&self, kind: LanguageKind) -> Option<Vec<DeepLLanguage>> {
        let cache = self.languages.lock().ok()?;
        cache
            .get(&kind)
            .filter(|entry| entry.fetched_at.elapsed() < self.cache_ttl)
            .map(|entry| entry.languages.clone())
    }

    fn store_languages(&self, kind: LanguageKind, languages: Vec<DeepLLanguage>) {
        if let Ok(mut cache) = self.languages.lock() {
            cache.insert(
                kind,
                CachedLanguages {
                    fetched_at: Instant::now(),
                    languages,
                },
            );
        }
    }
}

/// Map a non-success HTTP status to an error
fn check_status(status: reqwest::StatusCode, body: &str) -> MtResult<()> {
    if status.is_success() {
        return Ok(());
    }
    Err(match status.as_u16() {
        403 => MtError::ConfigError(format!("DeepL rejected the API key: {}", body)),
        456 => MtError::TranslationError("DeepL character quota exceeded".to_string()),
        429 => MtError::NetworkError("too many requests to DeepL".to_string()),
        _ if status.is_client_error() => {
            MtError::ConfigError(format!("API client error ({}): {}", status, body))
        }
        _ => MtError::TranslationError(format!("API server error ({}): {}", status, body)),
    })
}

fn parse_translations(body: &str) -> MtResult<Vec<String>> {
    let response: TranslateResponse = serde_json::from_str(body)
        .map_err(|e| MtError::TranslationError(format!("Failed to parse API response: {}", e)))?;
    Ok(response.translations.into_iter().map(|t| t.text).collect())
}

/// Names of `languages`, optionally without parenthesized qualifiers
pub fn language_names(languages: &[DeepLLanguage], no_parentheses: bool) -> Vec<String> {
    if !no_parentheses {
        return languages.iter().map(|l| l.name.clone()).collect();
    }
    let mut seen = HashSet::new();
    languages
        .iter()
        .map(|l| PARENTHESES_RE.replace(&l.name, "").into_owned())
        .filter(|name| seen.insert(name.clone()))
        .collect()
}

pub fn language_codes(languages: &[DeepLLanguage]) -> BTreeMap<String, String> {
    languages
        .iter()
        .map(|l| (l.language.clone(), l.name.clone()))
        .collect()
}

impl std::fmt::Debug for DeepLProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeepLProvider")
            .field("api_key", &"***")
            .field("base_url", &self.base_url)
            .field("batch_size", &self.batch_size)
            .finish()
    }
}

#[async_trait]
impl MachineTranslator for DeepLProvider {
    async fn translate(
        &self,
        text: &str,
        source_locale: &str,
        target_locale: &str,
    ) -> MtResult<String> {
        validate_locale(source_locale)?;
        validate_locale(target_locale)?;

        if text.is_empty() {
            return Ok(String::new());
        }

        if text.len() > Self::MAX_CHARS_PER_STRING {
            return Err(MtError::TranslationError(format!(
                "Text exceeds maximum length of {} characters",
                Self::MAX_CHARS_PER_STRING
            )));
        }

        let results = self
            .translate_chunk(&[text.to_string()], source_locale, target_locale)
            .await?;

        Ok(results.into_iter().next().unwrap_or_default())
    }

    async fn translate_batch(
        &self,
        texts: &[String],
        source_locale: &str,
        target_locale: &str,
    ) -> MtResult<Vec<String>> {
        validate_locale(source_locale)?;
        validate_locale(target_locale)?;

        if texts.is_empty() {
            return Ok(Vec::new());
        }

        for (i, text) in texts.iter().enumerate() {
            if text.len() > Self::MAX_CHARS_PER_STRING {
                return Err(MtError::TranslationError(format!(
                    "Text at index {} exceeds maximum length of {} characters",
                    i,
                    Self::MAX_CHARS_PER_STRING
                )));
            }
        }

        let mut all_results = Vec::with_capacity(texts.len());
        for chunk in self.chunk_batch(texts) {
            let chunk_results = self
                .translate_chunk(&chunk, source_locale, target_locale)
                .await?;
            all_results.extend(chunk_results);
        }

        Ok(all_results)
    }

    fn provider_name(&self) -> &str {
        "DeepL"
    }
}
