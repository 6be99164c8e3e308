//! Fragment and translation storage
//!
//! Fragments are captured source-language texts; translations hang off them,
//! at most one per (fragment, language). The localizer only reads from a
//! store. Writes come from the extraction crawl, the batch translation
//! workflow and manual edits.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use tracing::debug;

/// A captured unit of source-language text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedFragment {
    pub id: u64,
    pub original_text: String,
    pub source_locale: String,
}

/// A translation of one fragment into one language
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Translation {
    pub id: u64,
    pub fragment_id: u64,
    pub target_language: String,
    pub translated_text: String,
}

/// Storage operations the localizer and the workflows rely on
pub trait TranslationStore {
    /// All fragments, ordered by id
    fn fragments(&self) -> Vec<ExtractedFragment>;

    fn fragment(&self, id: u64) -> Option<ExtractedFragment>;

    /// Insert a fragment unless one with exactly the same text exists
    ///
    /// Returns the new id, or `None` for a duplicate.
    fn insert_fragment(&mut self, original_text: &str, source_locale: &str) -> Option<u64>;

    /// Replace the text of an existing fragment
    fn update_fragment(&mut self, id: u64, original_text: &str) -> Result<()>;

    /// Translation of a fragment for `language`
    ///
    /// An exact (case-insensitive) language match wins; otherwise any
    /// translation sharing the first two characters of the code is returned,
    /// so `fr-CA` finds a translation stored as `FR`.
    fn find_translation(&self, fragment_id: u64, language: &str) -> Option<Translation>;

    fn translation_exists(&self, fragment_id: u64, language: &str) -> bool {
        self.find_translation(fragment_id, language).is_some()
    }

    /// Insert the translation or update the existing one for the same
    /// (fragment, language) pair, returning its id
    fn upsert_translation(&mut self, fragment_id: u64, language: &str, text: &str) -> Result<u64>;

    /// Delete every fragment and, with them, every translation
    fn clear(&mut self);
}

/// Lowercased two-character language prefix used for lookups
pub fn language_prefix(language: &str) -> String {
    language.chars().take(2).collect::<String>().to_lowercase()
}

/// On-disk layout of a [`MemoryStore`]
#[derive(Debug, Default, Serialize, Deserialize)]
struct Snapshot {
    fragments: Vec<ExtractedFragment>,
    translations: Vec<Translation>,
}

/// In-memory store with JSON persistence
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    fragments: BTreeMap<u64, ExtractedFragment>,
    by_text: HashMap<String, u64>,
    /// Keyed by (fragment id, lowercased language): the uniqueness constraint
    translations: BTreeMap<(u64, String), Translation>,
    next_fragment_id: u64,
    next_translation_id: u64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a store saved with [`MemoryStore::save`]
    ///
    /// A missing file yields an empty store.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::io(path.display().to_string(), e))?;
        let snapshot: Snapshot = serde_json::from_str(&content)?;
        let store = Self::from_snapshot(snapshot)?;
        debug!(
            path = %path.display(),
            fragments = store.fragments.len(),
            translations = store.translations.len(),
            "store loaded"
        );
        Ok(store)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let snapshot = Snapshot {
            fragments: self.fragments.values().cloned().collect(),
            translations: self.translations.values().cloned().collect(),
        };
        let content = serde_json::to_string_pretty(&snapshot)?;
        std::fs::write(path, content).map_err(|e| Error::io(path.display().to_string(), e))
    }

    fn from_snapshot(snapshot: Snapshot) -> Result<Self> {
        let mut store = Self::new();
        for fragment in snapshot.fragments {
            if store.fragments.contains_key(&fragment.id) {
                return Err(Error::Store(format!("duplicate fragment id {}", fragment.id)));
            }
            store.next_fragment_id = store.next_fragment_id.max(fragment.id + 1);
            store.by_text.insert(fragment.original_text.clone(), fragment.id);
            store.fragments.insert(fragment.id, fragment);
        }
        for translation in snapshot.translations {
            if !store.fragments.contains_key(&translation.fragment_id) {
                return Err(Error::Store(format!(
                    "translation {} refers to missing fragment {}",
                    translation.id, translation.fragment_id
                )));
            }
            let key = (translation.fragment_id, translation.target_language.to_lowercase());
            if store.translations.contains_key(&key) {
                return Err(Error::Store(format!(
                    "duplicate translation for fragment {} in '{}'",
                    key.0, key.1
                )));
            }
            store.next_translation_id = store.next_translation_id.max(translation.id + 1);
            store.translations.insert(key, translation);
        }
        Ok(store)
    }

    pub fn fragment_count(&self) -> usize {
        self.fragments.len()
    }

    pub fn translation_count(&self) -> usize {
        self.translations.len()
    }

    /// All translations of one fragment
    pub fn translations_of(&self, fragment_id: u64) -> Vec<Translation> {
        self.translations
            .range((fragment_id, String::new())..)
            .take_while(|((id, _), _)| *id == fragment_id)
            .map(|(_, t)| t.clone())
            .collect()
    }
}

impl TranslationStore for MemoryStore {
    fn fragments(&self) -> Vec<ExtractedFragment> {
        self.fragments.values().cloned().collect()
    }

    fn fragment(&self, id: u64) -> Option<ExtractedFragment> {
        self.fragments.get(&id).cloned()
    }

    fn insert_fragment(&mut self, original_text: &str, source_locale: &str) -> Option<u64> {
        if self.by_text.contains_key(original_text) {
            return None;
        }
        let id = self.next_fragment_id.max(1);
        self.next_fragment_id = id + 1;
        self.by_text.insert(original_text.to_string(), id);
        self.fragments.insert(
            id,
            ExtractedFragment {
                id,
                original_text: original_text.to_string(),
                source_locale: source_locale.to_string(),
            },
        );
        Some(id)
    }

    fn update_fragment(&mut self, id: u64, original_text: &str) -> Result<()> {
        if let Some(&other) = self.by_text.get(original_text) {
            if other != id {
                return Err(Error::Store(format!(
                    "fragment {} already holds this text",
                    other
                )));
            }
        }
        let fragment = self
            .fragments
            .get_mut(&id)
            .ok_or_else(|| Error::Store(format!("no fragment with id {}", id)))?;
        self.by_text.remove(&fragment.original_text);
        fragment.original_text = original_text.to_string();
        self.by_text.insert(original_text.to_string(), id);
        Ok(())
    }

    fn find_translation(&self, fragment_id: u64, language: &str) -> Option<Translation> {
        let exact = (fragment_id, language.to_lowercase());
        if let Some(t) = self.translations.get(&exact) {
            return Some(t.clone());
        }
        let prefix = language_prefix(language);
        self.translations
            .range((fragment_id, String::new())..)
            .take_while(|((id, _), _)| *id == fragment_id)
            .find(|((_, lang), _)| language_prefix(lang) == prefix)
            .map(|(_, t)| t.clone())
    }

    fn upsert_translation(&mut self, fragment_id: u64, language: &str, text: &str) -> Result<u64> {
        if !self.fragments.contains_key(&fragment_id) {
            return Err(Error::Store(format!("no fragment with id {}", fragment_id)));
        }
        if language.trim().is_empty() {
            return Err(Error::Store("translation language is empty".to_string()));
        }
        let key = (fragment_id, language.to_lowercase());
        if let Some(existing) = self.translations.get_mut(&key) {
            existing.translated_text = text.to_string();
            return Ok(existing.id);
        }
        let id = self.next_translation_id.max(1);
        self.next_translation_id = id + 1;
        self.translations.insert(
            key,
            Translation {
                id,
                fragment_id,
                target_language: language.to_string(),
                translated_text: text.to_string(),
            },
        );
        Ok(id)
    }

    fn clear(&mut self) {
        self.fragments.clear();
        self.by_text.clear();
        self.translations.clear();
    }
}
