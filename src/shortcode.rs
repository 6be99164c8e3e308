//! Shortcode masking for protecting directives during substitution
//!
//! Shortcodes are inline bracket directives such as `[gallery ids="1,2"]` or
//! `[button]...[/button]`. The hosting CMS executes them after localization,
//! so they must reach it byte-identical. Before a document is localized every
//! directive token is swapped for an opaque placeholder that no matching step
//! can disturb, and swapped back once all substitution is done.
//!
//! Format: `__anc{hash}_{seq}__` where `hash` is derived from the text and the
//! current time and `seq` counts distinct directives (1-indexed).

use once_cell::sync::Lazy;
use regex::Regex;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

/// Generic `[name attrs]`, `[name/]` and `[/name]` tokens
static GENERIC_DIRECTIVE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[/?[A-Za-z][A-Za-z0-9_-]*(?:\s+[^\[\]]*?)?\s*/?\]")
        .expect("valid directive regex")
});

/// Source of the directive grammar
///
/// A host that knows its registered directives can supply a precise pattern;
/// otherwise the generic bracket pattern is used.
pub trait DirectiveGrammar: Send + Sync {
    /// Regex matching a single directive token, or `None` for the generic one
    fn directive_regex(&self) -> Option<Regex>;
}

/// Grammar matching any `[name ...]` bracket token
#[derive(Debug, Clone, Copy, Default)]
pub struct GenericBrackets;

impl DirectiveGrammar for GenericBrackets {
    fn directive_regex(&self) -> Option<Regex> {
        None
    }
}

/// Grammar restricted to a known set of registered directive names
#[derive(Debug, Clone, Default)]
pub struct RegisteredDirectives {
    names: Vec<String>,
}

impl RegisteredDirectives {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }
}

impl DirectiveGrammar for RegisteredDirectives {
    fn directive_regex(&self) -> Option<Regex> {
        if self.names.is_empty() {
            return None;
        }
        let alternatives: Vec<String> = self.names.iter().map(|n| regex::escape(n)).collect();
        let pattern = format!(
            r"\[/?(?:{})(?:\s+[^\[\]]*?)?\s*/?\]",
            alternatives.join("|")
        );
        Regex::new(&pattern).ok()
    }
}

/// The directive matcher used by one localizer
#[derive(Debug, Clone)]
pub struct Shortcodes {
    regex: Regex,
}

impl Default for Shortcodes {
    fn default() -> Self {
        Self {
            regex: GENERIC_DIRECTIVE_RE.clone(),
        }
    }
}

/// Result of masking a text
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MaskedText {
    /// Text with every directive replaced by its placeholder
    pub text: String,
    /// Placeholder → original directive
    pub placeholders: HashMap<String, String>,
    /// Original directive → placeholder
    pub reverse: HashMap<String, String>,
}

impl Shortcodes {
    pub fn new(grammar: &dyn DirectiveGrammar) -> Self {
        match grammar.directive_regex() {
            Some(regex) => Self { regex },
            None => Self::default(),
        }
    }

    /// All directive tokens in `text`, in order of appearance
    pub fn tokens<'t>(&self, text: &'t str) -> Vec<&'t str> {
        if !text.contains('[') {
            return Vec::new();
        }
        self.regex.find_iter(text).map(|m| m.as_str()).collect()
    }

    /// Replace each directive token in `text` with a placeholder
    ///
    /// Identical directives share one placeholder. Text without directive
    /// syntax is returned unchanged with empty maps.
    ///
    /// # Example
    /// ```ignore
    /// let masked = Shortcodes::default().mask("Hi [b]there[/b]");
    /// assert_eq!(masked.placeholders.len(), 2);
    /// ```
    pub fn mask(&self, text: &str) -> MaskedText {
        if !text.contains('[') || !self.regex.is_match(text) {
            return MaskedText {
                text: text.to_string(),
                ..Default::default()
            };
        }

        let prefix = unique_prefix(text);
        let mut placeholders = HashMap::new();
        let mut reverse: HashMap<String, String> = HashMap::new();
        let masked = self.regex.replace_all(text, |caps: &regex::Captures| {
            let original = &caps[0];
            if let Some(existing) = reverse.get(original) {
                return existing.clone();
            }
            let placeholder = format!("{}{}__", prefix, reverse.len() + 1);
            placeholders.insert(placeholder.clone(), original.to_string());
            reverse.insert(original.to_string(), placeholder.clone());
            placeholder
        });

        MaskedText {
            text: masked.into_owned(),
            placeholders,
            reverse,
        }
    }

    /// True when stripping every directive leaves only whitespace
    pub fn is_directives_only(&self, text: &str) -> bool {
        if !text.contains('[') {
            return text.trim().is_empty();
        }
        self.regex.replace_all(text, "").trim().is_empty()
    }

    /// Every directive of `original` must occur in `translated` at least as
    /// often as it does in `original`.
    pub fn translation_preserves(&self, original: &str, translated: &str) -> bool {
        let mut required: HashMap<&str, usize> = HashMap::new();
        for token in self.tokens(original) {
            *required.entry(token).or_insert(0) += 1;
        }
        required
            .into_iter()
            .all(|(token, count)| translated.matches(token).count() >= count)
    }
}

/// Restore directives from their placeholders
///
/// Longer placeholders are restored first so that no placeholder is ever
/// replaced inside another one.
pub fn unmask(text: &str, placeholders: &HashMap<String, String>) -> String {
    if placeholders.is_empty() {
        return text.to_string();
    }
    let mut sorted: Vec<(&String, &String)> = placeholders.iter().collect();
    sorted.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then(a.0.cmp(b.0)));

    let mut result = text.to_string();
    for (placeholder, original) in sorted {
        result = result.replace(placeholder.as_str(), original);
    }
    result
}

/// Express `text` in the masked form of a document using its reverse map
pub fn apply_reverse(text: &str, reverse: &HashMap<String, String>) -> String {
    if reverse.is_empty() || !text.contains('[') {
        return text.to_string();
    }
    let mut sorted: Vec<(&String, &String)> = reverse.iter().collect();
    sorted.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then(a.0.cmp(b.0)));

    let mut result = text.to_string();
    for (original, placeholder) in sorted {
        result = result.replace(original.as_str(), placeholder);
    }
    result
}

/// Placeholder prefix that does not occur anywhere in `text`
fn unique_prefix(text: &str) -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    let mut salt: u32 = 0;
    loop {
        let mut hasher = Sha256::new();
        hasher.update(text.as_bytes());
        hasher.update(nanos.to_le_bytes());
        hasher.update(salt.to_le_bytes());
        let digest = hasher.finalize();
        let hash: String = digest[..5].iter().map(|b| format!("{:02x}", b)).collect();
        let prefix = format!("__anc{}_", hash);
        if !text.contains(&prefix) {
            return prefix;
        }
        salt += 1;
    }
}
