//! HTML-safe text substitution for site localization
//!
//! Given a rendered HTML page and a set of captured source-language fragments
//! with their translations, rewrite the page so every fragment that appears in
//! renderable text is replaced by its translation, while:
//!
//! - tags, attributes, `<script>` and `<style>` contents stay byte-identical
//! - shortcodes (`[gallery]`, `[button]...[/button]`) survive unchanged
//! - entity and whitespace differences between page and fragment are tolerated
//! - auto-generated excerpts are rebuilt from a truncated translation
//! - overlapping fragments are resolved to the best non-overlapping set
//!
//! # Example
//!
//! ```ignore
//! use anchor_i18n::substitute;
//!
//! let html = substitute(
//!     "<p>It&#8217;s great</p>",
//!     "fr",
//!     &[("It's great".to_string(), "C'est super".to_string())],
//! );
//! assert_eq!(html, "<p>C'est super</p>");
//! ```
//!
//! Around the substitution engine live the pieces that feed it: a fragment
//! [`store`], the [`extract`] crawl that fills it, and the [`mt`] layer that
//! machine-translates what is missing.

pub mod config;
pub mod entities;
pub mod error;
pub mod excerpt;
pub mod extract;
pub mod html;
pub mod matcher;
pub mod mt;
pub mod normalize;
pub mod overlap;
pub mod pipeline;
pub mod shortcode;
pub mod store;


pub use config::{Config, ExcerptConfig, LocalizerConfig, TranslationConfig};
pub use error::{Error, Result};
pub use extract::{ContentSource, CrawlReport, Extractor, PageFetcher};
pub use pipeline::{LocalizeReport, Localized, Localizer, substitute};
pub use shortcode::{DirectiveGrammar, RegisteredDirectives, Shortcodes};
pub use store::{ExtractedFragment, MemoryStore, Translation, TranslationStore};
