//! Machine translation of stored fragments
//!
//! The localizer never translates anything itself; it substitutes
//! translations that already exist. This module is how they come to exist
//! without a human translator:
//!
//! 1. **MT trait & providers** - [`MachineTranslator`] with a DeepL
//!    implementation and a deterministic mock
//! 2. **Locale helpers** - base-language normalization and DeepL codes
//! 3. **Batch workflow** - [`translate_missing`] fills the gaps in a store,
//!    shielding shortcodes from the MT engine
//!
//! # Example
//!
//! ```ignore
//! use anchor_i18n::config::Config;
//! use anchor_i18n::mt::{DeepLProvider, translate_missing};
//! use anchor_i18n::shortcode::Shortcodes;
//! use anchor_i18n::store::MemoryStore;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env();
//!     let provider = DeepLProvider::from_config(&config.translation)?;
//!     let mut store = MemoryStore::load("fragments.json".as_ref())?;
//!
//!     let report = translate_missing(
//!         &mut store,
//!         &provider,
//!         "fr",
//!         &config.translation,
//!         &Shortcodes::default(),
//!     )
//!     .await?;
//!     println!("{:?}", report);
//!     Ok(())
//! }
//! ```
pub mod batch;
pub mod deepl;
pub mod error;
pub mod mock;
pub mod translator;

pub use batch::{BatchReport, translate_missing};
pub use deepl::{DeepLLanguage, DeepLProvider, LanguageKind};
pub use error::{MtError, MtResult};
pub use mock::{MockMode, MockTranslator};
pub use translator::{MachineTranslator, normalize_locale, provider_language_code, validate_locale};
