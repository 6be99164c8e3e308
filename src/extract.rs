//! Fragment extraction crawl
//!
//! Walks a [`ContentSource`] and records every piece of user-facing text it
//! finds as an [`ExtractedFragment`](crate::store::ExtractedFragment):
//!
//! - titles and bodies of pages, posts and products
//! - navigation labels, resolving unlabeled items to the title they link to
//! - rendered product pages, fetched over HTTP when a [`PageFetcher`] is given
//!
//! Bodies are split with the same tokenizer the localizer uses, so a fragment
//! is exactly the text of one eligible segment after normalization. Texts
//! already in the store are skipped.
//!
//! # Example
//!
//! ```ignore
//! use anchor_i18n::extract::{Extractor, HttpFetcher, JsonContentSource};
//! use anchor_i18n::store::MemoryStore;
//!
//! let source = JsonContentSource::from_file("export.json".as_ref())?;
//! let fetcher = HttpFetcher::new()?;
//! let mut store = MemoryStore::new();
//! let report = Extractor::new("en").crawl(&source, Some(&fetcher), &mut store).await;
//! println!("{} new fragments", report.inserted);
//! ```

use crate::error::{Error, Result};
use crate::html;
use crate::normalize::normalize_fragment;
use crate::shortcode::Shortcodes;
use crate::store::TranslationStore;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Page,
    Post,
    Product,
}

/// A piece of content owned by the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentItem {
    pub id: u64,
    #[serde(default)]
    pub title: String,
    /// Stored HTML body
    #[serde(default)]
    pub body: String,
    pub kind: ContentKind,
    /// Public address of the rendered page
    #[serde(default)]
    pub url: Option<String>,
}

/// A navigation menu entry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavItem {
    #[serde(default)]
    pub label: Option<String>,
    /// Content item this entry points at
    #[serde(default)]
    pub linked_id: Option<u64>,
    #[serde(default)]
    pub children: Vec<NavItem>,
}

/// Where the crawl finds content
pub trait ContentSource {
    fn content_items(&self) -> Vec<ContentItem>;

    /// Top-level navigation entries
    fn navigation(&self) -> Vec<NavItem>;

    /// Title of the content item `id`
    fn title_of(&self, id: u64) -> Option<String>;
}

/// Retrieves rendered pages
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String>;
}

/// [`PageFetcher`] over HTTP
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("anchor-i18n/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        let fetch_error = |message: String| Error::Fetch {
            url: url.to_string(),
            message,
        };
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| fetch_error(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(fetch_error(format!("HTTP status {}", status)));
        }
        response.text().await.map_err(|e| fetch_error(e.to_string()))
    }
}

/// Content export read from a JSON file
///
/// ```json
/// {
///     "items": [{ "id": 1, "title": "About", "body": "<p>Hi</p>", "kind": "page" }],
///     "navigation": [{ "linked_id": 1 }, { "label": "Shop", "children": [] }]
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsonContentSource {
    #[serde(default)]
    pub items: Vec<ContentItem>,
    #[serde(default)]
    pub navigation: Vec<NavItem>,
}

impl JsonContentSource {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::io(path.display().to_string(), e))?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }
}

impl ContentSource for JsonContentSource {
    fn content_items(&self) -> Vec<ContentItem> {
        self.items.clone()
    }

    fn navigation(&self) -> Vec<NavItem> {
        self.navigation.clone()
    }

    fn title_of(&self, id: u64) -> Option<String> {
        self.items.iter().find(|i| i.id == id).map(|i| i.title.clone())
    }
}

/// Counters of one crawl
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlReport {
    pub items: usize,
    pub nav_items: usize,
    pub pages_fetched: usize,
    pub fetch_failures: usize,
    /// Fragments seen, duplicates included
    pub discovered: usize,
    /// Fragments new to the store
    pub inserted: usize,
}

/// Runs extraction crawls into a store
#[derive(Debug, Clone)]
pub struct Extractor {
    source_locale: String,
    shortcodes: Shortcodes,
}

impl Extractor {
    pub fn new(source_locale: &str) -> Self {
        Self {
            source_locale: source_locale.to_string(),
            shortcodes: Shortcodes::default(),
        }
    }

    pub fn with_shortcodes(source_locale: &str, shortcodes: Shortcodes) -> Self {
        Self {
            source_locale: source_locale.to_string(),
            shortcodes,
        }
    }

    /// Normalized fragments of an HTML document, in document order
    ///
    /// Script and style contents, whitespace, pure directives and texts
    /// without any letter are left out.
    pub fn fragments_from_html(&self, document: &str) -> Vec<String> {
        html::split(document)
            .into_iter()
            .filter(|segment| segment.eligible)
            .filter_map(|segment| self.fragment_from_text(segment.text))
            .collect()
    }

    fn fragment_from_text(&self, text: &str) -> Option<String> {
        let fragment = normalize_fragment(text);
        if fragment.is_empty()
            || self.shortcodes.is_directives_only(&fragment)
            || !fragment.chars().any(char::is_alphabetic)
        {
            return None;
        }
        Some(fragment)
    }

    /// Extract from stored content and navigation only
    pub fn extract_source<S>(&self, source: &dyn ContentSource, store: &mut S) -> CrawlReport
    where
        S: TranslationStore + ?Sized,
    {
        let mut report = CrawlReport::default();
        let items = source.content_items();
        report.items = items.len();

        for item in &items {
            let mut found: Vec<String> = self.fragment_from_text(&item.title).into_iter().collect();
            found.extend(self.fragments_from_html(&item.body));
            self.record(found, store, &mut report);
        }

        let mut labels = Vec::new();
        for entry in source.navigation() {
            collect_nav_labels(&entry, source, &mut labels, &mut report.nav_items);
        }
        let found: Vec<String> = labels
            .iter()
            .filter_map(|label| self.fragment_from_text(label))
            .collect();
        self.record(found, store, &mut report);

        debug!(
            items = report.items,
            nav_items = report.nav_items,
            inserted = report.inserted,
            "content source extracted"
        );
        report
    }

    /// Full crawl: stored content, navigation and, with a fetcher, the
    /// rendered product pages
    ///
    /// A page that cannot be fetched is logged and counted; the crawl goes on.
    pub async fn crawl<S>(
        &self,
        source: &dyn ContentSource,
        fetcher: Option<&dyn PageFetcher>,
        store: &mut S,
    ) -> CrawlReport
    where
        S: TranslationStore + ?Sized,
    {
        let mut report = self.extract_source(source, store);

        if let Some(fetcher) = fetcher {
            let urls: Vec<String> = source
                .content_items()
                .into_iter()
                .filter(|item| item.kind == ContentKind::Product)
                .filter_map(|item| item.url)
                .collect();
            for url in urls {
                match fetcher.fetch(&url).await {
                    Ok(page) => {
                        report.pages_fetched += 1;
                        let found = self.fragments_from_html(&page);
                        self.record(found, store, &mut report);
                    }
                    Err(e) => {
                        warn!(url = url.as_str(), error = %e, "page fetch failed");
                        report.fetch_failures += 1;
                    }
                }
            }
        }

        info!(
            discovered = report.discovered,
            inserted = report.inserted,
            pages = report.pages_fetched,
            failures = report.fetch_failures,
            "crawl finished"
        );
        report
    }

    fn record<S>(&self, fragments: Vec<String>, store: &mut S, report: &mut CrawlReport)
    where
        S: TranslationStore + ?Sized,
    {
        for fragment in fragments {
            report.discovered += 1;
            if store.insert_fragment(&fragment, &self.source_locale).is_some() {
                report.inserted += 1;
            }
        }
    }
}

/// Labels of `entry` and its descendants, depth first
fn collect_nav_labels(
    entry: &NavItem,
    source: &dyn ContentSource,
    labels: &mut Vec<String>,
    visited: &mut usize,
) {
    *visited += 1;
    let label = entry
        .label
        .clone()
        .filter(|l| !l.trim().is_empty())
        .or_else(|| entry.linked_id.and_then(|id| source.title_of(id)));
    if let Some(label) = label {
        labels.push(label);
    }
    for child in &entry.children {
        collect_nav_labels(child, source, labels, visited);
    }
}

/// In-memory [`PageFetcher`] serving fixed pages
#[derive(Debug, Clone, Default)]
pub struct StaticFetcher {
    pages: HashMap<String, String>,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, url: &str, body: &str) -> Self {
        self.pages.insert(url.to_string(), body.to_string());
        self
    }
}

#[async_trait]
impl PageFetcher for StaticFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        self.pages.get(url).cloned().ok_or_else(|| Error::Fetch {
            url: url.to_string(),
            message: "not found".to_string(),
        })
    }
}
