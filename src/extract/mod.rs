//! Content extraction capability
//!
//! The engine consumes a [`ContentExtractor`] to turn raw HTML into a page
//! record: title, main text, a markdown rendition, structured metadata, and
//! the outbound links to classify. Extraction is best-effort: malformed HTML
//! must never panic, and a failing extractor only downgrades the page to a
//! partial record.

mod html;

pub use html::HtmlExtractor;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use url::Url;

/// One outbound link found on a page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedLink {
    /// Absolute URL, already resolved against the page's base URL
    pub href: String,

    /// Anchor text, possibly empty
    pub text: String,
}

/// Structured metadata pulled from a page's head
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageMetadata {
    pub description: Option<String>,
    pub language: Option<String>,
    pub canonical_url: Option<String>,

    /// Open Graph properties, keyed without the `og:` prefix
    #[serde(default)]
    pub open_graph: BTreeMap<String, String>,
}

impl PageMetadata {
    pub fn is_empty(&self) -> bool {
        self.description.is_none()
            && self.language.is_none()
            && self.canonical_url.is_none()
            && self.open_graph.is_empty()
    }
}

/// Everything an extractor produces for one page
#[derive(Debug, Clone, Default)]
pub struct ExtractedContent {
    pub title: Option<String>,
    pub main_text: String,
    pub markdown: String,
    pub metadata: PageMetadata,
    pub links: Vec<ExtractedLink>,
}

/// Errors an extractor implementation may surface
///
/// The engine treats these as a degradation, not a failure: the page is
/// stored with empty content and the crawl continues.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("extraction failed: {0}")]
    Failed(String),
}

/// Capability for extracting content and links from fetched HTML
pub trait ContentExtractor: Send + Sync {
    fn extract(&self, html: &str, base_url: &Url) -> Result<ExtractedContent, ExtractError>;
}
