//! Per-job crawl options
//!
//! The options snapshot is captured and validated once at job creation and
//! never re-parsed during traversal. Everything here is plain data; the
//! compiled form of the pattern lists lives in
//! [`crate::url::ScopePolicy`].

pub use crate::fetch::BrowserType;
use crate::fetch::RenderMode;
use crate::url::DomainScope;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors surfaced when a job's start URL or options are invalid
#[derive(Debug, Error)]
pub enum JobOptionsError {
    #[error("Invalid start URL: {0}")]
    InvalidStartUrl(String),

    #[error("Invalid URL pattern {pattern:?}: {message}")]
    InvalidPattern { pattern: String, message: String },
}

/// What a crawl records: full page content or only the link structure
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrawlMode {
    /// Persist extracted text, markdown, and metadata for every page
    #[default]
    Content,

    /// Persist only the link graph; page bodies are discarded
    Sitemap,
}

impl CrawlMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Content => "content",
            Self::Sitemap => "sitemap",
        }
    }
}

impl fmt::Display for CrawlMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for CrawlMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "content" => Ok(Self::Content),
            "sitemap" => Ok(Self::Sitemap),
            other => Err(format!("unknown crawl mode: {}", other)),
        }
    }
}

/// Immutable options snapshot for one crawl job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlOptions {
    /// Maximum hop distance from the start URL; `None` means unbounded
    pub max_depth: Option<u32>,

    /// Host restriction for discovered links
    pub domain_scope: DomainScope,

    /// Content vs. structure-only crawl
    pub mode: CrawlMode,

    /// Render pages through a headless browser instead of plain HTTP
    pub use_browser: bool,

    /// Browser profile to render with when `use_browser` is set
    pub browser_type: BrowserType,

    /// Forward the job's cookie context to the fetcher
    pub use_cookies: bool,

    /// If non-empty, a candidate URL must match at least one pattern
    pub include_patterns: Vec<String>,

    /// A candidate URL matching any pattern is rejected
    pub exclude_patterns: Vec<String>,
}

impl Default for CrawlOptions {
    fn default() -> Self {
        Self {
            max_depth: Some(2),
            domain_scope: DomainScope::Strict,
            mode: CrawlMode::Content,
            use_browser: false,
            browser_type: BrowserType::Desktop,
            use_cookies: false,
            include_patterns: Vec::new(),
            exclude_patterns: Vec::new(),
        }
    }
}

impl CrawlOptions {
    /// Validates the options without building a full scope policy
    ///
    /// Compiles every pattern so malformed regexes are rejected at job
    /// creation rather than mid-crawl.
    pub fn validate(&self) -> Result<(), JobOptionsError> {
        for pattern in self.include_patterns.iter().chain(&self.exclude_patterns) {
            regex::Regex::new(pattern).map_err(|e| JobOptionsError::InvalidPattern {
                pattern: pattern.clone(),
                message: e.to_string(),
            })?;
        }
        Ok(())
    }

    /// The render mode the Page Fetcher should use for this job
    pub fn render_mode(&self) -> RenderMode {
        if self.use_browser {
            RenderMode::Browser(self.browser_type)
        } else {
            RenderMode::Http
        }
    }
}
