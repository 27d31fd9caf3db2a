//! Webtrawl: a bounded crawl job engine
//!
//! This crate implements the traversal core of a website crawler: given a
//! start URL and a bounded policy (depth, domain scope, content vs. sitemap
//! mode, rendering mode), it discovers, fetches, and records a bounded
//! subgraph of a site while reporting live progress and surviving partial
//! failure. Page fetching and content extraction are injected capabilities,
//! and every crawl is tracked as a persisted job a client can poll.

pub mod aggregate;
pub mod config;
pub mod crawler;
pub mod extract;
pub mod fetch;
pub mod job;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for Webtrawl operations
#[derive(Debug, Error)]
pub enum TrawlError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid job options: {0}")]
    Options(#[from] job::JobOptionsError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StoreError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL")]
    MissingHost,
}

/// Result type alias for Webtrawl operations
pub type Result<T> = std::result::Result<T, TrawlError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::EngineConfig;
pub use job::{CrawlJob, CrawlMode, CrawlOptions, JobStatus};
pub use url::{normalize_url, DomainScope, ScopePolicy};
