//! Page fetching capability
//!
//! The engine never fetches pages itself: it consumes a [`PageFetcher`],
//! injected at startup. A fetcher applies its own timeout and returns
//! ordinary network failures as [`FetchError`] values, never panics. The
//! [`PooledFetcher`] wrapper adds scoped acquisition of a bounded pool of
//! fetch handles, which is how browser tabs are kept from leaking across
//! thousands of crawled pages.

mod http;
mod pool;

pub use http::{build_http_client, HttpFetcher};
pub use pool::PooledFetcher;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Browser profile used when rendering through a headless browser
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BrowserType {
    #[default]
    Desktop,
    Mobile,
}

impl fmt::Display for BrowserType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Desktop => write!(f, "desktop"),
            Self::Mobile => write!(f, "mobile"),
        }
    }
}

impl std::str::FromStr for BrowserType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "desktop" => Ok(Self::Desktop),
            "mobile" => Ok(Self::Mobile),
            other => Err(format!("unknown browser type: {}", other)),
        }
    }
}

/// How a page should be rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    /// Plain HTTP request, no JavaScript execution
    Http,

    /// Headless-browser navigation with the given profile
    Browser(BrowserType),
}

/// One cookie forwarded to the fetcher
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    pub name: String,
    pub value: String,
}

/// Cookie context a job may carry into every fetch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CookieContext {
    pub cookies: Vec<Cookie>,
}

impl CookieContext {
    /// Renders the context as a `Cookie` request header value
    pub fn header_value(&self) -> String {
        self.cookies
            .iter()
            .map(|c| format!("{}={}", c.name, c.value))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// A successfully fetched page
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Raw HTML body
    pub html: String,

    /// Final URL after redirects
    pub final_url: Url,
}

/// A failed fetch, classified
///
/// Every variant is non-fatal at the job level: the page is recorded in the
/// job's failure ledger and the crawl continues.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("HTTP status {0}")]
    Status(u16),

    #[error("unsupported content type: {0}")]
    UnsupportedContentType(String),

    #[error("failed to read response body: {0}")]
    Body(String),

    #[error("{0}")]
    Other(String),
}

/// Capability for fetching a single page
///
/// Implementations must apply their own timeout and must not panic for
/// ordinary network failures.
#[async_trait::async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(
        &self,
        url: &Url,
        mode: RenderMode,
        cookies: Option<&CookieContext>,
    ) -> Result<FetchedPage, FetchError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cookie_header_value() {
        let ctx = CookieContext {
            cookies: vec![
                Cookie {
                    name: "session".to_string(),
                    value: "abc123".to_string(),
                },
                Cookie {
                    name: "theme".to_string(),
                    value: "dark".to_string(),
                },
            ],
        };
        assert_eq!(ctx.header_value(), "session=abc123; theme=dark");
    }

    #[test]
    fn test_empty_cookie_header_value() {
        assert_eq!(CookieContext::default().header_value(), "");
    }

    #[test]
    fn test_browser_type_from_str() {
        assert_eq!("mobile".parse::<BrowserType>().unwrap(), BrowserType::Mobile);
        assert!("tablet".parse::<BrowserType>().is_err());
    }
}
