//! HTTP page fetcher
//!
//! The plain-HTTP implementation of the [`PageFetcher`] capability, built on
//! reqwest. Handles error classification (timeout vs. connect vs. HTTP
//! status vs. body read) so the engine only ever sees [`FetchError`] values.
//! When asked for a browser render mode it degrades to a plain request with
//! the matching browser user-agent string, since no JavaScript runtime is
//! available on this path.

use crate::fetch::{
    BrowserType, CookieContext, FetchError, FetchedPage, PageFetcher, RenderMode,
};
use reqwest::header::{HeaderValue, COOKIE, USER_AGENT};
use reqwest::Client;
use std::time::Duration;
use url::Url;

const DESKTOP_UA: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36";
const MOBILE_UA: &str =
    "Mozilla/5.0 (Linux; Android 14; Pixel 8) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Mobile Safari/537.36";

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `user_agent` - Default user agent string for requests
/// * `timeout` - Whole-request timeout
/// * `connect_timeout` - Connection establishment timeout
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(
    user_agent: &str,
    timeout: Duration,
    connect_timeout: Duration,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent)
        .timeout(timeout)
        .connect_timeout(connect_timeout)
        .gzip(true)
        .brotli(true)
        .build()
}

/// Plain-HTTP page fetcher
pub struct HttpFetcher {
    client: Client,
    timeout: Duration,
}

impl HttpFetcher {
    pub fn new(client: Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    /// Convenience constructor with a freshly built client
    pub fn with_defaults(user_agent: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = build_http_client(user_agent, timeout, Duration::from_secs(10))?;
        Ok(Self::new(client, timeout))
    }
}

#[async_trait::async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(
        &self,
        url: &Url,
        mode: RenderMode,
        cookies: Option<&CookieContext>,
    ) -> Result<FetchedPage, FetchError> {
        let mut request = self.client.get(url.clone());

        if let RenderMode::Browser(browser) = mode {
            let ua = match browser {
                BrowserType::Desktop => DESKTOP_UA,
                BrowserType::Mobile => MOBILE_UA,
            };
            request = request.header(USER_AGENT, ua);
        }

        if let Some(ctx) = cookies {
            if !ctx.cookies.is_empty() {
                let value = HeaderValue::from_str(&ctx.header_value())
                    .map_err(|e| FetchError::Other(format!("invalid cookie header: {}", e)))?;
                request = request.header(COOKIE, value);
            }
        }

        let response = request.send().await.map_err(|e| classify_error(e, self.timeout))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        // An empty content type is given the benefit of the doubt; anything
        // explicitly non-HTML is not a page we can traverse.
        if !content_type.is_empty()
            && !content_type.contains("text/html")
            && !content_type.contains("application/xhtml")
        {
            return Err(FetchError::UnsupportedContentType(content_type));
        }

        let final_url = response.url().clone();
        let html = response
            .text()
            .await
            .map_err(|e| FetchError::Body(e.to_string()))?;

        Ok(FetchedPage { html, final_url })
    }
}

fn classify_error(e: reqwest::Error, timeout: Duration) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout(timeout)
    } else if e.is_connect() {
        FetchError::Connect(e.to_string())
    } else if let Some(status) = e.status() {
        FetchError::Status(status.as_u16())
    } else {
        FetchError::Other(e.to_string())
    }
}
