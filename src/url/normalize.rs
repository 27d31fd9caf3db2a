use crate::{UrlError, UrlResult};
use url::Url;

/// Normalizes a URL into the canonical form used for visited-set lookups
///
/// # Normalization Steps
///
/// 1. Parse the URL; reject if malformed or relative
/// 2. Reject schemes other than HTTP and HTTPS
/// 3. Lowercase the scheme and host (the WHATWG parser does this on parse)
/// 4. Strip default ports (`:80` for http, `:443` for https)
/// 5. Collapse `.` and `..` path segments
/// 6. Remove the fragment (everything after `#`)
///
/// Two URLs that normalize identically name the same crawl node. Query
/// strings are preserved as-is: `/page?a=1` and `/page?a=2` are distinct
/// pages.
///
/// # Arguments
///
/// * `url_str` - The URL string to normalize
///
/// # Returns
///
/// * `Ok(Url)` - Normalized URL
/// * `Err(UrlError)` - Failed to parse or normalize the URL
///
/// # Examples
///
/// ```
/// use webtrawl::url::normalize_url;
///
/// let url = normalize_url("HTTP://EXAMPLE.COM:80/a/../b#section").unwrap();
/// assert_eq!(url.as_str(), "http://example.com/b");
/// ```
pub fn normalize_url(url_str: &str) -> UrlResult<Url> {
    let mut url = Url::parse(url_str).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    if url.host_str().is_none() {
        return Err(UrlError::MissingHost);
    }

    // Lowercasing of scheme/host, default-port stripping, and dot-segment
    // collapsing are performed by the WHATWG parser itself. The fragment is
    // the one piece it keeps that the visited-set must not see.
    url.set_fragment(None);

    Ok(url)
}
