//! Crawl job model
//!
//! A [`CrawlJob`] is one crawl request and its running state: the immutable
//! start URL and options snapshot, the live counters, the failure ledger,
//! and the lifecycle status. Jobs are created `pending`, claimed exclusively
//! by one runner, and mutated only by that runner until they reach a
//! terminal status.

mod options;
mod status;

pub use options::{BrowserType, CrawlMode, CrawlOptions, JobOptionsError};
pub use status::JobStatus;

use crate::aggregate::SitemapGraph;
use crate::url::normalize_url;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

/// One URL that could not be fetched during a crawl, with the reason
///
/// The failure ledger is append-only: entries are never removed or revised.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedUrl {
    pub url: String,
    pub reason: String,
}

/// One crawl request and its running state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlJob {
    /// Opaque job id, generated at creation
    pub id: Uuid,

    /// The crawl origin; immutable after creation
    pub start_url: Url,

    pub status: JobStatus,

    /// Immutable options snapshot captured at creation
    pub options: CrawlOptions,

    /// Number of frontier entries processed so far; monotonically
    /// non-decreasing
    pub processed_urls: u64,

    /// Number of links admitted into the frontier so far; monotonically
    /// non-decreasing
    pub found_urls: u64,

    /// Ordered ledger of per-page fetch failures
    pub failed_urls: Vec<FailedUrl>,

    /// Set when a runner claims the job
    pub start_time: Option<DateTime<Utc>>,

    /// Set when the job reaches a terminal status
    pub end_time: Option<DateTime<Utc>>,

    /// Fatal error message; populated only when the status is `failed`
    pub error: Option<String>,

    /// Structural graph of the crawl; present only for sitemap-mode jobs
    pub sitemap: Option<SitemapGraph>,

    pub created_at: DateTime<Utc>,
}

impl CrawlJob {
    /// Creates a new pending job, validating the start URL and options once
    ///
    /// The start URL is normalized here so the persisted origin matches the
    /// frontier's first entry, and every include/exclude pattern is compiled
    /// to surface bad regexes at creation instead of mid-crawl.
    ///
    /// # Arguments
    ///
    /// * `start_url` - The crawl origin
    /// * `options` - The options snapshot to capture
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlJob)` - A pending job ready to be persisted
    /// * `Err(JobOptionsError)` - Invalid start URL or options
    pub fn create(start_url: &str, options: CrawlOptions) -> Result<Self, JobOptionsError> {
        let start_url = normalize_url(start_url)
            .map_err(|e| JobOptionsError::InvalidStartUrl(format!("{}: {}", start_url, e)))?;
        options.validate()?;

        Ok(Self {
            id: Uuid::new_v4(),
            start_url,
            status: JobStatus::Pending,
            options,
            processed_urls: 0,
            found_urls: 0,
            failed_urls: Vec::new(),
            start_time: None,
            end_time: None,
            error: None,
            sitemap: None,
            created_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::url::DomainScope;

    #[test]
    fn test_create_normalizes_start_url() {
        let job = CrawlJob::create("HTTP://EXAMPLE.COM:80/#frag", CrawlOptions::default()).unwrap();
        assert_eq!(job.start_url.as_str(), "http://example.com/");
    }

    #[test]
    fn test_create_starts_pending_with_zero_counters() {
        let job = CrawlJob::create("https://example.com/", CrawlOptions::default()).unwrap();
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.processed_urls, 0);
        assert_eq!(job.found_urls, 0);
        assert!(job.failed_urls.is_empty());
        assert!(job.start_time.is_none());
        assert!(job.end_time.is_none());
        assert!(job.error.is_none());
        assert!(job.sitemap.is_none());
    }

    #[test]
    fn test_create_rejects_invalid_start_url() {
        let result = CrawlJob::create("not a url", CrawlOptions::default());
        assert!(matches!(result, Err(JobOptionsError::InvalidStartUrl(_))));
    }

    #[test]
    fn test_create_rejects_non_http_start_url() {
        let result = CrawlJob::create("ftp://example.com/", CrawlOptions::default());
        assert!(matches!(result, Err(JobOptionsError::InvalidStartUrl(_))));
    }

    #[test]
    fn test_create_rejects_invalid_pattern() {
        let options = CrawlOptions {
            exclude_patterns: vec!["(unclosed".to_string()],
            ..CrawlOptions::default()
        };
        let result = CrawlJob::create("https://example.com/", options);
        assert!(matches!(result, Err(JobOptionsError::InvalidPattern { .. })));
    }

    #[test]
    fn test_ids_are_unique() {
        let a = CrawlJob::create("https://example.com/", CrawlOptions::default()).unwrap();
        let b = CrawlJob::create("https://example.com/", CrawlOptions::default()).unwrap();
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_job_serde_roundtrip() {
        let options = CrawlOptions {
            max_depth: Some(3),
            domain_scope: DomainScope::Subdomains,
            ..CrawlOptions::default()
        };
        let job = CrawlJob::create("https://example.com/", options).unwrap();
        let json = serde_json::to_string(&job).unwrap();
        let back: CrawlJob = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, job.id);
        assert_eq!(back.start_url, job.start_url);
        assert_eq!(back.options, job.options);
        assert_eq!(back.status, JobStatus::Pending);
    }
}
