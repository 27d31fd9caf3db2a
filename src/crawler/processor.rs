//! Page processor: fetch, extract, persist, discover
//!
//! Processes one frontier entry end to end. Per-page failures never escape
//! this module: a failed fetch lands in the job's failure ledger and a
//! failed extraction downgrades to a partial record, while the crawl keeps
//! going. Only store faults propagate, because losing the ability to
//! persist is a whole-job problem.

use crate::aggregate::SitemapBuilder;
use crate::crawler::frontier::{FrontierEntry, UrlFrontier};
use crate::extract::{ContentExtractor, ExtractedContent};
use crate::fetch::{CookieContext, PageFetcher};
use crate::job::{CrawlJob, CrawlMode, CrawlOptions};
use crate::storage::{JobStore, NewScrapedPage};
use crate::url::{normalize_url, ScopePolicy};
use crate::TrawlError;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// What happened to one frontier entry
#[derive(Debug)]
pub enum PageOutcome {
    /// Page fetched and persisted; `enqueued` children were admitted
    Processed { enqueued: u64 },

    /// The fetch failed; recorded and skipped
    FetchFailed { reason: String },
}

/// Per-job page processing pipeline, shared across the runner's workers
pub struct PageProcessor<S: JobStore> {
    job_id: Uuid,
    options: CrawlOptions,
    policy: ScopePolicy,
    fetcher: Arc<dyn PageFetcher>,
    extractor: Arc<dyn ContentExtractor>,
    store: Arc<Mutex<S>>,
    frontier: Arc<UrlFrontier>,
    cookies: Option<CookieContext>,
    sitemap: Option<Mutex<SitemapBuilder>>,
}

impl<S: JobStore> PageProcessor<S> {
    pub fn new(
        job: &CrawlJob,
        policy: ScopePolicy,
        fetcher: Arc<dyn PageFetcher>,
        extractor: Arc<dyn ContentExtractor>,
        store: Arc<Mutex<S>>,
        frontier: Arc<UrlFrontier>,
        cookies: Option<CookieContext>,
    ) -> Self {
        let sitemap = match job.options.mode {
            CrawlMode::Sitemap => Some(Mutex::new(SitemapBuilder::new())),
            CrawlMode::Content => None,
        };

        Self {
            job_id: job.id,
            options: job.options.clone(),
            policy,
            fetcher,
            extractor,
            store,
            frontier,
            cookies,
            sitemap,
        }
    }

    /// Processes one frontier entry
    ///
    /// The processed counter is incremented exactly once per call, as the
    /// final store write on every path, so it always equals the number of
    /// entries dequeued.
    ///
    /// # Returns
    ///
    /// * `Ok(PageOutcome)` - The entry was handled, successfully or not
    /// * `Err(TrawlError)` - A store fault; the job must abort
    pub async fn process(&self, entry: FrontierEntry) -> Result<PageOutcome, TrawlError> {
        let is_root = entry.parent.is_none();
        let cookies = if self.options.use_cookies {
            self.cookies.as_ref()
        } else {
            None
        };

        tracing::debug!("Processing URL: {}", entry.url);

        let fetched = match self
            .fetcher
            .fetch(&entry.url, self.options.render_mode(), cookies)
            .await
        {
            Ok(fetched) => fetched,
            Err(e) => {
                let reason = e.to_string();
                tracing::warn!("Fetch failed for {}: {}", entry.url, reason);
                {
                    let mut store = self.store.lock().unwrap();
                    // The start URL failing is a whole-job condition; the
                    // runner records it in the job's error field instead of
                    // the per-page ledger.
                    if !is_root {
                        store.append_failed_url(self.job_id, entry.url.as_str(), &reason)?;
                    }
                    store.increment_counters(self.job_id, 1, 0)?;
                }
                return Ok(PageOutcome::FetchFailed { reason });
            }
        };

        // Relative links resolve against where the page actually came from,
        // which after redirects may differ from the requested URL.
        let extracted = match self.extractor.extract(&fetched.html, &fetched.final_url) {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!("Extraction degraded for {}: {}", entry.url, e);
                ExtractedContent::default()
            }
        };

        let record = self.build_record(&entry, &extracted);
        {
            let mut store = self.store.lock().unwrap();
            store.insert_page(&record)?;
        }

        if let Some(sitemap) = &self.sitemap {
            sitemap.lock().unwrap().add_node(entry.url.as_str());
        }

        let mut enqueued = 0u64;
        for link in &extracted.links {
            let normalized = match normalize_url(&link.href) {
                Ok(url) => url,
                Err(_) => continue,
            };
            if !self.policy.admits(&normalized) {
                continue;
            }
            if let Some(sitemap) = &self.sitemap {
                sitemap
                    .lock()
                    .unwrap()
                    .add_edge(entry.url.as_str(), normalized.as_str());
            }
            if self
                .frontier
                .enqueue(&normalized, entry.depth + 1, Some(entry.url.clone()))
            {
                enqueued += 1;
            }
        }

        {
            let mut store = self.store.lock().unwrap();
            store.increment_counters(self.job_id, 1, enqueued)?;
        }

        Ok(PageOutcome::Processed { enqueued })
    }

    fn build_record(&self, entry: &FrontierEntry, extracted: &ExtractedContent) -> NewScrapedPage {
        let parent_url = entry.parent.as_ref().map(|p| p.as_str().to_string());

        match self.options.mode {
            CrawlMode::Content => NewScrapedPage {
                crawl_job_id: self.job_id,
                url: entry.url.as_str().to_string(),
                parent_url,
                title: extracted.title.clone(),
                content: Some(extracted.main_text.clone()),
                markdown_content: Some(extracted.markdown.clone()),
                metadata: if extracted.metadata.is_empty() {
                    None
                } else {
                    Some(extracted.metadata.clone())
                },
            },
            // Structure-only crawls keep the node but drop the body.
            CrawlMode::Sitemap => NewScrapedPage {
                crawl_job_id: self.job_id,
                url: entry.url.as_str().to_string(),
                parent_url,
                title: extracted.title.clone(),
                content: None,
                markdown_content: None,
                metadata: None,
            },
        }
    }

    /// Snapshot of the sitemap accumulated so far; None for content-mode
    /// jobs
    pub fn sitemap(&self) -> Option<crate::aggregate::SitemapGraph> {
        self.sitemap
            .as_ref()
            .map(|builder| builder.lock().unwrap().build())
    }
}
