//! Job runner: drives one claimed job to a terminal status
//!
//! The runner owns the job's frontier and a bounded worker pool. The start
//! URL is processed alone first, because its failure fails the whole job;
//! after that, workers pull frontier entries concurrently. Cancellation is
//! checked at least once per dispatched page, and in-flight fetches are
//! allowed to finish before the runner transitions the job.

use crate::crawler::frontier::UrlFrontier;
use crate::crawler::processor::{PageOutcome, PageProcessor};
use crate::extract::ContentExtractor;
use crate::fetch::{CookieContext, PageFetcher};
use crate::job::{CrawlJob, JobStatus};
use crate::storage::{JobStore, StoreError};
use crate::url::ScopePolicy;
use crate::TrawlError;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use uuid::Uuid;

/// Tunables for one runner
#[derive(Debug, Clone)]
pub struct RunnerSettings {
    /// Worker pool size: how many pages of one job may be in flight at once
    pub workers: usize,

    /// Log crawl progress every this many processed pages
    pub progress_interval: u64,

    /// Cookie context handed to the fetcher for jobs with `use_cookies`
    pub cookie_context: Option<CookieContext>,
}

impl Default for RunnerSettings {
    fn default() -> Self {
        Self {
            workers: 4,
            progress_interval: 10,
            cookie_context: None,
        }
    }
}

/// Drives claimed jobs through the crawl loop
pub struct JobRunner<S: JobStore + Send + 'static> {
    store: Arc<Mutex<S>>,
    fetcher: Arc<dyn PageFetcher>,
    extractor: Arc<dyn ContentExtractor>,
    settings: RunnerSettings,
}

impl<S: JobStore + Send + 'static> JobRunner<S> {
    pub fn new(
        store: Arc<Mutex<S>>,
        fetcher: Arc<dyn PageFetcher>,
        extractor: Arc<dyn ContentExtractor>,
        settings: RunnerSettings,
    ) -> Self {
        Self {
            store,
            fetcher,
            extractor,
            settings,
        }
    }

    /// Runs one already-claimed job to a terminal status
    ///
    /// Internal faults are converted into a `failed` job here so the record
    /// always ends terminal; the error only propagates if even that final
    /// write is impossible.
    ///
    /// # Arguments
    ///
    /// * `job` - A job in `in_progress` status, claimed by this runner
    ///
    /// # Returns
    ///
    /// The terminal status the job reached
    pub async fn run(&self, job: CrawlJob) -> crate::Result<JobStatus> {
        let job_id = job.id;
        tracing::info!("Starting crawl job {} at {}", job_id, job.start_url);

        match self.drive(&job).await {
            Ok(status) => {
                tracing::info!("Crawl job {} finished: {}", job_id, status);
                Ok(status)
            }
            Err(e) => {
                let message = format!("internal error: {}", e);
                tracing::error!("Crawl job {} aborted: {}", job_id, message);
                let mut store = self.store.lock().unwrap();
                store.mark_terminal(job_id, JobStatus::Failed, Some(&message))?;
                Ok(JobStatus::Failed)
            }
        }
    }

    async fn drive(&self, job: &CrawlJob) -> crate::Result<JobStatus> {
        let policy = ScopePolicy::for_job(&job.start_url, &job.options)?;

        let frontier = Arc::new(UrlFrontier::new(job.options.max_depth));
        if !frontier.enqueue(&job.start_url, 0, None) {
            return Err(TrawlError::Internal(format!(
                "start URL {} could not be admitted to the frontier",
                job.start_url
            )));
        }

        let processor = Arc::new(PageProcessor::new(
            job,
            policy,
            Arc::clone(&self.fetcher),
            Arc::clone(&self.extractor),
            Arc::clone(&self.store),
            Arc::clone(&frontier),
            self.settings.cookie_context.clone(),
        ));

        if self.cancel_requested(job.id)? {
            return self.finish(job.id, JobStatus::Cancelled, &processor);
        }

        // The start URL is processed before the pool spins up: there is
        // nothing to traverse if it cannot be fetched.
        let root = frontier.dequeue().ok_or_else(|| {
            TrawlError::Internal("frontier lost the start entry".to_string())
        })?;
        if let PageOutcome::FetchFailed { reason } = processor.process(root).await? {
            let message = format!("start URL could not be fetched: {}", reason);
            let mut store = self.store.lock().unwrap();
            store.mark_terminal(job.id, JobStatus::Failed, Some(&message))?;
            return Ok(JobStatus::Failed);
        }

        let started = Instant::now();
        let semaphore = Arc::new(Semaphore::new(self.settings.workers.max(1)));
        let mut tasks: JoinSet<crate::Result<PageOutcome>> = JoinSet::new();
        let mut processed_pages: u64 = 1;
        let mut cancelled = false;
        let mut fault: Option<TrawlError> = None;

        'dispatch: loop {
            // Wait for worker capacity before looking at the frontier, so
            // the cancellation checkpoint runs between every dispatch.
            let permit = Arc::clone(&semaphore)
                .acquire_owned()
                .await
                .map_err(|_| TrawlError::Internal("worker pool closed".to_string()))?;

            while let Some(joined) = tasks.try_join_next() {
                match flatten(joined) {
                    Ok(_) => {
                        processed_pages += 1;
                        self.log_progress(job.id, processed_pages, frontier.len(), started);
                    }
                    Err(e) => {
                        fault = Some(e);
                        break 'dispatch;
                    }
                }
            }

            if self.cancel_requested(job.id)? {
                cancelled = true;
                break;
            }

            match frontier.dequeue() {
                Some(entry) => {
                    let processor = Arc::clone(&processor);
                    tasks.spawn(async move {
                        let result = processor.process(entry).await;
                        drop(permit);
                        result
                    });
                }
                None => {
                    drop(permit);
                    // Nothing queued, but an in-flight worker may still
                    // discover more; wait for one to finish.
                    match tasks.join_next().await {
                        Some(joined) => match flatten(joined) {
                            Ok(_) => {
                                processed_pages += 1;
                                self.log_progress(
                                    job.id,
                                    processed_pages,
                                    frontier.len(),
                                    started,
                                );
                            }
                            Err(e) => {
                                fault = Some(e);
                                break;
                            }
                        },
                        None => break,
                    }
                }
            }
        }

        // Cooperative wind-down: in-flight fetches finish and are counted.
        while let Some(joined) = tasks.join_next().await {
            match flatten(joined) {
                Ok(_) => processed_pages += 1,
                Err(e) => {
                    if fault.is_none() {
                        fault = Some(e);
                    }
                }
            }
        }

        if let Some(e) = fault {
            return Err(e);
        }

        if cancelled {
            return self.finish(job.id, JobStatus::Cancelled, &processor);
        }

        let status = {
            let store = self.store.lock().unwrap();
            let current = store
                .get_job(job.id)?
                .ok_or(StoreError::JobNotFound(job.id))?;
            if current.failed_urls.is_empty() {
                JobStatus::Completed
            } else {
                JobStatus::CompletedWithErrors
            }
        };
        self.finish(job.id, status, &processor)
    }

    /// Persists the sitemap (when there is one) and moves the job to its
    /// terminal status
    fn finish(
        &self,
        job_id: Uuid,
        status: JobStatus,
        processor: &PageProcessor<S>,
    ) -> crate::Result<JobStatus> {
        let mut store = self.store.lock().unwrap();
        if let Some(sitemap) = processor.sitemap() {
            store.set_sitemap(job_id, &sitemap)?;
        }
        store.mark_terminal(job_id, status, None)?;
        Ok(status)
    }

    fn cancel_requested(&self, job_id: Uuid) -> crate::Result<bool> {
        let store = self.store.lock().unwrap();
        Ok(store.cancel_requested(job_id)?)
    }

    fn log_progress(&self, job_id: Uuid, processed: u64, frontier_len: usize, started: Instant) {
        if processed % self.settings.progress_interval.max(1) == 0 {
            let rate = processed as f64 / started.elapsed().as_secs_f64().max(f64::EPSILON);
            tracing::info!(
                "Job {}: {} pages processed, {} in frontier, {:.2} pages/sec",
                job_id,
                processed,
                frontier_len,
                rate
            );
        }
    }
}

fn flatten(
    joined: Result<crate::Result<PageOutcome>, tokio::task::JoinError>,
) -> crate::Result<PageOutcome> {
    match joined {
        Ok(result) => result,
        Err(e) => Err(TrawlError::Internal(format!("worker task failed: {}", e))),
    }
}
