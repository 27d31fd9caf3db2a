//! Job store trait and error types

use crate::aggregate::SitemapGraph;
use crate::job::{CrawlJob, JobStatus};
use crate::storage::{NewScrapedPage, ScrapedPage};
use thiserror::Error;
use uuid::Uuid;

/// Errors that can occur during store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Job not found: {0}")]
    JobNotFound(Uuid),

    #[error("Corrupt record for job {job_id}: {message}")]
    Corrupt { job_id: String, message: String },
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Trait for job store backends
///
/// The store is the only state shared between concurrently running jobs.
/// Every mutation here is a single atomic step from the callers' point of
/// view; in particular `claim_next_pending` is the exclusive
/// `pending -> in_progress` transition, and the counter/ledger updates are
/// safe to issue from concurrent workers of one job.
pub trait JobStore {
    // ===== Job lifecycle =====

    /// Persists a newly created pending job
    fn create_job(&mut self, job: &CrawlJob) -> StoreResult<()>;

    /// Gets a job by id
    fn get_job(&self, id: Uuid) -> StoreResult<Option<CrawlJob>>;

    /// Lists jobs, optionally filtered by status, oldest first
    fn list_jobs(&self, status: Option<JobStatus>) -> StoreResult<Vec<CrawlJob>>;

    /// Atomically claims the oldest pending job for a runner
    ///
    /// Transitions it to `in_progress` and stamps `start_time`. At most one
    /// caller can claim any given job; all others see it as already taken.
    fn claim_next_pending(&mut self) -> StoreResult<Option<CrawlJob>>;

    /// Moves a job to a terminal status and stamps `end_time`
    ///
    /// `error` is recorded only for `failed` jobs.
    fn mark_terminal(
        &mut self,
        id: Uuid,
        status: JobStatus,
        error: Option<&str>,
    ) -> StoreResult<()>;

    /// Removes a job and all of its pages
    ///
    /// Returns false if the job did not exist.
    fn delete_job(&mut self, id: Uuid) -> StoreResult<bool>;

    // ===== Cancellation =====

    /// Requests cooperative cancellation of a job
    ///
    /// Returns false if the job is already terminal.
    fn request_cancel(&mut self, id: Uuid) -> StoreResult<bool>;

    /// Checks whether cancellation has been requested for a job
    fn cancel_requested(&self, id: Uuid) -> StoreResult<bool>;

    // ===== Progress =====

    /// Appends one entry to the job's failure ledger
    fn append_failed_url(&mut self, id: Uuid, url: &str, reason: &str) -> StoreResult<()>;

    /// Atomically adds to the job's progress counters
    fn increment_counters(&mut self, id: Uuid, processed: u64, found: u64) -> StoreResult<()>;

    // ===== Pages =====

    /// Inserts a page record, returning its row id
    fn insert_page(&mut self, page: &NewScrapedPage) -> StoreResult<i64>;

    /// Gets all pages belonging to a job, in insertion order
    fn pages_for_job(&self, id: Uuid) -> StoreResult<Vec<ScrapedPage>>;

    /// Counts pages belonging to a job
    fn count_pages(&self, id: Uuid) -> StoreResult<u64>;

    // ===== Sitemap =====

    /// Stores the serialized sitemap graph for a sitemap-mode job
    fn set_sitemap(&mut self, id: Uuid, sitemap: &SitemapGraph) -> StoreResult<()>;
}
