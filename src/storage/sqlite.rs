//! SQLite job store implementation

use crate::aggregate::SitemapGraph;
use crate::job::{CrawlJob, CrawlOptions, FailedUrl, JobStatus};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{JobStore, StoreError, StoreResult};
use crate::storage::{NewScrapedPage, ScrapedPage};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use url::Url;
use uuid::Uuid;

/// SQLite store backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(StoreError)` - Failed to open database
    pub fn new(path: &Path) -> StoreResult<Self> {
        let conn = Connection::open(path)?;

        // Configure SQLite for better performance
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory store, used by tests and ephemeral runs
    pub fn new_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

/// Raw job row before JSON columns are decoded
struct JobRow {
    id: String,
    start_url: String,
    status: String,
    options: String,
    processed_urls: i64,
    found_urls: i64,
    failed_urls: String,
    start_time: Option<String>,
    end_time: Option<String>,
    error: Option<String>,
    sitemap: Option<String>,
    created_at: String,
}

const JOB_COLUMNS: &str = "id, start_url, status, options, processed_urls, found_urls, \
     failed_urls, start_time, end_time, error, sitemap, created_at";

fn read_job_row(row: &Row) -> rusqlite::Result<JobRow> {
    Ok(JobRow {
        id: row.get(0)?,
        start_url: row.get(1)?,
        status: row.get(2)?,
        options: row.get(3)?,
        processed_urls: row.get(4)?,
        found_urls: row.get(5)?,
        failed_urls: row.get(6)?,
        start_time: row.get(7)?,
        end_time: row.get(8)?,
        error: row.get(9)?,
        sitemap: row.get(10)?,
        created_at: row.get(11)?,
    })
}

impl JobRow {
    fn into_job(self) -> StoreResult<CrawlJob> {
        let corrupt = |message: String| StoreError::Corrupt {
            job_id: self.id.clone(),
            message,
        };

        let id = Uuid::parse_str(&self.id)
            .map_err(|e| corrupt(format!("bad job id: {}", e)))?;
        let start_url = Url::parse(&self.start_url)
            .map_err(|e| corrupt(format!("bad start URL: {}", e)))?;
        let status = JobStatus::from_db_string(&self.status)
            .ok_or_else(|| corrupt(format!("unknown status: {}", self.status)))?;
        let options: CrawlOptions = serde_json::from_str(&self.options)?;
        let failed_urls: Vec<FailedUrl> = serde_json::from_str(&self.failed_urls)?;
        let sitemap: Option<SitemapGraph> = match &self.sitemap {
            Some(json) => Some(serde_json::from_str(json)?),
            None => None,
        };

        Ok(CrawlJob {
            id,
            start_url,
            status,
            options,
            processed_urls: self.processed_urls.max(0) as u64,
            found_urls: self.found_urls.max(0) as u64,
            failed_urls,
            start_time: parse_timestamp(self.start_time.as_deref(), &self.id)?,
            end_time: parse_timestamp(self.end_time.as_deref(), &self.id)?,
            error: self.error,
            sitemap,
            created_at: parse_timestamp(Some(&self.created_at), &self.id)?
                .unwrap_or_else(Utc::now),
        })
    }
}

fn parse_timestamp(value: Option<&str>, job_id: &str) -> StoreResult<Option<DateTime<Utc>>> {
    match value {
        None => Ok(None),
        Some(s) => DateTime::parse_from_rfc3339(s)
            .map(|d| Some(d.with_timezone(&Utc)))
            .map_err(|e| StoreError::Corrupt {
                job_id: job_id.to_string(),
                message: format!("bad timestamp {:?}: {}", s, e),
            }),
    }
}

fn read_page_row(row: &Row) -> rusqlite::Result<(i64, String, String, Option<String>, Option<String>, Option<String>, Option<String>, Option<String>, String)>
{
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
        row.get(7)?,
        row.get(8)?,
    ))
}

impl JobStore for SqliteStorage {
    // ===== Job lifecycle =====

    fn create_job(&mut self, job: &CrawlJob) -> StoreResult<()> {
        let options = serde_json::to_string(&job.options)?;
        let failed_urls = serde_json::to_string(&job.failed_urls)?;

        self.conn.execute(
            "INSERT INTO crawl_jobs
                (id, start_url, status, options, processed_urls, found_urls,
                 failed_urls, cancel_requested, start_time, end_time, error,
                 sitemap, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0, ?8, ?9, ?10, NULL, ?11)",
            params![
                job.id.to_string(),
                job.start_url.as_str(),
                job.status.to_db_string(),
                options,
                job.processed_urls as i64,
                job.found_urls as i64,
                failed_urls,
                job.start_time.map(|t| t.to_rfc3339()),
                job.end_time.map(|t| t.to_rfc3339()),
                job.error,
                job.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn get_job(&self, id: Uuid) -> StoreResult<Option<CrawlJob>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM crawl_jobs WHERE id = ?1",
            JOB_COLUMNS
        ))?;

        let row = stmt
            .query_row(params![id.to_string()], read_job_row)
            .optional()?;

        match row {
            Some(row) => Ok(Some(row.into_job()?)),
            None => Ok(None),
        }
    }

    fn list_jobs(&self, status: Option<JobStatus>) -> StoreResult<Vec<CrawlJob>> {
        let mut jobs = Vec::new();

        match status {
            Some(status) => {
                let mut stmt = self.conn.prepare(&format!(
                    "SELECT {} FROM crawl_jobs WHERE status = ?1 ORDER BY created_at, id",
                    JOB_COLUMNS
                ))?;
                let rows = stmt.query_map(params![status.to_db_string()], read_job_row)?;
                for row in rows {
                    jobs.push(row?.into_job()?);
                }
            }
            None => {
                let mut stmt = self.conn.prepare(&format!(
                    "SELECT {} FROM crawl_jobs ORDER BY created_at, id",
                    JOB_COLUMNS
                ))?;
                let rows = stmt.query_map([], read_job_row)?;
                for row in rows {
                    jobs.push(row?.into_job()?);
                }
            }
        }

        Ok(jobs)
    }

    fn claim_next_pending(&mut self) -> StoreResult<Option<CrawlJob>> {
        let claimed_id = {
            let tx = self.conn.transaction()?;

            let id: Option<String> = tx
                .query_row(
                    "SELECT id FROM crawl_jobs WHERE status = 'pending'
                     ORDER BY created_at, id LIMIT 1",
                    [],
                    |row| row.get(0),
                )
                .optional()?;

            let claimed = match id {
                None => None,
                Some(id) => {
                    let now = Utc::now().to_rfc3339();
                    let updated = tx.execute(
                        "UPDATE crawl_jobs
                         SET status = 'in_progress', start_time = ?1
                         WHERE id = ?2 AND status = 'pending'",
                        params![now, id],
                    )?;
                    if updated == 1 {
                        Some(id)
                    } else {
                        None
                    }
                }
            };

            tx.commit()?;
            claimed
        };

        match claimed_id {
            None => Ok(None),
            Some(id) => {
                let uuid = Uuid::parse_str(&id).map_err(|e| StoreError::Corrupt {
                    job_id: id.clone(),
                    message: format!("bad job id: {}", e),
                })?;
                self.get_job(uuid)
            }
        }
    }

    fn mark_terminal(
        &mut self,
        id: Uuid,
        status: JobStatus,
        error: Option<&str>,
    ) -> StoreResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE crawl_jobs SET status = ?1, end_time = ?2, error = ?3 WHERE id = ?4",
            params![status.to_db_string(), now, error, id.to_string()],
        )?;
        if updated == 0 {
            return Err(StoreError::JobNotFound(id));
        }
        Ok(())
    }

    fn delete_job(&mut self, id: Uuid) -> StoreResult<bool> {
        let deleted = self.conn.execute(
            "DELETE FROM crawl_jobs WHERE id = ?1",
            params![id.to_string()],
        )?;
        Ok(deleted > 0)
    }

    // ===== Cancellation =====

    fn request_cancel(&mut self, id: Uuid) -> StoreResult<bool> {
        let updated = self.conn.execute(
            "UPDATE crawl_jobs SET cancel_requested = 1
             WHERE id = ?1 AND status IN ('pending', 'in_progress')",
            params![id.to_string()],
        )?;
        Ok(updated > 0)
    }

    fn cancel_requested(&self, id: Uuid) -> StoreResult<bool> {
        let flag: Option<i64> = self
            .conn
            .query_row(
                "SELECT cancel_requested FROM crawl_jobs WHERE id = ?1",
                params![id.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        match flag {
            None => Err(StoreError::JobNotFound(id)),
            Some(value) => Ok(value != 0),
        }
    }

    // ===== Progress =====

    fn append_failed_url(&mut self, id: Uuid, url: &str, reason: &str) -> StoreResult<()> {
        let tx = self.conn.transaction()?;

        let existing: Option<String> = tx
            .query_row(
                "SELECT failed_urls FROM crawl_jobs WHERE id = ?1",
                params![id.to_string()],
                |row| row.get(0),
            )
            .optional()?;

        let json = existing.ok_or(StoreError::JobNotFound(id))?;
        let mut failed: Vec<FailedUrl> = serde_json::from_str(&json)?;
        failed.push(FailedUrl {
            url: url.to_string(),
            reason: reason.to_string(),
        });

        tx.execute(
            "UPDATE crawl_jobs SET failed_urls = ?1 WHERE id = ?2",
            params![serde_json::to_string(&failed)?, id.to_string()],
        )?;

        tx.commit()?;
        Ok(())
    }

    fn increment_counters(&mut self, id: Uuid, processed: u64, found: u64) -> StoreResult<()> {
        let updated = self.conn.execute(
            "UPDATE crawl_jobs
             SET processed_urls = processed_urls + ?1,
                 found_urls = found_urls + ?2
             WHERE id = ?3",
            params![processed as i64, found as i64, id.to_string()],
        )?;
        if updated == 0 {
            return Err(StoreError::JobNotFound(id));
        }
        Ok(())
    }

    // ===== Pages =====

    fn insert_page(&mut self, page: &NewScrapedPage) -> StoreResult<i64> {
        let metadata = match &page.metadata {
            Some(m) => Some(serde_json::to_string(m)?),
            None => None,
        };

        self.conn.execute(
            "INSERT INTO scraped_pages
                (crawl_job_id, url, parent_url, title, content,
                 markdown_content, metadata, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                page.crawl_job_id.to_string(),
                page.url,
                page.parent_url,
                page.title,
                page.content,
                page.markdown_content,
                metadata,
                Utc::now().to_rfc3339(),
            ],
        )?;

        Ok(self.conn.last_insert_rowid())
    }

    fn pages_for_job(&self, id: Uuid) -> StoreResult<Vec<ScrapedPage>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, crawl_job_id, url, parent_url, title, content,
                    markdown_content, metadata, created_at
             FROM scraped_pages WHERE crawl_job_id = ?1 ORDER BY id",
        )?;

        let rows = stmt.query_map(params![id.to_string()], read_page_row)?;

        let mut pages = Vec::new();
        for row in rows {
            let (row_id, job_id, url, parent_url, title, content, markdown, metadata, created_at) =
                row?;
            let corrupt = |message: String| StoreError::Corrupt {
                job_id: job_id.clone(),
                message,
            };
            pages.push(ScrapedPage {
                id: row_id,
                crawl_job_id: Uuid::parse_str(&job_id)
                    .map_err(|e| corrupt(format!("bad job id: {}", e)))?,
                url,
                parent_url,
                title,
                content,
                markdown_content: markdown,
                metadata: match metadata {
                    Some(json) => Some(serde_json::from_str(&json)?),
                    None => None,
                },
                created_at: parse_timestamp(Some(&created_at), &job_id)?
                    .unwrap_or_else(Utc::now),
            });
        }

        Ok(pages)
    }

    fn count_pages(&self, id: Uuid) -> StoreResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM scraped_pages WHERE crawl_job_id = ?1",
            params![id.to_string()],
            |row| row.get(0),
        )?;
        Ok(count.max(0) as u64)
    }

    // ===== Sitemap =====

    fn set_sitemap(&mut self, id: Uuid, sitemap: &SitemapGraph) -> StoreResult<()> {
        let json = serde_json::to_string(sitemap)?;
        let updated = self.conn.execute(
            "UPDATE crawl_jobs SET sitemap = ?1 WHERE id = ?2",
            params![json, id.to_string()],
        )?;
        if updated == 0 {
            return Err(StoreError::JobNotFound(id));
        }
        Ok(())
    }
}
