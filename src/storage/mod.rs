//! Job store: persistence for crawl jobs and their pages
//!
//! This module owns everything the engine persists: the job table with its
//! status, counters, and failure ledger, and the page table holding one row
//! per fetched URL. The [`JobStore`] trait is the seam the runner and
//! scheduler talk through; [`SqliteStorage`] is the shipped backend.

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{JobStore, StoreError, StoreResult};

use crate::extract::PageMetadata;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One fetched, extracted page belonging to a job
///
/// Created exactly once per distinct normalized URL per job; immutable once
/// written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapedPage {
    pub id: i64,

    /// The owning job
    pub crawl_job_id: Uuid,

    /// Normalized URL; unique within the job
    pub url: String,

    /// The frontier entry that discovered this page; None for the start URL
    pub parent_url: Option<String>,

    pub title: Option<String>,

    /// Extracted main text; None for sitemap-mode pages and partial records
    pub content: Option<String>,

    /// Markdown rendition; None for sitemap-mode pages and partial records
    pub markdown_content: Option<String>,

    /// Structured extraction result
    pub metadata: Option<PageMetadata>,

    pub created_at: DateTime<Utc>,
}

/// A page record about to be inserted
#[derive(Debug, Clone)]
pub struct NewScrapedPage {
    pub crawl_job_id: Uuid,
    pub url: String,
    pub parent_url: Option<String>,
    pub title: Option<String>,
    pub content: Option<String>,
    pub markdown_content: Option<String>,
    pub metadata: Option<PageMetadata>,
}
