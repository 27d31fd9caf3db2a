//! SQLite schema definition

use rusqlite::Connection;

/// Creates all tables and indexes if they do not exist
pub fn initialize_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS crawl_jobs (
            id TEXT PRIMARY KEY,
            start_url TEXT NOT NULL,
            status TEXT NOT NULL,
            options TEXT NOT NULL,
            processed_urls INTEGER NOT NULL DEFAULT 0,
            found_urls INTEGER NOT NULL DEFAULT 0,
            failed_urls TEXT NOT NULL DEFAULT '[]',
            cancel_requested INTEGER NOT NULL DEFAULT 0,
            start_time TEXT,
            end_time TEXT,
            error TEXT,
            sitemap TEXT,
            created_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_crawl_jobs_status
            ON crawl_jobs(status, created_at);

        CREATE TABLE IF NOT EXISTS scraped_pages (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            crawl_job_id TEXT NOT NULL
                REFERENCES crawl_jobs(id) ON DELETE CASCADE,
            url TEXT NOT NULL,
            parent_url TEXT,
            title TEXT,
            content TEXT,
            markdown_content TEXT,
            metadata TEXT,
            created_at TEXT NOT NULL,
            UNIQUE (crawl_job_id, url)
        );

        CREATE INDEX IF NOT EXISTS idx_scraped_pages_job
            ON scraped_pages(crawl_job_id);
        ",
    )
}
