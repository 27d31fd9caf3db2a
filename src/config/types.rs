use serde::Deserialize;

/// Top-level engine configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub scheduler: SchedulerConfigSection,
    pub runner: RunnerConfigSection,
    pub fetcher: FetcherConfig,
    pub storage: StorageConfigSection,
}

/// Scheduler loop settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SchedulerConfigSection {
    /// Maximum number of jobs running at once
    #[serde(rename = "max-concurrent-jobs")]
    pub max_concurrent_jobs: u32,

    /// Milliseconds to sleep between polls when the queue is empty
    #[serde(rename = "poll-interval-ms")]
    pub poll_interval_ms: u64,
}

impl Default for SchedulerConfigSection {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: 2,
            poll_interval_ms: 2000,
        }
    }
}

/// Per-job runner settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RunnerConfigSection {
    /// Worker pool size within one job
    #[serde(rename = "workers-per-job")]
    pub workers_per_job: u32,

    /// Log crawl progress every this many processed pages
    #[serde(rename = "progress-log-interval")]
    pub progress_log_interval: u32,
}

impl Default for RunnerConfigSection {
    fn default() -> Self {
        Self {
            workers_per_job: 4,
            progress_log_interval: 10,
        }
    }
}

/// Page fetcher settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FetcherConfig {
    /// User agent sent with plain HTTP fetches
    #[serde(rename = "user-agent")]
    pub user_agent: String,

    /// Whole-request timeout in seconds
    #[serde(rename = "timeout-secs")]
    pub timeout_secs: u64,

    /// Connection establishment timeout in seconds
    #[serde(rename = "connect-timeout-secs")]
    pub connect_timeout_secs: u64,

    /// Size of the fetch-handle pool shared by all jobs
    #[serde(rename = "pool-size")]
    pub pool_size: u32,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            user_agent: "webtrawl/0.1 (+https://github.com/webtrawl)".to_string(),
            timeout_secs: 30,
            connect_timeout_secs: 10,
            pool_size: 16,
        }
    }
}

/// Storage settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfigSection {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,
}

impl Default for StorageConfigSection {
    fn default() -> Self {
        Self {
            database_path: "./webtrawl.db".to_string(),
        }
    }
}
