//! Webtrawl main entry point
//!
//! Command-line interface for the crawl job engine: create and run crawl
//! jobs, inspect their status and results, cancel, and delete them.

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;
use webtrawl::aggregate::{job_output, CrawlOutput};
use webtrawl::config::{load_config, EngineConfig};
use webtrawl::crawler::{RunnerSettings, Scheduler, SchedulerSettings};
use webtrawl::extract::HtmlExtractor;
use webtrawl::fetch::{build_http_client, BrowserType, HttpFetcher, PooledFetcher};
use webtrawl::job::{CrawlJob, CrawlMode, CrawlOptions, JobStatus};
use webtrawl::storage::{JobStore, SqliteStorage};
use webtrawl::url::DomainScope;

/// Webtrawl: a bounded crawl job engine
///
/// Crawls a single site from a start URL under a bounded policy (depth,
/// domain scope, content vs. sitemap mode) and records the result as a
/// persisted job that can be inspected later.
#[derive(Parser, Debug)]
#[command(name = "webtrawl")]
#[command(version = "0.1.0")]
#[command(about = "A bounded crawl job engine", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (defaults apply if omitted)
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a crawl job and run it to a terminal status
    Crawl {
        /// Start URL of the crawl
        url: String,

        /// Maximum hop distance from the start URL
        #[arg(long, conflicts_with = "unbounded_depth")]
        max_depth: Option<u32>,

        /// Remove the depth bound entirely
        #[arg(long)]
        unbounded_depth: bool,

        /// Domain scope: strict, parent, subdomains, parent_subdomains, none
        #[arg(long, default_value = "strict")]
        scope: DomainScope,

        /// Crawl mode: content or sitemap
        #[arg(long, default_value = "content")]
        mode: CrawlMode,

        /// Render pages through a headless browser profile
        #[arg(long)]
        use_browser: bool,

        /// Browser profile: desktop or mobile
        #[arg(long, default_value = "desktop")]
        browser_type: BrowserType,

        /// Forward the configured cookie context to the fetcher
        #[arg(long)]
        use_cookies: bool,

        /// Require candidate URLs to match at least one of these patterns
        #[arg(long = "include", value_name = "REGEX")]
        include: Vec<String>,

        /// Reject candidate URLs matching any of these patterns
        #[arg(long = "exclude", value_name = "REGEX")]
        exclude: Vec<String>,

        /// Write the result payload to a file instead of stdout
        #[arg(long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Show a job's status, counters, failures, and result
    Status {
        /// Job id
        job: Uuid,
    },

    /// List jobs, optionally filtered by status
    List {
        /// Filter: pending, in_progress, completed, completed_with_errors,
        /// failed, cancelled
        #[arg(long)]
        status: Option<JobStatus>,
    },

    /// Request cooperative cancellation of a job
    Cancel {
        /// Job id
        job: Uuid,
    },

    /// Delete a job and all of its pages
    Delete {
        /// Job id
        job: Uuid,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            load_config(path).with_context(|| format!("loading {}", path.display()))?
        }
        None => EngineConfig::default(),
    };

    let store = SqliteStorage::new(std::path::Path::new(&config.storage.database_path))
        .with_context(|| format!("opening database {}", config.storage.database_path))?;
    let store = Arc::new(Mutex::new(store));

    match cli.command {
        Command::Crawl {
            url,
            max_depth,
            unbounded_depth,
            scope,
            mode,
            use_browser,
            browser_type,
            use_cookies,
            include,
            exclude,
            output,
        } => {
            let options = CrawlOptions {
                max_depth: if unbounded_depth {
                    None
                } else {
                    max_depth.or(CrawlOptions::default().max_depth)
                },
                domain_scope: scope,
                mode,
                use_browser,
                browser_type,
                use_cookies,
                include_patterns: include,
                exclude_patterns: exclude,
            };
            handle_crawl(&config, store, &url, options, output).await
        }
        Command::Status { job } => handle_status(store, job),
        Command::List { status } => handle_list(store, status),
        Command::Cancel { job } => handle_cancel(store, job),
        Command::Delete { job } => handle_delete(store, job),
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("webtrawl=info,warn"),
            1 => EnvFilter::new("webtrawl=debug,info"),
            2 => EnvFilter::new("webtrawl=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Creates one job and drives the scheduler until it is terminal
async fn handle_crawl(
    config: &EngineConfig,
    store: Arc<Mutex<SqliteStorage>>,
    url: &str,
    options: CrawlOptions,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    let job = CrawlJob::create(url, options).context("creating crawl job")?;
    let job_id = job.id;
    store.lock().unwrap().create_job(&job)?;
    tracing::info!("Created crawl job {}", job_id);

    let timeout = Duration::from_secs(config.fetcher.timeout_secs);
    let client = build_http_client(
        &config.fetcher.user_agent,
        timeout,
        Duration::from_secs(config.fetcher.connect_timeout_secs),
    )?;
    let fetcher = PooledFetcher::new(
        HttpFetcher::new(client, timeout),
        config.fetcher.pool_size as usize,
        // Leave room for connection setup before reqwest's own timeout
        timeout + Duration::from_secs(5),
    );

    let scheduler = Scheduler::new(
        Arc::clone(&store),
        Arc::new(fetcher),
        Arc::new(HtmlExtractor::new()),
        SchedulerSettings {
            max_concurrent_jobs: config.scheduler.max_concurrent_jobs as usize,
            poll_interval: Duration::from_millis(config.scheduler.poll_interval_ms),
        },
        RunnerSettings {
            workers: config.runner.workers_per_job as usize,
            progress_interval: config.runner.progress_log_interval as u64,
            cookie_context: None,
        },
    );

    scheduler.run_until_idle().await?;

    print_job(&store, job_id, output.as_deref())
}

fn handle_status(store: Arc<Mutex<SqliteStorage>>, job_id: Uuid) -> anyhow::Result<()> {
    print_job(&store, job_id, None)
}

fn handle_list(
    store: Arc<Mutex<SqliteStorage>>,
    status: Option<JobStatus>,
) -> anyhow::Result<()> {
    let jobs = store.lock().unwrap().list_jobs(status)?;
    for job in &jobs {
        println!(
            "{}  {:<21}  processed={:<6} found={:<6} failed={:<4}  {}",
            job.id,
            job.status.to_string(),
            job.processed_urls,
            job.found_urls,
            job.failed_urls.len(),
            job.start_url
        );
    }
    if jobs.is_empty() {
        println!("No jobs found");
    }
    Ok(())
}

fn handle_cancel(store: Arc<Mutex<SqliteStorage>>, job_id: Uuid) -> anyhow::Result<()> {
    let requested = store.lock().unwrap().request_cancel(job_id)?;
    if requested {
        println!("Cancellation requested for job {}", job_id);
    } else {
        println!("Job {} is already terminal or does not exist", job_id);
    }
    Ok(())
}

fn handle_delete(store: Arc<Mutex<SqliteStorage>>, job_id: Uuid) -> anyhow::Result<()> {
    if store.lock().unwrap().delete_job(job_id)? {
        println!("Deleted job {} and its pages", job_id);
    } else {
        println!("Job {} does not exist", job_id);
    }
    Ok(())
}

/// Prints the job summary to stdout, and its result payload to stdout or a
/// file
fn print_job(
    store: &Arc<Mutex<SqliteStorage>>,
    job_id: Uuid,
    output: Option<&std::path::Path>,
) -> anyhow::Result<()> {
    let (job, pages) = {
        let store = store.lock().unwrap();
        let job = store
            .get_job(job_id)?
            .with_context(|| format!("job {} not found", job_id))?;
        let pages = store.pages_for_job(job_id)?;
        (job, pages)
    };

    let summary = serde_json::json!({
        "id": job.id,
        "start_url": job.start_url,
        "status": job.status,
        "processed_urls": job.processed_urls,
        "found_urls": job.found_urls,
        "failed_urls": job.failed_urls,
        "error": job.error,
        "start_time": job.start_time,
        "end_time": job.end_time,
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);

    match job_output(&job, &pages) {
        None => {
            tracing::info!("Job {} is not terminal yet; no result payload", job_id);
        }
        Some(result) => {
            let payload = match &result {
                CrawlOutput::Tree(tree) => serde_json::to_string_pretty(tree)?,
                CrawlOutput::Sitemap(graph) => serde_json::to_string_pretty(graph)?,
            };
            match output {
                Some(path) => {
                    std::fs::write(path, payload)
                        .with_context(|| format!("writing {}", path.display()))?;
                    tracing::info!("Result written to {}", path.display());
                }
                None => println!("{}", payload),
            }
        }
    }

    Ok(())
}
