//! Integration tests for the crawl job engine
//!
//! These tests use wiremock to stand up a real HTTP server and drive full
//! crawl jobs through the scheduler, the worker pool, the HTTP fetcher, and
//! a SQLite store on disk.

use std::sync::{Arc, Mutex};
use std::time::Duration;
use url::Url;
use webtrawl::aggregate::{job_output, CrawlOutput};
use webtrawl::crawler::{RunnerSettings, Scheduler, SchedulerSettings};
use webtrawl::extract::HtmlExtractor;
use webtrawl::fetch::{HttpFetcher, PageFetcher, PooledFetcher};
use webtrawl::job::{CrawlJob, CrawlMode, CrawlOptions, JobStatus};
use webtrawl::storage::{JobStore, SqliteStorage};
use webtrawl::url::DomainScope;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn html_page(title: &str, links: &[&str]) -> String {
    let anchors: String = links
        .iter()
        .map(|href| format!(r#"<a href="{}">{}</a>"#, href, href))
        .collect();
    format!(
        r#"<html><head><title>{}</title></head><body><p>Content of {}.</p>{}</body></html>"#,
        title, title, anchors
    )
}

async fn mount_page(server: &MockServer, route: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(body, "text/html"),
        )
        .mount(server)
        .await;
}

struct TestEngine {
    store: Arc<Mutex<SqliteStorage>>,
    _db_file: tempfile::NamedTempFile,
}

impl TestEngine {
    fn new() -> Self {
        let db_file = tempfile::NamedTempFile::new().expect("temp db file");
        let store = SqliteStorage::new(db_file.path()).expect("open store");
        Self {
            store: Arc::new(Mutex::new(store)),
            _db_file: db_file,
        }
    }

    fn create_job(&self, start_url: &str, options: CrawlOptions) -> CrawlJob {
        let job = CrawlJob::create(start_url, options).expect("valid job");
        self.store.lock().unwrap().create_job(&job).expect("persist job");
        job
    }

    async fn run_with(&self, fetcher: Arc<dyn PageFetcher>, workers: usize) {
        let scheduler = Scheduler::new(
            Arc::clone(&self.store),
            fetcher,
            Arc::new(HtmlExtractor::new()),
            SchedulerSettings::default(),
            RunnerSettings {
                workers,
                ..RunnerSettings::default()
            },
        );
        scheduler.run_until_idle().await.expect("scheduler pass");
    }

    async fn run(&self, workers: usize) {
        let fetcher =
            HttpFetcher::with_defaults("webtrawl-tests/0.1", Duration::from_secs(5)).unwrap();
        self.run_with(Arc::new(fetcher), workers).await;
    }

    fn job(&self, id: uuid::Uuid) -> CrawlJob {
        self.store
            .lock()
            .unwrap()
            .get_job(id)
            .expect("get job")
            .expect("job exists")
    }

    fn pages(&self, id: uuid::Uuid) -> Vec<webtrawl::storage::ScrapedPage> {
        self.store.lock().unwrap().pages_for_job(id).expect("pages")
    }
}

#[tokio::test]
async fn test_strict_scope_depth_one_crawl() {
    let server = MockServer::start().await;
    let base = server.uri();

    // Depth-0 page links to a same-host page and a foreign-host page.
    mount_page(
        &server,
        "/",
        html_page("Home", &[&format!("{}/a", base), "https://other.invalid/b"]),
    )
    .await;
    mount_page(&server, "/a", html_page("A", &[])).await;

    let engine = TestEngine::new();
    let job = engine.create_job(
        &format!("{}/", base),
        CrawlOptions {
            max_depth: Some(1),
            domain_scope: DomainScope::Strict,
            ..CrawlOptions::default()
        },
    );

    engine.run(2).await;

    let finished = engine.job(job.id);
    assert_eq!(finished.status, JobStatus::Completed);
    assert_eq!(finished.processed_urls, 2);
    assert!(finished.found_urls >= 1);
    assert!(finished.failed_urls.is_empty());
    assert!(finished.start_time.is_some());
    assert!(finished.end_time.is_some());

    // The foreign-host link was never admitted, let alone fetched.
    let pages = engine.pages(job.id);
    assert_eq!(pages.len(), 2);
    let start_host = Url::parse(&base).unwrap().host_str().unwrap().to_string();
    for page in &pages {
        assert_eq!(
            Url::parse(&page.url).unwrap().host_str().unwrap(),
            start_host
        );
    }
}

#[tokio::test]
async fn test_start_url_timeout_fails_job() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(html_page("Slow", &[]), "text/html")
                .set_delay(Duration::from_secs(30)),
        )
        .mount(&server)
        .await;

    let engine = TestEngine::new();
    let job = engine.create_job(&format!("{}/", server.uri()), CrawlOptions::default());

    // A pooled fetcher with a tight deadline turns the hang into a timeout.
    let inner = HttpFetcher::with_defaults("webtrawl-tests/0.1", Duration::from_secs(5)).unwrap();
    let fetcher = PooledFetcher::new(inner, 4, Duration::from_millis(200));
    engine.run_with(Arc::new(fetcher), 2).await;

    let finished = engine.job(job.id);
    assert_eq!(finished.status, JobStatus::Failed);
    assert!(finished
        .error
        .as_deref()
        .expect("error populated")
        .contains("start URL could not be fetched"));
    assert!(engine.pages(job.id).is_empty());
}

#[tokio::test]
async fn test_unreachable_pages_complete_with_errors() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(
        &server,
        "/",
        html_page("Home", &[&format!("{}/ok", base), &format!("{}/broken", base)]),
    )
    .await;
    mount_page(&server, "/ok", html_page("OK", &[])).await;
    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let engine = TestEngine::new();
    let job = engine.create_job(&format!("{}/", base), CrawlOptions::default());

    engine.run(2).await;

    let finished = engine.job(job.id);
    assert_eq!(finished.status, JobStatus::CompletedWithErrors);
    assert_eq!(finished.processed_urls, 3);
    assert_eq!(finished.failed_urls.len(), 1);
    assert!(finished.failed_urls[0].url.ends_with("/broken"));
    assert!(finished.failed_urls[0].reason.contains("500"));
    assert!(finished.error.is_none());
    assert_eq!(engine.pages(job.id).len(), 2);
}

#[tokio::test]
async fn test_duplicate_spellings_crawled_once() {
    let server = MockServer::start().await;
    let base = server.uri();

    // Three spellings of the same page: plain, with a fragment, and via a
    // dot segment.
    mount_page(
        &server,
        "/",
        html_page(
            "Home",
            &[
                &format!("{}/a", base),
                &format!("{}/a#section", base),
                &format!("{}/x/../a", base),
            ],
        ),
    )
    .await;
    mount_page(&server, "/a", html_page("A", &[])).await;

    let engine = TestEngine::new();
    let job = engine.create_job(&format!("{}/", base), CrawlOptions::default());

    engine.run(2).await;

    let finished = engine.job(job.id);
    assert_eq!(finished.status, JobStatus::Completed);
    assert_eq!(finished.processed_urls, 2);
    assert_eq!(finished.found_urls, 1);

    // No two rows share a normalized URL.
    let pages = engine.pages(job.id);
    assert_eq!(pages.len(), 2);
    let mut urls: Vec<&str> = pages.iter().map(|p| p.url.as_str()).collect();
    urls.sort();
    urls.dedup();
    assert_eq!(urls.len(), 2);
}

#[tokio::test]
async fn test_depth_bound_stops_traversal() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(&server, "/", html_page("Root", &[&format!("{}/l1", base)])).await;
    mount_page(&server, "/l1", html_page("L1", &[&format!("{}/l2", base)])).await;
    mount_page(&server, "/l2", html_page("L2", &[&format!("{}/l3", base)])).await;
    // /l3 must never be requested with max_depth = 2
    Mock::given(method("GET"))
        .and(path("/l3"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(html_page("L3", &[]), "text/html"),
        )
        .expect(0)
        .mount(&server)
        .await;

    let engine = TestEngine::new();
    let job = engine.create_job(
        &format!("{}/", base),
        CrawlOptions {
            max_depth: Some(2),
            ..CrawlOptions::default()
        },
    );

    engine.run(1).await;

    let finished = engine.job(job.id);
    assert_eq!(finished.status, JobStatus::Completed);
    assert_eq!(finished.processed_urls, 3);
    assert_eq!(engine.pages(job.id).len(), 3);

    // Every page sits within two parent hops of the start URL.
    let pages = engine.pages(job.id);
    for page in &pages {
        let mut depth = 0;
        let mut current = page.parent_url.clone();
        while let Some(parent) = current {
            depth += 1;
            current = pages
                .iter()
                .find(|p| p.url == parent)
                .and_then(|p| p.parent_url.clone());
        }
        assert!(depth <= 2, "page {} at depth {}", page.url, depth);
    }
}

#[tokio::test]
async fn test_sitemap_mode_records_edges_without_bodies() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(
        &server,
        "/",
        html_page("Home", &[&format!("{}/a", base), &format!("{}/b", base)]),
    )
    .await;
    mount_page(&server, "/a", html_page("A", &[&format!("{}/c", base)])).await;
    mount_page(&server, "/b", html_page("B", &[])).await;

    let engine = TestEngine::new();
    let job = engine.create_job(
        &format!("{}/", base),
        CrawlOptions {
            mode: CrawlMode::Sitemap,
            max_depth: Some(1),
            ..CrawlOptions::default()
        },
    );

    engine.run(2).await;

    let finished = engine.job(job.id);
    assert_eq!(finished.status, JobStatus::Completed);

    // No page body survives in sitemap mode.
    let pages = engine.pages(job.id);
    assert_eq!(pages.len(), 3);
    for page in &pages {
        assert!(page.content.is_none(), "content on {}", page.url);
        assert!(
            page.markdown_content.is_none(),
            "markdown on {}",
            page.url
        );
    }

    // Every admitted link appears as an edge, including the one to /c that
    // the depth bound kept out of the frontier.
    let sitemap = finished.sitemap.as_ref().expect("sitemap present");
    assert_eq!(sitemap.nodes.len(), 3);
    let has_edge = |from: &str, to: &str| {
        sitemap
            .edges
            .iter()
            .any(|e| e.from.ends_with(from) && e.to.ends_with(to))
    };
    assert!(has_edge("/", "/a"));
    assert!(has_edge("/", "/b"));
    assert!(has_edge("/a", "/c"));

    match job_output(&finished, &pages) {
        Some(CrawlOutput::Sitemap(graph)) => assert_eq!(graph.edges.len(), 3),
        other => panic!("expected sitemap output, got {:?}", other),
    }
}

#[tokio::test]
async fn test_content_mode_builds_page_tree() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(
        &server,
        "/",
        html_page("Home", &[&format!("{}/docs", base)]),
    )
    .await;
    mount_page(
        &server,
        "/docs",
        html_page("Docs", &[&format!("{}/docs/intro", base)]),
    )
    .await;
    mount_page(&server, "/docs/intro", html_page("Intro", &[])).await;

    let engine = TestEngine::new();
    let job = engine.create_job(&format!("{}/", base), CrawlOptions::default());

    engine.run(1).await;

    let finished = engine.job(job.id);
    let pages = engine.pages(job.id);

    let tree = match job_output(&finished, &pages) {
        Some(CrawlOutput::Tree(tree)) => tree,
        other => panic!("expected tree output, got {:?}", other),
    };
    assert_eq!(tree.title.as_deref(), Some("Home"));
    assert_eq!(tree.children.len(), 1);
    assert_eq!(tree.children[0].title.as_deref(), Some("Docs"));
    assert_eq!(tree.children[0].children.len(), 1);
    assert_eq!(
        tree.children[0].children[0].title.as_deref(),
        Some("Intro")
    );
}

#[tokio::test]
async fn test_exclude_patterns_prune_traversal() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(
        &server,
        "/",
        html_page(
            "Home",
            &[&format!("{}/keep", base), &format!("{}/private/secret", base)],
        ),
    )
    .await;
    mount_page(&server, "/keep", html_page("Keep", &[])).await;
    Mock::given(method("GET"))
        .and(path("/private/secret"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(html_page("Secret", &[]), "text/html"),
        )
        .expect(0)
        .mount(&server)
        .await;

    let engine = TestEngine::new();
    let job = engine.create_job(
        &format!("{}/", base),
        CrawlOptions {
            exclude_patterns: vec!["/private/".to_string()],
            ..CrawlOptions::default()
        },
    );

    engine.run(2).await;

    let finished = engine.job(job.id);
    assert_eq!(finished.status, JobStatus::Completed);
    // Scope rejection is silent: not a failure, not even a counter.
    assert!(finished.failed_urls.is_empty());
    assert_eq!(finished.found_urls, 1);
    assert_eq!(engine.pages(job.id).len(), 2);
}

#[tokio::test]
async fn test_cancel_before_run_short_circuits() {
    let server = MockServer::start().await;
    mount_page(&server, "/", html_page("Home", &[])).await;

    let engine = TestEngine::new();
    let job = engine.create_job(&format!("{}/", server.uri()), CrawlOptions::default());
    assert!(engine.store.lock().unwrap().request_cancel(job.id).unwrap());

    engine.run(1).await;

    let finished = engine.job(job.id);
    assert_eq!(finished.status, JobStatus::Cancelled);
    assert_eq!(finished.processed_urls, 0);
    assert!(engine.pages(job.id).is_empty());
    assert!(finished.end_time.is_some());
}

#[tokio::test]
async fn test_delete_job_removes_everything() {
    let server = MockServer::start().await;
    let base = server.uri();
    mount_page(&server, "/", html_page("Home", &[&format!("{}/a", base)])).await;
    mount_page(&server, "/a", html_page("A", &[])).await;

    let engine = TestEngine::new();
    let job = engine.create_job(&format!("{}/", base), CrawlOptions::default());
    engine.run(1).await;
    assert_eq!(engine.pages(job.id).len(), 2);

    assert!(engine.store.lock().unwrap().delete_job(job.id).unwrap());
    assert!(engine.store.lock().unwrap().get_job(job.id).unwrap().is_none());
    assert!(engine.pages(job.id).is_empty());
}
