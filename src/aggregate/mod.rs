//! Result aggregation: page trees and sitemap graphs
//!
//! A finished crawl is read back in one of two shapes. Content mode builds a
//! parent/child tree over the job's page rows, rooted at the start URL;
//! sitemap mode serializes the link graph the crawl recorded. Orphaned pages
//! (whose parent row is missing) are attached directly under the root so the
//! tree is always a single connected structure for display.

use crate::job::{CrawlJob, CrawlMode};
use crate::storage::ScrapedPage;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use url::Url;

/// One node of the content-mode page tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageTreeNode {
    pub url: String,
    pub title: Option<String>,
    #[serde(default)]
    pub children: Vec<PageTreeNode>,
}

/// Directed link between two crawled URLs
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SitemapEdge {
    pub from: String,
    pub to: String,
}

/// Structural graph of a sitemap-mode crawl
///
/// `nodes` lists every processed page; `edges` carries one entry per
/// admitted link, including links to pages that were never fetched because
/// of the depth bound.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SitemapGraph {
    pub nodes: Vec<String>,
    pub edges: Vec<SitemapEdge>,
}

/// Deduplicating accumulator for a sitemap graph
///
/// Safe to fill from concurrent workers behind a lock; the output is sorted
/// so the serialized graph is stable across runs.
#[derive(Debug, Default, Clone)]
pub struct SitemapBuilder {
    nodes: BTreeSet<String>,
    edges: BTreeSet<SitemapEdge>,
}

impl SitemapBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, url: &str) {
        self.nodes.insert(url.to_string());
    }

    pub fn add_edge(&mut self, from: &str, to: &str) {
        self.edges.insert(SitemapEdge {
            from: from.to_string(),
            to: to.to_string(),
        });
    }

    pub fn build(&self) -> SitemapGraph {
        SitemapGraph {
            nodes: self.nodes.iter().cloned().collect(),
            edges: self.edges.iter().cloned().collect(),
        }
    }
}

/// The terminal output of a crawl job
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CrawlOutput {
    Tree(PageTreeNode),
    Sitemap(SitemapGraph),
}

/// Builds the client-facing output for a terminal job
///
/// Returns None while the job is still pending or in progress.
pub fn job_output(job: &CrawlJob, pages: &[ScrapedPage]) -> Option<CrawlOutput> {
    if !job.status.is_terminal() {
        return None;
    }

    match job.options.mode {
        CrawlMode::Content => Some(CrawlOutput::Tree(build_page_tree(&job.start_url, pages))),
        CrawlMode::Sitemap => Some(CrawlOutput::Sitemap(
            job.sitemap.clone().unwrap_or_default(),
        )),
    }
}

/// Builds the content-mode tree over a job's pages
///
/// The tree is keyed by `parent_url` edges and rooted at the start URL.
/// Pages whose parent does not resolve to any visited page are attached
/// under the root rather than dropped.
pub fn build_page_tree(start_url: &Url, pages: &[ScrapedPage]) -> PageTreeNode {
    let root_url = start_url.as_str();

    let known: HashMap<&str, &ScrapedPage> =
        pages.iter().map(|p| (p.url.as_str(), p)).collect();

    // Group children by parent, preserving insertion order. A page counts as
    // a child of the root if its parent is the root, missing, or unknown.
    let mut children_of: HashMap<&str, Vec<&ScrapedPage>> = HashMap::new();
    for page in pages {
        if page.url == root_url {
            continue;
        }
        let parent = match page.parent_url.as_deref() {
            Some(parent) if known.contains_key(parent) => parent,
            _ => root_url,
        };
        children_of.entry(parent).or_default().push(page);
    }

    let root_title = known.get(root_url).and_then(|p| p.title.clone());
    PageTreeNode {
        url: root_url.to_string(),
        title: root_title,
        children: build_children(root_url, &children_of),
    }
}

fn build_children(
    parent: &str,
    children_of: &HashMap<&str, Vec<&ScrapedPage>>,
) -> Vec<PageTreeNode> {
    children_of
        .get(parent)
        .map(|children| {
            children
                .iter()
                .map(|page| PageTreeNode {
                    url: page.url.clone(),
                    title: page.title.clone(),
                    children: build_children(&page.url, children_of),
                })
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn page(job: Uuid, url: &str, parent: Option<&str>, title: &str) -> ScrapedPage {
        ScrapedPage {
            id: 0,
            crawl_job_id: job,
            url: url.to_string(),
            parent_url: parent.map(String::from),
            title: Some(title.to_string()),
            content: None,
            markdown_content: None,
            metadata: None,
            created_at: Utc::now(),
        }
    }

    fn start() -> Url {
        Url::parse("https://example.com/").unwrap()
    }

    #[test]
    fn test_tree_single_page() {
        let job = Uuid::new_v4();
        let pages = vec![page(job, "https://example.com/", None, "Home")];

        let tree = build_page_tree(&start(), &pages);
        assert_eq!(tree.url, "https://example.com/");
        assert_eq!(tree.title, Some("Home".to_string()));
        assert!(tree.children.is_empty());
    }

    #[test]
    fn test_tree_two_levels() {
        let job = Uuid::new_v4();
        let pages = vec![
            page(job, "https://example.com/", None, "Home"),
            page(
                job,
                "https://example.com/a",
                Some("https://example.com/"),
                "A",
            ),
            page(
                job,
                "https://example.com/a/b",
                Some("https://example.com/a"),
                "B",
            ),
        ];

        let tree = build_page_tree(&start(), &pages);
        assert_eq!(tree.children.len(), 1);
        assert_eq!(tree.children[0].url, "https://example.com/a");
        assert_eq!(tree.children[0].children.len(), 1);
        assert_eq!(tree.children[0].children[0].url, "https://example.com/a/b");
    }

    #[test]
    fn test_orphan_attached_under_root() {
        let job = Uuid::new_v4();
        let pages = vec![
            page(job, "https://example.com/", None, "Home"),
            page(
                job,
                "https://example.com/lost",
                Some("https://example.com/never-visited"),
                "Lost",
            ),
        ];

        let tree = build_page_tree(&start(), &pages);
        assert_eq!(tree.children.len(), 1);
        assert_eq!(tree.children[0].url, "https://example.com/lost");
    }

    #[test]
    fn test_tree_without_root_row() {
        // The root page itself may be missing (e.g. a partial crawl); the
        // tree is still rooted at the start URL.
        let job = Uuid::new_v4();
        let pages = vec![page(
            job,
            "https://example.com/a",
            Some("https://example.com/"),
            "A",
        )];

        let tree = build_page_tree(&start(), &pages);
        assert_eq!(tree.url, "https://example.com/");
        assert_eq!(tree.title, None);
        assert_eq!(tree.children.len(), 1);
    }

    #[test]
    fn test_tree_empty() {
        let tree = build_page_tree(&start(), &[]);
        assert_eq!(tree.url, "https://example.com/");
        assert!(tree.children.is_empty());
    }

    #[test]
    fn test_sibling_order_preserved() {
        let job = Uuid::new_v4();
        let root = "https://example.com/";
        let pages = vec![
            page(job, root, None, "Home"),
            page(job, "https://example.com/z", Some(root), "Z"),
            page(job, "https://example.com/a", Some(root), "A"),
        ];

        let tree = build_page_tree(&start(), &pages);
        let urls: Vec<&str> = tree.children.iter().map(|c| c.url.as_str()).collect();
        assert_eq!(urls, vec!["https://example.com/z", "https://example.com/a"]);
    }

    #[test]
    fn test_sitemap_builder_dedups() {
        let mut builder = SitemapBuilder::new();
        builder.add_node("https://example.com/");
        builder.add_node("https://example.com/");
        builder.add_edge("https://example.com/", "https://example.com/a");
        builder.add_edge("https://example.com/", "https://example.com/a");

        let graph = builder.build();
        assert_eq!(graph.nodes.len(), 1);
        assert_eq!(graph.edges.len(), 1);
    }

    #[test]
    fn test_sitemap_builder_sorted_output() {
        let mut builder = SitemapBuilder::new();
        builder.add_node("https://example.com/b");
        builder.add_node("https://example.com/a");

        let graph = builder.build();
        assert_eq!(
            graph.nodes,
            vec!["https://example.com/a", "https://example.com/b"]
        );
    }

    #[test]
    fn test_sitemap_serde_roundtrip() {
        let mut builder = SitemapBuilder::new();
        builder.add_node("https://example.com/");
        builder.add_edge("https://example.com/", "https://example.com/a");
        let graph = builder.build();

        let json = serde_json::to_string(&graph).unwrap();
        let back: SitemapGraph = serde_json::from_str(&json).unwrap();
        assert_eq!(back, graph);
    }

    #[test]
    fn test_job_output_requires_terminal_status() {
        use crate::job::{CrawlJob, CrawlOptions};

        let job = CrawlJob::create("https://example.com/", CrawlOptions::default()).unwrap();
        assert!(job_output(&job, &[]).is_none());
    }

    #[test]
    fn test_job_output_sitemap_mode() {
        use crate::job::{CrawlJob, CrawlOptions, JobStatus};

        let options = CrawlOptions {
            mode: CrawlMode::Sitemap,
            ..CrawlOptions::default()
        };
        let mut job = CrawlJob::create("https://example.com/", options).unwrap();
        job.status = JobStatus::Completed;
        job.sitemap = Some(SitemapGraph {
            nodes: vec!["https://example.com/".to_string()],
            edges: vec![],
        });

        match job_output(&job, &[]) {
            Some(CrawlOutput::Sitemap(graph)) => assert_eq!(graph.nodes.len(), 1),
            other => panic!("expected sitemap output, got {:?}", other),
        }
    }
}
