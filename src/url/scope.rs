//! Crawl scope policy
//!
//! Decides, per candidate URL, whether a crawl rooted at a given start URL is
//! allowed to follow a link. The decision combines a host-based domain scope
//! with optional include/exclude regex lists. Rejection is silent: an
//! out-of-scope link is simply never admitted, it is not a page failure.

use crate::job::{CrawlOptions, JobOptionsError};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// Host restriction applied to every discovered link, relative to the start
/// URL's host
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DomainScope {
    /// Candidate host must equal the start host exactly
    #[default]
    Strict,

    /// Start host or a parent domain of it (`example.com` for a crawl
    /// started at `blog.example.com`)
    Parent,

    /// Start host or a subdomain of it
    Subdomains,

    /// Union of `Parent` and `Subdomains`
    ParentSubdomains,

    /// No host restriction
    None,
}

impl DomainScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Strict => "strict",
            Self::Parent => "parent",
            Self::Subdomains => "subdomains",
            Self::ParentSubdomains => "parent_subdomains",
            Self::None => "none",
        }
    }
}

impl fmt::Display for DomainScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for DomainScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "strict" => Ok(Self::Strict),
            "parent" => Ok(Self::Parent),
            "subdomains" => Ok(Self::Subdomains),
            "parent_subdomains" => Ok(Self::ParentSubdomains),
            "none" => Ok(Self::None),
            other => Err(format!("unknown domain scope: {}", other)),
        }
    }
}

/// Compiled admission policy for one crawl job
///
/// Built once at job start from the job's options; afterwards every call is
/// pure and side-effect free, so a policy can be shared freely across
/// concurrent workers.
#[derive(Debug)]
pub struct ScopePolicy {
    start_host: String,
    scope: DomainScope,
    include: Vec<Regex>,
    exclude: Vec<Regex>,
}

impl ScopePolicy {
    /// Compiles the scope policy for a job
    ///
    /// # Arguments
    ///
    /// * `start_url` - The crawl origin; its host anchors the domain scope
    /// * `options` - The job's options (scope mode and pattern lists)
    ///
    /// # Returns
    ///
    /// * `Ok(ScopePolicy)` - All patterns compiled
    /// * `Err(JobOptionsError)` - The start URL has no host, or a pattern is
    ///   not a valid regex
    pub fn for_job(start_url: &Url, options: &CrawlOptions) -> Result<Self, JobOptionsError> {
        let start_host = start_url
            .host_str()
            .ok_or_else(|| JobOptionsError::InvalidStartUrl(start_url.to_string()))?
            .to_lowercase();

        Ok(Self {
            start_host,
            scope: options.domain_scope,
            include: compile_patterns(&options.include_patterns)?,
            exclude: compile_patterns(&options.exclude_patterns)?,
        })
    }

    /// Decides whether a candidate URL is admitted into the crawl
    ///
    /// The candidate must already be a normalized absolute HTTP(S) URL (see
    /// [`crate::url::normalize_url`]); unparseable links are dropped before
    /// this point. Decision order: domain scope, then exclude patterns, then
    /// include patterns.
    pub fn admits(&self, candidate: &Url) -> bool {
        let host = match candidate.host_str() {
            Some(h) => h.to_lowercase(),
            None => return false,
        };

        if !self.host_in_scope(&host) {
            return false;
        }

        let url_str = candidate.as_str();

        if self.exclude.iter().any(|re| re.is_match(url_str)) {
            return false;
        }

        if !self.include.is_empty() && !self.include.iter().any(|re| re.is_match(url_str)) {
            return false;
        }

        true
    }

    fn host_in_scope(&self, host: &str) -> bool {
        let start = self.start_host.as_str();
        match self.scope {
            DomainScope::Strict => host == start,
            DomainScope::Parent => host == start || is_parent_of(host, start),
            DomainScope::Subdomains => host == start || is_parent_of(start, host),
            DomainScope::ParentSubdomains => {
                host == start || is_parent_of(host, start) || is_parent_of(start, host)
            }
            DomainScope::None => true,
        }
    }
}

/// Returns true if `parent` is a strict ancestor domain of `child`
/// (`example.com` is a parent of `blog.example.com`)
fn is_parent_of(parent: &str, child: &str) -> bool {
    child.len() > parent.len() && child.ends_with(&format!(".{}", parent))
}

fn compile_patterns(patterns: &[String]) -> Result<Vec<Regex>, JobOptionsError> {
    patterns
        .iter()
        .map(|p| {
            Regex::new(p).map_err(|e| JobOptionsError::InvalidPattern {
                pattern: p.clone(),
                message: e.to_string(),
            })
        })
        .collect()
}
