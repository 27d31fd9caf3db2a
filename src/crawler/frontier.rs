//! URL frontier: the breadth-first traversal queue
//!
//! One frontier per running job. It is a FIFO queue of
//! `(url, depth, parent)` entries plus a visited-set keyed by normalized
//! URL. The visited check and the enqueue are one atomically-guarded region,
//! so concurrent workers can never admit the same URL twice — which is also
//! what guarantees at most one page row per normalized URL per job.

use crate::url::normalize_url;
use std::collections::{HashSet, VecDeque};
use std::sync::Mutex;
use url::Url;

/// One discovered-but-not-yet-processed URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontierEntry {
    /// Normalized URL to fetch
    pub url: Url,

    /// Hop distance from the start URL, recorded at first discovery and
    /// never revised
    pub depth: u32,

    /// The page that discovered this one; None for the start URL
    pub parent: Option<Url>,
}

struct FrontierInner {
    queue: VecDeque<FrontierEntry>,
    visited: HashSet<String>,
}

/// Breadth-first frontier with built-in dedup and depth bounding
pub struct UrlFrontier {
    max_depth: Option<u32>,
    inner: Mutex<FrontierInner>,
}

impl UrlFrontier {
    /// Creates an empty frontier
    ///
    /// # Arguments
    ///
    /// * `max_depth` - Maximum hop distance admitted; None is unbounded
    pub fn new(max_depth: Option<u32>) -> Self {
        Self {
            max_depth,
            inner: Mutex::new(FrontierInner {
                queue: VecDeque::new(),
                visited: HashSet::new(),
            }),
        }
    }

    /// Attempts to admit a URL at the given depth
    ///
    /// The URL is normalized before the visited-set lookup, so two spellings
    /// of the same page are one node. Marking visited happens atomically
    /// with the enqueue decision.
    ///
    /// # Returns
    ///
    /// * `true` - Newly queued
    /// * `false` - Already visited, beyond the depth bound, or not a
    ///   normalizable HTTP(S) URL
    pub fn enqueue(&self, url: &Url, depth: u32, parent: Option<Url>) -> bool {
        if let Some(max) = self.max_depth {
            if depth > max {
                return false;
            }
        }

        let normalized = match normalize_url(url.as_str()) {
            Ok(u) => u,
            Err(_) => return false,
        };

        let mut inner = self.inner.lock().expect("frontier lock poisoned");
        if !inner.visited.insert(normalized.as_str().to_string()) {
            return false;
        }
        inner.queue.push_back(FrontierEntry {
            url: normalized,
            depth,
            parent,
        });
        true
    }

    /// Removes and returns the oldest entry
    pub fn dequeue(&self) -> Option<FrontierEntry> {
        self.inner
            .lock()
            .expect("frontier lock poisoned")
            .queue
            .pop_front()
    }

    /// Returns whether the queue is empty
    ///
    /// Visited URLs stay marked even after their entries are drained.
    pub fn is_empty(&self) -> bool {
        self.inner
            .lock()
            .expect("frontier lock poisoned")
            .queue
            .is_empty()
    }

    /// Number of entries waiting to be processed
    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .expect("frontier lock poisoned")
            .queue
            .len()
    }

    /// Number of distinct URLs ever admitted
    pub fn visited_count(&self) -> usize {
        self.inner
            .lock()
            .expect("frontier lock poisoned")
            .visited
            .len()
    }
}
