//! Bounded fetch-handle pool
//!
//! Wraps any [`PageFetcher`] with a fixed-size pool of fetch handles and a
//! wall-clock deadline. A handle is acquired before the inner fetch starts
//! and released on every exit path, including timeout, so a browser-backed
//! fetcher can map handles one-to-one onto tabs without ever leaking one.

use crate::fetch::{CookieContext, FetchError, FetchedPage, PageFetcher, RenderMode};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use url::Url;

/// A [`PageFetcher`] decorator with bounded concurrency and a hard deadline
pub struct PooledFetcher<F> {
    inner: F,
    handles: Arc<Semaphore>,
    deadline: Duration,
}

impl<F: PageFetcher> PooledFetcher<F> {
    /// Creates a pool over an inner fetcher
    ///
    /// # Arguments
    ///
    /// * `inner` - The fetcher that performs the actual work
    /// * `capacity` - Maximum number of concurrent fetches
    /// * `deadline` - Wall-clock upper bound per fetch, measured after a
    ///   handle is acquired
    pub fn new(inner: F, capacity: usize, deadline: Duration) -> Self {
        Self {
            inner,
            handles: Arc::new(Semaphore::new(capacity)),
            deadline,
        }
    }

    /// Number of handles currently free
    pub fn available_handles(&self) -> usize {
        self.handles.available_permits()
    }
}

#[async_trait::async_trait]
impl<F: PageFetcher> PageFetcher for PooledFetcher<F> {
    async fn fetch(
        &self,
        url: &Url,
        mode: RenderMode,
        cookies: Option<&CookieContext>,
    ) -> Result<FetchedPage, FetchError> {
        // The permit is held for the whole fetch and dropped on every path
        // out of this function.
        let _handle = self
            .handles
            .acquire()
            .await
            .map_err(|_| FetchError::Other("fetch pool closed".to_string()))?;

        match tokio::time::timeout(self.deadline, self.inner.fetch(url, mode, cookies)).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout(self.deadline)),
        }
    }
}
