//! Scheduler loop: claims pending jobs and fans them out to runners
//!
//! The scheduler owns concurrency across jobs; the runners own concurrency
//! within one. Claiming goes through the store's atomic
//! `pending -> in_progress` transition, so any number of scheduler
//! processes can share one store without double-running a job. A job that
//! fails, for any reason, never takes the loop down.

use crate::crawler::runner::{JobRunner, RunnerSettings};
use crate::extract::ContentExtractor;
use crate::fetch::PageFetcher;
use crate::storage::JobStore;
use crate::TrawlError;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Tunables for the scheduler loop
#[derive(Debug, Clone)]
pub struct SchedulerSettings {
    /// How many jobs may run at once
    pub max_concurrent_jobs: usize,

    /// How long to sleep between polls when the queue is empty
    pub poll_interval: Duration,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: 2,
            poll_interval: Duration::from_secs(2),
        }
    }
}

/// Polls the store for pending jobs and hands each to a runner
pub struct Scheduler<S: JobStore + Send + 'static> {
    store: Arc<Mutex<S>>,
    fetcher: Arc<dyn PageFetcher>,
    extractor: Arc<dyn ContentExtractor>,
    settings: SchedulerSettings,
    runner_settings: RunnerSettings,
}

impl<S: JobStore + Send + 'static> Scheduler<S> {
    pub fn new(
        store: Arc<Mutex<S>>,
        fetcher: Arc<dyn PageFetcher>,
        extractor: Arc<dyn ContentExtractor>,
        settings: SchedulerSettings,
        runner_settings: RunnerSettings,
    ) -> Self {
        Self {
            store,
            fetcher,
            extractor,
            settings,
            runner_settings,
        }
    }

    /// Claims and runs jobs until the queue is empty and every claimed job
    /// has finished, then returns
    ///
    /// This is the one-shot entry point used by the CLI and by tests; a
    /// long-lived deployment uses [`Scheduler::run`].
    pub async fn run_until_idle(&self) -> crate::Result<()> {
        let semaphore = Arc::new(Semaphore::new(self.settings.max_concurrent_jobs.max(1)));
        let mut active: JoinSet<()> = JoinSet::new();

        loop {
            let claimed_any = self.claim_available(&semaphore, &mut active)?;

            match active.join_next().await {
                Some(Err(e)) => tracing::error!("Job task panicked: {}", e),
                Some(Ok(())) => {}
                None => {
                    if !claimed_any {
                        return Ok(());
                    }
                }
            }
        }
    }

    /// Runs forever, sleeping between polls whenever the queue is idle
    pub async fn run(&self) -> crate::Result<()> {
        loop {
            if let Err(e) = self.run_until_idle().await {
                tracing::error!("Scheduler pass failed: {}", e);
            }
            tokio::time::sleep(self.settings.poll_interval).await;
        }
    }

    /// Claims pending jobs while worker capacity remains
    ///
    /// Returns whether anything was claimed this pass.
    fn claim_available(
        &self,
        semaphore: &Arc<Semaphore>,
        active: &mut JoinSet<()>,
    ) -> crate::Result<bool> {
        let mut claimed_any = false;

        while semaphore.available_permits() > 0 {
            let claimed = {
                let mut store = self.store.lock().unwrap();
                store.claim_next_pending()?
            };

            let job = match claimed {
                Some(job) => job,
                None => break,
            };

            let permit = Arc::clone(semaphore)
                .try_acquire_owned()
                .map_err(|_| TrawlError::Internal("job semaphore closed".to_string()))?;

            tracing::info!("Claimed crawl job {} ({})", job.id, job.start_url);
            claimed_any = true;

            let runner = JobRunner::new(
                Arc::clone(&self.store),
                Arc::clone(&self.fetcher),
                Arc::clone(&self.extractor),
                self.runner_settings.clone(),
            );
            let job_id = job.id;

            active.spawn(async move {
                // A failing job must never take the scheduler down; the
                // runner already folded internal faults into the job record
                // where it could.
                match runner.run(job).await {
                    Ok(status) => {
                        tracing::info!("Job {} reached terminal status {}", job_id, status)
                    }
                    Err(e) => tracing::error!("Job {} could not be finalized: {}", job_id, e),
                }
                drop(permit);
            });
        }

        Ok(claimed_any)
    }
}
