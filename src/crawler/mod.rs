//! Crawl execution: frontier, page processing, job running, scheduling
//!
//! This module drives a job from claim to terminal status. The
//! [`Scheduler`] polls the store for pending jobs and hands each to a
//! [`JobRunner`]; the runner owns the [`UrlFrontier`] and a bounded worker
//! pool of [`PageProcessor`] invocations.

mod frontier;
mod processor;
mod runner;
mod scheduler;

pub use frontier::{FrontierEntry, UrlFrontier};
pub use processor::{PageOutcome, PageProcessor};
pub use runner::{JobRunner, RunnerSettings};
pub use scheduler::{Scheduler, SchedulerSettings};
