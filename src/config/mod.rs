//! Engine configuration
//!
//! Deployment-level settings for the engine binary: worker pool sizes,
//! fetch timeouts, the scheduler poll interval, and the database path.
//! These are distinct from per-job options, which arrive from the client
//! with each crawl request.

mod parser;
mod types;
mod validation;

pub use parser::load_config;
pub use types::{
    EngineConfig, FetcherConfig, RunnerConfigSection, SchedulerConfigSection, StorageConfigSection,
};
pub use validation::validate_config;
