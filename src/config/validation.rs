use crate::config::types::EngineConfig;
use crate::{ConfigError, ConfigResult};

/// Validates an engine configuration
///
/// Rejects values that would stall or wedge the engine: zero-sized pools,
/// zero timeouts, an empty user agent, or an empty database path.
pub fn validate_config(config: &EngineConfig) -> ConfigResult<()> {
    if config.scheduler.max_concurrent_jobs == 0 {
        return Err(ConfigError::Validation(
            "scheduler.max-concurrent-jobs must be at least 1".to_string(),
        ));
    }

    if config.runner.workers_per_job == 0 {
        return Err(ConfigError::Validation(
            "runner.workers-per-job must be at least 1".to_string(),
        ));
    }

    if config.fetcher.timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "fetcher.timeout-secs must be at least 1".to_string(),
        ));
    }

    if config.fetcher.pool_size == 0 {
        return Err(ConfigError::Validation(
            "fetcher.pool-size must be at least 1".to_string(),
        ));
    }

    if config.fetcher.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "fetcher.user-agent must not be empty".to_string(),
        ));
    }

    if config.storage.database_path.trim().is_empty() {
        return Err(ConfigError::Validation(
            "storage.database-path must not be empty".to_string(),
        ));
    }

    Ok(())
}
