use crate::config::types::EngineConfig;
use crate::config::validation::validate_config;
use crate::ConfigResult;
use std::fs;
use std::path::Path;

/// Loads and validates the engine configuration from a TOML file
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(EngineConfig)` - Parsed and validated configuration
/// * `Err(ConfigError)` - File unreadable, TOML invalid, or validation
///   failed
pub fn load_config(path: &Path) -> ConfigResult<EngineConfig> {
    let contents = fs::read_to_string(path)?;
    let config: EngineConfig = toml::from_str(&contents)?;
    validate_config(&config)?;
    Ok(config)
}
