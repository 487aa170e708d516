use crate::config::types::{Config, DefaultsConfig, EngineConfig, StorageConfig};
use crate::{ConfigError, ConfigResult};

/// Validates the entire configuration
pub fn validate(config: &Config) -> ConfigResult<()> {
    validate_storage_config(&config.storage)?;
    validate_engine_config(&config.engine)?;
    validate_defaults_config(&config.defaults)?;
    Ok(())
}

fn validate_storage_config(config: &StorageConfig) -> ConfigResult<()> {
    if config.root.trim().is_empty() {
        return Err(ConfigError::Validation(
            "storage root cannot be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_engine_config(config: &EngineConfig) -> ConfigResult<()> {
    if config.program.trim().is_empty() {
        return Err(ConfigError::Validation(
            "engine program cannot be empty".to_string(),
        ));
    }

    if !config.manifest_flag.starts_with('-') || config.manifest_flag.len() < 2 {
        return Err(ConfigError::Validation(format!(
            "manifest-flag must be a command-line flag such as '--manifest', got '{}'",
            config.manifest_flag
        )));
    }

    Ok(())
}

fn validate_defaults_config(config: &DefaultsConfig) -> ConfigResult<()> {
    if config.fetch_limit == Some(0) {
        return Err(ConfigError::Validation(
            "fetch-limit must be >= 1 when set".to_string(),
        ));
    }
    Ok(())
}
