//! Configuration validation utilities.

use super::error::{ConfigError, ConfigResult};
use super::schema::{DispatchConfig, LogLevel, LogOutput, LoggingConfig, ParleyConfig};

/// Validates the entire configuration.
pub fn validate_config(config: &ParleyConfig) -> ConfigResult<()> {
    validate_dispatch_config(&config.dispatch)?;
    validate_logging_config(&config.logging)?;
    Ok(())
}

/// Validates the dispatch section.
fn validate_dispatch_config(dispatch: &DispatchConfig) -> ConfigResult<()> {
    if dispatch.prefixes.is_empty() {
        return Err(ConfigError::validation(
            "At least one command prefix must be configured",
        ));
    }

    if dispatch.prefixes.iter().any(String::is_empty) {
        return Err(ConfigError::validation("Command prefixes cannot be empty"));
    }

    Ok(())
}

/// Validates the logging section.
fn validate_logging_config(logging: &LoggingConfig) -> ConfigResult<()> {
    for (module, level) in &logging.filters {
        if module.trim().is_empty() {
            return Err(ConfigError::validation("Log filter module cannot be empty"));
        }
        level.parse::<LogLevel>()?;
    }

    if logging.output == LogOutput::File && logging.file_path.is_none() {
        return Err(ConfigError::validation(
            "logging.file_path is required when logging.output is 'file'",
        ));
    }

    Ok(())
}
