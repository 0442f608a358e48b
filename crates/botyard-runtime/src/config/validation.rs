//! Configuration validation utilities.

use super::error::{ConfigError, ConfigResult};
use super::schema::{BotyardConfig, LlmConfig, LogOutput, LoggingConfig, RuntimeConfig};

/// Validates the entire configuration.
pub fn validate_config(config: &BotyardConfig) -> ConfigResult<()> {
    validate_runtime_config(&config.runtime)?;
    validate_logging_config(&config.logging)?;
    validate_llm_config(&config.llm)?;
    Ok(())
}

fn validate_runtime_config(runtime: &RuntimeConfig) -> ConfigResult<()> {
    if runtime.plugin_dir.as_os_str().is_empty() {
        return Err(ConfigError::missing("runtime.plugin_dir"));
    }

    if runtime.stop_grace_secs == 0 {
        return Err(ConfigError::invalid(
            "runtime.stop_grace_secs",
            "must be greater than 0",
        ));
    }

    if runtime.console_channel.trim().is_empty() {
        return Err(ConfigError::missing("runtime.console_channel"));
    }

    Ok(())
}

fn validate_logging_config(logging: &LoggingConfig) -> ConfigResult<()> {
    // Levels themselves are checked by deserialization.
    if logging.output == LogOutput::File && logging.file_path.is_none() {
        return Err(ConfigError::invalid(
            "logging.file_path",
            "required when output = \"file\"",
        ));
    }

    if logging.filters.keys().any(|module| module.trim().is_empty()) {
        return Err(ConfigError::invalid("logging.filters", "module names must not be empty"));
    }

    Ok(())
}

fn validate_llm_config(llm: &LlmConfig) -> ConfigResult<()> {
    if !(0.0..=2.0).contains(&llm.temperature) {
        return Err(ConfigError::invalid(
            "llm.temperature",
            format!("must be within 0.0..=2.0, got {}", llm.temperature),
        ));
    }

    if llm.timeout_secs == 0 {
        return Err(ConfigError::invalid("llm.timeout_secs", "must be greater than 0"));
    }

    if !(llm.base_url.starts_with("http://") || llm.base_url.starts_with("https://")) {
        return Err(ConfigError::invalid(
            "llm.base_url",
            format!("must use http or https, got {}", llm.base_url),
        ));
    }

    if llm.model.trim().is_empty() {
        return Err(ConfigError::missing("llm.model"));
    }

    Ok(())
}
