//! Configuration validation

use tracing::debug;

use crate::error::{ConfigError, Result};

use super::types::Config;

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    debug!("validating configuration");
    validate_suite(config)?;
    validate_watch(config)?;
    validate_native(config)?;
    debug!("configuration validation passed");
    Ok(())
}

fn validate_suite(config: &Config) -> Result<()> {
    if config.suite.name.is_empty() {
        return Err(invalid("suite.name", "suite name cannot be empty"));
    }

    if config.suite.mx.is_empty() {
        return Err(invalid("suite.mx", "mx executable cannot be empty"));
    }

    if config.suite.git.is_empty() {
        return Err(invalid("suite.git", "git executable cannot be empty"));
    }

    Ok(())
}

fn validate_watch(config: &Config) -> Result<()> {
    if config.watch.quiet_period_ms == 0 {
        return Err(invalid("watch.quiet_period_ms", "must be greater than zero"));
    }

    for (i, ext) in config.watch.trigger_extensions.iter().enumerate() {
        if !ext.starts_with('.') || ext.len() < 2 {
            return Err(invalid(
                &format!("watch.trigger_extensions[{}]", i),
                "extensions must look like \".c\"",
            ));
        }
    }

    Ok(())
}

fn validate_native(config: &Config) -> Result<()> {
    if config.native.dependencies().is_empty() {
        return Err(invalid(
            "native",
            "at least one native project or archive is required",
        ));
    }

    if config.native.dependencies().iter().any(|d| d.contains(',')) {
        return Err(invalid("native", "dependency names cannot contain commas"));
    }

    Ok(())
}

fn invalid(field: &str, message: &str) -> crate::error::PymxError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        message: message.to_string(),
    }
    .into()
}
