//! Configuration validation.

use super::{Config, RunMode};
use crate::drivers::tls::SslMode;
use crate::error::{PipelineError, Result};

/// Validate the configuration for a run mode.
pub fn validate(config: &Config, mode: RunMode) -> Result<()> {
    // The app prefix ends up in object keys and table names
    if config.app.is_empty() {
        return Err(PipelineError::Config("app is required".into()));
    }
    if !config
        .app
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(PipelineError::Config(format!(
            "app may only contain letters, digits, '_' and '-', got '{}'",
            config.app
        )));
    }

    // Storage validation
    if config.storage.bucket.is_empty() {
        return Err(PipelineError::Config("storage.bucket is required".into()));
    }
    if config.storage.region.is_empty() {
        return Err(PipelineError::Config("storage.region is required".into()));
    }

    if config.pipeline.work_dir.as_os_str().is_empty() {
        return Err(PipelineError::Config("pipeline.work_dir is required".into()));
    }

    match mode {
        RunMode::Export => {
            if config.source.host.is_empty() {
                return Err(PipelineError::Config("source.host is required".into()));
            }
            if config.source.database.is_empty() {
                return Err(PipelineError::Config("source.database is required".into()));
            }
            if config.source.schema.is_empty() {
                return Err(PipelineError::Config("source.schema is required".into()));
            }
            SslMode::parse(&config.source.ssl_mode)?;
        }
        RunMode::Restore => {
            if config.warehouse.host.is_empty() {
                return Err(PipelineError::Config("warehouse.host is required".into()));
            }
            if config.warehouse.database.is_empty() {
                return Err(PipelineError::Config(
                    "warehouse.database is required".into(),
                ));
            }
            if config.warehouse.iam_role.is_empty() {
                return Err(PipelineError::Config(
                    "warehouse.iam_role is required for restore".into(),
                ));
            }
            SslMode::parse(&config.warehouse.ssl_mode)?;
        }
    }

    Ok(())
}
