//! Configuration loading and validation.

mod types;
mod validation;

pub use types::*;

use crate::error::Result;
use std::path::Path;

impl Config {
    /// Load configuration from a YAML file.
    ///
    /// Validation is deferred to [`Config::validate`] because CLI overrides are
    /// applied after loading.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Validate the configuration for the given run mode.
    pub fn validate(&self, mode: RunMode) -> Result<()> {
        validation::validate(self, mode)
    }
}

impl SourceConfig {
    /// Build a tokio-postgres connection config.
    pub fn pg_config(&self) -> tokio_postgres::Config {
        let mut pg_config = tokio_postgres::Config::new();
        pg_config.host(&self.host);
        pg_config.port(self.port);
        pg_config.dbname(&self.database);
        pg_config.user(&self.user);
        if let Some(ref password) = self.password {
            pg_config.password(password);
        }
        pg_config
    }
}

impl WarehouseConfig {
    /// Build a tokio-postgres connection config for the warehouse endpoint.
    pub fn pg_config(&self) -> tokio_postgres::Config {
        let mut pg_config = tokio_postgres::Config::new();
        pg_config.host(&self.host);
        pg_config.port(self.port);
        pg_config.dbname(&self.database);
        pg_config.user(&self.user);
        if let Some(ref password) = self.password {
            pg_config.password(password);
        }
        pg_config
    }
}
