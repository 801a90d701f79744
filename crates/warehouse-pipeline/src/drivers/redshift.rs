//! Redshift warehouse driver.
//!
//! Redshift speaks the PostgreSQL frontend protocol, so statements go through
//! tokio-postgres' simple query path.

use async_trait::async_trait;
use deadpool_postgres::Pool;
use tracing::{debug, info};

use super::connect_pool;
use crate::config::WarehouseConfig;
use crate::core::traits::Warehouse;
use crate::error::{PipelineError, Result};

const COLLABORATOR: &str = "warehouse";

/// Redshift target warehouse.
pub struct RedshiftWarehouse {
    pool: Pool,
}

impl RedshiftWarehouse {
    /// Connect to the warehouse cluster.
    pub async fn connect(config: &WarehouseConfig) -> Result<Self> {
        let pool = connect_pool(config.pg_config(), &config.ssl_mode, COLLABORATOR).await?;

        info!(
            "Connected to Redshift: {}:{}/{}",
            config.host, config.port, config.database
        );

        Ok(Self { pool })
    }
}

#[async_trait]
impl Warehouse for RedshiftWarehouse {
    async fn execute(&self, sql: &str) -> Result<()> {
        let client = self
            .pool
            .get()
            .await
            .map_err(|e| PipelineError::pool(e, "getting warehouse connection"))?;

        debug!("Warehouse: {}", sql);
        client
            .batch_execute(sql)
            .await
            .map_err(|e| PipelineError::external(COLLABORATOR, "execute", e))
    }
}
