//! Collaborator drivers for real services.
//!
//! - [`PgSource`]: PostgreSQL source over tokio-postgres
//! - [`RedshiftWarehouse`]: Redshift over the PostgreSQL wire protocol
//! - [`S3Store`]: S3 staging bucket over aws-sdk-s3
//!
//! Connections are pooled with deadpool-postgres. The pipeline is sequential,
//! so each pool holds a single connection.

mod postgres;
mod redshift;
mod s3;
pub mod tls;

pub use postgres::PgSource;
pub use redshift::RedshiftWarehouse;
pub use s3::S3Store;

use deadpool_postgres::{Manager, ManagerConfig, Pool, RecyclingMethod};
use tracing::warn;

use crate::error::{PipelineError, Result};
use tls::SslMode;

/// Build a single-connection pool and check it with `SELECT 1`.
pub(crate) async fn connect_pool(
    pg_config: tokio_postgres::Config,
    ssl_mode: &str,
    collaborator: &'static str,
) -> Result<Pool> {
    let mgr_config = ManagerConfig {
        recycling_method: RecyclingMethod::Fast,
    };

    let pool = match tls::connector(SslMode::parse(ssl_mode)?)? {
        None => {
            warn!(
                "{} TLS is disabled. Credentials will be transmitted in plaintext.",
                collaborator
            );
            let mgr = Manager::from_config(pg_config, tokio_postgres::NoTls, mgr_config);
            Pool::builder(mgr)
                .max_size(1)
                .build()
                .map_err(|e| PipelineError::pool(e, format!("creating {} pool", collaborator)))?
        }
        Some(tls_connector) => {
            let mgr = Manager::from_config(pg_config, tls_connector, mgr_config);
            Pool::builder(mgr)
                .max_size(1)
                .build()
                .map_err(|e| PipelineError::pool(e, format!("creating {} pool", collaborator)))?
        }
    };

    let client = pool
        .get()
        .await
        .map_err(|e| PipelineError::pool(e, format!("testing {} connection", collaborator)))?;
    client
        .simple_query("SELECT 1")
        .await
        .map_err(|e| PipelineError::external(collaborator, "connection test", e))?;

    Ok(pool)
}
