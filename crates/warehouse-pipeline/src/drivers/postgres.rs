//! PostgreSQL source driver.

use std::path::Path;

use async_trait::async_trait;
use deadpool_postgres::{Object, Pool};
use futures::StreamExt;
use tokio::io::AsyncWriteExt;
use tokio_postgres::SimpleQueryMessage;
use tracing::{debug, info};

use super::connect_pool;
use crate::config::SourceConfig;
use crate::core::traits::SourceDatabase;
use crate::error::{PipelineError, Result};

const COLLABORATOR: &str = "source";

/// PostgreSQL source database.
pub struct PgSource {
    pool: Pool,
}

impl PgSource {
    /// Connect to the source database.
    pub async fn connect(config: &SourceConfig) -> Result<Self> {
        let pool = connect_pool(config.pg_config(), &config.ssl_mode, COLLABORATOR).await?;

        info!(
            "Connected to PostgreSQL source: {}:{}/{}",
            config.host, config.port, config.database
        );

        Ok(Self { pool })
    }

    async fn client(&self, context: &str) -> Result<Object> {
        self.pool
            .get()
            .await
            .map_err(|e| PipelineError::pool(e, format!("getting source connection for {}", context)))
    }
}

#[async_trait]
impl SourceDatabase for PgSource {
    async fn query_lines(&self, sql: &str) -> Result<Vec<String>> {
        let client = self.client("query").await?;
        debug!("Source query: {}", sql);

        let messages = client
            .simple_query(sql)
            .await
            .map_err(|e| PipelineError::external(COLLABORATOR, "query", e))?;

        let mut lines = Vec::new();
        for message in messages {
            if let SimpleQueryMessage::Row(row) = message {
                if let Some(value) = row.get(0) {
                    lines.push(value.to_string());
                }
            }
        }
        Ok(lines)
    }

    async fn copy_to_file(&self, sql: &str, path: &Path) -> Result<u64> {
        let client = self.client("copy").await?;
        debug!("Source COPY to {}: {}", path.display(), sql);

        let context = format!("COPY to {}", path.display());
        let copy_stream = client
            .copy_out(sql)
            .await
            .map_err(|e| PipelineError::external(COLLABORATOR, context.clone(), e))?;

        let mut file = tokio::fs::File::create(path).await?;
        let mut written = 0u64;

        tokio::pin!(copy_stream);

        while let Some(data) = copy_stream.next().await {
            let bytes = data.map_err(|e| PipelineError::external(COLLABORATOR, context.clone(), e))?;
            file.write_all(&bytes).await?;
            written += bytes.len() as u64;
        }

        file.flush().await?;
        Ok(written)
    }
}
