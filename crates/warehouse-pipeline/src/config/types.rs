//! Configuration type definitions.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Application prefix. Names the staging folder and every target table.
    pub app: String,

    /// Source database configuration (PostgreSQL).
    pub source: SourceConfig,

    /// Target warehouse configuration (Redshift).
    pub warehouse: WarehouseConfig,

    /// Object storage staging configuration (S3).
    pub storage: StorageConfig,

    /// Pipeline behavior configuration.
    pub pipeline: PipelineConfig,
}

/// Which half of the pipeline a run performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    /// Dump source tables and stage them in object storage.
    Export,
    /// Fetch staged tables and load them into the warehouse.
    Restore,
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunMode::Export => write!(f, "export"),
            RunMode::Restore => write!(f, "restore"),
        }
    }
}

/// Source database (PostgreSQL) configuration.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Database host (default: "localhost").
    pub host: String,

    /// Database port (default: 5432).
    pub port: u16,

    /// Database name.
    pub database: String,

    /// Username (default: "postgres").
    pub user: String,

    /// Password. Falls back to the server's own authentication when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// Schema whose tables are exported (default: "public").
    pub schema: String,

    /// SSL mode (default: "disable").
    pub ssl_mode: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            database: String::new(),
            user: "postgres".to_string(),
            password: None,
            schema: "public".to_string(),
            ssl_mode: "disable".to_string(),
        }
    }
}

impl fmt::Debug for SourceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("schema", &self.schema)
            .field("ssl_mode", &self.ssl_mode)
            .finish()
    }
}

/// Target warehouse (Redshift) configuration.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WarehouseConfig {
    /// Cluster endpoint (default: "localhost").
    pub host: String,

    /// Port (default: 5439).
    pub port: u16,

    /// Database name (default: "dev").
    pub database: String,

    /// Username (default: "awsuser").
    pub user: String,

    /// Password.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// SSL mode (default: "require").
    pub ssl_mode: String,

    /// IAM role ARN the warehouse assumes to read staged objects.
    pub iam_role: String,
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5439,
            database: "dev".to_string(),
            user: "awsuser".to_string(),
            password: None,
            ssl_mode: "require".to_string(),
            iam_role: String::new(),
        }
    }
}

impl fmt::Debug for WarehouseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WarehouseConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("ssl_mode", &self.ssl_mode)
            .field("iam_role", &self.iam_role)
            .finish()
    }
}

/// Object storage staging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Bucket holding the staging folder.
    pub bucket: String,

    /// Region of the bucket; also passed to the warehouse COPY (default: "us-east-1").
    pub region: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            bucket: String::new(),
            region: "us-east-1".to_string(),
        }
    }
}

/// Pipeline behavior configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Local directory for dumped and downloaded files (default: ".").
    pub work_dir: PathBuf,

    /// What to do when a collaborator call fails (default: continue).
    pub failure_policy: FailurePolicy,

    /// Reject empty column lists and zero lengths instead of emitting them.
    pub strict_ddl: bool,

    /// Keep dumped files in the work directory after upload.
    pub keep_local_files: bool,

    /// Tables to ignore on export in addition to the built-in set.
    pub extra_ignore_tables: Vec<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            work_dir: PathBuf::from("."),
            failure_policy: FailurePolicy::default(),
            strict_ddl: false,
            keep_local_files: false,
            extra_ignore_tables: Vec::new(),
        }
    }
}

/// Policy applied when an external call fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Mark the table failed, skip its remaining steps, keep going.
    #[default]
    Continue,

    /// Stop the run at the first failed call.
    Abort,
}
