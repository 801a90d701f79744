//! Collaborator traits the orchestrator drives.
//!
//! - [`SourceDatabase`]: runs SQL against the source and returns text or
//!   streams results to a local file
//! - [`Warehouse`]: executes DDL/DML against the target warehouse
//! - [`ObjectStore`]: lists, uploads, downloads and deletes staged objects
//!
//! Command construction lives in [`crate::ddl`] and [`crate::load`]; these
//! traits only execute. Every call returns a `Result` so the orchestrator can
//! apply its failure policy per call.

use std::path::Path;

use async_trait::async_trait;

use crate::error::Result;

/// Source database (PostgreSQL) operations.
#[async_trait]
pub trait SourceDatabase: Send + Sync {
    /// Run a query and return the first column of every row as text.
    async fn query_lines(&self, sql: &str) -> Result<Vec<String>>;

    /// Run a `COPY ... TO STDOUT` statement and write its output to `path`.
    ///
    /// Returns the number of bytes written.
    async fn copy_to_file(&self, sql: &str, path: &Path) -> Result<u64>;
}

/// Target warehouse (Redshift) operations.
#[async_trait]
pub trait Warehouse: Send + Sync {
    /// Execute a statement, discarding any rows.
    async fn execute(&self, sql: &str) -> Result<()>;
}

/// Object storage operations on the staging bucket.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// List object keys under a prefix.
    async fn list(&self, prefix: &str) -> Result<Vec<String>>;

    /// Upload a local file to a key, overwriting any existing object.
    async fn upload(&self, local: &Path, key: &str) -> Result<()>;

    /// Download a key to a local file.
    async fn download(&self, key: &str, local: &Path) -> Result<()>;

    /// Delete a key.
    async fn delete(&self, key: &str) -> Result<()>;

    /// URI of a key, as the warehouse COPY expects it.
    fn object_uri(&self, key: &str) -> String;
}
