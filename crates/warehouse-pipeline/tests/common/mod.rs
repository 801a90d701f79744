//! In-memory collaborators for orchestrator tests.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use warehouse_pipeline::core::traits::{ObjectStore, SourceDatabase, Warehouse};
use warehouse_pipeline::{Config, PipelineError, Result};

pub const APP: &str = "articulate";
pub const BUCKET: &str = "test-bucket";
pub const IAM_ROLE: &str = "arn:aws:iam::123456789012:role/redshift-load";

pub const USERS_SCHEMA: &str =
    "column_name|udt_name|character_maximum_length\nid|int8|\nemail|varchar|255\nprofile|jsonb|\n";
pub const USERS_DATA: &str = "id|email|profile\n1|a@example.com|\"{\"\"k\"\":1}\"\n";
pub const ORDERS_SCHEMA: &str =
    "column_name|udt_name|character_maximum_length\nid|int4|\ntotal|numeric|\n";
pub const ORDERS_DATA: &str = "id|total\n7|19.99\n";

/// Config pointing at a temporary work dir.
pub fn config(work_dir: &Path) -> Config {
    let mut config = Config::default();
    config.app = APP.to_string();
    config.storage.bucket = BUCKET.to_string();
    config.warehouse.iam_role = IAM_ROLE.to_string();
    config.pipeline.work_dir = work_dir.to_path_buf();
    config
}

pub fn staged_key(file_name: &str) -> String {
    format!("{}-warehouse-pipeline/{}", APP, file_name)
}

/// Source database serving canned tables.
#[derive(Default)]
pub struct FakeSource {
    tables: Vec<String>,
    contents: HashMap<String, (String, String)>,
    fail_copy_for: Option<String>,
    fail_listing: bool,
    pub statements: Mutex<Vec<String>>,
}

impl FakeSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(mut self, table: &str, data: &str, schema: &str) -> Self {
        self.tables.push(table.to_string());
        self.contents
            .insert(table.to_string(), (data.to_string(), schema.to_string()));
        self
    }

    /// Listed but has nothing to dump; only useful for ignored tables.
    pub fn with_listed(mut self, table: &str) -> Self {
        self.tables.push(table.to_string());
        self
    }

    pub fn failing_copy_for(mut self, table: &str) -> Self {
        self.fail_copy_for = Some(table.to_string());
        self
    }

    pub fn failing_listing(mut self) -> Self {
        self.fail_listing = true;
        self
    }

    pub fn statements(&self) -> Vec<String> {
        self.statements.lock().unwrap().clone()
    }
}

#[async_trait]
impl SourceDatabase for FakeSource {
    async fn query_lines(&self, sql: &str) -> Result<Vec<String>> {
        self.statements.lock().unwrap().push(sql.to_string());
        if self.fail_listing {
            return Err(PipelineError::external("source", "query", "connection reset"));
        }
        Ok(self.tables.clone())
    }

    async fn copy_to_file(&self, sql: &str, path: &Path) -> Result<u64> {
        self.statements.lock().unwrap().push(sql.to_string());

        let file_name = path.file_name().unwrap().to_string_lossy().to_string();
        let is_schema_dump = sql.contains("information_schema.columns");
        let table = if is_schema_dump {
            file_name.strip_suffix("_schema.csv").unwrap()
        } else {
            file_name.strip_suffix(".csv").unwrap()
        };
        if self.fail_copy_for.as_deref() == Some(table) {
            return Err(PipelineError::external("source", "copy", "permission denied"));
        }

        let (data, schema) = self.contents.get(table).cloned().unwrap_or_default();
        let body = if is_schema_dump { schema } else { data };
        std::fs::write(path, &body)?;
        Ok(body.len() as u64)
    }
}

/// Warehouse recording every executed statement.
#[derive(Default)]
pub struct FakeWarehouse {
    fail_on: Vec<String>,
    statements: Mutex<Vec<String>>,
}

impl FakeWarehouse {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every statement containing `pattern`.
    pub fn failing_on(mut self, pattern: &str) -> Self {
        self.fail_on.push(pattern.to_string());
        self
    }

    pub fn statements(&self) -> Vec<String> {
        self.statements.lock().unwrap().clone()
    }
}

#[async_trait]
impl Warehouse for FakeWarehouse {
    async fn execute(&self, sql: &str) -> Result<()> {
        self.statements.lock().unwrap().push(sql.to_string());
        if self.fail_on.iter().any(|p| sql.contains(p.as_str())) {
            return Err(PipelineError::external("warehouse", "execute", "relation error"));
        }
        Ok(())
    }
}

/// Object store backed by a sorted map, listing keys the way S3 does.
#[derive(Default)]
pub struct FakeStore {
    objects: Mutex<BTreeMap<String, Vec<u8>>>,
    fail_upload_for: Option<String>,
    fail_listing: bool,
}

impl FakeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_object(self, key: &str, body: &str) -> Self {
        self.objects
            .lock()
            .unwrap()
            .insert(key.to_string(), body.as_bytes().to_vec());
        self
    }

    /// Stage both files of a table under the test app.
    pub fn with_staged(self, table: &str, data: &str, schema: &str) -> Self {
        self.with_object(&staged_key(&format!("{}.csv", table)), data)
            .with_object(&staged_key(&format!("{}_schema.csv", table)), schema)
    }

    pub fn failing_upload_for(mut self, key: &str) -> Self {
        self.fail_upload_for = Some(key.to_string());
        self
    }

    pub fn failing_listing(mut self) -> Self {
        self.fail_listing = true;
        self
    }

    pub fn keys(&self) -> Vec<String> {
        self.objects.lock().unwrap().keys().cloned().collect()
    }

    pub fn body(&self, key: &str) -> Option<String> {
        self.objects
            .lock()
            .unwrap()
            .get(key)
            .map(|b| String::from_utf8_lossy(b).to_string())
    }
}

#[async_trait]
impl ObjectStore for FakeStore {
    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        if self.fail_listing {
            return Err(PipelineError::external("storage", "list", "access denied"));
        }
        Ok(self
            .objects
            .lock()
            .unwrap()
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }

    async fn upload(&self, local: &Path, key: &str) -> Result<()> {
        if self.fail_upload_for.as_deref() == Some(key) {
            return Err(PipelineError::external("storage", "upload", "slow down"));
        }
        let body = std::fs::read(local)?;
        self.objects.lock().unwrap().insert(key.to_string(), body);
        Ok(())
    }

    async fn download(&self, key: &str, local: &Path) -> Result<()> {
        let body = self
            .objects
            .lock()
            .unwrap()
            .get(key)
            .cloned()
            .ok_or_else(|| PipelineError::external("storage", "download", "no such key"))?;
        std::fs::write(local, body)?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.objects.lock().unwrap().remove(key);
        Ok(())
    }

    fn object_uri(&self, key: &str) -> String {
        format!("s3://{}/{}", BUCKET, key)
    }
}
