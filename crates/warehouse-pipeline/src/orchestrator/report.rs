//! Run report: per-step outcomes and the final tally of a run.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::RunMode;
use crate::error::Result;

/// A pipeline step, in the order the two modes run them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    ListTables,
    DumpData,
    DumpSchema,
    UploadData,
    UploadSchema,
    ListStaged,
    Download,
    DropExisting,
    CreateTable,
    LoadData,
    DeleteStaged,
    CleanupLocal,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Step::ListTables => "list_tables",
            Step::DumpData => "dump_data",
            Step::DumpSchema => "dump_schema",
            Step::UploadData => "upload_data",
            Step::UploadSchema => "upload_schema",
            Step::ListStaged => "list_staged",
            Step::Download => "download",
            Step::DropExisting => "drop_existing",
            Step::CreateTable => "create_table",
            Step::LoadData => "load_data",
            Step::DeleteStaged => "delete_staged",
            Step::CleanupLocal => "cleanup_local",
        };
        f.write_str(name)
    }
}

/// Outcome of one step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepRecord {
    pub step: Step,
    /// Table the step ran for; `None` for run-wide steps.
    pub table: Option<String>,
    pub succeeded: bool,
    pub error: Option<String>,
}

/// Overall status of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}

/// Result of an export or restore run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// Unique run identifier.
    pub run_id: String,

    pub mode: RunMode,

    /// Final status.
    pub status: RunStatus,

    /// When the run started.
    pub started_at: DateTime<Utc>,

    /// When the run completed.
    pub completed_at: Option<DateTime<Utc>>,

    /// Total duration in seconds.
    pub duration_seconds: f64,

    /// Tables the run attempted.
    pub tables_total: usize,

    /// Tables that went through every step.
    pub tables_success: usize,

    /// Tables that failed.
    pub tables_failed: usize,

    /// Failed table names, in the order they failed.
    pub failed_tables: Vec<String>,

    /// Every step executed, in execution order.
    pub steps: Vec<StepRecord>,
}

impl RunReport {
    pub fn new(mode: RunMode) -> Self {
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            mode,
            status: RunStatus::Running,
            started_at: Utc::now(),
            completed_at: None,
            duration_seconds: 0.0,
            tables_total: 0,
            tables_success: 0,
            tables_failed: 0,
            failed_tables: Vec::new(),
            steps: Vec::new(),
        }
    }

    /// Record a step outcome.
    pub fn record(&mut self, step: Step, table: Option<&str>, error: Option<String>) {
        self.steps.push(StepRecord {
            step,
            table: table.map(str::to_string),
            succeeded: error.is_none(),
            error,
        });
    }

    /// Mark a table failed. Repeated marks for the same table are ignored.
    pub fn mark_failed(&mut self, table: &str) {
        if !self.is_failed(table) {
            self.failed_tables.push(table.to_string());
        }
    }

    pub fn is_failed(&self, table: &str) -> bool {
        self.failed_tables.iter().any(|t| t == table)
    }

    /// Close the report once every step has run.
    pub fn finish(&mut self, tables_total: usize) {
        let completed_at = Utc::now();
        self.tables_total = tables_total;
        self.tables_failed = self.failed_tables.len();
        self.tables_success = tables_total.saturating_sub(self.tables_failed);
        self.duration_seconds =
            (completed_at - self.started_at).num_milliseconds() as f64 / 1000.0;
        self.completed_at = Some(completed_at);
        self.status = if self.failed_tables.is_empty() {
            RunStatus::Completed
        } else {
            RunStatus::Failed
        };
    }

    pub fn is_success(&self) -> bool {
        self.status == RunStatus::Completed
    }

    /// Steps recorded for a table, in execution order.
    pub fn steps_for<'a>(&'a self, table: &'a str) -> impl Iterator<Item = &'a StepRecord> + 'a {
        self.steps
            .iter()
            .filter(move |r| r.table.as_deref() == Some(table))
    }

    /// Convert to JSON string.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
