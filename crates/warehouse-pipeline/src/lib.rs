//! # warehouse-pipeline
//!
//! Export PostgreSQL tables to an S3 staging folder and restore them into
//! Amazon Redshift.
//!
//! - **Export** dumps every non-ignored table of a source schema as
//!   pipe-delimited CSV, together with a column descriptor file, and stages
//!   both under `{app}-warehouse-pipeline/`
//! - **Restore** pairs the staged files, recreates each table as
//!   `{app}_{table}_test` from its descriptors and bulk-loads it with `COPY`
//!
//! ## Example
//!
//! ```rust,no_run
//! use warehouse_pipeline::{Config, Orchestrator, RunMode};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> warehouse_pipeline::Result<()> {
//!     let config = Config::load("config.yaml")?;
//!     let orchestrator = Orchestrator::connect(config, RunMode::Restore).await?;
//!     let report = orchestrator.restore().await?;
//!     println!("Restored {} tables", report.tables_success);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod core;
pub mod ddl;
pub mod drivers;
pub mod error;
pub mod load;
pub mod orchestrator;
pub mod parser;
pub mod source;
pub mod storage;
pub mod typemap;

// Re-exports for convenient access
pub use config::{Config, FailurePolicy, RunMode};
pub use crate::core::{ColumnDescriptor, MaxLength, TableExportUnit, TableFilter};
pub use ddl::{build_create_table, DdlGenerator};
pub use error::{PipelineError, Result};
pub use load::{build_load_command, CopyCommand};
pub use orchestrator::{Orchestrator, RunReport, RunStatus, Step};
pub use parser::parse_column_descriptors;
pub use typemap::TypeMapping;
