//! Core types shared across the pipeline:
//!
//! - [`schema`]: column descriptors and table export units
//! - [`identifier`]: quoting and the target table naming rule
//! - [`filter`]: ignored-table set
//! - [`traits`]: source, warehouse and object storage collaborators

pub mod filter;
pub mod identifier;
pub mod schema;
pub mod traits;

pub use filter::{TableFilter, DEFAULT_IGNORED_TABLES};
pub use identifier::{quote_ident, quote_literal, target_table_name};
pub use schema::{ColumnDescriptor, MaxLength, TableExportUnit};
pub use traits::{ObjectStore, SourceDatabase, Warehouse};
