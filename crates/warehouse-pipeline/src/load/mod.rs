//! Warehouse bulk-load (`COPY`) command generation.

use crate::core::identifier::{quote_ident, quote_literal};
use crate::error::Result;

/// Region used when none is configured.
pub const DEFAULT_REGION: &str = "us-east-1";

/// Format options of a staged CSV file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyOptions {
    pub delimiter: char,
    pub quote: char,
    /// Header rows to skip.
    pub ignore_header: u32,
    pub date_format: String,
    pub region: String,
}

impl Default for CopyOptions {
    fn default() -> Self {
        Self {
            delimiter: '|',
            quote: '"',
            ignore_header: 1,
            date_format: "auto".to_string(),
            region: DEFAULT_REGION.to_string(),
        }
    }
}

/// `COPY <table> FROM '<uri>'` command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyCommand {
    pub table: String,
    pub source_uri: String,
    pub iam_role: String,
    pub options: CopyOptions,
}

impl CopyCommand {
    pub fn new(
        table: impl Into<String>,
        source_uri: impl Into<String>,
        iam_role: impl Into<String>,
    ) -> Self {
        Self {
            table: table.into(),
            source_uri: source_uri.into(),
            iam_role: iam_role.into(),
            options: CopyOptions::default(),
        }
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.options.region = region.into();
        self
    }

    pub fn to_sql(&self) -> Result<String> {
        let opts = &self.options;
        Ok(format!(
            "COPY {} FROM {} IAM_ROLE {} CSV DELIMITER {} QUOTE {} REGION {} DATEFORMAT {} IGNOREHEADER AS {}",
            quote_ident(&self.table)?,
            quote_literal(&self.source_uri),
            quote_literal(&self.iam_role),
            quote_literal(&opts.delimiter.to_string()),
            quote_literal(&opts.quote.to_string()),
            quote_literal(&opts.region),
            quote_literal(&opts.date_format),
            opts.ignore_header,
        ))
    }
}

/// Render the load command with default format options.
pub fn build_load_command(
    table_name: &str,
    staged_object_locator: &str,
    credentials_ref: &str,
) -> Result<String> {
    CopyCommand::new(table_name, staged_object_locator, credentials_ref).to_sql()
}
