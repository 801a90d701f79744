//! Column and table metadata types shared by the parser, generators and
//! orchestrator.

use std::fmt;

/// Token rendered for an unbounded length.
pub const UNBOUNDED_LENGTH_TOKEN: &str = "MAX";

/// Declared maximum length of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MaxLength {
    /// Explicit character length from the source catalog.
    Bounded(u32),
    /// No declared length; the warehouse maximum is used.
    #[default]
    Unbounded,
}

impl fmt::Display for MaxLength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MaxLength::Bounded(n) => write!(f, "{}", n),
            MaxLength::Unbounded => f.write_str(UNBOUNDED_LENGTH_TOKEN),
        }
    }
}

/// One row of table-schema metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDescriptor {
    /// Column identifier, unquoted.
    pub name: String,
    /// Source engine type name (`udt_name`).
    pub source_type: String,
    /// Declared maximum length.
    pub max_length: MaxLength,
}

impl ColumnDescriptor {
    pub fn new(
        name: impl Into<String>,
        source_type: impl Into<String>,
        max_length: MaxLength,
    ) -> Self {
        Self {
            name: name.into(),
            source_type: source_type.into(),
            max_length,
        }
    }
}

/// File name suffix of a staged schema file.
pub const SCHEMA_FILE_SUFFIX: &str = "_schema.csv";

/// File name extension of a staged data file.
pub const DATA_FILE_EXTENSION: &str = ".csv";

/// A table paired with its data file and schema file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableExportUnit {
    /// Source table name.
    pub table: String,
    /// File name of the data dump.
    pub data_file: String,
    /// File name of the column descriptor dump.
    pub schema_file: String,
}

impl TableExportUnit {
    pub fn new(table: impl Into<String>) -> Self {
        let table = table.into();
        Self {
            data_file: format!("{}{}", table, DATA_FILE_EXTENSION),
            schema_file: format!("{}{}", table, SCHEMA_FILE_SUFFIX),
            table,
        }
    }
}
