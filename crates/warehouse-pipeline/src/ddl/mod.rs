//! Warehouse DDL generation.
//!
//! Statements are built as values ([`CreateTable`], [`DropTable`]) and
//! rendered with `to_sql()`; executing them is the orchestrator's job.

use crate::core::identifier::quote_ident;
use crate::core::schema::{ColumnDescriptor, MaxLength};
use crate::error::{PipelineError, Result};
use crate::typemap::TypeMapping;

/// A rendered-ready column of a `CREATE TABLE`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDefinition {
    /// Column name, unquoted.
    pub name: String,
    /// Target type, upper-cased.
    pub data_type: String,
    /// Length argument; `None` for length-free types.
    pub length: Option<MaxLength>,
}

impl ColumnDefinition {
    /// Render as `"name" TYPE` or `"name" TYPE(length)`.
    pub fn to_sql(&self) -> Result<String> {
        let name = quote_ident(&self.name)?;
        Ok(match self.length {
            Some(length) => format!("{} {}({})", name, self.data_type, length),
            None => format!("{} {}", name, self.data_type),
        })
    }
}

/// `CREATE TABLE` statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateTable {
    pub table: String,
    pub columns: Vec<ColumnDefinition>,
}

impl CreateTable {
    /// Render the statement. Column order is kept as given.
    pub fn to_sql(&self) -> Result<String> {
        let columns = self
            .columns
            .iter()
            .map(ColumnDefinition::to_sql)
            .collect::<Result<Vec<_>>>()?;

        Ok(format!(
            "CREATE TABLE {} ({})",
            quote_ident(&self.table)?,
            columns.join(", ")
        ))
    }
}

/// `DROP TABLE IF EXISTS` statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropTable {
    pub table: String,
}

impl DropTable {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
        }
    }

    pub fn to_sql(&self) -> Result<String> {
        Ok(format!("DROP TABLE IF EXISTS {}", quote_ident(&self.table)?))
    }
}

/// Builds [`CreateTable`] statements from column descriptors.
///
/// Lenient by default: an empty column list still produces a statement and a
/// zero length renders as `(0)`; the warehouse rejects both. Strict mode
/// reports them as generation errors instead.
#[derive(Debug, Clone)]
pub struct DdlGenerator<'a> {
    mapping: &'a TypeMapping,
    strict: bool,
}

impl<'a> DdlGenerator<'a> {
    pub fn new(mapping: &'a TypeMapping) -> Self {
        Self {
            mapping,
            strict: false,
        }
    }

    /// Enable or disable strict validation.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Map one descriptor to its column definition.
    pub fn column_definition(&self, column: &ColumnDescriptor) -> ColumnDefinition {
        let target_type = self.mapping.resolve_target_type(&column.source_type);
        let length = self
            .mapping
            .requires_length(target_type)
            .then_some(column.max_length);

        ColumnDefinition {
            name: column.name.clone(),
            data_type: target_type.to_uppercase(),
            length,
        }
    }

    /// Build the `CREATE TABLE` for a table.
    pub fn create_table(&self, table: &str, columns: &[ColumnDescriptor]) -> Result<CreateTable> {
        if self.strict {
            if columns.is_empty() {
                return Err(PipelineError::generation(table, "column list is empty"));
            }
            if let Some(col) = columns
                .iter()
                .find(|c| c.max_length == MaxLength::Bounded(0))
            {
                return Err(PipelineError::generation(
                    table,
                    format!("column '{}' has zero length", col.name),
                ));
            }
        }

        Ok(CreateTable {
            table: table.to_string(),
            columns: columns.iter().map(|c| self.column_definition(c)).collect(),
        })
    }
}

/// Render the `CREATE TABLE` statement for a table in lenient mode.
pub fn build_create_table(
    table_name: &str,
    columns: &[ColumnDescriptor],
    mapping: &TypeMapping,
) -> Result<String> {
    DdlGenerator::new(mapping)
        .create_table(table_name, columns)?
        .to_sql()
}
