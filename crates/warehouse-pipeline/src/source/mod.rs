//! SQL issued against the source database during export.

use crate::core::identifier::{qualify, quote_literal};
use crate::error::Result;
use crate::parser::{COLUMN_NAME_HEADER, MAX_LENGTH_HEADER, SOURCE_TYPE_HEADER};

/// Tables of a schema, one name per row.
pub fn list_tables_sql(schema: &str) -> String {
    format!(
        "SELECT tablename FROM pg_tables WHERE schemaname = {} ORDER BY tablename",
        quote_literal(schema)
    )
}

/// Dump a table's rows as pipe-delimited CSV with a header row.
pub fn dump_table_sql(schema: &str, table: &str) -> Result<String> {
    Ok(format!(
        "COPY {} TO STDOUT DELIMITER '|' CSV HEADER",
        qualify(schema, table)?
    ))
}

/// Dump a table's column descriptors in ordinal order, in the staged schema
/// file format.
pub fn dump_schema_sql(schema: &str, table: &str) -> String {
    format!(
        "COPY (SELECT {}, {}, {} FROM information_schema.columns \
         WHERE table_schema = {} AND table_name = {} ORDER BY ordinal_position) \
         TO STDOUT DELIMITER '|' CSV HEADER",
        COLUMN_NAME_HEADER,
        SOURCE_TYPE_HEADER,
        MAX_LENGTH_HEADER,
        quote_literal(schema),
        quote_literal(table)
    )
}
