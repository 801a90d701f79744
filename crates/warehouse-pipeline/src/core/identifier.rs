//! Identifier validation, quoting and the target table naming rule.
//!
//! SQL identifiers cannot be bound as statement parameters, so every table and
//! column name that ends up in generated SQL goes through [`quote_ident`]:
//! it is validated, embedded double quotes are doubled and the result is
//! wrapped in double quotes. String literals (object URIs, role ARNs, catalog
//! filters) go through [`quote_literal`].

use crate::core::schema::{DATA_FILE_EXTENSION, SCHEMA_FILE_SUFFIX};
use crate::error::{PipelineError, Result};

/// Maximum identifier length in bytes (Redshift limit).
pub const MAX_IDENTIFIER_LENGTH: usize = 127;

/// Suffix appended to every restored table name.
pub const TARGET_TABLE_SUFFIX: &str = "_test";

/// Validate an identifier.
///
/// Rejects empty identifiers, identifiers containing null bytes and
/// identifiers longer than [`MAX_IDENTIFIER_LENGTH`].
pub fn validate_identifier(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(PipelineError::Identifier(
            "identifier cannot be empty".to_string(),
        ));
    }

    if name.contains('\0') {
        return Err(PipelineError::Identifier(format!(
            "identifier contains null byte: {:?}",
            name
        )));
    }

    if name.len() > MAX_IDENTIFIER_LENGTH {
        return Err(PipelineError::Identifier(format!(
            "identifier exceeds maximum length of {} bytes (got {} bytes): {:?}",
            MAX_IDENTIFIER_LENGTH,
            name.len(),
            name
        )));
    }

    Ok(())
}

/// Quote an identifier with double quotes.
///
/// ```ignore
/// assert_eq!(quote_ident("users")?, "\"users\"");
/// assert_eq!(quote_ident("table\"name")?, "\"table\"\"name\"");
/// ```
pub fn quote_ident(name: &str) -> Result<String> {
    validate_identifier(name)?;
    Ok(format!("\"{}\"", name.replace('"', "\"\"")))
}

/// Qualify a table name with its schema.
pub fn qualify(schema: &str, table: &str) -> Result<String> {
    Ok(format!("{}.{}", quote_ident(schema)?, quote_ident(table)?))
}

/// Quote a string literal with single quotes, doubling embedded quotes.
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Base table name of a staged file.
///
/// Accepts a bare file name or a full object key; the directory part, then
/// the schema suffix or the data extension, is removed.
pub fn base_table_name(staged_name: &str) -> &str {
    let file_name = staged_name.rsplit('/').next().unwrap_or(staged_name);
    file_name
        .strip_suffix(SCHEMA_FILE_SUFFIX)
        .or_else(|| file_name.strip_suffix(DATA_FILE_EXTENSION))
        .unwrap_or(file_name)
}

/// Target table name for a table or staged schema file: `{app}_{base}_test`.
///
/// The create, load and drop steps all derive the name here from the same
/// table name, so they always address the same target table.
pub fn target_table_name(app: &str, staged_name: &str) -> String {
    format!(
        "{}_{}{}",
        app,
        base_table_name(staged_name),
        TARGET_TABLE_SUFFIX
    )
}
