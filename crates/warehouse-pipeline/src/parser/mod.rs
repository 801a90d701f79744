//! Parser for staged schema files.
//!
//! A schema file is the pipe-delimited, double-quoted CSV that the source
//! produces for `column_name, udt_name, character_maximum_length`, header row
//! first, one row per column in ordinal order.

use std::path::Path;

use csv::{ReaderBuilder, StringRecord};

use crate::core::schema::{ColumnDescriptor, MaxLength};
use crate::error::{PipelineError, Result};

/// Field delimiter of staged files.
pub const DELIMITER: u8 = b'|';

/// Quote character of staged files.
pub const QUOTE: u8 = b'"';

pub const COLUMN_NAME_HEADER: &str = "column_name";
pub const SOURCE_TYPE_HEADER: &str = "udt_name";
pub const MAX_LENGTH_HEADER: &str = "character_maximum_length";

const INLINE_SOURCE: &str = "<input>";

/// Parse column descriptors from schema file text.
pub fn parse_column_descriptors(input: &str) -> Result<Vec<ColumnDescriptor>> {
    parse_named(input, INLINE_SOURCE)
}

/// Read and parse a schema file. Errors name the file.
pub fn read_column_descriptors(path: &Path) -> Result<Vec<ColumnDescriptor>> {
    let input = std::fs::read_to_string(path)?;
    parse_named(&input, &path.display().to_string())
}

fn parse_named(input: &str, file: &str) -> Result<Vec<ColumnDescriptor>> {
    let parse_error = |line: u64, message: String| PipelineError::Parse {
        file: file.to_string(),
        line,
        message,
    };

    // The csv reader accepts an unterminated quote by reading to the end of
    // input, which would silently swallow the remaining rows.
    if let Some(line) = unterminated_quote_line(input) {
        return Err(parse_error(line, "unterminated quoted field".to_string()));
    }

    let mut reader = ReaderBuilder::new()
        .delimiter(DELIMITER)
        .quote(QUOTE)
        .has_headers(true)
        .from_reader(input.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| parse_error(csv_error_line(&e), e.to_string()))?
        .clone();

    let column = |name: &str| {
        headers
            .iter()
            .position(|h| h.trim() == name)
            .ok_or_else(|| parse_error(1, format!("missing header column '{}'", name)))
    };
    let name_idx = column(COLUMN_NAME_HEADER)?;
    let type_idx = column(SOURCE_TYPE_HEADER)?;
    let length_idx = column(MAX_LENGTH_HEADER)?;

    let mut columns = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| parse_error(csv_error_line(&e), e.to_string()))?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);

        let name = field(&record, name_idx);
        if name.is_empty() {
            return Err(parse_error(line, "empty column_name".to_string()));
        }

        let source_type = field(&record, type_idx);
        if source_type.is_empty() {
            return Err(parse_error(
                line,
                format!("empty udt_name for column '{}'", name),
            ));
        }

        let max_length = parse_max_length(field(&record, length_idx)).map_err(|raw| {
            parse_error(
                line,
                format!("invalid character_maximum_length '{}' for column '{}'", raw, name),
            )
        })?;

        columns.push(ColumnDescriptor::new(name, source_type, max_length));
    }

    Ok(columns)
}

fn field(record: &StringRecord, idx: usize) -> &str {
    record.get(idx).unwrap_or("")
}

/// Empty means unbounded; anything else must be a non-negative integer.
fn parse_max_length(raw: &str) -> std::result::Result<MaxLength, String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(MaxLength::Unbounded);
    }
    trimmed
        .parse::<u32>()
        .map(MaxLength::Bounded)
        .map_err(|_| raw.to_string())
}

fn csv_error_line(err: &csv::Error) -> u64 {
    err.position().map(|p| p.line()).unwrap_or(0)
}

/// Where a scanned character sits within a record.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Scan {
    FieldStart,
    Unquoted,
    Quoted,
    /// A quote seen inside a quoted field: closes it, or escapes a second one.
    QuoteInQuoted,
}

/// Line (1-based) on which a never-closed quoted field opens, if any.
///
/// Only a quote at the start of a field opens a quoted field; elsewhere it is
/// a literal character, as the csv reader treats it.
fn unterminated_quote_line(input: &str) -> Option<u64> {
    let quote = QUOTE as char;
    let delimiter = DELIMITER as char;
    let mut line = 1u64;
    let mut opened_at = 0u64;
    let mut state = Scan::FieldStart;

    for c in input.chars() {
        state = match (state, c) {
            (Scan::Quoted, c) if c == quote => Scan::QuoteInQuoted,
            (Scan::Quoted, _) => Scan::Quoted,
            (Scan::QuoteInQuoted, c) if c == quote => Scan::Quoted,
            (Scan::FieldStart, c) if c == quote => {
                opened_at = line;
                Scan::Quoted
            }
            (_, c) if c == delimiter || c == '\n' => Scan::FieldStart,
            _ => Scan::Unquoted,
        };
        if c == '\n' {
            line += 1;
        }
    }

    (state == Scan::Quoted).then_some(opened_at)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "column_name|udt_name|character_maximum_length";

    #[test]
    fn test_parse_basic_schema() {
        let input = format!("{}\nid|int8|\nemail|varchar|255\nbody|jsonb|\n", HEADER);
        let columns = parse_column_descriptors(&input).unwrap();
        assert_eq!(
            columns,
            vec![
                ColumnDescriptor::new("id", "int8", MaxLength::Unbounded),
                ColumnDescriptor::new("email", "varchar", MaxLength::Bounded(255)),
                ColumnDescriptor::new("body", "jsonb", MaxLength::Unbounded),
            ]
        );
    }

    #[test]
    fn test_header_only_yields_no_columns() {
        let columns = parse_column_descriptors(&format!("{}\n", HEADER)).unwrap();
        assert!(columns.is_empty());
    }

    #[test]
    fn test_quoted_field_may_contain_delimiter() {
        let input = format!("{}\n\"weird|name\"|text|\n", HEADER);
        let columns = parse_column_descriptors(&input).unwrap();
        assert_eq!(columns[0].name, "weird|name");
        assert_eq!(columns[0].source_type, "text");
    }

    #[test]
    fn test_doubled_quote_is_literal() {
        let input = format!("{}\n\"say \"\"hi\"\"\"|text|\n", HEADER);
        let columns = parse_column_descriptors(&input).unwrap();
        assert_eq!(columns[0].name, "say \"hi\"");
    }

    #[test]
    fn test_blank_lines_are_skipped() {
        let input = format!("{}\n\nid|int4|\n\n\ncode|char|10\n\n", HEADER);
        let columns = parse_column_descriptors(&input).unwrap();
        assert_eq!(columns.len(), 2);
        assert_eq!(columns[1], ColumnDescriptor::new("code", "char", MaxLength::Bounded(10)));
    }

    #[test]
    fn test_header_order_does_not_matter() {
        let input = "udt_name|character_maximum_length|column_name\nvarchar|32|slug\n";
        let columns = parse_column_descriptors(input).unwrap();
        assert_eq!(
            columns,
            vec![ColumnDescriptor::new("slug", "varchar", MaxLength::Bounded(32))]
        );
    }

    #[test]
    fn test_unterminated_quote_names_line() {
        let input = format!("{}\nid|int8|\n\"broken|text|\nother|text|\n", HEADER);
        match parse_column_descriptors(&input) {
            Err(PipelineError::Parse { line, message, .. }) => {
                assert_eq!(line, 3);
                assert!(message.contains("unterminated"));
            }
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_bare_quote_inside_field_is_literal() {
        let input = format!("{}\nsize_in\"|varchar|10\nnext|text|\n", HEADER);
        let columns = parse_column_descriptors(&input).unwrap();
        assert_eq!(columns.len(), 2);
        assert_eq!(columns[0].name, "size_in\"");
        assert_eq!(columns[0].max_length, MaxLength::Bounded(10));
        assert_eq!(columns[1].name, "next");
    }

    #[test]
    fn test_escaped_quotes_and_newline_in_quoted_field() {
        let input = format!("{}\n\"say \"\"hi\"\"\nthere\"|text|\nlast|int4|\n", HEADER);
        let columns = parse_column_descriptors(&input).unwrap();
        assert_eq!(columns[0].name, "say \"hi\"\nthere");
        assert_eq!(columns[1].name, "last");
    }

    #[test]
    fn test_missing_header_column() {
        let input = "column_name|udt_name\nid|int8\n";
        match parse_column_descriptors(input) {
            Err(PipelineError::Parse { line, message, .. }) => {
                assert_eq!(line, 1);
                assert!(message.contains(MAX_LENGTH_HEADER));
            }
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_wrong_field_count_is_error() {
        let input = format!("{}\nid|int8|\nname|text\n", HEADER);
        assert!(matches!(
            parse_column_descriptors(&input),
            Err(PipelineError::Parse { .. })
        ));
    }

    #[test]
    fn test_non_numeric_length_is_error() {
        let input = format!("{}\nid|varchar|abc\n", HEADER);
        match parse_column_descriptors(&input) {
            Err(PipelineError::Parse { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected parse error, got {:?}", other),
        }
        let negative = format!("{}\nid|varchar|-1\n", HEADER);
        assert!(parse_column_descriptors(&negative).is_err());
    }

    #[test]
    fn test_zero_length_is_kept() {
        let input = format!("{}\nflag|varchar|0\n", HEADER);
        let columns = parse_column_descriptors(&input).unwrap();
        assert_eq!(columns[0].max_length, MaxLength::Bounded(0));
    }

    #[test]
    fn test_empty_name_is_error() {
        let input = format!("{}\n|int8|\n", HEADER);
        assert!(parse_column_descriptors(&input).is_err());
    }

    #[test]
    fn test_round_trip_of_exported_metadata() {
        // Shape of `COPY (...) TO STDOUT DELIMITER '|' CSV HEADER` output
        let dumped = vec![
            ColumnDescriptor::new("id", "uuid", MaxLength::Unbounded),
            ColumnDescriptor::new("createdAt", "timestamptz", MaxLength::Unbounded),
            ColumnDescriptor::new("title", "varchar", MaxLength::Bounded(512)),
            ColumnDescriptor::new("a|b", "text", MaxLength::Unbounded),
        ];
        let mut text = format!("{}\n", HEADER);
        for col in &dumped {
            let name = if col.name.contains('|') {
                format!("\"{}\"", col.name)
            } else {
                col.name.clone()
            };
            let length = match col.max_length {
                MaxLength::Bounded(n) => n.to_string(),
                MaxLength::Unbounded => String::new(),
            };
            text.push_str(&format!("{}|{}|{}\n", name, col.source_type, length));
        }
        assert_eq!(parse_column_descriptors(&text).unwrap(), dumped);
    }

    #[test]
    fn test_read_column_descriptors_names_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("users_schema.csv");
        std::fs::write(&path, format!("{}\n\"open|text|\n", HEADER)).unwrap();
        match read_column_descriptors(&path) {
            Err(PipelineError::Parse { file, line, .. }) => {
                assert!(file.ends_with("users_schema.csv"));
                assert_eq!(line, 2);
            }
            other => panic!("expected parse error, got {:?}", other),
        }
    }
}
