//! Error types for the pipeline library.

use thiserror::Error;

use crate::config::RunMode;

/// Main error type for pipeline operations.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Configuration error (invalid YAML, missing fields, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Staged schema file could not be parsed
    #[error("Parse error in {file} at line {line}: {message}")]
    Parse {
        file: String,
        line: u64,
        message: String,
    },

    /// DDL could not be generated for a table
    #[error("Generation failed for table {table}: {message}")]
    Generation { table: String, message: String },

    /// Identifier rejected before quoting
    #[error("Invalid identifier: {0}")]
    Identifier(String),

    /// Staged table is missing its data or schema file
    #[error("Staged table {table} has no {missing} file")]
    IncompleteUnit { table: String, missing: &'static str },

    /// A collaborator (source database, warehouse, object storage) call failed
    #[error("{collaborator} call failed ({context}): {message}")]
    External {
        collaborator: &'static str,
        context: String,
        message: String,
    },

    /// Connection pool error with context
    #[error("Pool error: {message}\n  Context: {context}")]
    Pool { message: String, context: String },

    /// One or more tables failed during the run
    #[error("{mode} finished with {failed} of {total} tables failed")]
    RunFailed {
        mode: RunMode,
        failed: usize,
        total: usize,
    },

    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PipelineError {
    /// Create a Pool error with context about where it occurred
    pub fn pool(message: impl std::fmt::Display, context: impl Into<String>) -> Self {
        PipelineError::Pool {
            message: message.to_string(),
            context: context.into(),
        }
    }

    /// Create an External error for a failed collaborator call.
    pub fn external(
        collaborator: &'static str,
        context: impl Into<String>,
        message: impl std::fmt::Display,
    ) -> Self {
        PipelineError::External {
            collaborator,
            context: context.into(),
            message: message.to_string(),
        }
    }

    /// Create a Generation error
    pub fn generation(table: impl Into<String>, message: impl Into<String>) -> Self {
        PipelineError::Generation {
            table: table.into(),
            message: message.into(),
        }
    }

    /// Whether the error only concerns the table being processed.
    ///
    /// Table-local errors never stop the run, whatever the failure policy.
    pub fn is_table_local(&self) -> bool {
        matches!(
            self,
            PipelineError::Parse { .. }
                | PipelineError::Generation { .. }
                | PipelineError::Identifier(_)
                | PipelineError::IncompleteUnit { .. }
        )
    }

    /// Process exit code for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            PipelineError::RunFailed { .. } => 1,
            PipelineError::Config(_) => 2,
            PipelineError::Parse { .. }
            | PipelineError::Generation { .. }
            | PipelineError::Identifier(_)
            | PipelineError::IncompleteUnit { .. } => 3,
            PipelineError::External { .. } | PipelineError::Pool { .. } => 4,
            PipelineError::Io(_) | PipelineError::Yaml(_) | PipelineError::Json(_) => 5,
        }
    }

    /// Format error with full details including error chain
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;
