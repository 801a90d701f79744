//! Ignored-table filter applied before export.

use std::collections::HashSet;

/// Bookkeeping and internal metadata tables that are never exported.
pub const DEFAULT_IGNORED_TABLES: &[&str] = &[
    "knex_migrations",
    "knex_migrations_lock",
    "awsdms_ddl_audit",
    "authorLabelSets",
    "authorSettings",
    "SequelizeMeta",
];

/// Set of table names excluded from export. Matching is exact and
/// case-sensitive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableFilter {
    ignored: HashSet<String>,
}

impl TableFilter {
    /// Create a filter ignoring exactly the given tables.
    pub fn new<I, S>(ignored: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            ignored: ignored.into_iter().map(Into::into).collect(),
        }
    }

    /// Filter with the built-in ignore set.
    pub fn builtin() -> Self {
        Self::new(DEFAULT_IGNORED_TABLES.iter().copied())
    }

    /// Add more tables to ignore.
    pub fn with_ignored<I, S>(mut self, tables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ignored.extend(tables.into_iter().map(Into::into));
        self
    }

    pub fn is_ignored(&self, table: &str) -> bool {
        self.ignored.contains(table)
    }

    /// Remove ignored tables, keeping the relative order of the rest.
    pub fn apply(&self, tables: Vec<String>) -> Vec<String> {
        tables
            .into_iter()
            .filter(|t| !self.is_ignored(t))
            .collect()
    }
}

impl Default for TableFilter {
    fn default() -> Self {
        Self::builtin()
    }
}
