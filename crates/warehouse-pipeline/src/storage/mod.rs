//! Staging layout in object storage.
//!
//! Every app stages under `{app}-warehouse-pipeline/`, with one data file
//! `{table}.csv` and one schema file `{table}_schema.csv` per table.

use std::collections::HashSet;

use crate::core::identifier::base_table_name;
use crate::core::schema::{TableExportUnit, DATA_FILE_EXTENSION, SCHEMA_FILE_SUFFIX};
use crate::error::PipelineError;

/// Suffix of the per-app staging folder.
pub const STAGING_FOLDER_SUFFIX: &str = "-warehouse-pipeline";

/// Kind of staged artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Data,
    Schema,
}

/// A staged object recognized as part of a table export unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedObject {
    pub key: String,
    pub file_name: String,
    pub table: String,
    pub kind: ArtifactKind,
}

/// Result of pairing staged objects into units.
#[derive(Debug, Default)]
pub struct StagedUnits {
    /// Units with both files staged, in order of first appearance.
    pub complete: Vec<TableExportUnit>,
    /// Tables with only one file staged.
    pub incomplete: Vec<PipelineError>,
    /// Every recognized object, in listing order.
    pub objects: Vec<StagedObject>,
}

/// Object key layout for one app.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagingLayout {
    app: String,
}

impl StagingLayout {
    pub fn new(app: impl Into<String>) -> Self {
        Self { app: app.into() }
    }

    /// Listing prefix, including the trailing slash.
    pub fn prefix(&self) -> String {
        format!("{}{}/", self.app, STAGING_FOLDER_SUFFIX)
    }

    /// Key of a staged file.
    pub fn key(&self, file_name: &str) -> String {
        format!("{}{}", self.prefix(), file_name)
    }

    /// Recognize a listed key. Returns `None` for keys outside the staging
    /// folder, nested keys and files that are not staged CSVs.
    pub fn classify(&self, key: &str) -> Option<StagedObject> {
        let file_name = key.strip_prefix(&self.prefix())?;
        if file_name.is_empty() || file_name.contains('/') {
            return None;
        }

        let kind = if file_name.ends_with(SCHEMA_FILE_SUFFIX) {
            ArtifactKind::Schema
        } else if file_name.ends_with(DATA_FILE_EXTENSION) {
            ArtifactKind::Data
        } else {
            return None;
        };

        let table = base_table_name(file_name);
        if table.is_empty() {
            return None;
        }

        Some(StagedObject {
            key: key.to_string(),
            file_name: file_name.to_string(),
            table: table.to_string(),
            kind,
        })
    }

    /// Classify listed keys and pair them into table export units.
    ///
    /// `{t}_schema.csv` reads as the schema file of `{t}`, unless
    /// `{t}_schema_schema.csv` is listed too: then it is the data file of a
    /// table named `{t}_schema`.
    pub fn group(&self, keys: &[String]) -> StagedUnits {
        let mut objects: Vec<StagedObject> =
            keys.iter().filter_map(|k| self.classify(k)).collect();

        let file_names: HashSet<String> = objects.iter().map(|o| o.file_name.clone()).collect();
        for obj in objects.iter_mut().filter(|o| o.kind == ArtifactKind::Schema) {
            let Some(stem) = obj.file_name.strip_suffix(DATA_FILE_EXTENSION) else {
                continue;
            };
            if file_names.contains(&format!("{}{}", stem, SCHEMA_FILE_SUFFIX)) {
                obj.table = stem.to_string();
                obj.kind = ArtifactKind::Data;
            }
        }

        let mut tables: Vec<(&str, bool, bool)> = Vec::new();
        for obj in &objects {
            let idx = match tables.iter().position(|(t, _, _)| *t == obj.table) {
                Some(idx) => idx,
                None => {
                    tables.push((&obj.table, false, false));
                    tables.len() - 1
                }
            };
            match obj.kind {
                ArtifactKind::Data => tables[idx].1 = true,
                ArtifactKind::Schema => tables[idx].2 = true,
            }
        }

        let mut complete = Vec::new();
        let mut incomplete = Vec::new();
        for (table, has_data, has_schema) in tables {
            match (has_data, has_schema) {
                (true, true) => complete.push(TableExportUnit::new(table)),
                (true, false) => incomplete.push(PipelineError::IncompleteUnit {
                    table: table.to_string(),
                    missing: "schema",
                }),
                _ => incomplete.push(PipelineError::IncompleteUnit {
                    table: table.to_string(),
                    missing: "data",
                }),
            }
        }

        StagedUnits {
            complete,
            incomplete,
            objects,
        }
    }
}
