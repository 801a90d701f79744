//! Pipeline orchestrator - runs export and restore.
//!
//! Each phase runs over every table before the next phase starts, so for any
//! table the drop precedes the create, which precedes the load.

mod report;

pub use report::{RunReport, RunStatus, Step, StepRecord};

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::config::{Config, FailurePolicy, RunMode};
use crate::core::identifier::target_table_name;
use crate::core::schema::TableExportUnit;
use crate::core::traits::{ObjectStore, SourceDatabase, Warehouse};
use crate::core::TableFilter;
use crate::ddl::{DdlGenerator, DropTable};
use crate::drivers::{PgSource, RedshiftWarehouse, S3Store};
use crate::error::{PipelineError, Result};
use crate::load::CopyCommand;
use crate::parser::read_column_descriptors;
use crate::source::{dump_schema_sql, dump_table_sql, list_tables_sql};
use crate::storage::StagingLayout;
use crate::typemap::TypeMapping;

/// Pipeline orchestrator.
pub struct Orchestrator {
    config: Config,
    store: Arc<dyn ObjectStore>,
    source: Option<Arc<dyn SourceDatabase>>,
    warehouse: Option<Arc<dyn Warehouse>>,
    mapping: TypeMapping,
    filter: TableFilter,
}

impl Orchestrator {
    /// Create an orchestrator over an object store. Source and warehouse are
    /// attached with [`with_source`](Self::with_source) and
    /// [`with_warehouse`](Self::with_warehouse).
    pub fn new(config: Config, store: Arc<dyn ObjectStore>) -> Self {
        let filter =
            TableFilter::builtin().with_ignored(config.pipeline.extra_ignore_tables.iter());
        Self {
            config,
            store,
            source: None,
            warehouse: None,
            mapping: TypeMapping::builtin(),
            filter,
        }
    }

    /// Validate the configuration and connect the collaborators a mode needs.
    pub async fn connect(config: Config, mode: RunMode) -> Result<Self> {
        config.validate(mode)?;

        let store = S3Store::connect(&config.storage).await?;
        let orchestrator = Self::new(config, Arc::new(store));

        match mode {
            RunMode::Export => {
                let source = PgSource::connect(&orchestrator.config.source).await?;
                Ok(orchestrator.with_source(Arc::new(source)))
            }
            RunMode::Restore => {
                let warehouse = RedshiftWarehouse::connect(&orchestrator.config.warehouse).await?;
                Ok(orchestrator.with_warehouse(Arc::new(warehouse)))
            }
        }
    }

    pub fn with_source(mut self, source: Arc<dyn SourceDatabase>) -> Self {
        self.source = Some(source);
        self
    }

    pub fn with_warehouse(mut self, warehouse: Arc<dyn Warehouse>) -> Self {
        self.warehouse = Some(warehouse);
        self
    }

    /// Replace the built-in type mapping.
    pub fn with_type_mapping(mut self, mapping: TypeMapping) -> Self {
        self.mapping = mapping;
        self
    }

    /// Replace the table filter, including the extras from configuration.
    pub fn with_table_filter(mut self, filter: TableFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run the given mode.
    pub async fn run(&self, mode: RunMode) -> Result<RunReport> {
        match mode {
            RunMode::Export => self.export().await,
            RunMode::Restore => self.restore().await,
        }
    }

    /// Dump every non-ignored source table and stage it in object storage.
    pub async fn export(&self) -> Result<RunReport> {
        let source = self.source.as_ref().ok_or_else(|| {
            PipelineError::Config("export requires a source database".into())
        })?;

        let mut report = RunReport::new(RunMode::Export);
        let schema = &self.config.source.schema;
        let layout = StagingLayout::new(&self.config.app);
        info!("Starting export run: {}", report.run_id);

        tokio::fs::create_dir_all(&self.config.pipeline.work_dir).await?;

        info!("Phase 1: Listing tables in schema {}", schema);
        let listed = match source.query_lines(&list_tables_sql(schema)).await {
            Ok(tables) => {
                report.record(Step::ListTables, None, None);
                tables
            }
            Err(e) => {
                error!("Listing source tables failed - {}", e);
                report.record(Step::ListTables, None, Some(e.to_string()));
                return Err(e);
            }
        };

        let listed_count = listed.len();
        let units: Vec<TableExportUnit> = self
            .filter
            .apply(listed)
            .into_iter()
            .map(TableExportUnit::new)
            .collect();
        info!(
            "Found {} tables to export ({} ignored)",
            units.len(),
            listed_count - units.len()
        );

        info!("Phase 2: Dumping tables");
        for unit in &units {
            let data_path = self.work_path(&unit.data_file);
            let result = match dump_table_sql(schema, &unit.table) {
                Ok(sql) => {
                    debug!("{}: {}", unit.table, sql);
                    source.copy_to_file(&sql, &data_path).await
                }
                Err(e) => Err(e),
            };
            let Some(bytes) = self.settle(&mut report, Step::DumpData, &unit.table, result)? else {
                continue;
            };
            debug!("{}: dumped {} bytes of data", unit.table, bytes);

            let sql = dump_schema_sql(schema, &unit.table);
            debug!("{}: {}", unit.table, sql);
            let result = source
                .copy_to_file(&sql, &self.work_path(&unit.schema_file))
                .await;
            self.settle(&mut report, Step::DumpSchema, &unit.table, result)?;
        }

        info!("Phase 3: Uploading to {}", layout.prefix());
        for unit in &units {
            if report.is_failed(&unit.table) {
                continue;
            }

            let result = self
                .store
                .upload(&self.work_path(&unit.data_file), &layout.key(&unit.data_file))
                .await;
            if self
                .settle(&mut report, Step::UploadData, &unit.table, result)?
                .is_none()
            {
                continue;
            }

            let result = self
                .store
                .upload(
                    &self.work_path(&unit.schema_file),
                    &layout.key(&unit.schema_file),
                )
                .await;
            self.settle(&mut report, Step::UploadSchema, &unit.table, result)?;
        }

        info!("Phase 4: Cleaning up local files");
        self.cleanup_local(&mut report, &units).await;

        report.finish(units.len());
        self.log_summary(&report);
        Ok(report)
    }

    /// Load every staged table into the warehouse.
    pub async fn restore(&self) -> Result<RunReport> {
        let warehouse = self.warehouse.as_ref().ok_or_else(|| {
            PipelineError::Config("restore requires a warehouse".into())
        })?;

        let mut report = RunReport::new(RunMode::Restore);
        let app = &self.config.app;
        let layout = StagingLayout::new(app);
        info!("Starting restore run: {}", report.run_id);

        tokio::fs::create_dir_all(&self.config.pipeline.work_dir).await?;

        info!("Phase 1: Listing staged objects under {}", layout.prefix());
        let keys = match self.store.list(&layout.prefix()).await {
            Ok(keys) => {
                report.record(Step::ListStaged, None, None);
                keys
            }
            Err(e) => {
                error!("Listing staged objects failed - {}", e);
                report.record(Step::ListStaged, None, Some(e.to_string()));
                return Err(e);
            }
        };

        let staged = layout.group(&keys);
        for err in &staged.incomplete {
            if let PipelineError::IncompleteUnit { table, .. } = err {
                warn!("{}: {}", table, err);
                report.record(Step::ListStaged, Some(table.as_str()), Some(err.to_string()));
                report.mark_failed(table);
            }
        }
        let units = staged.complete;
        let tables_total = units.len() + staged.incomplete.len();
        info!(
            "Found {} staged tables ({} incomplete)",
            tables_total,
            staged.incomplete.len()
        );

        info!("Phase 2: Downloading staged files");
        for unit in &units {
            for file in [&unit.data_file, &unit.schema_file] {
                let result = self
                    .store
                    .download(&layout.key(file), &self.work_path(file))
                    .await;
                if self
                    .settle(&mut report, Step::Download, &unit.table, result)?
                    .is_none()
                {
                    break;
                }
            }
        }

        info!("Phase 3: Dropping existing tables");
        for unit in &units {
            if report.is_failed(&unit.table) {
                continue;
            }
            let target = target_table_name(app, &unit.table);
            let result = match DropTable::new(&target).to_sql() {
                Ok(sql) => {
                    debug!("{}: {}", unit.table, sql);
                    warehouse.execute(&sql).await
                }
                Err(e) => Err(e),
            };
            self.settle(&mut report, Step::DropExisting, &unit.table, result)?;
        }

        info!("Phase 4: Creating tables");
        let generator = DdlGenerator::new(&self.mapping).strict(self.config.pipeline.strict_ddl);
        for unit in &units {
            if report.is_failed(&unit.table) {
                continue;
            }
            let target = target_table_name(app, &unit.table);
            let schema_path = self.work_path(&unit.schema_file);
            let result = async {
                let columns = read_column_descriptors(&schema_path)?;
                let sql = generator.create_table(&target, &columns)?.to_sql()?;
                debug!("{}: {}", unit.table, sql);
                warehouse.execute(&sql).await
            }
            .await;
            self.settle(&mut report, Step::CreateTable, &unit.table, result)?;
        }

        info!("Phase 5: Loading data");
        for unit in &units {
            if report.is_failed(&unit.table) {
                continue;
            }
            let target = target_table_name(app, &unit.table);
            let source_uri = self.store.object_uri(&layout.key(&unit.data_file));
            let command = CopyCommand::new(&target, source_uri, &self.config.warehouse.iam_role)
                .with_region(&self.config.storage.region);
            let result = match command.to_sql() {
                Ok(sql) => {
                    debug!("{}: {}", unit.table, sql);
                    warehouse.execute(&sql).await
                }
                Err(e) => Err(e),
            };
            if self
                .settle(&mut report, Step::LoadData, &unit.table, result)?
                .is_some()
            {
                info!("{}: loaded into {}", unit.table, target);
            }
        }

        info!("Phase 6: Deleting restored staged objects");
        for unit in &units {
            if report.is_failed(&unit.table) {
                warn!("{}: keeping staged objects for a re-run", unit.table);
                continue;
            }
            for file in [&unit.data_file, &unit.schema_file] {
                let result = self.store.delete(&layout.key(file)).await;
                if self
                    .settle(&mut report, Step::DeleteStaged, &unit.table, result)?
                    .is_none()
                {
                    break;
                }
            }
        }

        info!("Phase 7: Cleaning up local files");
        self.cleanup_local(&mut report, &units).await;

        report.finish(tables_total);
        self.log_summary(&report);
        Ok(report)
    }

    /// Record a step outcome and apply the failure policy.
    ///
    /// Returns `Ok(None)` when the table failed but the run goes on.
    fn settle<T>(
        &self,
        report: &mut RunReport,
        step: Step,
        table: &str,
        result: Result<T>,
    ) -> Result<Option<T>> {
        match result {
            Ok(value) => {
                report.record(step, Some(table), None);
                Ok(Some(value))
            }
            Err(e) => {
                error!("{}: {} failed - {}", table, step, e);
                report.record(step, Some(table), Some(e.to_string()));
                report.mark_failed(table);

                if e.is_table_local() || self.config.pipeline.failure_policy == FailurePolicy::Continue
                {
                    Ok(None)
                } else {
                    Err(e)
                }
            }
        }
    }

    /// Remove the local files of every unit. Failures are logged, never fatal.
    async fn cleanup_local(&self, report: &mut RunReport, units: &[TableExportUnit]) {
        if self.config.pipeline.keep_local_files {
            info!(
                "Keeping local files in {}",
                self.config.pipeline.work_dir.display()
            );
            return;
        }

        for unit in units {
            let mut failure = None;
            for file in [&unit.data_file, &unit.schema_file] {
                let path = self.work_path(file);
                match tokio::fs::remove_file(&path).await {
                    Ok(()) => debug!("Removed {}", path.display()),
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                    Err(e) => {
                        warn!("Failed to remove {}: {}", path.display(), e);
                        failure = Some(format!("{}: {}", path.display(), e));
                    }
                }
            }
            report.record(Step::CleanupLocal, Some(unit.table.as_str()), failure);
        }
    }

    fn work_path(&self, file_name: &str) -> PathBuf {
        self.config.pipeline.work_dir.join(file_name)
    }

    fn log_summary(&self, report: &RunReport) {
        info!(
            "{} run {} finished in {:.1}s: {} of {} tables succeeded",
            report.mode,
            report.run_id,
            report.duration_seconds,
            report.tables_success,
            report.tables_total
        );
        if !report.failed_tables.is_empty() {
            warn!("Failed tables: {}", report.failed_tables.join(", "));
        }
    }
}
