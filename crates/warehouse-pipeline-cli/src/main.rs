//! warehouse-pipeline CLI - PostgreSQL to Redshift through S3 staging.

use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{info, Level};
use warehouse_pipeline::core::identifier::{base_table_name, target_table_name};
use warehouse_pipeline::parser::read_column_descriptors;
use warehouse_pipeline::storage::StagingLayout;
use warehouse_pipeline::{
    Config, CopyCommand, DdlGenerator, FailurePolicy, Orchestrator, PipelineError, RunMode,
    RunReport, TableExportUnit, TypeMapping,
};

#[derive(Parser)]
#[command(name = "warehouse-pipeline")]
#[command(about = "Export PostgreSQL tables to S3 and restore them into Redshift")]
#[command(version)]
struct Cli {
    /// Path to YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output JSON result to stdout
    #[arg(long)]
    output_json: bool,

    /// Log format: text or json
    #[arg(long, default_value = "text")]
    log_format: String,

    /// Log verbosity: debug, info, warn, error
    #[arg(long, default_value = "info")]
    verbosity: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Dump source tables and stage them in S3
    Export(RunArgs),

    /// Load staged tables into Redshift
    Restore(RunArgs),

    /// Print the CREATE TABLE (and COPY) for a local schema file
    Ddl {
        /// Application prefix used in the target table name
        #[arg(long)]
        app: String,

        /// Staged schema file ({table}_schema.csv)
        #[arg(long)]
        schema_file: PathBuf,

        /// Staging bucket; with --iam-role, also prints the COPY statement
        #[arg(long, requires = "iam_role")]
        bucket: Option<String>,

        /// IAM role the warehouse assumes to read the bucket
        #[arg(long, requires = "bucket")]
        iam_role: Option<String>,

        /// Bucket region
        #[arg(long, default_value = "us-east-1")]
        region: String,

        /// Reject empty column lists and zero lengths
        #[arg(long)]
        strict: bool,
    },
}

/// Overrides applied on top of the configuration file.
#[derive(Args, Default)]
struct RunArgs {
    /// Override application prefix
    #[arg(long)]
    app: Option<String>,

    /// Override staging bucket
    #[arg(long)]
    bucket: Option<String>,

    /// Override bucket region
    #[arg(long)]
    region: Option<String>,

    /// Override warehouse IAM role
    #[arg(long)]
    iam_role: Option<String>,

    /// Override source host
    #[arg(long)]
    pg_host: Option<String>,

    /// Override source port
    #[arg(long)]
    pg_port: Option<u16>,

    /// Override source user
    #[arg(long)]
    pg_user: Option<String>,

    /// Override source database
    #[arg(long)]
    pg_db: Option<String>,

    /// Override source schema
    #[arg(long)]
    pg_schema: Option<String>,

    /// Source password
    #[arg(long, env = "PGPASSWORD", hide_env_values = true)]
    pg_password: Option<String>,

    /// Override warehouse host
    #[arg(long)]
    rs_host: Option<String>,

    /// Override warehouse port
    #[arg(long)]
    rs_port: Option<u16>,

    /// Override warehouse user
    #[arg(long)]
    rs_user: Option<String>,

    /// Override warehouse database
    #[arg(long)]
    rs_db: Option<String>,

    /// Warehouse password
    #[arg(long, env = "REDSHIFT_PASSWORD", hide_env_values = true)]
    rs_password: Option<String>,

    /// Override local work directory
    #[arg(long)]
    work_dir: Option<PathBuf>,

    /// Reject empty column lists and zero lengths
    #[arg(long)]
    strict: bool,

    /// Stop at the first failed call instead of skipping the table
    #[arg(long)]
    abort_on_error: bool,
}

impl RunArgs {
    fn apply(self, config: &mut Config) {
        if let Some(app) = self.app {
            config.app = app;
        }
        if let Some(bucket) = self.bucket {
            config.storage.bucket = bucket;
        }
        if let Some(region) = self.region {
            config.storage.region = region;
        }
        if let Some(role) = self.iam_role {
            config.warehouse.iam_role = role;
        }

        if let Some(host) = self.pg_host {
            config.source.host = host;
        }
        if let Some(port) = self.pg_port {
            config.source.port = port;
        }
        if let Some(user) = self.pg_user {
            config.source.user = user;
        }
        if let Some(db) = self.pg_db {
            config.source.database = db;
        }
        if let Some(schema) = self.pg_schema {
            config.source.schema = schema;
        }
        if self.pg_password.is_some() {
            config.source.password = self.pg_password;
        }

        if let Some(host) = self.rs_host {
            config.warehouse.host = host;
        }
        if let Some(port) = self.rs_port {
            config.warehouse.port = port;
        }
        if let Some(user) = self.rs_user {
            config.warehouse.user = user;
        }
        if let Some(db) = self.rs_db {
            config.warehouse.database = db;
        }
        if self.rs_password.is_some() {
            config.warehouse.password = self.rs_password;
        }

        if let Some(dir) = self.work_dir {
            config.pipeline.work_dir = dir;
        }
        if self.strict {
            config.pipeline.strict_ddl = true;
        }
        if self.abort_on_error {
            config.pipeline.failure_policy = FailurePolicy::Abort;
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e.format_detailed());
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run() -> Result<(), PipelineError> {
    let cli = Cli::parse();

    setup_logging(&cli.verbosity, &cli.log_format);

    let (mode, overrides) = match cli.command {
        Commands::Ddl {
            app,
            schema_file,
            bucket,
            iam_role,
            region,
            strict,
        } => {
            let staging = bucket.zip(iam_role);
            return print_ddl(&app, &schema_file, staging, &region, strict);
        }
        Commands::Export(overrides) => (RunMode::Export, overrides),
        Commands::Restore(overrides) => (RunMode::Restore, overrides),
    };

    let mut config = match cli.config {
        Some(ref path) => {
            let config = Config::load(path)?;
            info!("Loaded configuration from {:?}", path);
            config
        }
        None => Config::default(),
    };
    overrides.apply(&mut config);

    let orchestrator = Orchestrator::connect(config, mode).await?;
    let report = orchestrator.run(mode).await?;

    if cli.output_json {
        println!("{}", report.to_json()?);
    } else {
        print_summary(&report);
    }

    if report.is_success() {
        Ok(())
    } else {
        Err(PipelineError::RunFailed {
            mode,
            failed: report.tables_failed,
            total: report.tables_total,
        })
    }
}

/// Render the statements a restore would run for one staged schema file.
fn print_ddl(
    app: &str,
    schema_file: &Path,
    staging: Option<(String, String)>,
    region: &str,
    strict: bool,
) -> Result<(), PipelineError> {
    let file_name = schema_file
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .ok_or_else(|| {
            PipelineError::Config(format!("not a file: {}", schema_file.display()))
        })?;

    let columns = read_column_descriptors(schema_file)?;
    let target = target_table_name(app, &file_name);
    let mapping = TypeMapping::builtin();
    let create = DdlGenerator::new(&mapping)
        .strict(strict)
        .create_table(&target, &columns)?;
    println!("{};", create.to_sql()?);

    if let Some((bucket, iam_role)) = staging {
        let unit = TableExportUnit::new(base_table_name(&file_name));
        let key = StagingLayout::new(app).key(&unit.data_file);
        let copy = CopyCommand::new(&target, format!("s3://{}/{}", bucket, key), iam_role)
            .with_region(region);
        println!("{};", copy.to_sql()?);
    }

    Ok(())
}

fn print_summary(report: &RunReport) {
    let verb = match report.mode {
        RunMode::Export => "Export",
        RunMode::Restore => "Restore",
    };
    let outcome = if report.is_success() {
        "completed"
    } else {
        "finished with failures"
    };
    println!("\n{} {}", verb, outcome);
    println!("  Run ID: {}", report.run_id);
    println!("  Duration: {:.2}s", report.duration_seconds);
    println!("  Tables: {}/{}", report.tables_success, report.tables_total);
    if !report.failed_tables.is_empty() {
        println!("  Failed tables: {:?}", report.failed_tables);
    }
}

fn setup_logging(verbosity: &str, format: &str) {
    let level = match verbosity.to_lowercase().as_str() {
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    // Logs go to stderr so stdout carries only results
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false);

    if format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}
