mod config;
mod registry;

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;
use uuid::Uuid;

use config::{ConfigError, FileConfig, Overrides, Settings};
use registry::{RunContext, RunPaths, init_run_logging, start_run, write_report};
use tabload_codec::{CodecError, resolve_encoding};
use tabload_core::{ColumnDefinition, Error as CoreError, redact_connection_string};
use tabload_introspect::{Catalog, CatalogOptions, PostgresCatalog};
use tabload_load::{
    ExportOptions, ImportOptions, ImportReport, ImportRun, LoadError, LoadOptions, PgExporter,
    PgSinkProvider, RealignOptions, RealignReport, SequenceRealigner, write_script,
};

#[derive(Debug, Error)]
enum CliError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("registry error: {0}")]
    Registry(#[from] registry::RegistryError),
    #[error("core error: {0}")]
    Core(#[from] CoreError),
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),
    #[error("load error: {0}")]
    Load(#[from] LoadError),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{0}")]
    Incomplete(String),
}

#[derive(Parser, Debug)]
#[command(name = "tabload", version, about = "Load delimited text into database tables and back")]
struct Cli {
    /// Configuration file (default: ./tabload.toml when present).
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Output directory for run artifacts.
    #[arg(long, global = true, default_value = "runs")]
    run_dir: PathBuf,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Replace table contents with the data files of a folder.
    Import(ImportArgs),
    /// Write tables out to a timestamped folder.
    Export(ExportArgs),
    /// Write a script that moves key sequences past the loaded data.
    Realign(RealignArgs),
    /// Print the column definitions of a table as JSON.
    Describe(DescribeArgs),
}

#[derive(Args, Debug, Default)]
struct ConnectionArgs {
    /// Database connection string.
    #[arg(long, value_name = "CONNECTION_STRING")]
    conn: Option<String>,
    /// Schema holding the tables.
    #[arg(long)]
    schema: Option<String>,
}

#[derive(Args, Debug)]
struct ImportArgs {
    #[command(flatten)]
    connection: ConnectionArgs,
    /// Folder with one `<TABLE>.csv` per table.
    #[arg(long)]
    folder: Option<PathBuf>,
    /// Rows per transaction.
    #[arg(long)]
    batch_size: Option<usize>,
    /// Text encoding label of the data files.
    #[arg(long)]
    encoding: Option<String>,
    /// Only import these tables.
    #[arg(long = "table", value_name = "TABLE")]
    tables: Vec<String>,
    /// Check key sequences of loaded tables afterwards.
    #[arg(long, default_value_t = false)]
    realign: bool,
    #[arg(long)]
    key_prefix: Option<String>,
    /// Where to write the realignment script.
    #[arg(long)]
    script: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct ExportArgs {
    #[command(flatten)]
    connection: ConnectionArgs,
    /// Parent folder of the export directory.
    #[arg(long)]
    folder: Option<PathBuf>,
    #[arg(long)]
    encoding: Option<String>,
    /// Only export these tables.
    #[arg(long = "table", value_name = "TABLE")]
    tables: Vec<String>,
}

#[derive(Args, Debug)]
struct RealignArgs {
    #[command(flatten)]
    connection: ConnectionArgs,
    /// Tables to check; all tables of the schema when omitted.
    #[arg(long = "table", value_name = "TABLE")]
    tables: Vec<String>,
    #[arg(long)]
    key_prefix: Option<String>,
    #[arg(long)]
    script: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct DescribeArgs {
    #[command(flatten)]
    connection: ConnectionArgs,
    table: String,
}

/// Report written for `import`, with the optional realignment outcome.
#[derive(Debug, Serialize)]
struct ImportRunReport {
    import: ImportReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    realign: Option<RealignRunReport>,
}

#[derive(Debug, Serialize)]
struct RealignRunReport {
    script: PathBuf,
    #[serde(flatten)]
    report: RealignReport,
}

#[derive(Debug, Serialize)]
struct TableDescription<'a> {
    table: &'a str,
    columns: &'a [ColumnDefinition],
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let cli = Cli::parse();
    let file = FileConfig::load(cli.config.as_deref())?;

    match cli.command {
        Command::Import(args) => run_import(file, cli.run_dir, args).await,
        Command::Export(args) => run_export(file, cli.run_dir, args).await,
        Command::Realign(args) => run_realign(file, cli.run_dir, args).await,
        Command::Describe(args) => run_describe(file, cli.run_dir, args).await,
    }
}

fn overrides(connection: ConnectionArgs) -> Overrides {
    Overrides {
        connection_string: connection.conn,
        schema: connection.schema,
        ..Overrides::default()
    }
}

struct Session {
    settings: Settings,
    paths: RunPaths,
    pool: PgPool,
    catalog: PostgresCatalog,
    started: Instant,
}

/// Resolve settings, open the run directory and logging, then connect.
async fn open_session(
    command: &'static str,
    file: FileConfig,
    run_dir: PathBuf,
    overrides: Overrides,
) -> Result<Session, CliError> {
    let settings = Settings::resolve(file, |name| std::env::var(name).ok(), overrides)?;

    let run_id = Uuid::new_v4().to_string();
    let ctx = RunContext {
        run_id: run_id.clone(),
        started_at: chrono::Utc::now(),
        command,
        run_dir,
        connection: redact_connection_string(&settings.connection_string),
    };
    let paths = start_run(&ctx, &settings)?;
    init_run_logging(&paths.logs_path)?;

    tracing::info!(
        event = "run_started",
        run_id = %run_id,
        command,
        engine = settings.engine,
        schema = %settings.schema,
        connection = %ctx.connection.redacted,
    );

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(10))
        .connect(&settings.connection_string)
        .await?;

    let catalog = PostgresCatalog::new(
        pool.clone(),
        CatalogOptions {
            schema: settings.schema.clone(),
        },
    );

    Ok(Session {
        settings,
        paths,
        pool,
        catalog,
        started: Instant::now(),
    })
}

impl Session {
    fn finish<T: Serialize>(&self, report: &T, failures: usize) -> Result<(), CliError> {
        write_report(&self.paths, report)?;
        let duration_ms = self.started.elapsed().as_millis() as u64;
        let status = if failures == 0 { "success" } else { "incomplete" };
        tracing::info!(
            event = "run_finished",
            status,
            failures,
            duration_ms,
            report = %self.paths.report_path.display(),
        );

        if failures > 0 {
            return Err(CliError::Incomplete(format!(
                "{failures} table(s) failed, see {}",
                self.paths.report_path.display()
            )));
        }
        Ok(())
    }

    fn script_path(&self) -> PathBuf {
        self.settings
            .script
            .clone()
            .unwrap_or_else(|| self.paths.root.join("realign.sql"))
    }

    async fn realign(&self, tables: &[String]) -> Result<RealignRunReport, CliError> {
        let options = RealignOptions {
            key_prefix: self.settings.key_prefix.clone(),
        };
        let report = SequenceRealigner::new(&self.catalog, options)
            .realign_tables(tables)
            .await;

        let script = self.script_path();
        write_script(&script, &self.settings.schema, &report.entries)?;
        tracing::info!(
            event = "realign_script_written",
            path = %script.display(),
            sequences = report.entries.len(),
            skipped = report.skipped.len(),
        );
        Ok(RealignRunReport { script, report })
    }
}

/// Raise `flag` on Ctrl-C so loads stop between batches.
fn abort_on_ctrl_c(flag: Arc<AtomicBool>) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!(event = "abort_requested", "finishing current batch, then stopping");
            flag.store(true, Ordering::SeqCst);
        }
    });
}

async fn run_import(file: FileConfig, run_dir: PathBuf, args: ImportArgs) -> Result<(), CliError> {
    let overrides = Overrides {
        import_folder: args.folder,
        batch_size: args.batch_size,
        encoding: args.encoding,
        key_prefix: args.key_prefix,
        script: args.script,
        ..overrides(args.connection)
    };
    let session = open_session("import", file, run_dir, overrides).await?;
    let settings = &session.settings;

    let abort = Arc::new(AtomicBool::new(false));
    abort_on_ctrl_c(Arc::clone(&abort));

    let options = ImportOptions {
        folder: settings.import_folder.clone(),
        encoding: resolve_encoding(&settings.import_encoding)?,
        load: LoadOptions {
            batch_size: settings.batch_size,
            abort: Some(abort),
        },
        tables: args.tables,
    };

    let sinks = PgSinkProvider::new(session.pool.clone(), settings.schema.clone());
    let import = ImportRun::new(&session.catalog, &sinks).run(&options).await?;

    let realign = if args.realign && !import.aborted {
        Some(session.realign(&import.loaded_tables()).await?)
    } else {
        None
    };

    let failures = import.failed_count();
    session.finish(&ImportRunReport { import, realign }, failures)
}

async fn run_export(file: FileConfig, run_dir: PathBuf, args: ExportArgs) -> Result<(), CliError> {
    let overrides = Overrides {
        export_folder: args.folder,
        encoding: args.encoding,
        ..overrides(args.connection)
    };
    let session = open_session("export", file, run_dir, overrides).await?;

    let options = ExportOptions {
        folder: session.settings.export_folder.clone(),
        encoding: resolve_encoding(&session.settings.export_encoding)?,
        tables: args.tables,
    };
    let report = PgExporter::new(session.catalog.clone()).run(&options).await?;

    session.finish(&report, report.failed_count())
}

async fn run_realign(file: FileConfig, run_dir: PathBuf, args: RealignArgs) -> Result<(), CliError> {
    let overrides = Overrides {
        key_prefix: args.key_prefix,
        script: args.script,
        ..overrides(args.connection)
    };
    let session = open_session("realign", file, run_dir, overrides).await?;

    let tables = if args.tables.is_empty() {
        session.catalog.list_tables().await?
    } else {
        args.tables
    };
    let report = session.realign(&tables).await?;

    session.finish(&report, 0)
}

async fn run_describe(file: FileConfig, run_dir: PathBuf, args: DescribeArgs) -> Result<(), CliError> {
    let session = open_session("describe", file, run_dir, overrides(args.connection)).await?;

    let schema = session.catalog.fetch_columns(&args.table).await?;
    let description = TableDescription {
        table: schema.table(),
        columns: schema.columns(),
    };
    println!("{}", serde_json::to_string_pretty(&description)?);

    session.finish(&description, 0)
}
