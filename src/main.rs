mod cli;
mod logging;
mod reporter;

use anyhow::{Context, Result};
use archive_indexer::config::{load_configuration, AppConfig};
use archive_indexer::storage::import::import_catalog;
use archive_indexer::storage::{CatalogSink, CsvSink, Database, SqliteSink};
use archive_indexer::{CatalogBuilder, ScanSummary};
use clap::Parser;
use cli::{Cli, Commands, ImportArgs, ScanArgs};
use colored::*;
use dotenv::dotenv;
use reporter::CliReporter;
use std::path::Path;
use tracing::{error, info};

fn main() -> Result<()> {
    dotenv().ok();

    let _guard = logging::init_logger();

    let args = Cli::parse();

    let config = match load_configuration(args.config.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            error!("Error loading configuration: {}", err);
            return Err(err).context("loading configuration");
        }
    };

    match args.command {
        Commands::Scan(scan) => run_scan(config, &scan),
        Commands::InitDb { db } => {
            Database::open(&db)
                .with_context(|| format!("initializing database {}", db.display()))?;
            println!("{} Database initialized at: {}", "[OK]".green(), db.display());
            Ok(())
        }
        Commands::Import(import) => run_import(&import),
        Commands::PrintConfig => {
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
    }
}

fn run_scan(mut config: AppConfig, args: &ScanArgs) -> Result<()> {
    args.apply_to(&mut config);
    let builder = CatalogBuilder::new(config).context("invalid scan configuration")?;
    let reporter = CliReporter::new();

    let summary = match (&args.db, &args.entries_out, &args.archives_out) {
        (Some(db_path), _, _) => {
            let root_path = builder.root().display().to_string();
            let library_name = args
                .library_name
                .clone()
                .unwrap_or_else(|| default_library_name(builder.root()));
            let db = Database::open(db_path)
                .with_context(|| format!("opening database {}", db_path.display()))?;
            let mut sink = SqliteSink::new(db, &library_name, &root_path, args.note.as_deref())?;
            let summary = scan_into(&builder, &mut sink, &reporter)?;
            info!(
                "Library '{}' (id {}) written to {}",
                library_name,
                sink.library_id(),
                db_path.display()
            );
            print_summary(&summary);
            println!("[INFO] Database    : {}", db_path.display());
            summary
        }
        (None, Some(entries_out), Some(archives_out)) => {
            let mut sink = CsvSink::create(entries_out, archives_out)?;
            let summary = scan_into(&builder, &mut sink, &reporter)?;
            print_summary(&summary);
            println!("[INFO] Entries CSV : {}", entries_out.display());
            println!("[INFO] Archives CSV: {}", archives_out.display());
            summary
        }
        _ => anyhow::bail!("scan needs --db or both --entries-out and --archives-out"),
    };

    if summary.errors > 0 {
        info!("{} objects could not be fully cataloged, see the log", summary.errors);
    }
    Ok(())
}

fn scan_into(
    builder: &CatalogBuilder,
    sink: &mut dyn CatalogSink,
    reporter: &CliReporter,
) -> Result<ScanSummary> {
    builder
        .run(sink, reporter)
        .with_context(|| format!("scanning {}", builder.root().display()))
}

fn run_import(args: &ImportArgs) -> Result<()> {
    let db = Database::open(&args.db)
        .with_context(|| format!("opening database {}", args.db.display()))?;
    let report = import_catalog(
        &db,
        &args.library_name,
        &args.root_path,
        args.note.as_deref(),
        &args.entries_csv,
        args.archives_csv.as_deref(),
    )
    .with_context(|| format!("importing {}", args.entries_csv.display()))?;

    println!(
        "{} Imported {} entries and {} archive members into library_id={} ({} linked)",
        "[OK]".green(),
        report.entries,
        report.members,
        report.library_id,
        report.linked
    );
    Ok(())
}

fn print_summary(summary: &ScanSummary) {
    println!();
    let done = "[DONE]".green().bold();
    if summary.errors > 0 {
        println!("{} {}", done, summary.to_string().yellow());
    } else {
        println!("{} {}", done, summary);
    }
}

fn default_library_name(root: &Path) -> String {
    root.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| root.display().to_string())
}
