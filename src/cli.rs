use archive_indexer::config::AppConfig;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "archive-indexer")]
#[command(about = "Catalog files and archive contents to CSV or SQLite", long_about = None)]
pub struct Cli {
    /// Configuration file, instead of ./Config.toml
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Walk a root and catalog every file and archive member
    Scan(ScanArgs),
    /// Create the catalog database schema
    InitDb {
        #[arg(long, default_value = archive_indexer::storage::sqlite::DEFAULT_DB_PATH)]
        db: PathBuf,
    },
    /// Load an entries CSV (and optional archives CSV) into the database
    Import(ImportArgs),
    /// Print configuration values
    PrintConfig,
}

#[derive(Debug, Args)]
pub struct ScanArgs {
    /// Root folder to scan
    #[arg(long)]
    pub root: Option<PathBuf>,

    /// Hash method: md5, sha1, sha256, blake3 or xxh64
    #[arg(long)]
    pub hash: Option<String>,

    /// Path to the 7z executable
    #[arg(long = "archive-lister", alias = "sevenzip")]
    pub archive_lister: Option<String>,

    /// Seconds allowed for listing one archive
    #[arg(long)]
    pub timeout: Option<u64>,

    #[arg(long)]
    pub workers: Option<usize>,

    /// Glob pattern to skip, may be repeated
    #[arg(long = "ignore")]
    pub ignore: Vec<String>,

    /// Keep a final listing block that is not followed by a blank line
    #[arg(long)]
    pub flush_trailing_block: bool,

    /// Output CSV for the entries table
    #[arg(long, requires = "archives_out", conflicts_with = "db")]
    pub entries_out: Option<PathBuf>,

    /// Output CSV for the archives table
    #[arg(long, requires = "entries_out", conflicts_with = "db")]
    pub archives_out: Option<PathBuf>,

    /// Write straight into this SQLite database
    #[arg(long, required_unless_present = "entries_out")]
    pub db: Option<PathBuf>,

    /// Library name for --db, defaults to the root's directory name
    #[arg(long, requires = "db")]
    pub library_name: Option<String>,

    #[arg(long, requires = "db")]
    pub note: Option<String>,
}

impl ScanArgs {
    /// Command-line values win over file and environment configuration.
    pub fn apply_to(&self, config: &mut AppConfig) {
        if let Some(root) = &self.root {
            config.root = Some(root.clone());
        }
        if let Some(hash) = &self.hash {
            config.hash = hash.clone();
        }
        if let Some(lister) = &self.archive_lister {
            config.archive_lister_path = lister.clone();
        }
        if let Some(timeout) = self.timeout {
            config.listing_timeout_secs = timeout;
        }
        if let Some(workers) = self.workers {
            config.workers = workers;
        }
        if !self.ignore.is_empty() {
            config.ignore_patterns.extend(self.ignore.iter().cloned());
        }
        if self.flush_trailing_block {
            config.flush_trailing_listing_block = true;
        }
    }
}

#[derive(Debug, Args)]
pub struct ImportArgs {
    #[arg(long, default_value = archive_indexer::storage::sqlite::DEFAULT_DB_PATH)]
    pub db: PathBuf,

    #[arg(long)]
    pub library_name: String,

    #[arg(long)]
    pub root_path: String,

    #[arg(long)]
    pub entries_csv: PathBuf,

    #[arg(long)]
    pub archives_csv: Option<PathBuf>,

    #[arg(long)]
    pub note: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_scan_requires_a_sink() {
        assert!(Cli::try_parse_from(["archive-indexer", "scan", "--root", "/x"]).is_err());
        assert!(Cli::try_parse_from([
            "archive-indexer",
            "scan",
            "--entries-out",
            "e.csv"
        ])
        .is_err());
        assert!(Cli::try_parse_from(["archive-indexer", "scan", "--db", "c.db"]).is_ok());
    }

    #[test]
    fn test_scan_overrides_config() {
        let cli = Cli::try_parse_from([
            "archive-indexer",
            "scan",
            "--root",
            "/srv/lib",
            "--hash",
            "sha1",
            "--sevenzip",
            "/opt/7zz",
            "--timeout",
            "5",
            "--ignore",
            "*.part",
            "--entries-out",
            "e.csv",
            "--archives-out",
            "a.csv",
        ])
        .unwrap();
        let Commands::Scan(args) = cli.command else {
            panic!("expected scan");
        };
        let mut config = AppConfig::default();
        args.apply_to(&mut config);
        assert_eq!(config.root, Some(PathBuf::from("/srv/lib")));
        assert_eq!(config.hash, "sha1");
        assert_eq!(config.archive_lister_path, "/opt/7zz");
        assert_eq!(config.listing_timeout_secs, 5);
        assert_eq!(config.ignore_patterns, vec!["*.part"]);
        assert_eq!(config.workers, 0);
    }
}
