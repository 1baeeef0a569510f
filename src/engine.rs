use crate::config::AppConfig;
use crate::error::Error;
use crate::hasher::{self, HashAlgo};
use crate::listing::ArchiveLister;
use crate::model::{ArchiveMember, Entry};
use crate::progress::ProgressReporter;
use crate::scanner::{self, Classifier, TreeWalker};
use crate::storage::CatalogSink;
use rayon::prelude::*;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, trace};

/// Objects pulled from the walker per round of parallel work. Bounds memory independently
/// of tree size.
const BATCH_SIZE: usize = 64;

/// Walks a root and streams `Entry` and `ArchiveMember` records into a sink.
pub struct CatalogBuilder {
    config: AppConfig,
    root: PathBuf,
    hash_algo: Option<HashAlgo>,
    classifier: Classifier,
    lister: ArchiveLister,
    pool: rayon::ThreadPool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanSummary {
    pub plain_files: usize,
    pub archives: usize,
    pub members: usize,
    pub errors: usize,
    pub duration: Duration,
}

impl fmt::Display for ScanSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Scanned files: {} | archives: {} | members: {} | errors: {}",
            self.plain_files, self.archives, self.members, self.errors
        )
    }
}

enum ObjectOutcome {
    /// A directory reached through a symlink, or a special file. Not cataloged, not an error.
    Skipped,
    Cataloged {
        entry: Entry,
        members: Vec<ArchiveMember>,
        listing_error: Option<Error>,
    },
    Failed {
        path: PathBuf,
        error: Error,
    },
}

#[derive(Default)]
struct RunState {
    summary: ScanSummary,
    objects_seen: usize,
    tool_missing_reported: bool,
}

impl CatalogBuilder {
    /// Validate the configuration. An inaccessible root or unknown hash algorithm fails here,
    /// before anything is scanned.
    pub fn new(config: AppConfig) -> Result<Self, Error> {
        let configured_root = config
            .root
            .clone()
            .ok_or_else(|| Error::InvalidConfig("a scan root is required".to_string()))?;
        let root = check_root(&configured_root)?;

        let hash_algo = HashAlgo::from_config(&config.hash)?;

        if config.archive_lister_path.trim().is_empty() {
            return Err(Error::InvalidConfig(
                "archive_lister_path must not be empty".to_string(),
            ));
        }
        let lister = ArchiveLister::new(config.archive_lister_path.trim(), config.listing_timeout());
        let classifier = Classifier::new(&config.archive_extensions);

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.workers)
            .thread_name(|i| format!("catalog-worker-{}", i))
            .build()
            .map_err(|e| Error::InvalidConfig(format!("cannot start worker pool: {}", e)))?;

        Ok(Self {
            config,
            root,
            hash_algo,
            classifier,
            lister,
            pool,
        })
    }

    /// Canonical scan root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn hash_algo(&self) -> Option<HashAlgo> {
        self.hash_algo
    }

    /// Run the scan to completion. Per-object failures are counted and logged; only a sink
    /// failure aborts the run.
    pub fn run(
        &self,
        sink: &mut dyn CatalogSink,
        reporter: &dyn ProgressReporter,
    ) -> Result<ScanSummary, Error> {
        let start = Instant::now();
        info!("Scanning {}", self.root.display());
        debug!(
            "hash: {}, lister: {}, timeout: {}s, workers: {}",
            self.hash_algo.map(|a| a.name()).unwrap_or("none"),
            self.lister.tool(),
            self.config.listing_timeout_secs,
            self.pool.current_num_threads(),
        );
        reporter.on_scan_start(&self.root);

        let walker = TreeWalker::new(&self.root, &self.config.ignore_patterns);
        let mut files = walker.files();
        let mut state = RunState::default();

        loop {
            let batch: Vec<_> = files.by_ref().take(BATCH_SIZE).collect();
            if batch.is_empty() {
                break;
            }

            // Indexed collect keeps walk order, so output order never depends on scheduling.
            let outcomes: Vec<ObjectOutcome> = self.pool.install(|| {
                batch
                    .into_par_iter()
                    .map(|item| match item {
                        Ok(path) => self.scan_object(path),
                        Err(err) => ObjectOutcome::Failed {
                            path: err.path().map(Path::to_path_buf).unwrap_or_default(),
                            error: Error::Walk(err),
                        },
                    })
                    .collect()
            });

            for outcome in outcomes {
                self.record(outcome, sink, reporter, &mut state)?;
            }
        }

        sink.finish()?;

        let mut summary = state.summary;
        summary.duration = start.elapsed();
        info!("{} in {:.2}s", summary, summary.duration.as_secs_f64());
        reporter.on_scan_complete(&summary);
        Ok(summary)
    }

    fn scan_object(&self, path: PathBuf) -> ObjectOutcome {
        let metadata = match fs::metadata(&path) {
            Ok(metadata) => metadata,
            Err(source) => {
                return ObjectOutcome::Failed {
                    error: Error::ObjectUnreadable {
                        path: path.clone(),
                        source,
                    },
                    path,
                }
            }
        };
        if metadata.is_dir() {
            return ObjectOutcome::Skipped;
        }
        if !metadata.is_file() {
            // FIFOs, sockets and device nodes would block a reader.
            debug!("Skipping special file {}", path.display());
            return ObjectOutcome::Skipped;
        }

        let mut entry =
            match scanner::describe_object(&self.root, &path, &metadata, &self.classifier) {
                Ok(entry) => entry,
                Err(source) => {
                    return ObjectOutcome::Failed {
                        error: Error::ObjectUnreadable {
                            path: path.clone(),
                            source,
                        },
                        path,
                    }
                }
            };

        if let Some(algo) = self.hash_algo {
            match hasher::hash_file(&path, Some(algo)) {
                Ok(value) => {
                    entry.hash_algo = Some(algo);
                    entry.hash_value = Some(value);
                }
                Err(error) => return ObjectOutcome::Failed { path, error },
            }
        }

        if !entry.is_archive {
            return ObjectOutcome::Cataloged {
                entry,
                members: Vec::new(),
                listing_error: None,
            };
        }

        match self
            .lister
            .list_members(&path, self.config.flush_trailing_listing_block)
        {
            Ok(listed) => {
                let members = listed
                    .into_iter()
                    .filter(|member| !member.is_directory)
                    .map(|member| ArchiveMember::from_listed(&entry, member))
                    .collect();
                ObjectOutcome::Cataloged {
                    entry,
                    members,
                    listing_error: None,
                }
            }
            Err(error) => ObjectOutcome::Cataloged {
                entry,
                members: Vec::new(),
                listing_error: Some(error),
            },
        }
    }

    fn record(
        &self,
        outcome: ObjectOutcome,
        sink: &mut dyn CatalogSink,
        reporter: &dyn ProgressReporter,
        state: &mut RunState,
    ) -> Result<(), Error> {
        match outcome {
            ObjectOutcome::Skipped => {}
            ObjectOutcome::Failed { path, error } => {
                state.summary.errors += 1;
                error!("Error reading {}: {}", path.display(), error);
                reporter.on_object_failed(&path, &error);
            }
            ObjectOutcome::Cataloged {
                entry,
                members,
                listing_error,
            } => {
                sink.write_entry(&entry)?;
                state.objects_seen += 1;

                if entry.is_archive {
                    state.summary.archives += 1;
                    match listing_error {
                        Some(error) => {
                            state.summary.errors += 1;
                            self.report_listing_error(&entry, &error, state);
                            reporter.on_object_failed(Path::new(&entry.full_path), &error);
                        }
                        None => {
                            for member in &members {
                                sink.write_member(member)?;
                            }
                            trace!("{}: {} members", entry.full_path, members.len());
                            state.summary.members += members.len();
                        }
                    }
                } else {
                    state.summary.plain_files += 1;
                }

                reporter.on_object_scanned(state.objects_seen, Path::new(&entry.full_path));
            }
        }
        Ok(())
    }

    fn report_listing_error(&self, entry: &Entry, error: &Error, state: &mut RunState) {
        match error {
            Error::ListingToolMissing { tool } => {
                if state.tool_missing_reported {
                    debug!("Skipping members of {}: {} not found", entry.full_path, tool);
                } else {
                    state.tool_missing_reported = true;
                    error!(
                        "Archive listing tool '{}' not found; archives are cataloged without members",
                        tool
                    );
                }
            }
            Error::ListingToolFailed { output, .. } => {
                error!("{}", error);
                debug!("Listing output:\n{}", output);
            }
            _ => error!("Error listing archive {}: {}", entry.full_path, error),
        }
    }
}

fn check_root(root: &Path) -> Result<PathBuf, Error> {
    let unreadable = |source: io::Error| Error::RootUnreadable {
        path: root.to_path_buf(),
        source,
    };
    let canonical = fs::canonicalize(root).map_err(unreadable)?;
    if !canonical.is_dir() {
        return Err(unreadable(io::Error::new(
            io::ErrorKind::NotADirectory,
            "not a directory",
        )));
    }
    fs::read_dir(&canonical).map_err(unreadable)?;
    Ok(canonical)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::SilentReporter;
    use crate::storage::MemoryCatalog;

    #[test]
    fn test_missing_root_is_fatal() {
        let config = AppConfig::with_root("/definitely/not/a/root");
        assert!(matches!(
            CatalogBuilder::new(config),
            Err(Error::RootUnreadable { .. })
        ));
    }

    #[test]
    fn test_root_is_required() {
        assert!(matches!(
            CatalogBuilder::new(AppConfig::default()),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_file_root_is_fatal() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("plain.txt");
        fs::write(&file, "x").unwrap();
        assert!(matches!(
            CatalogBuilder::new(AppConfig::with_root(&file)),
            Err(Error::RootUnreadable { .. })
        ));
    }

    #[test]
    fn test_unknown_hash_is_fatal() {
        let tmp = tempfile::tempdir().unwrap();
        let mut config = AppConfig::with_root(tmp.path());
        config.hash = "crc32".to_string();
        assert!(matches!(
            CatalogBuilder::new(config),
            Err(Error::UnknownHashAlgorithm(_))
        ));
    }

    #[test]
    fn test_plain_tree_without_archives() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir_all(tmp.path().join("docs")).unwrap();
        fs::write(tmp.path().join("docs/a.txt"), "aaaa").unwrap();
        fs::write(tmp.path().join("b.txt"), "bb").unwrap();

        let mut config = AppConfig::with_root(tmp.path());
        config.hash = "md5".to_string();
        config.workers = 2;
        let builder = CatalogBuilder::new(config).unwrap();
        let mut catalog = MemoryCatalog::new();
        let summary = builder.run(&mut catalog, &SilentReporter).unwrap();

        assert_eq!(summary.plain_files, 2);
        assert_eq!(summary.archives, 0);
        assert_eq!(summary.errors, 0);
        assert_eq!(catalog.entries().len(), 2);
        assert_eq!(catalog.entries()[0].name, "b.txt");
        assert_eq!(catalog.entries()[1].name, "a.txt");
        assert_eq!(
            catalog.entries()[0].hash_value.as_deref(),
            Some("21ad0bd836b90d08f4cf640b4c298e7c")
        );
        assert_eq!(catalog.entries()[0].hash_algo, Some(HashAlgo::Md5));
    }

    #[test]
    fn test_summary_display() {
        let summary = ScanSummary {
            plain_files: 3,
            archives: 1,
            members: 7,
            errors: 2,
            duration: Duration::from_secs(1),
        };
        assert_eq!(
            summary.to_string(),
            "Scanned files: 3 | archives: 1 | members: 7 | errors: 2"
        );
    }
}
