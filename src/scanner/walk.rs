use glob::Pattern;
use std::path::{Path, PathBuf};
use tracing::error;
use walkdir::WalkDir;

/// Lazy, deterministic traversal of every file below a root.
///
/// Directories are only traversal scaffolding and are never yielded. Symlinked directories
/// are not descended into. Entries are visited in file-name order inside each directory so
/// repeated scans of an unchanged tree see the same sequence.
pub struct TreeWalker {
    root: PathBuf,
    ignore_patterns: Vec<Pattern>,
}

impl TreeWalker {
    pub fn new(root: &Path, ignore_globs: &[String]) -> Self {
        let ignore_patterns: Vec<Pattern> = ignore_globs
            .iter()
            .filter_map(|glob| match Pattern::new(glob) {
                Ok(p) => Some(p),
                Err(e) => {
                    error!("Invalid glob pattern '{}': {}", glob, e);
                    None
                }
            })
            .collect();

        Self {
            root: root.to_path_buf(),
            ignore_patterns,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn is_ignored(&self, path: &Path) -> bool {
        self.ignore_patterns
            .iter()
            .any(|pattern| pattern.matches_path(path))
    }

    /// Files under the root. Walk failures (unreadable directories, entries vanishing
    /// mid-walk) are yielded in place so the caller can count them and carry on.
    pub fn files(&self) -> impl Iterator<Item = Result<PathBuf, walkdir::Error>> + '_ {
        WalkDir::new(&self.root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(move |entry| entry.depth() == 0 || !self.is_ignored(entry.path()))
            .filter_map(|result| match result {
                Ok(entry) if entry.file_type().is_dir() => None,
                Ok(entry) => Some(Ok(entry.into_path())),
                Err(err) => Some(Err(err)),
            })
    }
}
