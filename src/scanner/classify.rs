use crate::config::normalize_extension;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    Plain,
    Archive,
}

/// Tags files as archives by (possibly compound) extension, case-insensitively.
#[derive(Debug, Clone)]
pub struct Classifier {
    /// Normalized `.ext` strings, longest first so `.tar.gz` wins over `.gz`.
    extensions: Vec<String>,
}

impl Classifier {
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut extensions: Vec<String> = extensions
            .into_iter()
            .map(|ext| normalize_extension(ext.as_ref()))
            .filter(|ext| ext.len() > 1)
            .collect();
        extensions.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        extensions.dedup();
        Self { extensions }
    }

    pub fn classify(&self, path: &Path) -> ObjectKind {
        if self.archive_extension(path).is_some() {
            ObjectKind::Archive
        } else {
            ObjectKind::Plain
        }
    }

    /// The configured archive extension the file name ends with, if any.
    pub fn archive_extension(&self, path: &Path) -> Option<&str> {
        let name = path.file_name()?.to_string_lossy().to_lowercase();
        self.extensions
            .iter()
            .find(|ext| name.len() > ext.len() && name.ends_with(ext.as_str()))
            .map(|ext| ext.as_str())
    }

    /// Lowercase extension without the dot. Archives report the full matched extension
    /// (`tar.gz`), everything else the last suffix.
    pub fn extension(&self, path: &Path) -> String {
        match self.archive_extension(path) {
            Some(ext) => ext.trim_start_matches('.').to_string(),
            None => path
                .extension()
                .map(|ext| ext.to_string_lossy().to_lowercase())
                .unwrap_or_default(),
        }
    }
}
