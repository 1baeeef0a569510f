use config::{Config, ConfigError, Environment, File as ConfigFile};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_ARCHIVE_LISTER: &str = "7z";
pub const DEFAULT_LISTING_TIMEOUT_SECS: u64 = 300;
pub const DEFAULT_ARCHIVE_EXTENSIONS: [&str; 6] = [".zip", ".rar", ".7z", ".tar", ".tgz", ".tar.gz"];

/// Everything the catalog builder needs to know about one scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Directory the scan starts from.
    pub root: Option<PathBuf>,
    /// Digest algorithm name; empty disables hashing.
    pub hash: String,
    pub archive_lister_path: String,
    pub archive_extensions: Vec<String>,
    pub ignore_patterns: Vec<String>,
    pub listing_timeout_secs: u64,
    /// Size of the worker pool, 0 lets rayon decide.
    pub workers: usize,
    pub flush_trailing_listing_block: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            root: None,
            hash: String::new(),
            archive_lister_path: DEFAULT_ARCHIVE_LISTER.to_string(),
            archive_extensions: DEFAULT_ARCHIVE_EXTENSIONS
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
            ignore_patterns: Vec::new(),
            listing_timeout_secs: DEFAULT_LISTING_TIMEOUT_SECS,
            workers: 0,
            flush_trailing_listing_block: false,
        }
    }
}

impl AppConfig {
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
            ..Self::default()
        }
    }

    pub fn listing_timeout(&self) -> Duration {
        Duration::from_secs(self.listing_timeout_secs)
    }
}

/// Layer `Config.toml` (or `path`) and `ARCHIVE_INDEXER_*` variables over the defaults.
/// An explicitly given file must exist.
pub fn load_configuration(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let file = match path {
        Some(path) => ConfigFile::from(path).required(true),
        None => ConfigFile::with_name("Config").required(false),
    };

    // Missing keys fall back to `AppConfig::default()` through `#[serde(default)]`.
    let builder = Config::builder()
        .add_source(file)
        .add_source(
            Environment::with_prefix("ARCHIVE_INDEXER")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("archive_extensions")
                .with_list_parse_key("ignore_patterns"),
        )
        .build()?;
    builder.try_deserialize::<AppConfig>()
}

/// Lowercase an extension and make sure it carries a leading dot.
pub fn normalize_extension(ext: &str) -> String {
    let ext = ext.trim().to_lowercase();
    if ext.starts_with('.') {
        ext
    } else {
        format!(".{}", ext)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.archive_lister_path, "7z");
        assert_eq!(config.archive_extensions.len(), 6);
        assert!(config.archive_extensions.contains(&".tar.gz".to_string()));
        assert!(config.hash.is_empty());
        assert_eq!(config.listing_timeout(), Duration::from_secs(300));
    }

    #[test]
    fn test_normalize_extension() {
        assert_eq!(normalize_extension("ZIP"), ".zip");
        assert_eq!(normalize_extension(".Tar.GZ"), ".tar.gz");
        assert_eq!(normalize_extension(" .7z "), ".7z");
    }

    #[test]
    fn test_load_from_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scan.toml");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "root = \"/srv/library\"").unwrap();
        writeln!(f, "hash = \"sha256\"").unwrap();
        writeln!(f, "archive_extensions = [\".zip\", \".cbz\"]").unwrap();
        writeln!(f, "listing_timeout_secs = 30").unwrap();
        drop(f);

        let config = load_configuration(Some(&path)).unwrap();
        assert_eq!(config.root, Some(PathBuf::from("/srv/library")));
        assert_eq!(config.hash, "sha256");
        assert_eq!(config.archive_extensions, vec![".zip", ".cbz"]);
        assert_eq!(config.listing_timeout_secs, 30);
        // untouched keys keep their defaults
        assert_eq!(config.archive_lister_path, "7z");
        assert!(!config.flush_trailing_listing_block);
    }
}
