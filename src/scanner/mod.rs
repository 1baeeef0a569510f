pub mod classify;
pub mod walk;

pub use classify::{Classifier, ObjectKind};
pub use walk::TreeWalker;

use crate::model::Entry;
use chrono::{DateTime, Local};
use std::fs::Metadata;
use std::io;
use std::path::Path;

/// Build the catalog entry for one file from its metadata. Hash fields are left empty.
pub fn describe_object(
    root: &Path,
    path: &Path,
    metadata: &Metadata,
    classifier: &Classifier,
) -> io::Result<Entry> {
    let parent_path = path
        .strip_prefix(root)
        .ok()
        .and_then(Path::parent)
        .filter(|parent| !parent.as_os_str().is_empty())
        .map(|parent| parent.to_string_lossy().into_owned())
        .unwrap_or_else(|| ".".to_string());

    let name = path
        .file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_default();

    let modified: DateTime<Local> = metadata.modified()?.into();

    Ok(Entry {
        root_path: root.to_string_lossy().into_owned(),
        full_path: path.to_string_lossy().into_owned(),
        parent_path,
        name,
        ext: classifier.extension(path),
        is_dir: false,
        is_archive: classifier.classify(path) == ObjectKind::Archive,
        size_bytes: Some(metadata.len()),
        modified,
        hash_algo: None,
        hash_value: None,
    })
}
