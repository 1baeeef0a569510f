use crate::hasher::HashAlgo;
use chrono::{DateTime, Local};

pub const ENTRY_COLUMNS: [&str; 11] = [
    "root_path",
    "full_path",
    "parent_path",
    "name",
    "ext",
    "is_dir",
    "is_archive",
    "size_bytes",
    "mtime_iso",
    "hash_algo",
    "hash_value",
];

pub const MEMBER_COLUMNS: [&str; 7] = [
    "root_path",
    "archive_full_path",
    "member_path",
    "member_size",
    "member_mtime",
    "hash_algo",
    "hash_value",
];

const ISO_SECONDS: &str = "%Y-%m-%dT%H:%M:%S";

/// One cataloged filesystem object under a scan root.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub root_path: String,
    pub full_path: String,
    /// Parent directory relative to the root, `.` for objects directly in it.
    pub parent_path: String,
    pub name: String,
    pub ext: String,
    pub is_dir: bool,
    pub is_archive: bool,
    pub size_bytes: Option<u64>,
    pub modified: DateTime<Local>,
    pub hash_algo: Option<HashAlgo>,
    pub hash_value: Option<String>,
}

impl Entry {
    pub fn mtime_iso(&self) -> String {
        self.modified.format(ISO_SECONDS).to_string()
    }

    /// Unix seconds, as stored in the relational `mtime` column.
    pub fn mtime_unix(&self) -> f64 {
        self.modified.timestamp() as f64
            + f64::from(self.modified.timestamp_subsec_nanos()) / 1_000_000_000.0
    }

    pub fn to_record(&self) -> [String; 11] {
        [
            self.root_path.clone(),
            self.full_path.clone(),
            self.parent_path.clone(),
            self.name.clone(),
            self.ext.clone(),
            flag(self.is_dir),
            flag(self.is_archive),
            self.size_bytes.map(|s| s.to_string()).unwrap_or_default(),
            self.mtime_iso(),
            self.hash_algo.map(|a| a.name().to_string()).unwrap_or_default(),
            self.hash_value.clone().unwrap_or_default(),
        ]
    }
}

/// A member as reported by the listing tool, before it is tied to an archive entry.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ListedMember {
    pub path: String,
    pub size: u64,
    pub is_directory: bool,
    pub is_encrypted: bool,
    pub compression_method: String,
    /// Lowercase suffix without the dot, empty for directories.
    pub extension: String,
    /// `Modified` field normalized to `YYYY-MM-DDTHH:MM:SS`, when parseable.
    pub modified: Option<String>,
}

/// A leaf member of an archive, linked to its archive by full path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveMember {
    pub root_path: String,
    pub archive_full_path: String,
    pub member_path: String,
    pub member_size: u64,
    pub member_mtime: Option<String>,
    pub hash_algo: Option<HashAlgo>,
    pub hash_value: Option<String>,
    pub is_encrypted: bool,
    pub compression_method: String,
}

impl ArchiveMember {
    pub fn from_listed(archive: &Entry, listed: ListedMember) -> Self {
        Self {
            root_path: archive.root_path.clone(),
            archive_full_path: archive.full_path.clone(),
            member_path: listed.path,
            member_size: listed.size,
            member_mtime: listed.modified,
            hash_algo: None,
            hash_value: None,
            is_encrypted: listed.is_encrypted,
            compression_method: listed.compression_method,
        }
    }

    pub fn to_record(&self) -> [String; 7] {
        [
            self.root_path.clone(),
            self.archive_full_path.clone(),
            self.member_path.clone(),
            self.member_size.to_string(),
            self.member_mtime.clone().unwrap_or_default(),
            self.hash_algo.map(|a| a.name().to_string()).unwrap_or_default(),
            self.hash_value.clone().unwrap_or_default(),
        ]
    }
}

fn flag(value: bool) -> String {
    if value { "1" } else { "0" }.to_string()
}
