use crate::model::{ArchiveMember, Entry};
use chrono::{Local, NaiveDateTime, TimeZone};
use serde::{Deserialize, Serialize};

/// A named collection of entries sharing one scanned root.
#[derive(Debug, Clone)]
pub struct Library {
    pub id: i64,
    pub name: String,
    pub root_path: String,
    pub note: Option<String>,
    pub created_at: String,
}

/// A row of the `entries` table.
#[derive(Debug, Clone, PartialEq)]
pub struct EntryRow {
    pub id: i64,
    pub library_id: i64,
    pub full_path: String,
    pub parent_path: String,
    pub name: String,
    pub ext: Option<String>,
    pub is_dir: bool,
    pub is_archive: bool,
    pub size_bytes: Option<i64>,
    /// Unix seconds.
    pub mtime: Option<f64>,
    pub hash_algo: Option<String>,
    pub hash_value: Option<String>,
    pub extra_meta: Option<String>,
}

impl EntryRow {
    pub fn from_entry(entry: &Entry, library_id: i64) -> Self {
        Self {
            id: 0,
            library_id,
            full_path: entry.full_path.clone(),
            parent_path: entry.parent_path.clone(),
            name: entry.name.clone(),
            ext: non_empty(&entry.ext),
            is_dir: entry.is_dir,
            is_archive: entry.is_archive,
            size_bytes: entry.size_bytes.map(|s| s as i64),
            mtime: Some(entry.mtime_unix()),
            hash_algo: entry.hash_algo.map(|a| a.name().to_string()),
            hash_value: entry.hash_value.as_deref().and_then(non_empty),
            extra_meta: None,
        }
    }
}

/// A row of the `archives` table: one leaf member of an archive.
#[derive(Debug, Clone, PartialEq)]
pub struct MemberRow {
    pub id: i64,
    pub library_id: i64,
    pub archive_full_path: String,
    /// Filled in by the reconciliation pass.
    pub archive_entry_id: Option<i64>,
    pub member_path: String,
    pub member_size: Option<i64>,
    pub member_mtime: Option<f64>,
    pub hash_algo: Option<String>,
    pub hash_value: Option<String>,
    pub extra_meta: Option<String>,
}

/// Listing attributes that have no column of their own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberMeta {
    pub encrypted: bool,
    pub method: String,
}

impl MemberRow {
    pub fn from_member(member: &ArchiveMember, library_id: i64) -> Result<Self, serde_json::Error> {
        let meta = MemberMeta {
            encrypted: member.is_encrypted,
            method: member.compression_method.clone(),
        };
        Ok(Self {
            id: 0,
            library_id,
            archive_full_path: member.archive_full_path.clone(),
            archive_entry_id: None,
            member_path: member.member_path.clone(),
            member_size: Some(member.member_size as i64),
            member_mtime: member.member_mtime.as_deref().and_then(iso_to_unix),
            hash_algo: member.hash_algo.map(|a| a.name().to_string()),
            hash_value: member.hash_value.as_deref().and_then(non_empty),
            extra_meta: Some(serde_json::to_string(&meta)?),
        })
    }
}

/// Interpret a `YYYY-MM-DDTHH:MM:SS` local timestamp as unix seconds.
pub fn iso_to_unix(iso: &str) -> Option<f64> {
    let naive = NaiveDateTime::parse_from_str(iso.trim(), "%Y-%m-%dT%H:%M:%S").ok()?;
    let local = Local.from_local_datetime(&naive).earliest()?;
    Some(local.timestamp() as f64)
}

pub(crate) fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}
