use super::csv_sink::UTF8_BOM;
use super::models::{iso_to_unix, non_empty, EntryRow, MemberRow};
use super::sqlite::Database;
use crate::error::Error;
use serde::Deserialize;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::{info, trace};

/// Outcome of loading one catalog CSV pair into the database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportReport {
    pub library_id: i64,
    pub entries: usize,
    pub members: usize,
    pub linked: usize,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct EntryRecord {
    full_path: String,
    parent_path: String,
    name: String,
    ext: String,
    is_dir: Option<i64>,
    is_archive: Option<i64>,
    size_bytes: Option<i64>,
    /// Unix seconds, as older exports carry them.
    mtime: String,
    mtime_iso: String,
    hash_algo: String,
    hash_value: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct MemberRecord {
    archive_full_path: String,
    member_path: String,
    member_size: Option<i64>,
    member_mtime: String,
    hash_algo: String,
    hash_value: String,
}

/// Create a library and load an entries CSV (and optionally an archives CSV) into it.
///
/// Everything is inserted in one transaction; members are linked to their archive entries
/// afterwards.
pub fn import_catalog(
    db: &Database,
    library_name: &str,
    root_path: &str,
    note: Option<&str>,
    entries_csv: &Path,
    archives_csv: Option<&Path>,
) -> Result<ImportReport, Error> {
    let tx = db.connection().unchecked_transaction()?;
    let library_id = db.create_library(library_name, root_path, note)?;

    let mut entries = 0;
    let mut reader = open_csv(entries_csv)?;
    for record in reader.deserialize() {
        let record: EntryRecord = record?;
        db.insert_entry(&entry_row(record, library_id))?;
        entries += 1;
    }
    info!(
        "Imported {} rows into entries for library_id={}",
        entries, library_id
    );

    let mut members = 0;
    if let Some(path) = archives_csv {
        let mut reader = open_csv(path)?;
        for record in reader.deserialize() {
            let record: MemberRecord = record?;
            db.insert_member(&member_row(record, library_id))?;
            members += 1;
        }
        info!(
            "Imported {} rows into archives for library_id={}",
            members, library_id
        );
    }

    let linked = db.link_archive_members(library_id)?;
    tx.commit()?;

    Ok(ImportReport {
        library_id,
        entries,
        members,
        linked,
    })
}

fn open_csv(path: &Path) -> Result<csv::Reader<BufReader<File>>, Error> {
    let mut reader = BufReader::new(File::open(path)?);
    if reader.fill_buf()?.starts_with(UTF8_BOM) {
        reader.consume(UTF8_BOM.len());
    }
    Ok(csv::Reader::from_reader(reader))
}

fn entry_row(record: EntryRecord, library_id: i64) -> EntryRow {
    let mtime = parse_timestamp(&record.mtime).or_else(|| parse_timestamp(&record.mtime_iso));
    EntryRow {
        id: 0,
        library_id,
        full_path: record.full_path,
        parent_path: record.parent_path,
        name: record.name,
        ext: non_empty(&record.ext),
        is_dir: record.is_dir.unwrap_or(0) != 0,
        is_archive: record.is_archive.unwrap_or(0) != 0,
        size_bytes: record.size_bytes,
        mtime,
        hash_algo: non_empty(&record.hash_algo),
        hash_value: non_empty(&record.hash_value),
        extra_meta: None,
    }
}

fn member_row(record: MemberRecord, library_id: i64) -> MemberRow {
    MemberRow {
        id: 0,
        library_id,
        member_mtime: parse_timestamp(&record.member_mtime),
        archive_full_path: record.archive_full_path,
        archive_entry_id: None,
        member_path: record.member_path,
        member_size: record.member_size,
        hash_algo: non_empty(&record.hash_algo),
        hash_value: non_empty(&record.hash_value),
        extra_meta: None,
    }
}

/// Accepts unix seconds or a local ISO timestamp.
fn parse_timestamp(value: &str) -> Option<f64> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    let parsed = value.parse::<f64>().ok().or_else(|| iso_to_unix(value));
    if parsed.is_none() {
        trace!("Ignoring unparseable timestamp '{}'", value);
    }
    parsed
}
