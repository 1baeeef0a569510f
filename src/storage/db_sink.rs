use super::models::{EntryRow, MemberRow};
use super::sqlite::Database;
use super::CatalogSink;
use crate::error::Error;
use crate::model::{ArchiveMember, Entry};
use tracing::{debug, warn};

/// Rows written between commits, so an interrupted scan keeps what it already stored.
const COMMIT_EVERY: usize = 5000;

/// Streams a scan straight into the relational store under a new library row.
///
/// Members are inserted unlinked; `finish` resolves them to their archive entries once every
/// entry has its id.
pub struct SqliteSink {
    db: Database,
    library_id: i64,
    pending: usize,
    entries_written: usize,
    members_written: usize,
}

impl SqliteSink {
    pub fn new(
        db: Database,
        library_name: &str,
        root_path: &str,
        note: Option<&str>,
    ) -> Result<Self, Error> {
        let library_id = db.create_library(library_name, root_path, note)?;
        db.connection().execute_batch("BEGIN")?;
        Ok(Self {
            db,
            library_id,
            pending: 0,
            entries_written: 0,
            members_written: 0,
        })
    }

    pub fn library_id(&self) -> i64 {
        self.library_id
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn into_database(self) -> Database {
        self.db
    }

    fn row_written(&mut self) -> Result<(), Error> {
        self.pending += 1;
        if self.pending >= COMMIT_EVERY {
            self.db.connection().execute_batch("COMMIT; BEGIN")?;
            self.pending = 0;
        }
        Ok(())
    }
}

impl CatalogSink for SqliteSink {
    fn write_entry(&mut self, entry: &Entry) -> Result<(), Error> {
        self.db
            .insert_entry(&EntryRow::from_entry(entry, self.library_id))?;
        self.entries_written += 1;
        self.row_written()
    }

    fn write_member(&mut self, member: &ArchiveMember) -> Result<(), Error> {
        self.db
            .insert_member(&MemberRow::from_member(member, self.library_id)?)?;
        self.members_written += 1;
        self.row_written()
    }

    fn finish(&mut self) -> Result<(), Error> {
        let linked = self.db.link_archive_members(self.library_id)?;
        if self.db.connection().is_autocommit() {
            debug!("No open transaction to commit");
        } else {
            self.db.connection().execute_batch("COMMIT")?;
        }
        let unlinked = self.db.count_unlinked_members(self.library_id)?;
        if unlinked > 0 {
            warn!(
                "{} archive members in library {} have no matching archive entry",
                unlinked, self.library_id
            );
        }
        debug!(
            "Library {}: {} entries, {} members ({} linked)",
            self.library_id, self.entries_written, self.members_written, linked
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hasher::HashAlgo;
    use chrono::Local;

    fn entry(name: &str, is_archive: bool) -> Entry {
        Entry {
            root_path: "/lib".to_string(),
            full_path: format!("/lib/{}", name),
            parent_path: ".".to_string(),
            name: name.to_string(),
            ext: name.rsplit('.').next().unwrap_or_default().to_string(),
            is_dir: false,
            is_archive,
            size_bytes: Some(10),
            modified: Local::now(),
            hash_algo: Some(HashAlgo::Sha1),
            hash_value: Some("abc123".to_string()),
        }
    }

    fn member(archive: &Entry, path: &str) -> ArchiveMember {
        ArchiveMember {
            root_path: archive.root_path.clone(),
            archive_full_path: archive.full_path.clone(),
            member_path: path.to_string(),
            member_size: 1,
            member_mtime: None,
            hash_algo: None,
            hash_value: None,
            is_encrypted: false,
            compression_method: "Store".to_string(),
        }
    }

    #[test]
    fn test_members_linked_to_archive_entries() {
        let db = Database::open_in_memory().unwrap();
        let mut sink = SqliteSink::new(db, "photos", "/lib", Some("first pass")).unwrap();

        let plain = entry("a.txt", false);
        let zip = entry("b.zip", true);
        sink.write_entry(&plain).unwrap();
        sink.write_entry(&zip).unwrap();
        sink.write_member(&member(&zip, "one.jpg")).unwrap();
        sink.write_member(&member(&zip, "two.jpg")).unwrap();
        sink.finish().unwrap();

        let db = sink.database();
        let library = db.get_library(sink.library_id()).unwrap().unwrap();
        assert_eq!(library.name, "photos");
        assert_eq!(library.note.as_deref(), Some("first pass"));

        let entries = db.entries_for_library(sink.library_id()).unwrap();
        assert_eq!(entries.len(), 2);
        let zip_row = entries.iter().find(|e| e.name == "b.zip").unwrap();
        assert!(zip_row.is_archive);
        assert_eq!(zip_row.hash_algo.as_deref(), Some("sha1"));

        let members = db.members_of_archive(zip_row.id).unwrap();
        assert_eq!(members.len(), 2);
        assert_eq!(members[0].member_path, "one.jpg");
        assert_eq!(db.count_unlinked_members(sink.library_id()).unwrap(), 0);
        assert!(db.connection().is_autocommit());
    }

    #[test]
    fn test_orphan_member_stays_unlinked() {
        let db = Database::open_in_memory().unwrap();
        let mut sink = SqliteSink::new(db, "lib", "/lib", None).unwrap();
        let ghost = entry("ghost.7z", true);
        sink.write_member(&member(&ghost, "x")).unwrap();
        sink.finish().unwrap();
        assert_eq!(
            sink.database()
                .count_unlinked_members(sink.library_id())
                .unwrap(),
            1
        );
    }
}
