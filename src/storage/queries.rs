use super::models::*;
use super::sqlite::Database;
use rusqlite::{params, OptionalExtension, Result, Row};
use tracing::debug;

const ENTRY_SELECT: &str = "SELECT id, library_id, full_path, parent_path, name, ext, is_dir, \
     is_archive, size_bytes, mtime, hash_algo, hash_value, extra_meta FROM entries";

const MEMBER_SELECT: &str = "SELECT id, library_id, archive_full_path, archive_entry_id, \
     member_path, member_size, member_mtime, hash_algo, hash_value, extra_meta FROM archives";

impl Database {
    // ── Library ──────────────────────────────────────────────────

    pub fn create_library(&self, name: &str, root_path: &str, note: Option<&str>) -> Result<i64> {
        let created_at = chrono::Local::now()
            .format("%Y-%m-%dT%H:%M:%S")
            .to_string();
        self.connection().execute(
            "INSERT INTO library (name, root_path, note, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![name, root_path, note, created_at],
        )?;
        let id = self.connection().last_insert_rowid();
        debug!("Created library {} '{}' for {}", id, name, root_path);
        Ok(id)
    }

    pub fn get_library(&self, id: i64) -> Result<Option<Library>> {
        self.connection()
            .query_row(
                "SELECT id, name, root_path, note, created_at FROM library WHERE id = ?1",
                params![id],
                |row| {
                    Ok(Library {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        root_path: row.get(2)?,
                        note: row.get(3)?,
                        created_at: row.get(4)?,
                    })
                },
            )
            .optional()
    }

    // ── Entries ──────────────────────────────────────────────────

    pub fn insert_entry(&self, entry: &EntryRow) -> Result<i64> {
        let mut stmt = self.connection().prepare_cached(
            "INSERT INTO entries (library_id, full_path, parent_path, name, ext, is_dir, \
             is_archive, size_bytes, mtime, hash_algo, hash_value, extra_meta) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        )?;
        stmt.execute(params![
            entry.library_id,
            entry.full_path,
            entry.parent_path,
            entry.name,
            entry.ext,
            entry.is_dir,
            entry.is_archive,
            entry.size_bytes,
            entry.mtime,
            entry.hash_algo,
            entry.hash_value,
            entry.extra_meta,
        ])?;
        Ok(self.connection().last_insert_rowid())
    }

    pub fn entries_for_library(&self, library_id: i64) -> Result<Vec<EntryRow>> {
        let mut stmt = self
            .connection()
            .prepare(&format!("{} WHERE library_id = ?1 ORDER BY id", ENTRY_SELECT))?;
        let rows = stmt.query_map(params![library_id], entry_from_row)?;
        rows.collect()
    }

    /// Entries with the given content hash, across all libraries.
    pub fn find_entries_by_hash(&self, hash_value: &str) -> Result<Vec<EntryRow>> {
        let mut stmt = self
            .connection()
            .prepare(&format!("{} WHERE hash_value = ?1 ORDER BY id", ENTRY_SELECT))?;
        let rows = stmt.query_map(params![hash_value], entry_from_row)?;
        rows.collect()
    }

    // ── Archive members ──────────────────────────────────────────

    pub fn insert_member(&self, member: &MemberRow) -> Result<i64> {
        let mut stmt = self.connection().prepare_cached(
            "INSERT INTO archives (library_id, archive_full_path, archive_entry_id, member_path, \
             member_size, member_mtime, hash_algo, hash_value, extra_meta) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        )?;
        stmt.execute(params![
            member.library_id,
            member.archive_full_path,
            member.archive_entry_id,
            member.member_path,
            member.member_size,
            member.member_mtime,
            member.hash_algo,
            member.hash_value,
            member.extra_meta,
        ])?;
        Ok(self.connection().last_insert_rowid())
    }

    pub fn members_for_library(&self, library_id: i64) -> Result<Vec<MemberRow>> {
        let mut stmt = self
            .connection()
            .prepare(&format!("{} WHERE library_id = ?1 ORDER BY id", MEMBER_SELECT))?;
        let rows = stmt.query_map(params![library_id], member_from_row)?;
        rows.collect()
    }

    pub fn members_of_archive(&self, archive_entry_id: i64) -> Result<Vec<MemberRow>> {
        let mut stmt = self.connection().prepare(&format!(
            "{} WHERE archive_entry_id = ?1 ORDER BY id",
            MEMBER_SELECT
        ))?;
        let rows = stmt.query_map(params![archive_entry_id], member_from_row)?;
        rows.collect()
    }

    /// Resolve each unlinked member's `archive_full_path` to the id of the entry with that
    /// path in the same library. Returns the number of members linked.
    pub fn link_archive_members(&self, library_id: i64) -> Result<usize> {
        let linked = self.connection().execute(
            "UPDATE archives SET archive_entry_id = ( \
                 SELECT e.id FROM entries e \
                 WHERE e.library_id = archives.library_id \
                   AND e.full_path = archives.archive_full_path \
                 ORDER BY e.id LIMIT 1) \
             WHERE library_id = ?1 \
               AND archive_entry_id IS NULL \
               AND EXISTS ( \
                 SELECT 1 FROM entries e \
                 WHERE e.library_id = archives.library_id \
                   AND e.full_path = archives.archive_full_path)",
            params![library_id],
        )?;
        debug!("Linked {} archive members in library {}", linked, library_id);
        Ok(linked)
    }

    pub fn count_unlinked_members(&self, library_id: i64) -> Result<i64> {
        self.connection().query_row(
            "SELECT COUNT(*) FROM archives WHERE library_id = ?1 AND archive_entry_id IS NULL",
            params![library_id],
            |row| row.get(0),
        )
    }
}

fn entry_from_row(row: &Row<'_>) -> Result<EntryRow> {
    Ok(EntryRow {
        id: row.get(0)?,
        library_id: row.get(1)?,
        full_path: row.get(2)?,
        parent_path: row.get(3)?,
        name: row.get(4)?,
        ext: row.get(5)?,
        is_dir: row.get(6)?,
        is_archive: row.get(7)?,
        size_bytes: row.get(8)?,
        mtime: row.get(9)?,
        hash_algo: row.get(10)?,
        hash_value: row.get(11)?,
        extra_meta: row.get(12)?,
    })
}

fn member_from_row(row: &Row<'_>) -> Result<MemberRow> {
    Ok(MemberRow {
        id: row.get(0)?,
        library_id: row.get(1)?,
        archive_full_path: row.get(2)?,
        archive_entry_id: row.get(3)?,
        member_path: row.get(4)?,
        member_size: row.get(5)?,
        member_mtime: row.get(6)?,
        hash_algo: row.get(7)?,
        hash_value: row.get(8)?,
        extra_meta: row.get(9)?,
    })
}
