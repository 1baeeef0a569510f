use crate::error::Error;
use rusqlite::Connection;
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_DB_PATH: &str = "data/workspace/archive_work.db";

/// The relational catalog store: `library`, `entries` and `archives` tables.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (creating if needed) the database file and make sure the schema exists.
    pub fn open(path: &Path) -> Result<Self, Error> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        let db = Database { conn };
        db.configure_pragmas()?;
        db.create_schema()?;
        debug!("Opened catalog database {}", path.display());
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self, Error> {
        let conn = Connection::open_in_memory()?;
        let db = Database { conn };
        db.configure_pragmas()?;
        db.create_schema()?;
        Ok(db)
    }

    fn configure_pragmas(&self) -> rusqlite::Result<()> {
        // journal_mode answers with the resulting mode, so it cannot go through execute_batch
        let journal_mode: String =
            self.conn
                .query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
        self.conn.execute_batch(
            "PRAGMA synchronous = NORMAL;
             PRAGMA foreign_keys = ON;
             PRAGMA cache_size = -64000;",
        )?;
        self.conn.busy_timeout(Duration::from_millis(5000))?;
        debug!("SQLite pragmas configured ({} journal, 64MB cache)", journal_mode);
        Ok(())
    }

    fn create_schema(&self) -> rusqlite::Result<()> {
        self.conn.execute_batch(include_str!("schema.sql"))?;
        Ok(())
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}
