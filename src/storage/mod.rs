pub mod csv_sink;
pub mod db_sink;
pub mod import;
pub mod memory;
pub mod models;
pub mod queries;
pub mod sqlite;

pub use csv_sink::CsvSink;
pub use db_sink::SqliteSink;
pub use memory::MemoryCatalog;
pub use sqlite::Database;

use crate::error::Error;
use crate::model::{ArchiveMember, Entry};

/// Destination for the two record streams of a scan.
///
/// A sink is only ever driven from one thread; the catalog builder serializes writes.
/// An archive's members are always written after the archive's own entry.
pub trait CatalogSink {
    fn write_entry(&mut self, entry: &Entry) -> Result<(), Error>;

    fn write_member(&mut self, member: &ArchiveMember) -> Result<(), Error>;

    /// Called once after the walk: flush buffers and link members to their archives.
    fn finish(&mut self) -> Result<(), Error>;
}
