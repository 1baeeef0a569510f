use super::CatalogSink;
use crate::error::Error;
use crate::model::{ArchiveMember, Entry, ENTRY_COLUMNS, MEMBER_COLUMNS};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::debug;

pub const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Writes entries and archive members to two CSV streams, header first.
///
/// Streams start with a UTF-8 byte-order mark so spreadsheet tools pick the right encoding.
pub struct CsvSink<W: Write> {
    entries: csv::Writer<W>,
    members: csv::Writer<W>,
}

impl CsvSink<BufWriter<File>> {
    /// Create (or truncate) both files, creating missing parent directories.
    pub fn create(entries_path: &Path, members_path: &Path) -> Result<Self, Error> {
        let entries = create_file(entries_path)?;
        let members = create_file(members_path)?;
        debug!(
            "Writing entries to {}, archive members to {}",
            entries_path.display(),
            members_path.display()
        );
        Self::new(entries, members)
    }
}

impl<W: Write> CsvSink<W> {
    pub fn new(mut entries: W, mut members: W) -> Result<Self, Error> {
        entries.write_all(UTF8_BOM)?;
        members.write_all(UTF8_BOM)?;

        let mut entries = csv::Writer::from_writer(entries);
        let mut members = csv::Writer::from_writer(members);
        entries.write_record(ENTRY_COLUMNS)?;
        members.write_record(MEMBER_COLUMNS)?;

        Ok(Self { entries, members })
    }

    /// Flush and hand back the underlying writers.
    pub fn into_inner(self) -> Result<(W, W), Error> {
        let entries = self
            .entries
            .into_inner()
            .map_err(|e| Error::Io(e.into_error()))?;
        let members = self
            .members
            .into_inner()
            .map_err(|e| Error::Io(e.into_error()))?;
        Ok((entries, members))
    }
}

impl<W: Write> CatalogSink for CsvSink<W> {
    fn write_entry(&mut self, entry: &Entry) -> Result<(), Error> {
        self.entries.write_record(entry.to_record())?;
        Ok(())
    }

    fn write_member(&mut self, member: &ArchiveMember) -> Result<(), Error> {
        self.members.write_record(member.to_record())?;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), Error> {
        self.entries.flush()?;
        self.members.flush()?;
        Ok(())
    }
}

fn create_file(path: &Path) -> Result<BufWriter<File>, Error> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    Ok(BufWriter::new(File::create(path)?))
}
