use super::CatalogSink;
use crate::error::Error;
use crate::model::{ArchiveMember, Entry};
use std::collections::HashMap;
use tracing::warn;

/// Keeps a whole catalog in memory, indexed by full path.
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    entries: Vec<Entry>,
    members: Vec<ArchiveMember>,
    index: HashMap<String, usize>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn members(&self) -> &[ArchiveMember] {
        &self.members
    }

    pub fn entry(&self, idx: usize) -> Option<&Entry> {
        self.entries.get(idx)
    }

    /// Index of the archive entry a member belongs to.
    pub fn resolve(&self, member: &ArchiveMember) -> Option<usize> {
        self.index
            .get(&member.archive_full_path)
            .copied()
            .filter(|&idx| self.entries[idx].is_archive)
    }

    /// Pairs each member (by position) with its archive entry, `None` for orphans.
    pub fn reconcile(&self) -> Vec<(usize, Option<usize>)> {
        self.members
            .iter()
            .enumerate()
            .map(|(i, member)| (i, self.resolve(member)))
            .collect()
    }

    pub fn members_of(&self, archive_full_path: &str) -> Vec<&ArchiveMember> {
        self.members
            .iter()
            .filter(|m| m.archive_full_path == archive_full_path)
            .collect()
    }
}

impl CatalogSink for MemoryCatalog {
    fn write_entry(&mut self, entry: &Entry) -> Result<(), Error> {
        let idx = self.entries.len();
        if self.index.insert(entry.full_path.clone(), idx).is_some() {
            warn!("Duplicate catalog entry for {}", entry.full_path);
        }
        self.entries.push(entry.clone());
        Ok(())
    }

    fn write_member(&mut self, member: &ArchiveMember) -> Result<(), Error> {
        self.members.push(member.clone());
        Ok(())
    }

    fn finish(&mut self) -> Result<(), Error> {
        Ok(())
    }
}
