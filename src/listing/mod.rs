pub mod invoke;
pub mod parse;

pub use invoke::{decode_listing, ArchiveLister};
pub use parse::{parse_listing, parse_listing_with, ListingParser};

use crate::error::Error;
use crate::model::ListedMember;
use std::path::Path;

impl ArchiveLister {
    /// List an archive and parse the output into members, in the order the tool printed them.
    pub fn list_members(
        &self,
        archive: &Path,
        flush_trailing_block: bool,
    ) -> Result<Vec<ListedMember>, Error> {
        let raw = self.list_raw(archive)?;
        Ok(parse_listing_with(&decode_listing(&raw), flush_trailing_block))
    }
}
