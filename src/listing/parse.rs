//! Parser for the "technical" listing format (`7z l -slt`).
//!
//! The output is a sequence of blocks, one per member, each made of `Key = Value` lines and
//! terminated by a blank line:
//!
//! ```text
//! Path = docs/readme.txt
//! Size = 42
//! Attributes = A
//! Method = Deflate
//!
//! ```
//!
//! 7-Zip prints the archive's own properties first and introduces the member list with a
//! line of dashes. Blocks seen before that separator describe the archive, not a member,
//! and are dropped when the separator arrives.

use crate::model::ListedMember;
use chrono::NaiveDateTime;
use std::collections::HashMap;
use std::path::Path;
use tracing::trace;

const MEMBER_SECTION_SEPARATOR: &str = "----------";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    BetweenBlocks,
    Accumulating,
}

#[derive(Debug)]
pub struct ListingParser {
    state: State,
    block: HashMap<String, String>,
    members: Vec<ListedMember>,
    in_member_section: bool,
    flush_trailing_block: bool,
}

impl Default for ListingParser {
    fn default() -> Self {
        Self::new()
    }
}

impl ListingParser {
    pub fn new() -> Self {
        Self {
            state: State::BetweenBlocks,
            block: HashMap::new(),
            members: Vec::new(),
            in_member_section: false,
            flush_trailing_block: false,
        }
    }

    /// Finalize a block that is still open when the input ends instead of dropping it.
    pub fn flush_trailing_block(mut self, flush: bool) -> Self {
        self.flush_trailing_block = flush;
        self
    }

    pub fn feed_line(&mut self, line: &str) {
        let line = line.trim();

        if line.is_empty() {
            if self.state == State::Accumulating {
                self.finalize_block();
            }
            return;
        }

        if !self.in_member_section && is_member_separator(line) {
            if !self.members.is_empty() {
                trace!("Dropping {} archive header block(s)", self.members.len());
            }
            self.members.clear();
            self.block.clear();
            self.state = State::BetweenBlocks;
            self.in_member_section = true;
            return;
        }

        if let Some((key, value)) = line.split_once('=') {
            self.block
                .insert(key.trim().to_string(), value.trim().to_string());
            self.state = State::Accumulating;
        }
    }

    pub fn finish(mut self) -> Vec<ListedMember> {
        if self.state == State::Accumulating {
            if self.flush_trailing_block {
                self.finalize_block();
            } else if self.block.contains_key("Path") {
                trace!(
                    "Dropping unterminated listing block for {:?}",
                    self.block.get("Path")
                );
            }
        }
        self.members
    }

    fn finalize_block(&mut self) {
        let block = std::mem::take(&mut self.block);
        self.state = State::BetweenBlocks;
        if let Some(member) = member_from_block(block) {
            self.members.push(member);
        }
    }
}

/// Parse a whole decoded listing with the default (drop trailing block) policy.
pub fn parse_listing(text: &str) -> Vec<ListedMember> {
    parse_listing_with(text, false)
}

pub fn parse_listing_with(text: &str, flush_trailing_block: bool) -> Vec<ListedMember> {
    let mut parser = ListingParser::new().flush_trailing_block(flush_trailing_block);
    for line in text.lines() {
        parser.feed_line(line);
    }
    parser.finish()
}

fn is_member_separator(line: &str) -> bool {
    line.len() >= MEMBER_SECTION_SEPARATOR.len() && line.bytes().all(|b| b == b'-')
}

fn member_from_block(mut block: HashMap<String, String>) -> Option<ListedMember> {
    let path = block.remove("Path")?;

    let size = match block.get("Size") {
        Some(raw) => raw.parse::<u64>().unwrap_or_else(|_| {
            trace!("Malformed Size '{}' for {}, using 0", raw, path);
            0
        }),
        None => 0,
    };

    let is_directory = block
        .get("Attributes")
        .is_some_and(|attrs| attrs.starts_with('D'));
    let is_encrypted = block.get("Encrypted").is_some_and(|flag| flag == "+");
    let compression_method = block.remove("Method").unwrap_or_default();
    let modified = block.get("Modified").and_then(|raw| parse_modified(raw));

    let extension = if is_directory {
        String::new()
    } else {
        Path::new(&path)
            .extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
            .unwrap_or_default()
    };

    Some(ListedMember {
        path,
        size,
        is_directory,
        is_encrypted,
        compression_method,
        extension,
        modified,
    })
}

fn parse_modified(raw: &str) -> Option<String> {
    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|ts| ts.format("%Y-%m-%dT%H:%M:%S").to_string())
}
