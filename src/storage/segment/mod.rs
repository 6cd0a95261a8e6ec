//! Segment Module
//!
//! An immutable, sorted text file of records.
//!
//! ## Naming
//! ```text
//! seg-<epoch-secs>-<seq:06>-<rand:08x>.seg
//! ```
//! The sequence number orders segments oldest → newest across restarts;
//! the random suffix keeps names unique within a running process.
//!
//! Segments are written to `<name>.tmp` and renamed into place once
//! complete, so a live name never refers to a partial file.

mod builder;
mod reader;

use std::path::PathBuf;

use crate::record::{Entry, Key, Record};

pub use builder::SegmentWriter;
pub use reader::SegmentReader;

// =============================================================================
// Shared Constants (used by builder, reader, store)
// =============================================================================

/// File extension of a committed segment
pub const SEGMENT_EXTENSION: &str = "seg";

/// File extension of a segment still being written
pub(crate) const TMP_EXTENSION: &str = "tmp";

/// Prefix of every segment file name
pub(crate) const SEGMENT_PREFIX: &str = "seg-";

// =============================================================================
// Segment Metadata
// =============================================================================

/// Summary of a segment returned when it is committed
#[derive(Debug, Clone)]
pub struct SegmentMeta {
    /// File name (unique, ordered by its sequence number)
    pub name: String,
    /// Full path to the file
    pub path: PathBuf,
    /// Number of records
    pub record_count: u64,
    /// Number of tombstone records
    pub tombstone_count: u64,
    /// Smallest key, None for an empty segment
    pub min_key: Option<Key>,
    /// Largest key, None for an empty segment
    pub max_key: Option<Key>,
}

impl SegmentMeta {
    /// Quick check if a key might be in this segment (range check)
    pub fn might_contain(&self, key: Key) -> bool {
        match (self.min_key, self.max_key) {
            (Some(min), Some(max)) => key >= min && key <= max,
            _ => false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.record_count == 0
    }
}

// =============================================================================
// Naming and Line Helpers
// =============================================================================

/// Build a segment file name
pub(crate) fn segment_name(epoch_secs: u64, seq: u64, nonce: u32) -> String {
    format!(
        "{}{}-{:06}-{:08x}.{}",
        SEGMENT_PREFIX, epoch_secs, seq, nonce, SEGMENT_EXTENSION
    )
}

/// Parse the sequence number out of a segment file name
/// "seg-1718000000-000042-0badf00d.seg" → Some(42)
pub(crate) fn parse_segment_seq(name: &str) -> Option<u64> {
    let stem = name
        .strip_prefix(SEGMENT_PREFIX)?
        .strip_suffix(SEGMENT_EXTENSION)?
        .strip_suffix('.')?;
    let mut parts = stem.split('-');
    let _secs: u64 = parts.next()?.parse().ok()?;
    let seq = parts.next()?.parse().ok()?;
    let nonce = parts.next()?;
    if nonce.len() != 8 || u32::from_str_radix(nonce, 16).is_err() || parts.next().is_some() {
        return None;
    }
    Some(seq)
}

/// Parse one `<key>,<value>` line (without its newline)
pub(crate) fn parse_line(line: &str) -> Result<Record, &'static str> {
    let (key, value) = line.split_once(',').ok_or("missing comma")?;
    let key = key.parse::<Key>().map_err(|_| "key is not an integer")?;
    Ok(Record::new(key, Entry::from_raw(value)))
}
