//! Segment Store
//!
//! Owns the segment directory: names, writes, reads and retires segment files.
//!
//! ## Responsibilities
//! - Discover existing segments on startup (oldest → newest)
//! - Create new segments from sorted records
//! - Point lookups inside a named segment
//! - Delete retired segments
//!
//! The ordered list of live segments belongs to the engine; the store only
//! deals in names.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use rand::Rng;
use tracing::{debug, warn};

use crate::error::Result;
use crate::record::{Entry, Key, Record};
use crate::wal::epoch_seconds;

use super::segment::{parse_segment_seq, segment_name, TMP_EXTENSION};
use super::{SegmentMeta, SegmentReader, SegmentWriter};

/// Manages the segment directory
///
/// ## Concurrency:
/// - `next_seq`: Atomic counter (lock-free)
/// - All methods use `&self`; segment files are immutable once committed
pub struct SegmentStore {
    /// Directory where segments are stored
    dir: PathBuf,

    /// Sequence number of the next segment (atomic, lock-free)
    next_seq: AtomicU64,
}

impl SegmentStore {
    /// Open or create a segment directory
    ///
    /// On startup:
    /// 1. Create directory if it doesn't exist
    /// 2. Remove temporary files left by interrupted writes
    /// 3. Continue numbering after the highest existing sequence
    pub fn open(path: &Path) -> Result<Self> {
        fs::create_dir_all(path)?;

        let mut max_seq = 0;
        for entry in fs::read_dir(path)? {
            let entry = entry?;
            let file_path = entry.path();
            if !file_path.is_file() {
                continue;
            }

            if file_path.extension().and_then(|e| e.to_str()) == Some(TMP_EXTENSION) {
                warn!(path = %file_path.display(), "removing interrupted segment write");
                fs::remove_file(&file_path)?;
                continue;
            }

            if let Some(seq) = Self::file_seq(&file_path) {
                max_seq = max_seq.max(seq);
            }
        }

        Ok(Self {
            dir: path.to_path_buf(),
            next_seq: AtomicU64::new(max_seq + 1),
        })
    }

    /// Names of all committed segments, ordered oldest → newest
    pub fn discover(&self) -> Result<Vec<String>> {
        let mut found: Vec<(u64, String)> = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let file_path = entry.path();
            if !file_path.is_file() {
                continue;
            }
            if let Some(seq) = Self::file_seq(&file_path) {
                let name = entry.file_name().to_string_lossy().into_owned();
                found.push((seq, name));
            }
        }
        found.sort();
        Ok(found.into_iter().map(|(_, name)| name).collect())
    }

    /// Write records (ascending keys) to a brand-new segment
    pub fn write<I>(&self, records: I) -> Result<SegmentMeta>
    where
        I: IntoIterator<Item = Record>,
    {
        self.write_results(records.into_iter().map(Ok))
    }

    /// Write a fallible stream of records (ascending keys) to a new segment
    ///
    /// Stops at the first error; nothing is left behind under a live name.
    pub fn write_results<I>(&self, records: I) -> Result<SegmentMeta>
    where
        I: IntoIterator<Item = Result<Record>>,
    {
        let path = self.path_of(&self.next_name());
        let mut writer = SegmentWriter::create(&path)?;
        for record in records {
            writer.add(&record?)?;
        }
        let meta = writer.finish()?;
        debug!(
            segment = %meta.name,
            records = meta.record_count,
            tombstones = meta.tombstone_count,
            "segment written"
        );
        Ok(meta)
    }

    /// Look up `key` in one segment
    ///
    /// Returns `KvError::SegmentMissing` if the file no longer exists.
    pub fn point_lookup(&self, name: &str, key: Key) -> Result<Option<Entry>> {
        SegmentReader::open(&self.path_of(name))?.get(key)
    }

    /// Open a segment for sequential reading
    pub fn reader(&self, name: &str) -> Result<SegmentReader> {
        SegmentReader::open(&self.path_of(name))
    }

    /// Read every record of a segment into memory
    pub fn read_all(&self, name: &str) -> Result<Vec<Record>> {
        self.reader(name)?.collect()
    }

    /// Permanently remove a retired segment
    ///
    /// Only call after its replacement is durably written. Removing a file
    /// that is already gone is not an error.
    pub fn delete(&self, name: &str) -> Result<()> {
        match fs::remove_file(self.path_of(name)) {
            Ok(()) => {
                debug!(segment = %name, "segment deleted");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                warn!(segment = %name, "segment already removed");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Whether a segment file is present
    pub fn exists(&self, name: &str) -> bool {
        self.path_of(name).is_file()
    }

    /// Full path of a segment
    pub fn path_of(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    /// Get the segment directory path
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Get the next sequence number (for testing/debugging)
    pub fn next_seq(&self) -> u64 {
        self.next_seq.load(Ordering::SeqCst)
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    /// Allocate a fresh, unique segment name
    fn next_name(&self) -> String {
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
        let nonce: u32 = rand::thread_rng().gen();
        segment_name(epoch_seconds(), seq, nonce)
    }

    fn file_seq(path: &Path) -> Option<u64> {
        parse_segment_seq(&path.file_name()?.to_string_lossy())
    }
}
