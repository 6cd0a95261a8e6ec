//! Segment Writer
//!
//! Writes sorted records to a new segment file.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::error::{KvError, Result};
use crate::record::{Key, Record};

use super::{SegmentMeta, TMP_EXTENSION};

/// Builder for creating a segment from records in ascending key order
///
/// Records go to a temporary file next to the target; `finish()` syncs it,
/// renames it into place and syncs the directory. A writer dropped before
/// `finish()` removes its temporary file.
pub struct SegmentWriter {
    /// Final file path
    path: PathBuf,
    /// Path written to until `finish()`
    tmp_path: PathBuf,
    /// Buffered writer; None once finished
    writer: Option<BufWriter<File>>,
    record_count: u64,
    tombstone_count: u64,
    min_key: Option<Key>,
    max_key: Option<Key>,
}

impl SegmentWriter {
    /// Create a writer that will commit to `path`
    pub fn create(path: &Path) -> Result<Self> {
        let tmp_path = path.with_extension(TMP_EXTENSION);
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&tmp_path)?;

        Ok(Self {
            path: path.to_path_buf(),
            tmp_path,
            writer: Some(BufWriter::new(file)),
            record_count: 0,
            tombstone_count: 0,
            min_key: None,
            max_key: None,
        })
    }

    /// Append a record (keys must be strictly ascending)
    pub fn add(&mut self, record: &Record) -> Result<()> {
        if let Some(last) = self.max_key {
            if record.key <= last {
                return Err(KvError::InvalidInput(format!(
                    "segment keys must be strictly ascending: {} after {}",
                    record.key, last
                )));
            }
        }

        let writer = self.writer.as_mut().ok_or_else(|| {
            KvError::InvalidInput("segment writer already finished".to_string())
        })?;
        writeln!(writer, "{}", record)?;

        if self.min_key.is_none() {
            self.min_key = Some(record.key);
        }
        self.max_key = Some(record.key);
        self.record_count += 1;
        if record.entry.is_tombstone() {
            self.tombstone_count += 1;
        }
        Ok(())
    }

    /// Number of records added so far
    pub fn record_count(&self) -> u64 {
        self.record_count
    }

    /// Flush, sync, and rename the file into place
    pub fn finish(mut self) -> Result<SegmentMeta> {
        let writer = self.writer.take().ok_or_else(|| {
            KvError::InvalidInput("segment writer already finished".to_string())
        })?;

        let committed = writer
            .into_inner()
            .map_err(|e| e.into_error())
            .and_then(|file| file.sync_all())
            .and_then(|_| fs::rename(&self.tmp_path, &self.path));
        if let Err(e) = committed {
            let _ = fs::remove_file(&self.tmp_path);
            return Err(e.into());
        }

        // The new directory entry must be durable before anyone refers to it
        if let Err(e) = sync_parent_dir(&self.path) {
            let _ = fs::remove_file(&self.path);
            return Err(e.into());
        }

        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        Ok(SegmentMeta {
            name,
            path: self.path.clone(),
            record_count: self.record_count,
            tombstone_count: self.tombstone_count,
            min_key: self.min_key,
            max_key: self.max_key,
        })
    }
}

/// fsync the directory holding `path`
fn sync_parent_dir(path: &Path) -> io::Result<()> {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => File::open(dir)?.sync_all(),
        _ => Ok(()),
    }
}

impl Drop for SegmentWriter {
    fn drop(&mut self) {
        if self.writer.take().is_some() {
            if let Err(e) = fs::remove_file(&self.tmp_path) {
                warn!(path = %self.tmp_path.display(), error = %e, "failed to remove abandoned segment");
            }
        }
    }
}
