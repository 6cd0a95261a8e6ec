//! Log Writer
//!
//! Handles appending records to the log file.

use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::mem;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::config::LogSyncStrategy;
use crate::error::Result;
use crate::record::Key;

use super::LogRecord;

/// Appends records to the log file
///
/// Every append is flushed out of the process before it returns, so a
/// successful `append` means the mutation may be applied. With
/// `LogSyncStrategy::EveryWrite` the data is also forced to disk. A failed
/// append is rolled back so the rejected record can never be replayed.
pub struct LogWriter {
    path: PathBuf,
    writer: BufWriter<File>,
    /// File length up to the last successful append
    len: u64,
    sync_strategy: LogSyncStrategy,
    /// Records appended through this writer
    records_written: u64,
}

impl LogWriter {
    /// Open or create a log file for appending
    pub fn open(path: &Path, sync_strategy: LogSyncStrategy) -> Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let len = file.metadata()?.len();

        Ok(Self {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
            len,
            sync_strategy,
            records_written: 0,
        })
    }

    /// Append a record and push it to stable storage
    pub fn append(&mut self, record: &LogRecord) -> Result<()> {
        let line = record.encode();
        if let Err(e) = self.write_line(line.as_bytes()) {
            self.rollback();
            return Err(e.into());
        }

        self.len += line.len() as u64;
        self.records_written += 1;
        debug!(
            action = record.action.code(),
            key = record.key,
            "log record appended"
        );
        Ok(())
    }

    /// Log an ADD
    pub fn append_add(&mut self, key: Key, value: &str) -> Result<()> {
        self.append(&LogRecord::add(key, value))
    }

    /// Log a DELETE
    pub fn append_delete(&mut self, key: Key) -> Result<()> {
        self.append(&LogRecord::delete(key))
    }

    /// Record that everything logged so far is durable in `segment`
    ///
    /// Checkpoints are always forced to disk regardless of strategy.
    pub fn checkpoint(&mut self, segment: &str) -> Result<()> {
        self.append(&LogRecord::checkpoint(segment))?;
        if self.sync_strategy != LogSyncStrategy::EveryWrite {
            self.writer.get_ref().sync_data()?;
        }
        Ok(())
    }

    /// Drop everything already covered by a checkpoint
    ///
    /// Empties the file and writes a fresh checkpoint naming `segment`, so
    /// replay only ever reads records logged since the last flush. Call only
    /// after `checkpoint(segment)` succeeded: a crash at any point here leaves
    /// either the old log (ending in that checkpoint) or one with nothing to
    /// replay.
    pub fn restart_at_checkpoint(&mut self, segment: &str) -> Result<()> {
        self.writer.flush()?;
        let file = self.writer.get_ref();
        file.set_len(0)?;
        file.sync_all()?;
        self.len = 0;
        debug!(path = %self.path.display(), "log truncated at checkpoint");

        self.checkpoint(segment)
    }

    /// Force sync to disk
    pub fn sync(&mut self) -> Result<()> {
        self.writer.flush()?;
        self.writer.get_ref().sync_all()?;
        Ok(())
    }

    /// File length covered by successful appends
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of records appended through this writer
    pub fn records_written(&self) -> u64 {
        self.records_written
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_line(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.writer.write_all(bytes)?;
        self.writer.flush()?;
        if self.sync_strategy == LogSyncStrategy::EveryWrite {
            self.writer.get_ref().sync_data()?;
        }
        Ok(())
    }

    /// Discard buffered bytes and cut the file back to the last good record
    fn rollback(&mut self) {
        let file = match self.writer.get_ref().try_clone() {
            Ok(file) => file,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "log rollback failed");
                return;
            }
        };
        let failed = mem::replace(&mut self.writer, BufWriter::new(file));
        let (_, _discarded) = failed.into_parts();

        if let Err(e) = self.writer.get_ref().set_len(self.len) {
            warn!(path = %self.path.display(), error = %e, "log truncate after failed append failed");
        }
    }
}
