//! Log Recovery
//!
//! Finds the mutations that were logged after the last checkpoint and so may
//! only exist in the log.

use std::fs::OpenOptions;
use std::path::Path;

use tracing::{info, warn};

use crate::error::{KvError, Result};

use super::{LogAction, LogReader, LogRecord};

/// Handles log replay after a restart or crash
pub struct LogRecovery;

/// Result of a replay
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReplayStats {
    /// Well-formed records read from the whole file
    pub records_read: u64,

    /// Mutations after the last checkpoint (returned to the caller)
    pub records_replayed: u64,

    /// Malformed lines skipped
    pub lines_corrupted: u64,

    /// Segment named by the last checkpoint, if any
    pub last_checkpoint: Option<String>,

    /// Whether the file ended with a partial line
    pub torn_tail: bool,
}

impl LogRecovery {
    /// Replay a log file
    ///
    /// This will:
    /// 1. Read every complete line
    /// 2. Skip (and count) malformed lines
    /// 3. Truncate a torn final line so later appends start on a clean line
    /// 4. Return ADD/DELETE records after the last checkpoint, in log order
    ///
    /// A missing file replays as empty.
    pub fn replay(path: &Path) -> Result<(Vec<LogRecord>, ReplayStats)> {
        if !path.exists() {
            return Ok((Vec::new(), ReplayStats::default()));
        }

        let (records, stats, valid_len) = Self::scan(path)?;

        if stats.torn_tail {
            let file = OpenOptions::new().write(true).open(path)?;
            file.set_len(valid_len)?;
            file.sync_all()?;
            warn!(path = %path.display(), valid_len, "truncated torn log tail");
        }

        info!(
            records_read = stats.records_read,
            records_replayed = stats.records_replayed,
            lines_corrupted = stats.lines_corrupted,
            last_checkpoint = ?stats.last_checkpoint,
            "log replay complete"
        );
        Ok((records, stats))
    }

    /// Same as `replay` without modifying the file
    pub fn inspect(path: &Path) -> Result<(Vec<LogRecord>, ReplayStats)> {
        if !path.exists() {
            return Ok((Vec::new(), ReplayStats::default()));
        }
        let (records, stats, _) = Self::scan(path)?;
        Ok((records, stats))
    }

    fn scan(path: &Path) -> Result<(Vec<LogRecord>, ReplayStats, u64)> {
        let mut reader = LogReader::open(path)?;
        let mut stats = ReplayStats::default();
        let mut pending = Vec::new();

        loop {
            match reader.next_record() {
                Ok(Some(record)) => {
                    stats.records_read += 1;
                    if record.action == LogAction::Checkpoint {
                        pending.clear();
                        stats.last_checkpoint = Some(record.value);
                    } else {
                        pending.push(record);
                    }
                }
                Ok(None) => break,
                Err(KvError::LogCorruption(msg)) => {
                    warn!(reason = %msg, "skipping corrupt log line");
                    stats.lines_corrupted += 1;
                }
                Err(e) => return Err(e),
            }
        }

        stats.records_replayed = pending.len() as u64;
        stats.torn_tail = reader.torn_tail();
        Ok((pending, stats, reader.valid_len()))
    }
}
