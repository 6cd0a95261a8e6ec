//! Log record definitions
//!
//! Defines the structure of individual log lines and their text encoding.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::{KvError, Result};
use crate::record::{Entry, Key, Record, TOMBSTONE};

/// Kind of a log record, written as a numeric code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogAction {
    /// Everything logged before this line is durable in a segment
    Checkpoint,

    /// Upsert of a live value
    Add,

    /// Tombstone write
    Delete,
}

impl LogAction {
    pub fn code(self) -> u8 {
        match self {
            LogAction::Checkpoint => 0,
            LogAction::Add => 1,
            LogAction::Delete => 3,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(LogAction::Checkpoint),
            1 => Some(LogAction::Add),
            3 => Some(LogAction::Delete),
            _ => None,
        }
    }
}

/// A single line in the log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    /// Seconds since the unix epoch when the record was appended
    pub timestamp: u64,

    pub action: LogAction,

    /// Zero for checkpoints
    pub key: Key,

    /// Live value for ADD, the tombstone marker for DELETE,
    /// the flushed segment's name for CHECKPOINT
    pub value: String,
}

impl LogRecord {
    pub fn add(key: Key, value: impl Into<String>) -> Self {
        Self::now(LogAction::Add, key, value.into())
    }

    pub fn delete(key: Key) -> Self {
        Self::now(LogAction::Delete, key, TOMBSTONE.to_string())
    }

    pub fn checkpoint(segment: impl Into<String>) -> Self {
        Self::now(LogAction::Checkpoint, 0, segment.into())
    }

    fn now(action: LogAction, key: Key, value: String) -> Self {
        Self {
            timestamp: epoch_seconds(),
            action,
            key,
            value,
        }
    }

    /// The memtable mutation this record describes, if any
    pub fn to_record(&self) -> Option<Record> {
        match self.action {
            LogAction::Add => Some(Record::new(self.key, Entry::Value(self.value.clone()))),
            LogAction::Delete => Some(Record::tombstone(self.key)),
            LogAction::Checkpoint => None,
        }
    }

    /// Encode as a full log line, including the trailing newline
    pub fn encode(&self) -> String {
        format!("{}\n", self)
    }

    /// Parse one line (with or without its trailing newline)
    pub fn parse(line: &str) -> Result<Self> {
        let line = line.strip_suffix('\n').unwrap_or(line);
        let line = line.strip_suffix('\r').unwrap_or(line);

        let (timestamp, rest) = line
            .split_once(" - ")
            .ok_or_else(|| corrupt(line, "missing timestamp separator"))?;
        let (code, rest) = rest
            .split_once(':')
            .ok_or_else(|| corrupt(line, "missing action separator"))?;
        let (key, value) = rest
            .split_once(',')
            .ok_or_else(|| corrupt(line, "missing key/value separator"))?;

        let timestamp = timestamp
            .parse::<u64>()
            .map_err(|_| corrupt(line, "timestamp is not an integer"))?;
        let action = code
            .parse::<u8>()
            .ok()
            .and_then(LogAction::from_code)
            .ok_or_else(|| corrupt(line, "unknown action code"))?;
        let key = key
            .parse::<Key>()
            .map_err(|_| corrupt(line, "key is not an integer"))?;

        if action == LogAction::Delete && value != TOMBSTONE {
            return Err(corrupt(line, "delete record without tombstone marker"));
        }

        Ok(Self {
            timestamp,
            action,
            key,
            value: value.to_string(),
        })
    }
}

impl fmt::Display for LogRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} - {}:{},{}",
            self.timestamp,
            self.action.code(),
            self.key,
            self.value
        )
    }
}

fn corrupt(line: &str, reason: &str) -> KvError {
    KvError::LogCorruption(format!("{}: {:?}", reason, line))
}

/// Seconds since the unix epoch (0 if the clock is before it)
pub(crate) fn epoch_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
