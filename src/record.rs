//! Record types shared by every layer
//!
//! A record is an integer key paired with either a live string value or a
//! tombstone. On disk (segments and the log) the tombstone is spelled as the
//! reserved literal [`TOMBSTONE`], which is why a live value may never equal it.

use std::fmt;

use crate::error::{KvError, Result};

/// Key type. Requests only accept keys greater than zero.
pub type Key = i64;

/// Reserved literal written in place of a value for deleted keys
pub const TOMBSTONE: &str = "*-*";

/// Value side of a record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    /// A live value
    Value(String),

    /// A tombstone (deleted key)
    Tombstone,
}

impl Entry {
    /// Decode the value column of a segment or log line
    pub fn from_raw(raw: &str) -> Self {
        if raw == TOMBSTONE {
            Entry::Tombstone
        } else {
            Entry::Value(raw.to_string())
        }
    }

    /// The value column as written to disk
    pub fn as_raw(&self) -> &str {
        match self {
            Entry::Value(v) => v,
            Entry::Tombstone => TOMBSTONE,
        }
    }

    pub fn is_tombstone(&self) -> bool {
        matches!(self, Entry::Tombstone)
    }

    /// Live value, or None for a tombstone
    pub fn into_value(self) -> Option<String> {
        match self {
            Entry::Value(v) => Some(v),
            Entry::Tombstone => None,
        }
    }

    /// Approximate heap footprint, used for memtable size accounting
    pub(crate) fn approximate_size(&self) -> usize {
        match self {
            Entry::Value(v) => v.len(),
            Entry::Tombstone => 0,
        }
    }
}

/// A key with its value or tombstone
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub key: Key,
    pub entry: Entry,
}

impl Record {
    pub fn new(key: Key, entry: Entry) -> Self {
        Self { key, entry }
    }

    pub fn value(key: Key, value: impl Into<String>) -> Self {
        Self::new(key, Entry::Value(value.into()))
    }

    pub fn tombstone(key: Key) -> Self {
        Self::new(key, Entry::Tombstone)
    }
}

impl fmt::Display for Record {
    /// Segment line format without the trailing newline: `<key>,<value>`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.key, self.entry.as_raw())
    }
}

/// Keys must be strictly positive
pub fn validate_key(key: Key) -> Result<()> {
    if key <= 0 {
        return Err(KvError::InvalidInput(format!(
            "key must be greater than zero, got {}",
            key
        )));
    }
    Ok(())
}

/// A live value must fit on one segment line and must not collide with the
/// tombstone marker
pub fn validate_value(value: &str) -> Result<()> {
    if value == TOMBSTONE {
        return Err(KvError::InvalidInput(format!(
            "value {:?} is reserved for deletions",
            TOMBSTONE
        )));
    }
    if value.contains(&[',', '\n', '\r'][..]) {
        return Err(KvError::InvalidInput(format!(
            "value {:?} contains a comma or line break",
            value
        )));
    }
    Ok(())
}
