//! MemTable implementation
//!
//! BTreeMap-based memtable with RwLock for concurrency.

use std::collections::BTreeMap;
use std::mem;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::RwLock;

use crate::error::Result;
use crate::record::{validate_value, Entry, Key, Record};

/// In-memory table for recent writes
///
/// Holds at most one entry per key; an entry is either a live value or a
/// tombstone. The engine decides when the table is full, the table only
/// reports how many distinct keys it holds.
pub struct MemTable {
    /// Sorted key → entry map
    data: RwLock<BTreeMap<Key, Entry>>,

    /// Approximate size in bytes (keys + value payloads)
    size: AtomicUsize,
}

impl MemTable {
    /// Create a new empty MemTable
    pub fn new() -> Self {
        Self {
            data: RwLock::new(BTreeMap::new()),
            size: AtomicUsize::new(0),
        }
    }

    /// Get the entry for a key (read lock)
    ///
    /// Returns `Some(Entry::Tombstone)` for a key deleted since the last
    /// flush, which callers must treat as a definitive "not found".
    pub fn get(&self, key: Key) -> Option<Entry> {
        self.data.read().get(&key).cloned()
    }

    /// Live value for a key, if one is resident
    pub fn lookup(&self, key: Key) -> Option<String> {
        self.get(key).and_then(Entry::into_value)
    }

    /// Upsert a live value (write lock)
    ///
    /// Replaces any prior value or tombstone. Values equal to the tombstone
    /// marker are rejected. Returns the distinct-key count after the insert.
    pub fn insert(&self, key: Key, value: String) -> Result<usize> {
        validate_value(&value)?;
        Ok(self.upsert(key, Entry::Value(value)))
    }

    /// Soft delete: store a tombstone for the key (write lock)
    ///
    /// The key need not be resident; the tombstone shadows copies that only
    /// exist in segments. Returns the distinct-key count afterwards.
    pub fn delete(&self, key: Key) -> usize {
        self.upsert(key, Entry::Tombstone)
    }

    /// Hard delete: drop the entry entirely (write lock)
    ///
    /// Returns true if the key was resident.
    pub fn remove(&self, key: Key) -> bool {
        let mut data = self.data.write();
        match data.remove(&key) {
            Some(old) => {
                self.size
                    .fetch_sub(Self::entry_size(&old), Ordering::Relaxed);
                true
            }
            None => false,
        }
    }

    /// Approximate size in bytes
    pub fn size(&self) -> usize {
        self.size.load(Ordering::Relaxed)
    }

    /// Number of distinct keys (live values and tombstones)
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }

    /// Check whether the table reached its capacity
    pub fn is_full(&self, max_keys: usize) -> bool {
        self.len() >= max_keys
    }

    /// Snapshot of every record in ascending key order (for flush)
    pub fn ascending_scan(&self) -> Vec<Record> {
        self.data
            .read()
            .iter()
            .map(|(key, entry)| Record::new(*key, entry.clone()))
            .collect()
    }

    /// Keys currently resident, ascending
    pub fn keys(&self) -> Vec<Key> {
        self.data.read().keys().copied().collect()
    }

    /// Clear all entries (after successful flush)
    pub fn clear(&self) {
        let mut data = self.data.write();
        data.clear();
        self.size.store(0, Ordering::Relaxed);
    }

    fn upsert(&self, key: Key, entry: Entry) -> usize {
        let mut data = self.data.write();
        let added = Self::entry_size(&entry);
        match data.insert(key, entry) {
            Some(old) => {
                let removed = Self::entry_size(&old);
                if added >= removed {
                    self.size.fetch_add(added - removed, Ordering::Relaxed);
                } else {
                    self.size.fetch_sub(removed - added, Ordering::Relaxed);
                }
            }
            None => {
                self.size.fetch_add(added, Ordering::Relaxed);
            }
        }
        data.len()
    }

    fn entry_size(entry: &Entry) -> usize {
        mem::size_of::<Key>() + entry.approximate_size()
    }
}

impl Default for MemTable {
    fn default() -> Self {
        Self::new()
    }
}
