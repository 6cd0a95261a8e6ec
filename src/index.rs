//! Index Module
//!
//! Key → owning-segment map that lets a read skip straight to the one
//! segment holding the newest flushed copy of a key.
//!
//! ## Structure
//! Separate chaining over a bucket vector with division-method hashing:
//! `h(k) = k mod m`, sign-corrected so negative keys land in `0..m`. The
//! table doubles and rehashes once `len / m` exceeds the configured load
//! factor.
//!
//! Entries may go stale when compaction removes the segment they name;
//! readers must treat a stale hit as a miss.

use tracing::debug;

use crate::error::{KvError, Result};
use crate::record::Key;

/// Chained hash map from key to segment name
#[derive(Debug)]
pub struct HashIndex {
    buckets: Vec<Vec<(Key, String)>>,
    len: usize,
    max_load_factor: f64,
}

impl HashIndex {
    /// Create an index with `buckets` initial buckets
    pub fn new(buckets: usize, max_load_factor: f64) -> Self {
        let buckets = buckets.max(1);
        Self {
            buckets: (0..buckets).map(|_| Vec::new()).collect(),
            len: 0,
            max_load_factor,
        }
    }

    /// Map `key` to `segment`, overwriting any previous mapping
    ///
    /// Fails only if growing the table cannot allocate.
    pub fn insert_or_update(&mut self, key: Key, segment: &str) -> Result<()> {
        let slot = self.bucket_of(key);
        if let Some(existing) = self.buckets[slot].iter_mut().find(|(k, _)| *k == key) {
            if existing.1 != segment {
                existing.1 = segment.to_string();
            }
            return Ok(());
        }

        self.buckets[slot].push((key, segment.to_string()));
        self.len += 1;

        if self.load_factor() > self.max_load_factor {
            self.grow()?;
        }
        Ok(())
    }

    /// Segment recorded for `key`, if any
    pub fn lookup(&self, key: Key) -> Option<&str> {
        self.buckets[self.bucket_of(key)]
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, segment)| segment.as_str())
    }

    /// Drop the mapping for `key`, returning the segment it named
    pub fn remove(&mut self, key: Key) -> Option<String> {
        let slot = self.bucket_of(key);
        let bucket = &mut self.buckets[slot];
        let pos = bucket.iter().position(|(k, _)| *k == key)?;
        self.len -= 1;
        Some(bucket.swap_remove(pos).1)
    }

    /// Number of keys mapped
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Current number of buckets (`m`)
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Keys per bucket
    pub fn load_factor(&self) -> f64 {
        self.len as f64 / self.buckets.len() as f64
    }

    /// Remove all mappings, keeping the current bucket count
    pub fn clear(&mut self) {
        for bucket in &mut self.buckets {
            bucket.clear();
        }
        self.len = 0;
    }

    /// Division-method bucket for a key
    fn bucket_of(&self, key: Key) -> usize {
        hash(key, self.buckets.len())
    }

    /// Double the bucket count and redistribute every entry
    fn grow(&mut self) -> Result<()> {
        let new_count = self.buckets.len().checked_mul(2).ok_or_else(|| {
            KvError::AllocationFailure("index bucket count overflow".to_string())
        })?;

        let mut buckets: Vec<Vec<(Key, String)>> = Vec::new();
        buckets.try_reserve_exact(new_count).map_err(|e| {
            KvError::AllocationFailure(format!("index growth to {} buckets: {}", new_count, e))
        })?;
        buckets.resize_with(new_count, Vec::new);

        for (key, segment) in self.buckets.drain(..).flatten() {
            buckets[hash(key, new_count)].push((key, segment));
        }
        self.buckets = buckets;

        debug!(buckets = new_count, keys = self.len, "index grown and rehashed");
        Ok(())
    }
}

/// `k mod m`, normalized into `0..m` for negative keys
fn hash(key: Key, buckets: usize) -> usize {
    key.rem_euclid(buckets as i64) as usize
}
