//! Configuration for lsmkv
//!
//! Centralized configuration with sensible defaults. Every capacity threshold
//! the engine uses lives here and is passed in at open time.

use std::path::PathBuf;

use crate::error::{KvError, Result};

/// Main configuration for an lsmkv instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Root directory for all data files
    /// Internal structure:
    ///   {data_dir}/
    ///     ├── wal.log            (durability log)
    ///     ├── memtable.recovery  (memtable dump written on exit)
    ///     ├── segments/          (sorted segment files)
    ///     └── snapshots/         (diagnostic FLUSH output)
    pub data_dir: PathBuf,

    /// Number of segments that may accumulate before the next flush
    /// compacts all of them into one
    pub max_segments: usize,

    // -------------------------------------------------------------------------
    // Log Configuration
    // -------------------------------------------------------------------------
    /// How far each log append is pushed before the mutation is applied
    pub log_sync_strategy: LogSyncStrategy,

    // -------------------------------------------------------------------------
    // MemTable Configuration
    // -------------------------------------------------------------------------
    /// Distinct keys the memtable holds before it is flushed to a segment
    pub memtable_max_keys: usize,

    // -------------------------------------------------------------------------
    // Index Configuration
    // -------------------------------------------------------------------------
    /// Bucket count the hash index starts with
    pub index_initial_buckets: usize,

    /// Entries-per-bucket ratio above which the index doubles and rehashes
    pub index_max_load_factor: f64,
}

/// Log sync strategy
///
/// Both variants flush the record out of the process before the mutation is
/// applied to the memtable; they differ in whether the OS is forced to disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogSyncStrategy {
    /// flush + fsync after every append (safest, slowest)
    EveryWrite,

    /// flush to the OS page cache only (survives process crashes, not power loss)
    OsBuffer,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./lsmkv_data"),
            max_segments: 2,
            log_sync_strategy: LogSyncStrategy::EveryWrite,
            memtable_max_keys: 10,
            index_initial_buckets: 16,
            index_max_load_factor: 0.8,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Reject thresholds the engine cannot operate with
    pub fn validate(&self) -> Result<()> {
        if self.memtable_max_keys == 0 {
            return Err(KvError::Config(
                "memtable_max_keys must be at least 1".to_string(),
            ));
        }
        if self.max_segments == 0 {
            return Err(KvError::Config(
                "max_segments must be at least 1".to_string(),
            ));
        }
        if self.index_initial_buckets == 0 {
            return Err(KvError::Config(
                "index_initial_buckets must be at least 1".to_string(),
            ));
        }
        if !(self.index_max_load_factor > 0.0 && self.index_max_load_factor <= 1.0) {
            return Err(KvError::Config(format!(
                "index_max_load_factor must be in (0, 1], got {}",
                self.index_max_load_factor
            )));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the data directory (root for all storage)
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Set the segment count that triggers a full compaction
    pub fn max_segments(mut self, count: usize) -> Self {
        self.config.max_segments = count;
        self
    }

    /// Set the log sync strategy
    pub fn log_sync_strategy(mut self, strategy: LogSyncStrategy) -> Self {
        self.config.log_sync_strategy = strategy;
        self
    }

    /// Set the memtable capacity (distinct keys)
    pub fn memtable_max_keys(mut self, keys: usize) -> Self {
        self.config.memtable_max_keys = keys;
        self
    }

    /// Set the initial bucket count of the hash index
    pub fn index_initial_buckets(mut self, buckets: usize) -> Self {
        self.config.index_initial_buckets = buckets;
        self
    }

    /// Set the load factor that triggers index growth
    pub fn index_max_load_factor(mut self, factor: f64) -> Self {
        self.config.index_max_load_factor = factor;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
