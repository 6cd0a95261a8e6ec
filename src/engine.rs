//! Engine Module
//!
//! The orchestrator that routes every request through the log, the memtable
//! and the segment store.
//!
//! ## Responsibilities
//! - Log every mutation before applying it
//! - Serve reads memtable → index → newest-first segment scan
//! - Flush the memtable when it reaches capacity, compacting first when the
//!   segment list is full
//! - Replay the log on startup
//! - Decide which failures are fatal

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::{Mutex, RwLock};
use rand::Rng;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::error::{KvError, Result};
use crate::index::HashIndex;
use crate::memtable::MemTable;
use crate::record::{validate_key, validate_value, Entry, Key, Record};
use crate::request::Action;
use crate::storage::{Compactor, SegmentMeta, SegmentStore, SegmentWriter, TombstonePolicy};
use crate::wal::{epoch_seconds, LogRecovery, LogWriter, ReplayStats};

/// Segment list and index, swapped together under one lock
struct Catalog {
    /// Live segments, ordered oldest → newest
    segments: Vec<String>,

    /// Key → newest segment holding it (may be stale)
    index: HashIndex,
}

/// The main storage engine
///
/// ## Concurrency Model
///
/// Requests are processed one at a time: mutations are serialized by
/// `write_lock`, and flush/compaction run inline on the mutating call.
/// Readers see the segment list and index through `catalog`; a compaction
/// swaps both in one write-locked step and only then removes its inputs, so
/// a reader never observes a list missing data that is not yet replaced.
pub struct Engine {
    /// Engine configuration
    config: Config,

    /// Directory for diagnostic FLUSH output
    snapshot_dir: PathBuf,

    /// Durability log (exclusive access needed)
    log: Mutex<LogWriter>,

    /// In-memory table for recent writes (internal RwLock)
    memtable: MemTable,

    /// Segment files on disk
    store: SegmentStore,

    /// Segment list + index
    catalog: RwLock<Catalog>,

    /// Serializes write operations (add/delete/flush/exit)
    write_lock: Mutex<()>,

    /// Set after a fatal error; every later request is refused
    halted: AtomicBool,

    /// Set by EXIT
    closed: AtomicBool,

    /// Stats from the replay performed by `open`
    replay_stats: ReplayStats,
}

impl Engine {
    // =========================================================================
    // Internal Path Constants
    // =========================================================================
    const LOG_FILENAME: &'static str = "wal.log";
    const SEGMENT_DIR: &'static str = "segments";
    const SNAPSHOT_DIR: &'static str = "snapshots";
    const RECOVERY_FILENAME: &'static str = "memtable.recovery";

    /// Open or create an engine with the given config
    ///
    /// On startup:
    /// 1. Open/create the data directories
    /// 2. Discover existing segments and rebuild the index from them
    /// 3. Replay log records written after the last checkpoint
    /// 4. Flush if the replayed memtable is already at capacity
    pub fn open(config: Config) -> Result<Self> {
        config.validate()?;

        // Step 1: Directories (derived from data_dir, not configurable)
        fs::create_dir_all(&config.data_dir)?;
        let segment_dir = config.data_dir.join(Self::SEGMENT_DIR);
        let snapshot_dir = config.data_dir.join(Self::SNAPSHOT_DIR);
        let log_path = config.data_dir.join(Self::LOG_FILENAME);
        fs::create_dir_all(&snapshot_dir)?;

        // Step 2: Segments and index
        let store = SegmentStore::open(&segment_dir)?;
        let segments = store.discover()?;
        let mut index = HashIndex::new(config.index_initial_buckets, config.index_max_load_factor);
        for name in &segments {
            for record in store.reader(name)? {
                index.insert_or_update(record?.key, name)?;
            }
        }
        info!(segments = segments.len(), keys = index.len(), "segments loaded");

        // Step 3: Replay the log
        let (records, replay_stats) = LogRecovery::replay(&log_path)?;
        let log = LogWriter::open(&log_path, config.log_sync_strategy)?;

        let engine = Self {
            config,
            snapshot_dir,
            log: Mutex::new(log),
            memtable: MemTable::new(),
            store,
            catalog: RwLock::new(Catalog { segments, index }),
            write_lock: Mutex::new(()),
            halted: AtomicBool::new(false),
            closed: AtomicBool::new(false),
            replay_stats,
        };

        for record in records.iter().filter_map(|r| r.to_record()) {
            engine.apply_replayed(record);
        }

        // Step 4: Replayed records all precede the next checkpoint, so the
        // flush only runs once every one of them is in the memtable
        {
            let _write_guard = engine.write_lock.lock();
            engine.maybe_rotate()?;
        }

        Ok(engine)
    }

    /// Execute a request
    ///
    /// `value` is only read for ADD. SEARCH returns the value found (or None);
    /// FLUSH returns the path of the snapshot it wrote. An error for which
    /// `KvError::is_fatal` holds halts the engine.
    pub fn submit(&self, action: Action, key: Key, value: Option<&str>) -> Result<Option<String>> {
        self.execute(action, key, value).map_err(|e| {
            if e.is_fatal() && !self.is_halted() {
                self.escalate(e)
            } else {
                e
            }
        })
    }

    fn execute(&self, action: Action, key: Key, value: Option<&str>) -> Result<Option<String>> {
        match action {
            Action::Add => {
                let value = value.ok_or_else(|| {
                    KvError::InvalidInput("ADD requires a value".to_string())
                })?;
                self.add(key, value)?;
                Ok(None)
            }
            Action::Search => self.search(key),
            Action::Delete => {
                self.delete(key)?;
                Ok(None)
            }
            Action::Flush => {
                let path = self.flush_snapshot()?;
                Ok(Some(path.display().to_string()))
            }
            Action::Exit => {
                self.exit()?;
                Ok(None)
            }
        }
    }

    /// Upsert a key-value pair
    ///
    /// Steps:
    /// 1. Validate key and value
    /// 2. Write to the log (durability guarantee)
    /// 3. Write to MemTable
    /// 4. Flush (and maybe compact) if the memtable is full
    pub fn add(&self, key: Key, value: &str) -> Result<()> {
        self.ensure_serving()?;
        validate_key(key)?;
        validate_value(value)?;

        let _write_guard = self.write_lock.lock();

        self.log.lock().append_add(key, value)?;
        self.memtable.insert(key, value.to_string())?;

        self.maybe_rotate()
    }

    /// Delete a key
    ///
    /// Always writes a tombstone, since older copies may live in segments.
    pub fn delete(&self, key: Key) -> Result<()> {
        self.ensure_serving()?;
        validate_key(key)?;

        let _write_guard = self.write_lock.lock();

        self.log.lock().append_delete(key)?;
        self.memtable.delete(key);

        self.maybe_rotate()
    }

    /// Get a value by key
    ///
    /// Search order:
    /// 1. MemTable (most recent writes)
    /// 2. The segment the index names, if it is still live
    /// 3. All segments, newest to oldest
    pub fn search(&self, key: Key) -> Result<Option<String>> {
        self.ensure_serving()?;
        validate_key(key)?;

        // Step 1: MemTable
        if let Some(entry) = self.memtable.get(key) {
            return Ok(entry.into_value());
        }

        let catalog = self.catalog.read();

        // Step 2: Index
        let mut probed = None;
        if let Some(segment) = catalog.index.lookup(key) {
            if catalog.segments.iter().any(|s| s == segment) {
                match self.store.point_lookup(segment, key) {
                    Ok(Some(entry)) => return Ok(entry.into_value()),
                    Ok(None) => {
                        debug!(key, segment, "index pointed at a segment without the key");
                        probed = Some(segment);
                    }
                    Err(KvError::SegmentMissing(_)) => {
                        debug!(key, segment, "index pointed at a missing segment");
                    }
                    Err(e) => return Err(e),
                }
            } else {
                debug!(key, segment, "stale index entry");
            }
        }

        // Step 3: Exhaustive scan, newest first
        for segment in catalog.segments.iter().rev() {
            if probed == Some(segment.as_str()) {
                continue;
            }
            match self.store.point_lookup(segment, key) {
                Ok(Some(entry)) => return Ok(entry.into_value()),
                Ok(None) => continue,
                Err(KvError::SegmentMissing(name)) => {
                    warn!(segment = %name, "live segment missing during scan");
                }
                Err(e) => return Err(e),
            }
        }

        Ok(None)
    }

    /// Write the memtable to a new snapshot file without rotating it
    ///
    /// Diagnostic path: the memtable, segment list and log are unchanged.
    pub fn flush_snapshot(&self) -> Result<PathBuf> {
        self.ensure_serving()?;
        let _write_guard = self.write_lock.lock();

        let nonce: u32 = rand::thread_rng().gen();
        let path = self
            .snapshot_dir
            .join(format!("snapshot-{}-{:08x}.snap", epoch_seconds(), nonce));

        let meta = Self::write_records(&path, self.memtable.ascending_scan())?;
        info!(path = %path.display(), records = meta.record_count, "memtable snapshot written");
        Ok(path)
    }

    /// Shut down: dump the memtable to the recovery file and sync the log
    ///
    /// Best effort; failures are logged. Later requests return
    /// `KvError::Closed`. Log records since the last checkpoint remain the
    /// authoritative copy of unflushed data.
    pub fn exit(&self) -> Result<()> {
        self.ensure_serving()?;
        let _write_guard = self.write_lock.lock();

        self.dump_memtable();
        if let Err(e) = self.log.lock().sync() {
            warn!(error = %e, "log sync on exit failed");
        }

        self.closed.store(true, Ordering::SeqCst);
        info!("engine closed");
        Ok(())
    }

    /// Close the engine gracefully
    pub fn close(self) -> Result<()> {
        self.exit()
    }

    // =========================================================================
    // Flush and Compaction
    // =========================================================================

    /// Rotate if the memtable reached capacity (called with write lock held)
    fn maybe_rotate(&self) -> Result<()> {
        if self.memtable.is_full(self.config.memtable_max_keys) {
            self.rotate()?;
        }
        Ok(())
    }

    /// Flush-then-compact (called with write lock held)
    ///
    /// 1. If the segment list is full, compact all of it into one segment
    /// 2. Write the memtable to a new segment and append it to the list
    /// 3. Point the index at it for every flushed key
    /// 4. Checkpoint the log and clear the memtable
    ///
    /// A failed compaction leaves everything as it was and is returned as
    /// `KvError::Compaction`. Any failure from the flush onwards is fatal:
    /// the triggering mutation is already logged and applied.
    fn rotate(&self) -> Result<()> {
        // Step 1: Compaction
        let segment_count = self.catalog.read().segments.len();
        if segment_count >= self.config.max_segments {
            self.compact_all()?;
        }

        // Step 2: Flush
        let records = self.memtable.ascending_scan();
        let meta = match self.store.write(records.iter().cloned()) {
            Ok(meta) => meta,
            Err(e) => return Err(self.escalate(e)),
        };

        // Step 3: Segment list + index
        {
            let mut catalog = self.catalog.write();
            catalog.segments.push(meta.name.clone());
            if let Err(e) = Self::index_records(&mut catalog.index, &records, &meta) {
                drop(catalog);
                return Err(self.escalate(e));
            }
        }

        // Step 4: Checkpoint, then drop the log history it covers
        {
            let mut log = self.log.lock();
            if let Err(e) = log.checkpoint(&meta.name) {
                drop(log);
                return Err(self.escalate(e));
            }
            if let Err(e) = log.restart_at_checkpoint(&meta.name) {
                warn!(error = %e, "log truncation after checkpoint failed");
            }
        }
        self.memtable.clear();

        info!(segment = %meta.name, records = meta.record_count, "memtable flushed");
        Ok(())
    }

    /// Replace the whole segment list with one compacted segment
    ///
    /// The compacted segment is the only live one afterwards, so the index is
    /// rebuilt from its keys alone; keys whose tombstones were dropped lose
    /// their entries.
    fn compact_all(&self) -> Result<()> {
        let inputs = self.catalog.read().segments.clone();
        let outcome = Compactor::new(&self.store).compact(&inputs, TombstonePolicy::Drop)?;
        let name = outcome.segment.name.clone();

        let mut index = self.new_index();
        for key in &outcome.keys {
            if let Err(e) = index.insert_or_update(*key, &name) {
                return Err(self.escalate(KvError::IndexInconsistency(format!(
                    "index rebuild after compaction into {} failed: {}",
                    name, e
                ))));
            }
        }

        {
            let mut catalog = self.catalog.write();
            catalog.segments = vec![name];
            catalog.index = index;
        }

        for old in &inputs {
            if let Err(e) = self.store.delete(old) {
                warn!(segment = %old, error = %e, "failed to remove compacted segment");
            }
        }
        Ok(())
    }

    fn new_index(&self) -> HashIndex {
        HashIndex::new(
            self.config.index_initial_buckets,
            self.config.index_max_load_factor,
        )
    }

    fn index_records(index: &mut HashIndex, records: &[Record], meta: &SegmentMeta) -> Result<()> {
        for record in records {
            index.insert_or_update(record.key, &meta.name).map_err(|e| {
                KvError::IndexInconsistency(format!(
                    "index update after flush of {} failed: {}",
                    meta.name, e
                ))
            })?;
        }
        Ok(())
    }

    // =========================================================================
    // Recovery and Failure Handling
    // =========================================================================

    /// Apply one replayed mutation without logging it again
    fn apply_replayed(&self, record: Record) {
        match record.entry {
            Entry::Value(value) => {
                if let Err(e) = self.memtable.insert(record.key, value) {
                    warn!(key = record.key, error = %e, "skipping invalid replayed record");
                }
            }
            Entry::Tombstone => {
                self.memtable.delete(record.key);
            }
        }
    }

    /// Mark the engine halted after an unrecoverable error
    ///
    /// Used for failures after a mutation has been applied (flush, index,
    /// checkpoint) and for any error `KvError::is_fatal` classifies as fatal.
    fn escalate(&self, err: KvError) -> KvError {
        error!(error = %err, "fatal error, halting engine");
        self.halted.store(true, Ordering::SeqCst);
        self.dump_memtable();
        err
    }

    /// Best-effort write of the memtable to the recovery file
    ///
    /// An empty memtable removes any dump left by an earlier run.
    fn dump_memtable(&self) {
        let path = self.recovery_path();
        if self.memtable.is_empty() {
            if let Err(e) = fs::remove_file(&path) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!(path = %path.display(), error = %e, "failed to remove stale memtable dump");
                }
            }
            return;
        }
        match Self::write_records(&path, self.memtable.ascending_scan()) {
            Ok(meta) => info!(path = %path.display(), records = meta.record_count, "memtable dumped"),
            Err(e) => warn!(path = %path.display(), error = %e, "memtable dump failed"),
        }
    }

    fn write_records(path: &Path, records: Vec<Record>) -> Result<SegmentMeta> {
        let mut writer = SegmentWriter::create(path)?;
        for record in &records {
            writer.add(record)?;
        }
        writer.finish()
    }

    fn ensure_serving(&self) -> Result<()> {
        if self.halted.load(Ordering::SeqCst) {
            return Err(KvError::Halted);
        }
        if self.closed.load(Ordering::SeqCst) {
            return Err(KvError::Closed);
        }
        Ok(())
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// Get the data directory path
    pub fn data_dir(&self) -> &Path {
        &self.config.data_dir
    }

    /// Get the segment directory path
    pub fn segment_dir(&self) -> &Path {
        self.store.dir()
    }

    /// Path of the durability log
    pub fn log_path(&self) -> PathBuf {
        self.config.data_dir.join(Self::LOG_FILENAME)
    }

    /// Path of the memtable dump written on exit
    pub fn recovery_path(&self) -> PathBuf {
        self.config.data_dir.join(Self::RECOVERY_FILENAME)
    }

    /// Get the memtable entry count
    pub fn memtable_len(&self) -> usize {
        self.memtable.len()
    }

    /// Get the number of live segments
    pub fn segment_count(&self) -> usize {
        self.catalog.read().segments.len()
    }

    /// Live segment names, oldest → newest
    pub fn segment_names(&self) -> Vec<String> {
        self.catalog.read().segments.clone()
    }

    /// Segment the index currently names for a key
    pub fn indexed_segment(&self, key: Key) -> Option<String> {
        self.catalog.read().index.lookup(key).map(str::to_string)
    }

    /// Number of keys in the index
    pub fn index_len(&self) -> usize {
        self.catalog.read().index.len()
    }

    /// Stats from the log replay done at open
    pub fn replay_stats(&self) -> &ReplayStats {
        &self.replay_stats
    }

    /// Whether a fatal error halted the engine
    pub fn is_halted(&self) -> bool {
        self.halted.load(Ordering::SeqCst)
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }
}
