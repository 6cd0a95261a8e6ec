//! Storage Module
//!
//! Persistent storage layer built from immutable sorted segment files.
//!
//! ## Responsibilities
//! - Persist memtable snapshots to disk in sorted format
//! - Point lookups within a single segment
//! - Merge segments into one (compaction)
//! - Retire superseded segments only after their replacement is on disk
//!
//! ## File Format
//! ```text
//! 3,b
//! 5,c
//! 9,*-*        <- tombstone
//! ```
//! One `<key>,<value>` line per record, strictly ascending keys, no header.

mod segment;
mod manager;
mod compaction;

pub use segment::{SegmentMeta, SegmentReader, SegmentWriter, SEGMENT_EXTENSION};
pub use manager::SegmentStore;
pub use compaction::{CompactionOutcome, Compactor, MergeStats, TombstonePolicy, TwoWayMerge};
