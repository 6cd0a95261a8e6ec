//! MemTable Module
//!
//! In-memory data structure for recent writes.
//!
//! ## Responsibilities
//! - Fast reads and writes in memory
//! - Authoritative copy of every key not yet flushed to a segment
//! - Track distinct-key count for the flush trigger
//! - Ordered iteration for segment creation
//!
//! ## Data Structure Choice
//! BTreeMap wrapped in RwLock:
//! - Ordered keys (required for segment generation)
//! - Bounded height without hand-written rebalancing

mod table;

pub use table::MemTable;
