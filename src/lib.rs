//! # lsmkv
//!
//! An embedded, single-node log-structured-merge key-value engine with:
//! - A write-ahead durability log, replayed from the last checkpoint on startup
//! - A bounded in-memory table of recent writes
//! - Immutable sorted segment files on disk
//! - Full compaction by pairwise streaming merge
//! - A hash index from key to owning segment
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                Engine::submit(action, key, value)           │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │     Log     │          │  MemTable   │
//!   │  (Append)   │          │  (RwLock)   │
//!   └─────────────┘          └──────┬──────┘
//!                                   │ flush at capacity
//!                                   ▼
//!   ┌─────────────┐          ┌─────────────┐       ┌─────────────┐
//!   │  HashIndex  │◄─────────│  Segments   │──────►│  Compactor  │
//!   │ key→segment │          │ (immutable) │◄──────│ (full merge)│
//!   └─────────────┘          └─────────────┘       └─────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod record;
pub mod request;
pub mod wal;
pub mod memtable;
pub mod storage;
pub mod index;
pub mod engine;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{KvError, Result};
pub use config::{Config, LogSyncStrategy};
pub use engine::Engine;
pub use record::{Entry, Key, Record, TOMBSTONE};
pub use request::Action;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of lsmkv
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
