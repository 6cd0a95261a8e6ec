//! Error types for lsmkv
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

/// Result type alias using KvError
pub type Result<T> = std::result::Result<T, KvError>;

/// Unified error type for lsmkv operations
#[derive(Debug, Error)]
pub enum KvError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Allocation failure: {0}")]
    AllocationFailure(String),

    // -------------------------------------------------------------------------
    // Log Errors
    // -------------------------------------------------------------------------
    #[error("Log corruption detected: {0}")]
    LogCorruption(String),

    // -------------------------------------------------------------------------
    // Segment Errors
    // -------------------------------------------------------------------------
    #[error("Segment {segment} is corrupt at line {line}: {reason}")]
    SegmentCorruption {
        segment: String,
        line: usize,
        reason: String,
    },

    #[error("Segment missing: {0}")]
    SegmentMissing(String),

    #[error("Compaction aborted: {0}")]
    Compaction(String),

    // -------------------------------------------------------------------------
    // Index Errors
    // -------------------------------------------------------------------------
    #[error("Index inconsistency: {0}")]
    IndexInconsistency(String),

    // -------------------------------------------------------------------------
    // Request Errors
    // -------------------------------------------------------------------------
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),

    // -------------------------------------------------------------------------
    // Engine Errors
    // -------------------------------------------------------------------------
    #[error("Engine halted after a fatal error")]
    Halted,

    #[error("Engine closed")]
    Closed,
}

impl KvError {
    /// Whether this error leaves the engine in a state it cannot keep serving from.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            KvError::AllocationFailure(_) | KvError::IndexInconsistency(_) | KvError::Halted
        )
    }
}
