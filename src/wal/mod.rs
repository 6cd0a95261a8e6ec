//! Durability Log Module
//!
//! Provides durability guarantees through append-only logging.
//!
//! ## Responsibilities
//! - Append a record for every accepted mutation before it is applied
//! - Mark successful segment flushes with checkpoint records
//! - Replay everything after the last checkpoint on startup
//!
//! ## File Format
//! One text line per record:
//! ```text
//! <epoch-seconds> - <action-code>:<key>,<value>\n
//!
//! 1718000000 - 1:5,hello        ADD 5 = "hello"
//! 1718000001 - 3:5,*-*          DELETE 5
//! 1718000002 - 0:0,seg-...seg   CHECKPOINT (segment that made the above durable)
//! ```

mod entry;
mod writer;
mod reader;
mod recovery;

pub use entry::{LogAction, LogRecord};
pub use writer::LogWriter;
pub use reader::LogReader;
pub use recovery::{LogRecovery, ReplayStats};

pub(crate) use entry::epoch_seconds;
