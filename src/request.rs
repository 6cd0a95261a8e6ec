//! Request definitions
//!
//! The actions a caller can submit to the engine.

use std::fmt;

/// Action types, numbered as presented to users
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Action {
    /// Upsert a value
    Add = 1,

    /// Read a value
    Search = 2,

    /// Delete a key (tombstone)
    Delete = 3,

    /// Write the memtable to a snapshot file without rotating it
    Flush = 4,

    /// Dump the memtable, close the log, release resources
    Exit = 5,
}

impl Action {
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Action::Add),
            2 => Some(Action::Search),
            3 => Some(Action::Delete),
            4 => Some(Action::Flush),
            5 => Some(Action::Exit),
            _ => None,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Action::Add => "ADD",
            Action::Search => "SEARCH",
            Action::Delete => "DELETE",
            Action::Flush => "FLUSH",
            Action::Exit => "EXIT",
        };
        f.write_str(name)
    }
}
