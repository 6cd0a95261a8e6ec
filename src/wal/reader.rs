//! Log Reader
//!
//! Handles reading records from the log file, one line at a time.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::error::{KvError, Result};

use super::LogRecord;

/// Reads records from the log file
///
/// A malformed line is reported as `KvError::LogCorruption` and reading can
/// continue with the next line. A final line without a newline is a torn
/// write: it is not yielded, and `torn_tail()` reports it.
pub struct LogReader {
    reader: BufReader<File>,
    /// Byte offset just past the last complete line
    valid_len: u64,
    /// 1-based number of the line last read
    line_no: usize,
    torn_tail: bool,
    buf: Vec<u8>,
}

impl LogReader {
    /// Open a log file for reading
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        Ok(Self {
            reader: BufReader::new(file),
            valid_len: 0,
            line_no: 0,
            torn_tail: false,
            buf: Vec::new(),
        })
    }

    /// Read the next record
    ///
    /// Returns `Ok(None)` at end of file or when a torn tail is reached.
    pub fn next_record(&mut self) -> Result<Option<LogRecord>> {
        loop {
            self.buf.clear();
            let n = self.reader.read_until(b'\n', &mut self.buf)?;
            if n == 0 {
                return Ok(None);
            }
            if self.buf.last() != Some(&b'\n') {
                self.torn_tail = true;
                return Ok(None);
            }

            self.line_no += 1;
            self.valid_len += n as u64;

            let line = std::str::from_utf8(&self.buf).map_err(|_| {
                KvError::LogCorruption(format!("line {} is not valid UTF-8", self.line_no))
            })?;
            if line.trim().is_empty() {
                continue;
            }
            return LogRecord::parse(line)
                .map(Some)
                .map_err(|e| match e {
                    KvError::LogCorruption(msg) => {
                        KvError::LogCorruption(format!("line {}: {}", self.line_no, msg))
                    }
                    other => other,
                });
        }
    }

    /// Byte length of the log up to and including the last complete line
    pub fn valid_len(&self) -> u64 {
        self.valid_len
    }

    /// Whether the file ended with a partial line
    pub fn torn_tail(&self) -> bool {
        self.torn_tail
    }

    /// Number of complete lines consumed so far
    pub fn lines_read(&self) -> usize {
        self.line_no
    }
}

impl Iterator for LogReader {
    type Item = Result<LogRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_record().transpose()
    }
}
