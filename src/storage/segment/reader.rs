//! Segment Reader
//!
//! Sequential, buffered iteration over a segment and point lookups on top of it.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use crate::error::{KvError, Result};
use crate::record::{Entry, Key, Record};

use super::parse_line;

/// Reader over one segment file, yielding records in ascending key order
pub struct SegmentReader {
    name: String,
    reader: BufReader<File>,
    line_no: usize,
    last_key: Option<Key>,
    buf: String,
    done: bool,
}

impl SegmentReader {
    /// Open a segment for reading
    ///
    /// A missing file is reported as `KvError::SegmentMissing`.
    pub fn open(path: &Path) -> Result<Self> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let file = match File::open(path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(KvError::SegmentMissing(name));
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            name,
            reader: BufReader::new(file),
            line_no: 0,
            last_key: None,
            buf: String::new(),
            done: false,
        })
    }

    /// Find the entry for `key`, stopping as soon as the scan passes it
    ///
    /// Returns:
    /// - `Ok(Some(Entry::Value(_)))`: key found with value
    /// - `Ok(Some(Entry::Tombstone))`: key found but deleted
    /// - `Ok(None)`: key not in this segment
    pub fn get(mut self, key: Key) -> Result<Option<Entry>> {
        while let Some(record) = self.next_record()? {
            if record.key == key {
                return Ok(Some(record.entry));
            }
            if record.key > key {
                break;
            }
        }
        Ok(None)
    }

    /// Read the next record
    pub fn next_record(&mut self) -> Result<Option<Record>> {
        if self.done {
            return Ok(None);
        }

        self.buf.clear();
        let n = self.reader.read_line(&mut self.buf)?;
        if n == 0 {
            self.done = true;
            return Ok(None);
        }
        self.line_no += 1;

        let line = self.buf.trim_end_matches(&['\n', '\r'][..]);
        let record = parse_line(line).map_err(|reason| self.corrupt(reason))?;

        if let Some(last) = self.last_key {
            if record.key <= last {
                return Err(self.corrupt("keys out of order"));
            }
        }
        self.last_key = Some(record.key);
        Ok(Some(record))
    }

    /// Name of the segment being read
    pub fn name(&self) -> &str {
        &self.name
    }

    fn corrupt(&mut self, reason: &str) -> KvError {
        self.done = true;
        KvError::SegmentCorruption {
            segment: self.name.clone(),
            line: self.line_no,
            reason: reason.to_string(),
        }
    }
}

impl Iterator for SegmentReader {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_record().transpose()
    }
}
