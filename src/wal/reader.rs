//! WAL Reader
//!
//! Reads records from the log file in file order.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::error::{EmberError, Result};
use super::Record;

/// Reads records from the log file
pub struct WalReader {
    reader: BufReader<File>,
    line: u64,
    offset: u64,
    failed: bool,
}

impl WalReader {
    /// Open a log file for reading
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        Ok(Self {
            reader: BufReader::new(file),
            line: 0,
            offset: 0,
            failed: false,
        })
    }

    /// Read the next record
    ///
    /// A final line without a terminator is a truncated record and an error.
    pub fn next_record(&mut self) -> Result<Option<Record>> {
        let mut buf = Vec::new();
        let n = self.reader.read_until(b'\n', &mut buf)?;
        if n == 0 {
            return Ok(None);
        }
        self.line += 1;

        if buf.last() != Some(&b'\n') {
            return Err(EmberError::WalCorruption(format!(
                "truncated record at line {} (offset {})",
                self.line, self.offset
            )));
        }

        let text = std::str::from_utf8(&buf).map_err(|_| {
            EmberError::WalCorruption(format!("line {} is not valid UTF-8", self.line))
        })?;

        let record = Record::parse(text).map_err(|e| match e {
            EmberError::WalCorruption(reason) => {
                EmberError::WalCorruption(format!("line {}: {}", self.line, reason))
            }
            other => other,
        })?;

        self.offset += n as u64;
        Ok(Some(record))
    }

    /// Number of lines consumed so far
    pub fn line(&self) -> u64 {
        self.line
    }

    /// Byte offset just past the last valid record
    pub fn offset(&self) -> u64 {
        self.offset
    }
}

impl Iterator for WalReader {
    type Item = Result<Record>;

    /// Stops after the first error
    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.next_record() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => None,
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}
