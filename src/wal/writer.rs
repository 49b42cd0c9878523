//! WAL Writer
//!
//! Appends records to the log file and forces them to stable storage.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::Result;
use super::Record;

/// Appends records to the log file
pub struct WalWriter {
    file: File,
    path: PathBuf,
    records_written: u64,
}

impl WalWriter {
    /// Open the log file for append, creating it if missing
    pub fn open(path: &Path) -> Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file,
            path: path.to_path_buf(),
            records_written: 0,
        })
    }

    /// Append a record and fsync before returning
    ///
    /// Blocks the calling thread for the duration of the disk flush.
    pub fn append(&mut self, record: &Record) -> Result<()> {
        self.file.write_all(&record.encode())?;
        self.file.sync_all()?;
        self.records_written += 1;
        Ok(())
    }

    /// Records appended through this writer
    pub fn records_written(&self) -> u64 {
        self.records_written
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
