//! WAL Recovery
//!
//! Replays the log at startup.

use std::io;
use std::path::Path;

use crate::error::{EmberError, Result};
use super::{Record, WalReader};

/// Handles log replay after a restart or crash
pub struct WalRecovery;

/// Result of a recovery operation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecoveryResult {
    /// Number of records replayed
    pub records_recovered: u64,

    /// Bytes of the file consumed
    pub bytes_read: u64,
}

impl WalRecovery {
    /// Replay every record of the log at `path` in file order
    ///
    /// A missing file replays nothing. Any malformed record aborts the whole
    /// replay; records applied before it must be discarded by the caller.
    pub fn replay<F>(path: &Path, mut apply: F) -> Result<RecoveryResult>
    where
        F: FnMut(Record),
    {
        let mut reader = match WalReader::open(path) {
            Ok(reader) => reader,
            Err(EmberError::Io(e)) if e.kind() == io::ErrorKind::NotFound => {
                return Ok(RecoveryResult::default());
            }
            Err(e) => return Err(e),
        };

        let mut result = RecoveryResult::default();
        while let Some(record) = reader.next_record()? {
            apply(record);
            result.records_recovered += 1;
        }
        result.bytes_read = reader.offset();

        Ok(result)
    }

    /// Check the integrity of a log file without keeping its records
    pub fn verify(path: &Path) -> Result<RecoveryResult> {
        Self::replay(path, |_| {})
    }
}
