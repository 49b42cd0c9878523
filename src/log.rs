//! Log Module
//!
//! The durable key-value store: an in-memory index backed by the WAL.
//!
//! ## Responsibilities
//! - Rebuild the index by replaying the WAL before serving anything
//! - Apply SETs in order: index, then durable append, then acknowledge
//! - Answer GETs from memory

use std::collections::HashMap;
use std::path::Path;

use crate::error::Result;
use crate::wal::{Record, RecoveryResult, WalRecovery, WalWriter};

/// In-memory index plus the append-only record file
///
/// ## Durability
///
/// [`Log::set`] returns only after the record has been written and fsynced,
/// so a caller that acknowledges after `set` returns never acknowledges a
/// write that would be lost by a crash.
///
/// The fsync runs on the caller's thread. In the server that is the reactor
/// thread, so every connection (and every pending accept) stalls for the
/// duration of each append and throughput is bounded by one fsync at a time.
pub struct Log {
    index: HashMap<String, String>,
    writer: WalWriter,
    recovery: RecoveryResult,
}

impl Log {
    /// Open the log at `path`, replaying any existing records
    ///
    /// Fails on the first malformed record; nothing is partially recovered.
    pub fn open(path: &Path) -> Result<Self> {
        let mut index = HashMap::new();
        let recovery = WalRecovery::replay(path, |record| match record {
            Record::Set { key, value } => {
                index.insert(key, value);
            }
        })?;

        if recovery.records_recovered > 0 {
            tracing::info!(
                "Log recovery: {} records replayed, {} keys, {} bytes",
                recovery.records_recovered,
                index.len(),
                recovery.bytes_read
            );
        }

        let writer = WalWriter::open(path)?;

        Ok(Self {
            index,
            writer,
            recovery,
        })
    }

    /// Bind `key` to `value` durably
    ///
    /// Steps:
    /// 1. Update the index
    /// 2. Append the record and fsync
    /// 3. Return, letting the caller acknowledge
    ///
    /// If the append fails the index change is undone.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let record = Record::set(key, value)?;

        // Step 1: index
        let previous = self.index.insert(key.to_string(), value.to_string());

        // Step 2: durable append
        if let Err(e) = self.writer.append(&record) {
            tracing::error!("Log append failed for key {:?}: {}", key, e);
            match previous {
                Some(old) => self.index.insert(key.to_string(), old),
                None => self.index.remove(key),
            };
            return Err(e);
        }

        tracing::trace!("Durably set {:?}", key);
        Ok(())
    }

    /// Latest value for `key`
    pub fn get(&self, key: &str) -> Option<&str> {
        self.index.get(key).map(String::as_str)
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// Number of distinct keys
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// The whole index
    pub fn index(&self) -> &HashMap<String, String> {
        &self.index
    }

    /// Stats from the replay that opened this log
    pub fn recovery(&self) -> RecoveryResult {
        self.recovery
    }

    /// Records appended since open
    pub fn records_written(&self) -> u64 {
        self.writer.records_written()
    }

    pub fn path(&self) -> &Path {
        self.writer.path()
    }
}
