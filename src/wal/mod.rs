//! Write-Ahead Log (WAL) Module
//!
//! Provides durability through an append-only text log.
//!
//! ## Responsibilities
//! - Append one record per SET, fsynced before the write is acknowledged
//! - Replay records in file order at startup
//! - Refuse to start on any malformed record
//!
//! ## File Format
//! ```text
//! SET <key> <value>\r\n
//! SET <key> <value>\r\n
//! ...
//! ```
//! Keys and values never contain whitespace, so a record is exactly three
//! whitespace-separated fields.

mod record;
mod writer;
mod reader;
mod recovery;

pub use record::{Record, RECORD_TERMINATOR, SET_TAG};
pub use writer::WalWriter;
pub use reader::WalReader;
pub use recovery::{WalRecovery, RecoveryResult};
