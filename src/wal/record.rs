//! WAL Record definitions
//!
//! One text line per record: `SET <key> <value>\r\n`.

use std::fmt;

use crate::error::{EmberError, Result};

/// Record terminator written after every record
pub const RECORD_TERMINATOR: &str = "\r\n";

/// The only command tag the log knows
pub const SET_TAG: &str = "SET";

/// A single entry in the log
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record {
    /// Bind `key` to `value`, replacing any earlier value
    Set { key: String, value: String },
}

impl Record {
    /// Build a SET record, rejecting fields the text format cannot hold
    pub fn set(key: impl Into<String>, value: impl Into<String>) -> Result<Self> {
        let key = key.into();
        let value = value.into();
        validate_field("key", &key)?;
        validate_field("value", &value)?;
        Ok(Record::Set { key, value })
    }

    /// Parse one record line (terminator optional)
    pub fn parse(line: &str) -> Result<Self> {
        let mut fields = line.split_ascii_whitespace();
        let tag = fields.next();
        let key = fields.next();
        let value = fields.next();

        match (tag, key, value, fields.next()) {
            (Some(SET_TAG), Some(key), Some(value), None) => Ok(Record::Set {
                key: key.to_string(),
                value: value.to_string(),
            }),
            (Some(tag), _, _, _) if tag != SET_TAG => Err(EmberError::WalCorruption(format!(
                "unknown record tag {:?}",
                tag
            ))),
            (None, _, _, _) => Err(EmberError::WalCorruption("empty record".to_string())),
            _ => Err(EmberError::WalCorruption(format!(
                "malformed record {:?}",
                line.trim_end()
            ))),
        }
    }

    /// Serialized form including the terminator
    pub fn encode(&self) -> Vec<u8> {
        self.to_string().into_bytes()
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Record::Set { key, value } => {
                write!(f, "{} {} {}{}", SET_TAG, key, value, RECORD_TERMINATOR)
            }
        }
    }
}

fn validate_field(name: &str, field: &str) -> Result<()> {
    if field.is_empty() {
        return Err(EmberError::InvalidRecord(format!("{} is empty", name)));
    }
    if field.bytes().any(|b| b.is_ascii_whitespace()) {
        return Err(EmberError::InvalidRecord(format!(
            "{} {:?} contains whitespace",
            name, field
        )));
    }
    Ok(())
}
