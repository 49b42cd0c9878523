//! Command definitions
//!
//! Represents commands from clients.

use crate::error::{EmberError, Result};

/// A parsed command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Set a key to a value
    Set { key: String, value: String },

    /// Get a value by key
    Get { key: String },

    /// Compact the log (always refused)
    Compact,
}

impl Command {
    /// Parse one request line (without its delimiter)
    ///
    /// The first whitespace-separated token is the command. `SET` takes
    /// exactly a key and a value, `GET` uses its first argument as the key,
    /// `COMPACT` ignores its arguments.
    pub fn parse(line: &str) -> Result<Self> {
        let line = line.trim_start_matches(|c: char| c.is_ascii_whitespace());
        let (name, args) = match line.find(|c: char| c.is_ascii_whitespace()) {
            Some(pos) => (&line[..pos], &line[pos..]),
            None => (line, ""),
        };
        let mut args = args.split_ascii_whitespace();

        match name {
            "SET" => match (args.next(), args.next(), args.next()) {
                (Some(key), Some(value), None) => Ok(Command::Set {
                    key: key.to_string(),
                    value: value.to_string(),
                }),
                _ => Err(EmberError::Protocol(
                    "SET takes exactly a key and a value".to_string(),
                )),
            },
            "GET" => match args.next() {
                Some(key) => Ok(Command::Get {
                    key: key.to_string(),
                }),
                None => Err(EmberError::Protocol("GET requires a key".to_string())),
            },
            "COMPACT" => Ok(Command::Compact),
            "" => Err(EmberError::Protocol("empty request".to_string())),
            other => Err(EmberError::Protocol(format!("unknown command {:?}", other))),
        }
    }

    /// Command name as sent on the wire
    pub fn name(&self) -> &'static str {
        match self {
            Command::Set { .. } => "SET",
            Command::Get { .. } => "GET",
            Command::Compact => "COMPACT",
        }
    }
}
