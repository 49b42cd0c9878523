//! Protocol codec
//!
//! Encoding and decoding functions for the wire protocol.
//!
//! ## Wire Format
//!
//! Every message is ASCII text terminated by `\r\n`.
//!
//! ### Requests
//! ```text
//! SET <key> <value>\r\n
//! GET <key>\r\n
//! COMPACT\r\n
//! ```
//!
//! ### Responses
//! ```text
//! OK\r\n               SET stored
//! OK\r\n<value>\r\n    GET hit
//! MISSING\r\n          GET miss
//! NOPE\r\n             COMPACT refused
//! ERROR\r\n            anything else
//! ```

use std::io::BufRead;

use crate::error::{EmberError, Result};
use super::{Command, Response};

/// Line delimiter for requests and responses
pub const LINE_DELIMITER: &[u8] = b"\r\n";

// =============================================================================
// Server Side
// =============================================================================

/// Decode a request line (delimiter already stripped)
pub fn decode_command(line: &[u8]) -> Result<Command> {
    let text = std::str::from_utf8(line)
        .map_err(|_| EmberError::Protocol("request is not valid UTF-8".to_string()))?;
    Command::parse(text)
}

/// Encode a response including its delimiters
pub fn encode_response(response: &Response) -> Vec<u8> {
    let mut message = Vec::with_capacity(16);
    message.extend_from_slice(response.status().as_bytes());
    message.extend_from_slice(LINE_DELIMITER);
    if let Response::Value(value) = response {
        message.extend_from_slice(value.as_bytes());
        message.extend_from_slice(LINE_DELIMITER);
    }
    message
}

// =============================================================================
// Client Side
// =============================================================================

/// Encode a request including its delimiter
pub fn encode_command(command: &Command) -> Vec<u8> {
    let line = match command {
        Command::Set { key, value } => format!("SET {} {}", key, value),
        Command::Get { key } => format!("GET {}", key),
        Command::Compact => "COMPACT".to_string(),
    };
    let mut message = line.into_bytes();
    message.extend_from_slice(LINE_DELIMITER);
    message
}

/// Read the response to `command` from a stream
///
/// An `OK` answering a GET is followed by the value line.
pub fn read_response<R: BufRead>(reader: &mut R, command: &Command) -> Result<Response> {
    let status = read_line(reader)?;
    match status.as_str() {
        "OK" => match command {
            Command::Get { .. } => Ok(Response::Value(read_line(reader)?)),
            _ => Ok(Response::Ok),
        },
        "MISSING" => Ok(Response::Missing),
        "NOPE" => Ok(Response::Unsupported),
        "ERROR" => Ok(Response::Error),
        other => Err(EmberError::Protocol(format!("unknown response {:?}", other))),
    }
}

fn read_line<R: BufRead>(reader: &mut R) -> Result<String> {
    let mut line = String::new();
    if reader.read_line(&mut line)? == 0 {
        return Err(EmberError::Protocol("connection closed mid-response".to_string()));
    }
    match line.strip_suffix("\r\n") {
        Some(stripped) => Ok(stripped.to_string()),
        None => Err(EmberError::Protocol(format!("unterminated response line {:?}", line))),
    }
}
