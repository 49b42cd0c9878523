//! Protocol Module
//!
//! Defines the line-oriented wire protocol for client-server communication.
//!
//! ### Commands
//! - `SET <key> <value>`: store a value, answered with `OK`
//! - `GET <key>`: answered with `OK` and the value, or `MISSING`
//! - `COMPACT`: always answered with `NOPE`
//!
//! Anything else is answered with `ERROR` and the connection stays open.

mod command;
mod response;
mod codec;

pub use command::Command;
pub use response::Response;
pub use codec::{decode_command, encode_command, encode_response, read_response, LINE_DELIMITER};
