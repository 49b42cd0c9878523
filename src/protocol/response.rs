//! Response definitions
//!
//! Represents responses to clients.

/// Outcome of one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// SET stored
    Ok,

    /// GET hit
    Value(String),

    /// GET miss
    Missing,

    /// COMPACT is not implemented
    Unsupported,

    /// Malformed or unknown request
    Error,
}

impl Response {
    /// Status line as sent on the wire
    pub fn status(&self) -> &'static str {
        match self {
            Response::Ok | Response::Value(_) => "OK",
            Response::Missing => "MISSING",
            Response::Unsupported => "NOPE",
            Response::Error => "ERROR",
        }
    }
}
