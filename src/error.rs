//! Error types for EmberKV
//!
//! Provides a unified error type for all operations.

use std::fmt;
use std::os::unix::io::RawFd;

use thiserror::Error;

/// Result type alias using EmberError
pub type Result<T> = std::result::Result<T, EmberError>;

/// Direction of a channel operation, used to report reentrancy misuse
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Read,
    Write,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Read => f.write_str("read"),
            Direction::Write => f.write_str("write"),
        }
    }
}

/// Unified error type for EmberKV operations
#[derive(Debug, Error)]
pub enum EmberError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Reactor Errors
    // -------------------------------------------------------------------------
    #[error("Readiness polling failed: {0}")]
    Poll(std::io::Error),

    #[error("Descriptor {0} is already registered")]
    AlreadyRegistered(RawFd),

    #[error("Descriptor {0} is not registered")]
    NotRegistered(RawFd),

    #[error("Reentrant {0}: a {0} is already pending on this channel")]
    Reentrant(Direction),

    #[error("Channel is closed")]
    ChannelClosed,

    // -------------------------------------------------------------------------
    // WAL Errors
    // -------------------------------------------------------------------------
    #[error("WAL corruption detected: {0}")]
    WalCorruption(String),

    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    // -------------------------------------------------------------------------
    // Network Errors
    // -------------------------------------------------------------------------
    #[error("Protocol error: {0}")]
    Protocol(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}
