//! # EmberKV
//!
//! A minimal network key-value store with:
//! - A single-threaded, epoll-driven reactor serving many connections
//! - An append-only log, fsynced before every acknowledgement
//! - Deterministic replay of that log at startup
//! - A CR-LF delimited text protocol (`SET`, `GET`, `COMPACT`)
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  Events (mio::Poll)                          │
//! │            descriptor -> handler registry                    │
//! └──────────┬──────────────────────────────┬───────────────────┘
//!            │                              │
//!            ▼                              ▼
//!   ┌─────────────────┐           ┌─────────────────┐
//!   │    Listener     │──accept──▶│     Channel     │ (one per client)
//!   └─────────────────┘           └────────┬────────┘
//!                                          │ readline / write
//!                                          ▼
//!                                 ┌─────────────────┐
//!                                 │     Session     │ (state machine)
//!                                 └────────┬────────┘
//!                                          │ set / get
//!                                          ▼
//!                                 ┌─────────────────┐
//!                                 │       Log       │ index + WAL
//!                                 └─────────────────┘
//! ```
//!
//! Everything runs on one thread. The durable append in [`Log::set`] is
//! the only blocking call and stalls every connection while it runs.

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod event;
pub mod wal;
pub mod log;
pub mod network;
pub mod protocol;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{EmberError, Result};
pub use config::Config;
pub use event::{Channel, Events, Listener, Ready};
pub use log::Log;
pub use network::Server;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of EmberKV
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
