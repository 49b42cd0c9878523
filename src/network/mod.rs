//! Network Module
//!
//! TCP server and client session handling.
//!
//! ## Architecture
//! - One reactor thread drives the listener and every connection
//! - Each connection runs a [`Session`] state machine
//! - Commands go straight to the shared [`Log`](crate::log::Log)

mod server;
mod connection;

pub use server::Server;
pub use connection::{Session, State};
