//! TCP Server
//!
//! Opens the log, then accepts connections on the reactor.

use std::cell::{Ref, RefCell};
use std::net::SocketAddr;
use std::os::unix::io::RawFd;
use std::rc::Rc;

use crate::config::Config;
use crate::error::{EmberError, Result};
use crate::event::{Events, Listener};
use crate::log::Log;
use super::Session;

/// TCP server for EmberKV
pub struct Server {
    listener: Listener,
    log: Rc<RefCell<Log>>,
}

impl Server {
    /// Recover the log and start listening
    ///
    /// Recovery finishes before the listening socket exists, so no client
    /// can observe a partially replayed index. Connections are served once
    /// `events` is run.
    pub fn bind(config: &Config, events: &Events) -> Result<Self> {
        let addr: SocketAddr = config.listen_addr.parse().map_err(|e| {
            EmberError::Config(format!("invalid listen address {:?}: {}", config.listen_addr, e))
        })?;
        if config.read_chunk_size == 0 {
            return Err(EmberError::Config("read chunk size must be positive".to_string()));
        }

        let log = Log::open(&config.log_path)?;
        tracing::info!(
            "Log {} opened with {} keys",
            config.log_path.display(),
            log.len()
        );
        let log = Rc::new(RefCell::new(log));

        let shared = Rc::clone(&log);
        let listener = Listener::bind(events, addr, config.read_chunk_size, move |channel, peer| {
            Session::start(channel, Rc::clone(&shared), peer);
        })?;

        tracing::info!("Listening on {}", listener.local_addr()?);
        Ok(Self { listener, log })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Descriptor of the listening socket
    pub fn listener_fd(&self) -> RawFd {
        self.listener.fd()
    }

    /// Read access to the store
    pub fn log(&self) -> Ref<'_, Log> {
        self.log.borrow()
    }

    /// Stop accepting new connections
    pub fn shutdown(&self) -> Result<()> {
        self.listener.close()
    }
}
