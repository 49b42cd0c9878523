//! Listening Socket
//!
//! Accepts TCP connections on the reactor and hands each one over as a
//! [`Channel`].

use std::cell::{Cell, RefCell};
use std::io;
use std::net::SocketAddr;
use std::os::unix::io::{AsRawFd, RawFd};
use std::rc::Rc;

use mio::net::TcpListener;

use crate::error::Result;
use super::{Channel, Events, Interest, Ready};

type AcceptCallback = Box<dyn FnMut(Channel, SocketAddr)>;

struct Inner {
    listener: TcpListener,
    events: Events,
    on_accept: RefCell<AcceptCallback>,
    chunk_size: usize,
    closed: Cell<bool>,
}

/// Non-blocking TCP listener driven by [`Events`]
pub struct Listener {
    inner: Rc<Inner>,
}

impl Listener {
    /// Bind `addr` and start accepting on the next turns of `events`
    ///
    /// `SO_REUSEADDR` is set and the socket is non-blocking. Each accepted
    /// stream becomes a channel reading `read_chunk_size` bytes per syscall.
    pub fn bind<F>(
        events: &Events,
        addr: SocketAddr,
        read_chunk_size: usize,
        on_accept: F,
    ) -> Result<Self>
    where
        F: FnMut(Channel, SocketAddr) + 'static,
    {
        let listener = TcpListener::bind(addr)?;
        let fd = listener.as_raw_fd();

        let inner = Rc::new(Inner {
            listener,
            events: events.clone(),
            on_accept: RefCell::new(Box::new(on_accept)),
            chunk_size: read_chunk_size,
            closed: Cell::new(false),
        });

        let handle = Rc::clone(&inner);
        events.register(fd, Interest::READABLE, move |ready| handle.accept_one(ready))?;

        tracing::debug!("Listener bound on {} (fd {})", addr, fd);
        Ok(Self { inner })
    }

    /// Address actually bound (useful with port 0)
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.inner.listener.local_addr()?)
    }

    pub fn fd(&self) -> RawFd {
        self.inner.listener.as_raw_fd()
    }

    /// Stop accepting; already accepted channels are unaffected
    pub fn close(&self) -> Result<()> {
        if self.inner.closed.replace(true) {
            return Ok(());
        }
        self.inner.events.unregister(self.fd())
    }
}

impl Inner {
    /// Exactly one accept per readiness event
    fn accept_one(&self, _ready: Ready) {
        if self.closed.get() {
            return;
        }

        let (stream, peer) = match self.listener.accept() {
            Ok(accepted) => accepted,
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => return,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {
                self.events.wake(self.listener.as_raw_fd(), Ready::READABLE);
                return;
            }
            Err(e) => {
                tracing::warn!("Accept failed: {}", e);
                return;
            }
        };

        // Edge-triggered: more connections may be queued behind this one
        self.events.wake(self.listener.as_raw_fd(), Ready::READABLE);

        if let Err(e) = stream.set_nodelay(true) {
            tracing::debug!("Failed to set TCP_NODELAY for {}: {}", peer, e);
        }

        match Channel::with_chunk_size(&self.events, stream, self.chunk_size) {
            Ok(channel) => {
                tracing::debug!("Accepted connection from {} (fd {})", peer, channel.fd());
                let mut on_accept = self.on_accept.borrow_mut();
                (*on_accept)(channel, peer);
            }
            Err(e) => tracing::warn!("Failed to set up channel for {}: {}", peer, e),
        }
    }
}
