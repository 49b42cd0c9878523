//! Event Module
//!
//! Single-threaded readiness reactor built on `mio`.
//!
//! ## Components
//! - [`Events`]: owns the poll handle and the descriptor -> handler registry
//! - [`Channel`]: one non-blocking descriptor with single-pending read/write
//! - [`Listener`]: accepts TCP connections and wraps them in channels
//!
//! ## Edge Triggering
//! `mio` reports readiness edges, not levels. Components remember readiness
//! they have not exhausted (no `WouldBlock` seen yet) and queue a synthetic
//! event with [`Events::wake`] whenever they still have work for it.

mod channel;
mod listener;

pub use channel::{Channel, Transport};
pub use listener::Listener;
pub use mio::Interest;

use std::cell::RefCell;
use std::collections::HashMap;
use std::io;
use std::ops::{BitOr, BitOrAssign};
use std::os::unix::io::RawFd;
use std::rc::Rc;
use std::time::Duration;

use mio::unix::SourceFd;
use mio::{Poll, Token};

use crate::error::{EmberError, Result};

/// Default number of readiness events collected per poll
pub const DEFAULT_EVENT_CAPACITY: usize = 1024;

// =============================================================================
// Readiness Bitmask
// =============================================================================

/// Readiness observed for a descriptor
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Ready(u8);

impl Ready {
    pub const EMPTY: Ready = Ready(0);
    pub const READABLE: Ready = Ready(0b001);
    pub const WRITABLE: Ready = Ready(0b010);
    pub const HANGUP: Ready = Ready(0b100);

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn is_readable(self) -> bool {
        self.contains(Ready::READABLE)
    }

    pub fn is_writable(self) -> bool {
        self.contains(Ready::WRITABLE)
    }

    pub fn is_hangup(self) -> bool {
        self.contains(Ready::HANGUP)
    }

    pub fn contains(self, other: Ready) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for Ready {
    type Output = Ready;

    fn bitor(self, rhs: Ready) -> Ready {
        Ready(self.0 | rhs.0)
    }
}

impl BitOrAssign for Ready {
    fn bitor_assign(&mut self, rhs: Ready) {
        self.0 |= rhs.0;
    }
}

impl From<&mio::event::Event> for Ready {
    fn from(event: &mio::event::Event) -> Self {
        let mut ready = Ready::EMPTY;
        if event.is_readable() {
            ready |= Ready::READABLE;
        }
        if event.is_writable() {
            ready |= Ready::WRITABLE;
        }
        // EPOLLHUP / EPOLLERR; a read-side shutdown alone surfaces as EOF
        if event.is_write_closed() || event.is_error() {
            ready |= Ready::HANGUP;
        }
        ready
    }
}

// =============================================================================
// Multiplexer
// =============================================================================

type Handler = Rc<RefCell<dyn FnMut(Ready)>>;

struct Shared {
    poll: RefCell<Poll>,
    buffer: RefCell<mio::Events>,
    handlers: RefCell<HashMap<RawFd, Handler>>,
    deferred: RefCell<Vec<(RawFd, Ready)>>,
}

/// Readiness multiplexer
///
/// A cheap handle: clones share one poll instance and one registry. Every
/// component that registers descriptors is handed a clone, so independent
/// instances can coexist (one per test, for example).
///
/// Handlers run on the calling thread, one at a time, and must not block.
/// The only blocking work in the server is the durable log append.
#[derive(Clone)]
pub struct Events {
    shared: Rc<Shared>,
}

impl Events {
    /// Create a multiplexer with the default event capacity
    pub fn new() -> Result<Self> {
        Self::with_capacity(DEFAULT_EVENT_CAPACITY)
    }

    /// Create a multiplexer collecting up to `capacity` events per poll
    pub fn with_capacity(capacity: usize) -> Result<Self> {
        let poll = Poll::new().map_err(EmberError::Poll)?;

        Ok(Self {
            shared: Rc::new(Shared {
                poll: RefCell::new(poll),
                buffer: RefCell::new(mio::Events::with_capacity(capacity.max(1))),
                handlers: RefCell::new(HashMap::new()),
                deferred: RefCell::new(Vec::new()),
            }),
        })
    }

    /// Arm `fd` for `interest` and route its readiness to `handler`
    pub fn register<F>(&self, fd: RawFd, interest: Interest, handler: F) -> Result<()>
    where
        F: FnMut(Ready) + 'static,
    {
        if self.is_registered(fd) {
            return Err(EmberError::AlreadyRegistered(fd));
        }

        self.shared
            .poll
            .borrow()
            .registry()
            .register(&mut SourceFd(&fd), Token(fd as usize), interest)?;

        let handler: Handler = Rc::new(RefCell::new(handler));
        self.shared.handlers.borrow_mut().insert(fd, handler);
        tracing::trace!("Registered fd {} for {:?}", fd, interest);
        Ok(())
    }

    /// Disarm `fd` and drop its handler
    ///
    /// Should be called while `fd` is still open. If the kernel refuses the
    /// deregistration the handler is dropped anyway and the error returned.
    pub fn unregister(&self, fd: RawFd) -> Result<()> {
        let Some(handler) = self.shared.handlers.borrow_mut().remove(&fd) else {
            return Err(EmberError::NotRegistered(fd));
        };

        let result = self
            .shared
            .poll
            .borrow()
            .registry()
            .deregister(&mut SourceFd(&fd));

        // Dropped outside the map borrow: it may own the last channel handle
        drop(handler);

        result?;
        tracing::trace!("Unregistered fd {}", fd);
        Ok(())
    }

    /// Whether `fd` currently has a handler
    pub fn is_registered(&self, fd: RawFd) -> bool {
        self.shared.handlers.borrow().contains_key(&fd)
    }

    /// Number of registered descriptors
    pub fn len(&self) -> usize {
        self.shared.handlers.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Queue a synthetic readiness event for `fd`, delivered on the next turn
    pub fn wake(&self, fd: RawFd, ready: Ready) {
        self.shared.deferred.borrow_mut().push((fd, ready));
    }

    /// Dispatch loop
    ///
    /// Never returns under normal operation. Returns only when the poll
    /// itself fails, which is fatal to the process.
    pub fn run(&self) -> Result<()> {
        loop {
            self.turn(None)?;
        }
    }

    /// Run one iteration of the dispatch loop
    ///
    /// Blocks for up to `timeout` (forever on `None`) unless synthetic events
    /// are queued, then invokes every ready handler once. Returns the number
    /// of handler invocations.
    pub fn turn(&self, timeout: Option<Duration>) -> Result<usize> {
        let timeout = if self.shared.deferred.borrow().is_empty() {
            timeout
        } else {
            Some(Duration::ZERO)
        };

        let mut ready: Vec<(RawFd, Ready)> = Vec::new();
        {
            let mut poll = self.shared.poll.borrow_mut();
            let mut buffer = self.shared.buffer.borrow_mut();

            match poll.poll(&mut buffer, timeout) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(EmberError::Poll(e)),
            }

            ready.extend(
                buffer
                    .iter()
                    .map(|event| (event.token().0 as RawFd, Ready::from(event))),
            );
        }

        // Snapshot: wake-ups queued by handlers below wait for the next turn
        ready.append(&mut self.shared.deferred.borrow_mut());

        let mut dispatched = 0;
        for (fd, readiness) in ready {
            if self.dispatch(fd, readiness) {
                dispatched += 1;
            }
        }
        Ok(dispatched)
    }

    fn dispatch(&self, fd: RawFd, ready: Ready) -> bool {
        let handler = self.shared.handlers.borrow().get(&fd).cloned();
        match handler {
            Some(handler) => {
                (&mut *handler.borrow_mut())(ready);
                true
            }
            None => {
                // Closed earlier in the same batch
                tracing::trace!("Dropping {:?} for unregistered fd {}", ready, fd);
                false
            }
        }
    }
}
