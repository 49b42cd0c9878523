//! Non-blocking I/O Channel
//!
//! Wraps one descriptor and exposes callback-style `read`, `write` and
//! `readline`. Each direction holds at most one pending operation.

use std::cell::{Cell, RefCell};
use std::io::{self, Read, Write};
use std::os::unix::io::{AsRawFd, RawFd};
use std::rc::Rc;

use bytes::{Buf, Bytes, BytesMut};

use crate::error::{Direction, EmberError, Result};
use super::{Events, Interest, Ready};

/// Default maximum bytes pulled by one read syscall
pub const DEFAULT_READ_CHUNK: usize = 1024;

/// Anything a channel can drive: a non-blocking, pollable byte stream
pub trait Transport: Read + Write + AsRawFd {}

impl<T: Read + Write + AsRawFd> Transport for T {}

type ReadCallback = Box<dyn FnOnce(Bytes)>;
type LineCallback = Box<dyn FnOnce(Option<Bytes>)>;
type WriteCallback = Box<dyn FnOnce()>;

enum PendingRead {
    Chunk(ReadCallback),
    Line { delimiter: Bytes, callback: LineCallback },
}

struct PendingWrite {
    data: Bytes,
    sent: usize,
    callback: WriteCallback,
}

/// Outcome of one read syscall
enum Fill {
    Data,
    Eof,
    Empty,
}

struct Inner {
    fd: RawFd,
    events: Events,
    transport: RefCell<Option<Box<dyn Transport>>>,
    residue: RefCell<BytesMut>,
    pending_read: RefCell<Option<PendingRead>>,
    pending_write: RefCell<Option<PendingWrite>>,
    /// Readiness not yet exhausted by a `WouldBlock`
    readable: Cell<bool>,
    writable: Cell<bool>,
    /// A synthetic wake-up is queued
    scheduled: Cell<bool>,
    eof: Cell<bool>,
    closed: Cell<bool>,
    /// Reused by every read syscall; its length is the chunk size
    scratch: RefCell<Vec<u8>>,
}

/// Handle to one non-blocking descriptor
///
/// Clones refer to the same channel. The registry keeps the channel alive
/// until [`Channel::close`]; pending callbacks are dropped on close.
#[derive(Clone)]
pub struct Channel {
    inner: Rc<Inner>,
}

impl Channel {
    /// Wrap `transport` and register it for read and write readiness
    ///
    /// The transport must already be in non-blocking mode.
    pub fn new<T: Transport + 'static>(events: &Events, transport: T) -> Result<Self> {
        Self::with_chunk_size(events, transport, DEFAULT_READ_CHUNK)
    }

    /// Like [`Channel::new`] with an explicit read size
    pub fn with_chunk_size<T: Transport + 'static>(
        events: &Events,
        transport: T,
        chunk_size: usize,
    ) -> Result<Self> {
        if chunk_size == 0 {
            return Err(EmberError::Config("read chunk size must be positive".to_string()));
        }

        let fd = transport.as_raw_fd();
        let channel = Self {
            inner: Rc::new(Inner {
                fd,
                events: events.clone(),
                transport: RefCell::new(Some(Box::new(transport))),
                residue: RefCell::new(BytesMut::new()),
                pending_read: RefCell::new(None),
                pending_write: RefCell::new(None),
                readable: Cell::new(true),
                writable: Cell::new(true),
                scheduled: Cell::new(false),
                eof: Cell::new(false),
                closed: Cell::new(false),
                scratch: RefCell::new(vec![0u8; chunk_size]),
            }),
        };

        let handle = channel.clone();
        events.register(fd, Interest::READABLE | Interest::WRITABLE, move |ready| {
            handle.on_ready(ready)
        })?;

        Ok(channel)
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Read whatever is available on the next read-ready event
    ///
    /// The callback receives buffered residue followed by the newly read
    /// bytes. Empty means end-of-stream.
    pub fn read<F>(&self, callback: F) -> Result<()>
    where
        F: FnOnce(Bytes) + 'static,
    {
        self.arm_read(PendingRead::Chunk(Box::new(callback)))
    }

    /// Read up to the next `delimiter`
    ///
    /// The callback receives the line without the delimiter; bytes after it
    /// are kept for the next read. `None` means the stream ended before a
    /// full line arrived and the caller should treat the connection as gone.
    ///
    /// Residue is unbounded: a peer that never sends `delimiter` grows it
    /// until it disconnects.
    pub fn readline<F>(&self, delimiter: &[u8], callback: F) -> Result<()>
    where
        F: FnOnce(Option<Bytes>) + 'static,
    {
        if delimiter.is_empty() {
            return Err(EmberError::Config("line delimiter must not be empty".to_string()));
        }
        self.arm_read(PendingRead::Line {
            delimiter: Bytes::copy_from_slice(delimiter),
            callback: Box::new(callback),
        })
    }

    /// Send all of `data`, then invoke `callback`
    ///
    /// Short writes keep the operation pending across readiness events.
    pub fn write<F>(&self, data: impl Into<Bytes>, callback: F) -> Result<()>
    where
        F: FnOnce() + 'static,
    {
        if self.is_closed() {
            return Err(EmberError::ChannelClosed);
        }
        if self.inner.pending_write.borrow().is_some() {
            return Err(EmberError::Reentrant(Direction::Write));
        }

        *self.inner.pending_write.borrow_mut() = Some(PendingWrite {
            data: data.into(),
            sent: 0,
            callback: Box::new(callback),
        });
        self.rearm();
        Ok(())
    }

    /// Unregister and release the descriptor
    ///
    /// Pending callbacks are dropped without being invoked. Closing an
    /// already closed channel is a no-op.
    pub fn close(&self) {
        if self.inner.closed.replace(true) {
            return;
        }

        if let Err(e) = self.inner.events.unregister(self.inner.fd) {
            tracing::warn!("Failed to unregister fd {}: {}", self.inner.fd, e);
        }

        // Take everything out first; dropping callbacks may drop sessions
        // that hold clones of this channel.
        let transport = self.inner.transport.borrow_mut().take();
        let pending_read = self.inner.pending_read.borrow_mut().take();
        let pending_write = self.inner.pending_write.borrow_mut().take();
        self.inner.residue.borrow_mut().clear();
        drop(transport);
        drop(pending_read);
        drop(pending_write);

        tracing::trace!("Closed fd {}", self.inner.fd);
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn fd(&self) -> RawFd {
        self.inner.fd
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.get()
    }

    /// Whether a read syscall has returned end-of-stream
    pub fn at_eof(&self) -> bool {
        self.inner.eof.get()
    }

    /// Bytes read but not yet consumed
    pub fn residue_len(&self) -> usize {
        self.inner.residue.borrow().len()
    }

    // =========================================================================
    // Readiness Handling
    // =========================================================================

    fn arm_read(&self, op: PendingRead) -> Result<()> {
        if self.is_closed() {
            return Err(EmberError::ChannelClosed);
        }
        if self.inner.pending_read.borrow().is_some() {
            return Err(EmberError::Reentrant(Direction::Read));
        }

        *self.inner.pending_read.borrow_mut() = Some(op);
        self.rearm();
        Ok(())
    }

    fn on_ready(&self, ready: Ready) {
        self.inner.scheduled.set(false);
        if self.is_closed() {
            return;
        }

        if ready.is_readable() {
            self.inner.readable.set(true);
            self.complete_read();
        }
        if ready.is_writable() && !self.is_closed() {
            self.inner.writable.set(true);
            self.complete_write();
        }
        if ready.is_hangup() {
            tracing::debug!("Hang-up on fd {}", self.inner.fd);
            self.close();
            return;
        }

        self.rearm();
    }

    /// Queue a wake-up if a pending operation can make progress without
    /// waiting for a new readiness edge
    fn rearm(&self) {
        if self.is_closed() || self.inner.scheduled.get() {
            return;
        }

        let mut ready = Ready::EMPTY;
        {
            let residue = self.inner.residue.borrow();
            match &*self.inner.pending_read.borrow() {
                Some(PendingRead::Chunk(_)) => {
                    if self.inner.readable.get() || !residue.is_empty() {
                        ready |= Ready::READABLE;
                    }
                }
                Some(PendingRead::Line { delimiter, .. }) => {
                    if self.inner.readable.get() || find(&residue, delimiter).is_some() {
                        ready |= Ready::READABLE;
                    }
                }
                None => {}
            }
        }
        if self.inner.pending_write.borrow().is_some() && self.inner.writable.get() {
            ready |= Ready::WRITABLE;
        }

        if !ready.is_empty() {
            self.inner.scheduled.set(true);
            self.inner.events.wake(self.inner.fd, ready);
        }
    }

    fn complete_read(&self) {
        let Some(op) = self.inner.pending_read.borrow_mut().take() else {
            return;
        };

        match op {
            PendingRead::Chunk(callback) => match self.fill() {
                Ok(Fill::Data) | Ok(Fill::Eof) => callback(self.take_residue()),
                Ok(Fill::Empty) => {
                    if self.residue_len() > 0 {
                        callback(self.take_residue());
                    } else {
                        self.restore_read(PendingRead::Chunk(callback));
                    }
                }
                Err(e) => self.fail(Direction::Read, e),
            },
            PendingRead::Line { delimiter, callback } => {
                if let Some(line) = self.take_line(&delimiter) {
                    return callback(Some(line));
                }
                match self.fill() {
                    Ok(Fill::Data) => match self.take_line(&delimiter) {
                        Some(line) => callback(Some(line)),
                        None => self.restore_read(PendingRead::Line { delimiter, callback }),
                    },
                    Ok(Fill::Eof) => {
                        let dropped = self.take_residue();
                        if !dropped.is_empty() {
                            tracing::debug!(
                                "fd {} ended with {} bytes of unterminated line",
                                self.inner.fd,
                                dropped.len()
                            );
                        }
                        callback(None)
                    }
                    Ok(Fill::Empty) => {
                        self.restore_read(PendingRead::Line { delimiter, callback })
                    }
                    Err(e) => self.fail(Direction::Read, e),
                }
            }
        }
    }

    fn complete_write(&self) {
        let Some(mut op) = self.inner.pending_write.borrow_mut().take() else {
            return;
        };

        if op.sent >= op.data.len() {
            return (op.callback)();
        }

        let result = match self.inner.transport.borrow_mut().as_mut() {
            Some(transport) => transport.write(&op.data[op.sent..]),
            None => Err(io::ErrorKind::NotConnected.into()),
        };

        match result {
            Ok(0) => self.fail(Direction::Write, io::ErrorKind::WriteZero.into()),
            Ok(n) => {
                op.sent += n;
                if op.sent >= op.data.len() {
                    (op.callback)();
                } else {
                    tracing::trace!(
                        "Short write on fd {}: {}/{} bytes",
                        self.inner.fd,
                        op.sent,
                        op.data.len()
                    );
                    *self.inner.pending_write.borrow_mut() = Some(op);
                }
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                self.inner.writable.set(false);
                *self.inner.pending_write.borrow_mut() = Some(op);
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {
                *self.inner.pending_write.borrow_mut() = Some(op);
            }
            Err(e) => self.fail(Direction::Write, e),
        }
    }

    /// One read syscall into the residue buffer
    fn fill(&self) -> io::Result<Fill> {
        let mut buf = self.inner.scratch.borrow_mut();
        let result = match self.inner.transport.borrow_mut().as_mut() {
            Some(transport) => transport.read(&mut buf[..]),
            None => Err(io::ErrorKind::NotConnected.into()),
        };

        match result {
            Ok(0) => {
                self.inner.eof.set(true);
                Ok(Fill::Eof)
            }
            Ok(n) => {
                self.inner.residue.borrow_mut().extend_from_slice(&buf[..n]);
                Ok(Fill::Data)
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                self.inner.readable.set(false);
                Ok(Fill::Empty)
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => Ok(Fill::Empty),
            Err(e) => Err(e),
        }
    }

    fn take_line(&self, delimiter: &[u8]) -> Option<Bytes> {
        let mut residue = self.inner.residue.borrow_mut();
        let pos = find(&residue, delimiter)?;
        let line = residue.split_to(pos).freeze();
        residue.advance(delimiter.len());
        Some(line)
    }

    fn take_residue(&self) -> Bytes {
        self.inner.residue.borrow_mut().split().freeze()
    }

    fn restore_read(&self, op: PendingRead) {
        *self.inner.pending_read.borrow_mut() = Some(op);
    }

    fn fail(&self, direction: Direction, error: io::Error) {
        tracing::debug!("{} failed on fd {}: {}", direction, self.inner.fd, error);
        self.close();
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|window| window == needle)
}
