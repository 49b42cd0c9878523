//! Connection Session
//!
//! Per-connection request/response state machine.

use std::cell::{Cell, RefCell};
use std::net::SocketAddr;
use std::rc::Rc;

use bytes::Bytes;

use crate::error::{EmberError, Result};
use crate::event::Channel;
use crate::log::Log;
use crate::protocol::{decode_command, encode_response, Command, Response, LINE_DELIMITER};

/// Where a session is in its request cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// Waiting for a full request line
    AwaitLine,
    /// Splitting the line into a command
    Parse,
    /// Running the command against the log
    Dispatch,
    /// Writing the response
    Respond,
    /// Channel closed; the session is finished
    Closed,
}

/// What moves the state machine forward
enum Input {
    Start,
    Line(Option<Bytes>),
    Written,
}

/// One client connection
///
/// Strictly request/response: the next line is only read once the previous
/// response has been fully written. The session stays alive through the
/// callback it has armed on its channel and is dropped when the channel
/// closes.
pub struct Session {
    channel: Channel,
    log: Rc<RefCell<Log>>,
    peer: SocketAddr,
    state: Cell<State>,
    requests: Cell<u64>,
}

impl Session {
    /// Start serving `channel`
    pub fn start(channel: Channel, log: Rc<RefCell<Log>>, peer: SocketAddr) -> Rc<Self> {
        let session = Rc::new(Self {
            channel,
            log,
            peer,
            state: Cell::new(State::AwaitLine),
            requests: Cell::new(0),
        });
        session.advance(Input::Start);
        session
    }

    pub fn state(&self) -> State {
        if self.channel.is_closed() {
            State::Closed
        } else {
            self.state.get()
        }
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Requests answered so far
    pub fn requests(&self) -> u64 {
        self.requests.get()
    }

    // =========================================================================
    // State Machine
    // =========================================================================

    fn advance(self: &Rc<Self>, input: Input) {
        let result = match input {
            Input::Start => self.await_line(),
            Input::Written => {
                self.requests.set(self.requests.get() + 1);
                self.await_line()
            }
            Input::Line(Some(line)) => {
                let response = self.handle_line(&line);
                self.respond(response)
            }
            Input::Line(None) => {
                tracing::debug!("Client {} disconnected", self.peer);
                self.close();
                Ok(())
            }
        };

        if let Err(e) = result {
            match e {
                EmberError::Reentrant(_) => {
                    tracing::error!("Session {} misused its channel: {}", self.peer, e)
                }
                _ => tracing::debug!("Session {} ended: {}", self.peer, e),
            }
            self.close();
        }
    }

    fn await_line(self: &Rc<Self>) -> Result<()> {
        self.state.set(State::AwaitLine);
        let session = Rc::clone(self);
        self.channel
            .readline(LINE_DELIMITER, move |line| session.advance(Input::Line(line)))
    }

    fn handle_line(&self, line: &[u8]) -> Response {
        self.state.set(State::Parse);
        let command = match decode_command(line) {
            Ok(command) => command,
            Err(e) => {
                tracing::debug!("Bad request from {}: {}", self.peer, e);
                return Response::Error;
            }
        };

        self.state.set(State::Dispatch);
        tracing::trace!("Received command from {}: {:?}", self.peer, command);
        self.dispatch(command)
    }

    fn dispatch(&self, command: Command) -> Response {
        match command {
            Command::Set { key, value } => {
                // Blocks the reactor until the record is on stable storage
                let stored = self.log.borrow_mut().set(&key, &value);
                match stored {
                    Ok(()) => Response::Ok,
                    Err(e) => {
                        tracing::warn!("SET from {} failed: {}", self.peer, e);
                        Response::Error
                    }
                }
            }
            Command::Get { key } => {
                let log = self.log.borrow();
                match log.get(&key) {
                    Some(value) => Response::Value(value.to_string()),
                    None => Response::Missing,
                }
            }
            Command::Compact => Response::Unsupported,
        }
    }

    fn respond(self: &Rc<Self>, response: Response) -> Result<()> {
        self.state.set(State::Respond);
        let session = Rc::clone(self);
        self.channel
            .write(encode_response(&response), move || session.advance(Input::Written))
    }

    fn close(&self) {
        self.state.set(State::Closed);
        self.channel.close();
    }
}
