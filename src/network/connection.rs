//! Connection State Machine
//!
//! Owns the transport and drives the connection lifecycle:
//!
//! ```text
//!   Disconnected ──open()──▶ Connecting ──(no password)──────────▶ Ready
//!        ▲                     │    │                              │  │
//!        │                     │    └─(password)─▶ Authenticating ─┘  │
//!        │                     ▼                        │             │
//!        │                   Failed ◀───────────────────┘◀────────────┘
//!        │                                       (auth/transport/protocol error)
//!        └────────── Closing ◀──close()── any state
//! ```
//!
//! Requests run one at a time in arrival order. The shared state lock is never
//! held across transport I/O, so `close()` can always make progress and a
//! request blocked on a read fails once the transport is closed under it.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::{Address, ClientConfig};
use crate::error::{RespError, Result};
use crate::protocol::{encode_command, Command, ReplyFrame};

use super::queue::RequestQueue;
use super::reassembler::Reassembler;
use super::transport::{Connector, Transport, TransportOptions};

/// Lifecycle state of a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Authenticating,
    Ready,
    Closing,
    Failed,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Authenticating => "authenticating",
            ConnectionState::Ready => "ready",
            ConnectionState::Closing => "closing",
            ConnectionState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// An open transport and the reassembly buffer reading from it
struct Link<T> {
    transport: T,
    reassembler: Mutex<Reassembler>,
}

struct Shared<T> {
    state: ConnectionState,

    /// Present only while Authenticating or Ready
    link: Option<Arc<Link<T>>>,

    /// Bumped by every open() and close(); an open() that finds a different
    /// epoch after the transport is up lost a race with close()
    epoch: u64,
}

/// A single client connection
pub struct Connection<C: Connector> {
    connector: C,
    address: Address,
    password: Option<String>,
    options: TransportOptions,
    read_chunk_size: usize,

    shared: Mutex<Shared<C::Transport>>,
    queue: RequestQueue,
}

impl<C: Connector> Connection<C> {
    /// Create a disconnected connection from a validated config
    pub fn new(connector: C, config: &ClientConfig) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            connector,
            address: config.address()?,
            password: config.password.clone(),
            options: TransportOptions::from_config(config),
            read_chunk_size: config.read_chunk_size,
            shared: Mutex::new(Shared {
                state: ConnectionState::Disconnected,
                link: None,
                epoch: 0,
            }),
            queue: RequestQueue::new(),
        })
    }

    /// Current lifecycle state
    pub fn state(&self) -> ConnectionState {
        self.shared.lock().state
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Open the transport and authenticate if a password is configured
    ///
    /// No-op when already Ready. Fails with `AlreadyInProgress` while another
    /// open or close is underway.
    pub fn open(&self) -> Result<()> {
        let epoch = {
            let mut shared = self.shared.lock();
            match shared.state {
                ConnectionState::Ready => return Ok(()),
                ConnectionState::Connecting
                | ConnectionState::Authenticating
                | ConnectionState::Closing => {
                    return Err(RespError::AlreadyInProgress(shared.state));
                }
                ConnectionState::Disconnected | ConnectionState::Failed => {
                    shared.state = ConnectionState::Connecting;
                    shared.epoch = shared.epoch.wrapping_add(1);
                    shared.epoch
                }
            }
        };

        tracing::debug!("Connecting to {}", self.address);

        let transport = match self.connector.open(&self.address, &self.options) {
            Ok(transport) => transport,
            Err(e) => {
                tracing::warn!("Failed to connect to {}: {}", self.address, e);
                let mut shared = self.shared.lock();
                if shared.epoch == epoch {
                    shared.state = ConnectionState::Failed;
                }
                return Err(RespError::from_io(e));
            }
        };

        let link = Arc::new(Link {
            transport,
            reassembler: Mutex::new(Reassembler::new()),
        });

        {
            let mut shared = self.shared.lock();
            if shared.epoch != epoch {
                drop(shared);
                tracing::debug!("Connection to {} closed while opening", self.address);
                let _ = link.transport.close();
                return Err(RespError::ConnectionClosed);
            }
            shared.state = if self.password.is_some() {
                ConnectionState::Authenticating
            } else {
                ConnectionState::Ready
            };
            shared.link = Some(Arc::clone(&link));
        }

        tracing::info!("Connected to {}", self.address);

        match &self.password {
            Some(password) => self.authenticate(&link, password),
            None => Ok(()),
        }
    }

    /// Run AUTH during the Authenticating state
    ///
    /// Only `+OK` moves the connection to Ready; anything else fails it.
    fn authenticate(&self, link: &Arc<Link<C::Transport>>, password: &str) -> Result<()> {
        let command = Command::Auth {
            password: password.as_bytes().to_vec(),
        };

        let outcome = match self.execute_in(command, ConnectionState::Authenticating) {
            Ok(ReplyFrame::Status(text)) if text == "OK" => Ok(()),
            Ok(ReplyFrame::Error(message)) => Err(RespError::AuthFailed(message)),
            Ok(other) => Err(RespError::Protocol(format!(
                "unexpected {} reply to AUTH",
                other.type_name()
            ))),
            Err(e) => Err(e),
        };

        match outcome {
            Ok(()) => {
                let mut shared = self.shared.lock();
                if shared.state == ConnectionState::Authenticating && self.is_current(&shared, link) {
                    shared.state = ConnectionState::Ready;
                    drop(shared);
                    tracing::info!("Authenticated with {}", self.address);
                    Ok(())
                } else {
                    Err(RespError::ConnectionClosed)
                }
            }
            Err(e) => {
                tracing::warn!("Authentication with {} failed: {}", self.address, e);
                self.fail_link(link);
                Err(e)
            }
        }
    }

    /// Close the transport from any state
    ///
    /// Best effort: close failures are logged, never returned. A request
    /// blocked on the transport fails once the close lands.
    pub fn close(&self) {
        let link = {
            let mut shared = self.shared.lock();
            shared.epoch = shared.epoch.wrapping_add(1);
            match shared.link.take() {
                Some(link) => {
                    shared.state = ConnectionState::Closing;
                    link
                }
                None => {
                    shared.state = ConnectionState::Disconnected;
                    return;
                }
            }
        };

        tracing::debug!("Closing connection to {}", self.address);
        if let Err(e) = link.transport.close() {
            tracing::warn!("Error closing connection to {}: {}", self.address, e);
        }

        let mut shared = self.shared.lock();
        if shared.state == ConnectionState::Closing {
            shared.state = ConnectionState::Disconnected;
        }
    }

    // =========================================================================
    // Command Execution
    // =========================================================================

    /// Send a command and wait for its reply
    ///
    /// Queues behind earlier callers. Requires the Ready state. Transport,
    /// timeout and malformed-frame errors move the connection to Failed.
    pub fn execute(&self, command: Command) -> Result<ReplyFrame> {
        self.execute_in(command, ConnectionState::Ready)
    }

    fn execute_in(&self, command: Command, expected: ConnectionState) -> Result<ReplyFrame> {
        let _turn = self.queue.wait_turn();

        let link = {
            let shared = self.shared.lock();
            match (&shared.link, shared.state) {
                (Some(link), state) if state == expected => Arc::clone(link),
                (_, state) => return Err(RespError::NotConnected(state)),
            }
        };

        tracing::trace!("Sending {:?} to {}", command, self.address);
        let request = encode_command(&command);

        match self.round_trip(&link, &request) {
            Ok(frame) => {
                tracing::trace!("Received {} from {}", frame, self.address);
                Ok(frame)
            }
            Err(e) => {
                tracing::warn!("{:?} to {} failed: {}", command.command_type(), self.address, e);
                self.fail_link(&link);
                Err(e)
            }
        }
    }

    /// Write one request, then read until one reply is reassembled
    fn round_trip(&self, link: &Link<C::Transport>, request: &[u8]) -> Result<ReplyFrame> {
        link.transport.write_all(request).map_err(RespError::from_io)?;

        let mut reassembler = link.reassembler.lock();
        let mut chunk = vec![0u8; self.read_chunk_size];
        loop {
            if let Some(frame) = reassembler.try_take_frame()? {
                return Ok(frame);
            }

            let n = link.transport.read_some(&mut chunk).map_err(RespError::from_io)?;
            if n == 0 {
                return Err(RespError::ConnectionClosed);
            }
            reassembler.feed(&chunk[..n]);
        }
    }

    /// Tear down `link` and enter Failed, unless it was already replaced
    fn fail_link(&self, link: &Arc<Link<C::Transport>>) {
        let mut shared = self.shared.lock();
        if !self.is_current(&shared, link) {
            return;
        }
        shared.link = None;
        shared.state = ConnectionState::Failed;
        drop(shared);

        if let Err(e) = link.transport.close() {
            tracing::debug!("Error closing failed connection to {}: {}", self.address, e);
        }
        link.reassembler.lock().clear();
    }

    fn is_current(&self, shared: &Shared<C::Transport>, link: &Arc<Link<C::Transport>>) -> bool {
        shared
            .link
            .as_ref()
            .map_or(false, |current| Arc::ptr_eq(current, link))
    }
}

impl<C: Connector> Drop for Connection<C> {
    fn drop(&mut self) {
        if let Some(link) = self.shared.get_mut().link.take() {
            let _ = link.transport.close();
        }
    }
}
