//! Client Module
//!
//! The public facade: connect, disconnect, get and set.
//!
//! ## Responsibilities
//! - Build commands from caller keys and values (any bytes)
//! - Run them through the connection state machine
//! - Translate replies into values and errors

use bytes::Bytes;

use crate::config::ClientConfig;
use crate::error::{RespError, Result};
use crate::network::{Connection, ConnectionState, Connector, TcpConnector};
use crate::protocol::{Command, ReplyFrame};

/// Client for a single server connection
///
/// All methods take `&self`; share the client between threads with an `Arc`.
/// Concurrent calls are served one at a time in the order they arrive.
///
/// ```no_run
/// use resplite::{Client, ClientConfig};
///
/// let config = ClientConfig::builder().host("127.0.0.1").port(6379).build();
/// let client = Client::new(config)?;
/// client.connect()?;
/// client.set("greeting", "hello")?;
/// assert_eq!(client.get("greeting")?.as_deref(), Some(&b"hello"[..]));
/// client.disconnect();
/// # Ok::<(), resplite::RespError>(())
/// ```
pub struct Client<C: Connector = TcpConnector> {
    config: ClientConfig,
    connection: Connection<C>,
}

impl Client<TcpConnector> {
    /// Create a TCP client. Does not connect yet.
    pub fn new(config: ClientConfig) -> Result<Self> {
        Self::with_connector(config, TcpConnector)
    }
}

impl<C: Connector> Client<C> {
    /// Create a client over a custom transport
    pub fn with_connector(config: ClientConfig, connector: C) -> Result<Self> {
        let connection = Connection::new(connector, &config)?;
        Ok(Self { config, connection })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Current connection state
    pub fn state(&self) -> ConnectionState {
        self.connection.state()
    }

    /// Connect, authenticating when a password is configured
    ///
    /// Calling while already connected does nothing.
    pub fn connect(&self) -> Result<()> {
        self.connection.open()
    }

    /// Close the connection. Always succeeds.
    pub fn disconnect(&self) {
        self.connection.close()
    }

    /// Fetch a value by key
    ///
    /// Returns `Ok(None)` when the key does not exist.
    pub fn get(&self, key: impl AsRef<[u8]>) -> Result<Option<Bytes>> {
        let command = Command::Get {
            key: key.as_ref().to_vec(),
        };
        match self.connection.execute(command)? {
            ReplyFrame::Bulk(value) => Ok(value),
            ReplyFrame::Error(message) => Err(RespError::Server(message)),
            other => Err(unexpected("GET", &other)),
        }
    }

    /// Store a value under a key
    pub fn set(&self, key: impl AsRef<[u8]>, value: impl AsRef<[u8]>) -> Result<()> {
        let command = Command::Set {
            key: key.as_ref().to_vec(),
            value: value.as_ref().to_vec(),
        };
        match self.connection.execute(command)? {
            reply if reply.is_ok() => Ok(()),
            ReplyFrame::Error(message) => Err(RespError::Server(message)),
            other => Err(unexpected("SET", &other)),
        }
    }
}

fn unexpected(command: &str, reply: &ReplyFrame) -> RespError {
    RespError::Protocol(format!("unexpected {} reply to {}", reply.type_name(), command))
}
