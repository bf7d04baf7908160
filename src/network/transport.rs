//! Transport
//!
//! The byte-stream collaborator the connection runs on, plus its TCP
//! implementation.
//!
//! Methods take `&self` so one thread can `close()` a transport while another
//! is blocked in `read_some()`; the blocked read then returns.

use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use crate::config::{Address, ClientConfig};

/// Socket-level options passed to a connector
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransportOptions {
    pub connect_timeout: Option<Duration>,
    pub read_timeout: Option<Duration>,
    pub write_timeout: Option<Duration>,
}

impl TransportOptions {
    pub fn from_config(config: &ClientConfig) -> Self {
        Self {
            connect_timeout: config.connect_timeout(),
            read_timeout: config.read_timeout(),
            write_timeout: config.write_timeout(),
        }
    }
}

/// An open bidirectional byte stream
pub trait Transport: Send + Sync {
    /// Write every byte or fail
    fn write_all(&self, bytes: &[u8]) -> io::Result<()>;

    /// Read whatever is available into `buf`; `Ok(0)` means end of stream
    fn read_some(&self, buf: &mut [u8]) -> io::Result<usize>;

    /// Close both directions
    fn close(&self) -> io::Result<()>;
}

/// Opens transports to an address
pub trait Connector: Send + Sync {
    type Transport: Transport;

    fn open(&self, address: &Address, options: &TransportOptions) -> io::Result<Self::Transport>;
}

// =============================================================================
// TCP
// =============================================================================

/// Opens plain TCP connections
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpConnector;

impl Connector for TcpConnector {
    type Transport = TcpTransport;

    fn open(&self, address: &Address, options: &TransportOptions) -> io::Result<TcpTransport> {
        let stream = connect_stream(address, options.connect_timeout)?;

        // Disable Nagle's algorithm for low latency
        stream.set_nodelay(true)?;
        stream.set_read_timeout(options.read_timeout)?;
        stream.set_write_timeout(options.write_timeout)?;

        Ok(TcpTransport { stream })
    }
}

/// Try every resolved address in order, returning the last error
fn connect_stream(address: &Address, timeout: Option<Duration>) -> io::Result<TcpStream> {
    let addrs: Vec<SocketAddr> = (address.host(), address.port()).to_socket_addrs()?.collect();

    let mut last_err = io::Error::new(
        io::ErrorKind::AddrNotAvailable,
        format!("{} did not resolve to any address", address),
    );
    for addr in addrs {
        let attempt = match timeout {
            Some(timeout) => TcpStream::connect_timeout(&addr, timeout),
            None => TcpStream::connect(addr),
        };
        match attempt {
            Ok(stream) => return Ok(stream),
            Err(e) => {
                tracing::debug!("Connect to {} failed: {}", addr, e);
                last_err = e;
            }
        }
    }
    Err(last_err)
}

/// TCP stream transport
#[derive(Debug)]
pub struct TcpTransport {
    stream: TcpStream,
}

impl TcpTransport {
    pub fn peer_addr(&self) -> io::Result<SocketAddr> {
        self.stream.peer_addr()
    }
}

impl Transport for TcpTransport {
    fn write_all(&self, bytes: &[u8]) -> io::Result<()> {
        let mut stream = &self.stream;
        stream.write_all(bytes)?;
        stream.flush()
    }

    fn read_some(&self, buf: &mut [u8]) -> io::Result<usize> {
        let mut stream = &self.stream;
        loop {
            match stream.read(buf) {
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                other => return other,
            }
        }
    }

    fn close(&self) -> io::Result<()> {
        match self.stream.shutdown(Shutdown::Both) {
            // Peer already went away
            Err(e) if e.kind() == io::ErrorKind::NotConnected => Ok(()),
            other => other,
        }
    }
}
