//! Network Module
//!
//! Transport plumbing and the connection state machine.
//!
//! ## Architecture
//! - `Connector`/`Transport` abstract the byte stream (TCP by default)
//! - `Reassembler` turns arbitrary read chunks into complete reply frames
//! - `RequestQueue` admits one request at a time, in arrival order
//! - `Connection` owns the transport and drives the lifecycle

mod connection;
mod queue;
mod reassembler;
mod transport;

pub use connection::{Connection, ConnectionState};
pub use queue::{RequestQueue, Turn};
pub use reassembler::Reassembler;
pub use transport::{Connector, TcpConnector, TcpTransport, Transport, TransportOptions};
