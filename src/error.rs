//! Error types for resplite
//!
//! Provides a unified error type for all client operations, grouped into the
//! kinds the connection state machine reacts to.

use std::io;

use thiserror::Error;

use crate::network::ConnectionState;

/// Result type alias using RespError
pub type Result<T> = std::result::Result<T, RespError>;

/// Unified error type for resplite operations
#[derive(Debug, Error)]
pub enum RespError {
    // -------------------------------------------------------------------------
    // Transport Errors
    // -------------------------------------------------------------------------
    #[error("Transport error: {0}")]
    Transport(#[from] io::Error),

    #[error("Connection closed by peer")]
    ConnectionClosed,

    #[error("Operation timed out")]
    Timeout,

    // -------------------------------------------------------------------------
    // Protocol Errors
    // -------------------------------------------------------------------------
    #[error("Protocol error: {0}")]
    Protocol(String),

    // -------------------------------------------------------------------------
    // Application Errors (server replied with -ERR ...)
    // -------------------------------------------------------------------------
    #[error("Server error: {0}")]
    Server(String),

    #[error("Authentication failed: {0}")]
    AuthFailed(String),

    // -------------------------------------------------------------------------
    // State Errors
    // -------------------------------------------------------------------------
    #[error("Not connected (connection is {0})")]
    NotConnected(ConnectionState),

    #[error("Connect already in progress (connection is {0})")]
    AlreadyInProgress(ConnectionState),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Coarse classification of a [`RespError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Open/read/write failure, timeout or unexpected end of stream
    Transport,
    /// The byte stream is no longer frame-aligned
    Protocol,
    /// The server answered with an error reply
    Application,
    /// Operation invoked in the wrong connection state
    State,
    /// Invalid client configuration
    Config,
}

impl RespError {
    /// Map an I/O error, folding socket timeouts into [`RespError::Timeout`]
    pub(crate) fn from_io(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => RespError::Timeout,
            io::ErrorKind::UnexpectedEof => RespError::ConnectionClosed,
            _ => RespError::Transport(err),
        }
    }

    /// Which part of the taxonomy this error belongs to
    pub fn kind(&self) -> ErrorKind {
        match self {
            RespError::Transport(_) | RespError::ConnectionClosed | RespError::Timeout => {
                ErrorKind::Transport
            }
            RespError::Protocol(_) => ErrorKind::Protocol,
            RespError::Server(_) | RespError::AuthFailed(_) => ErrorKind::Application,
            RespError::NotConnected(_) | RespError::AlreadyInProgress(_) => ErrorKind::State,
            RespError::Config(_) => ErrorKind::Config,
        }
    }

    /// True for errors that normally move the connection to Failed
    ///
    /// An unexpected but well-formed reply is reported as `Protocol` and
    /// still leaves the connection Ready.
    pub fn is_fatal(&self) -> bool {
        matches!(self.kind(), ErrorKind::Transport | ErrorKind::Protocol)
            || matches!(self, RespError::AuthFailed(_))
    }
}
