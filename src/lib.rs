//! # resplite
//!
//! A minimal client for the Redis RESP2 protocol:
//! - GET, SET and AUTH over one persistent connection
//! - Binary-safe command encoding (arrays of bulk strings)
//! - Reply reassembly across arbitrary read boundaries
//! - One in-flight request at a time, callers served in arrival order
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Client Facade                           │
//! │              connect / disconnect / get / set                │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │               Connection State Machine                       │
//! │     (FIFO request queue, lifecycle, owns the transport)      │
//! └──────────┬──────────────────────────────────┬───────────────┘
//!            │ encode                           │ read chunks
//!            ▼                                  ▼
//!   ┌─────────────────┐                ┌─────────────────┐
//!   │  Frame Codec    │◀───decode──────│   Reassembler   │
//!   │  (pure, no I/O) │                │    (BytesMut)   │
//!   └─────────────────┘                └─────────────────┘
//!                                               ▲
//!                                      ┌────────┴────────┐
//!                                      │    Transport    │
//!                                      │      (TCP)      │
//!                                      └─────────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod protocol;
pub mod network;
pub mod client;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{ErrorKind, RespError, Result};
pub use config::{Address, ClientConfig, ClientConfigBuilder, DEFAULT_PORT};
pub use client::Client;
pub use network::ConnectionState;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of resplite
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
