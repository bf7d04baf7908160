//! Configuration for resplite
//!
//! Centralized client configuration with sensible defaults.

use std::fmt;
use std::time::Duration;

use crate::error::{RespError, Result};

/// Default Redis port
pub const DEFAULT_PORT: u16 = 6379;

/// Server address a client connects to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Address {
    host: String,
    port: u16,
}

impl Address {
    /// Create a validated address
    ///
    /// The host must be non-empty and the port within 1-65535.
    pub fn new(host: impl Into<String>, port: u16) -> Result<Self> {
        let host = host.into();
        if host.trim().is_empty() {
            return Err(RespError::Config("host must not be empty".to_string()));
        }
        if port == 0 {
            return Err(RespError::Config("port must be within 1-65535".to_string()));
        }
        Ok(Self { host, port })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Main configuration for a client instance
#[derive(Clone)]
pub struct ClientConfig {
    // -------------------------------------------------------------------------
    // Server
    // -------------------------------------------------------------------------
    /// Server host name or IP address
    pub host: String,

    /// Server TCP port (1-65535)
    pub port: u16,

    /// Password sent with AUTH right after the transport opens
    pub password: Option<String>,

    // -------------------------------------------------------------------------
    // Timeouts (0 disables the timeout)
    // -------------------------------------------------------------------------
    /// Transport open timeout (milliseconds)
    pub connect_timeout_ms: u64,

    /// Read timeout while waiting for a reply (milliseconds)
    pub read_timeout_ms: u64,

    /// Write timeout while sending a command (milliseconds)
    pub write_timeout_ms: u64,

    // -------------------------------------------------------------------------
    // Buffers
    // -------------------------------------------------------------------------
    /// Maximum bytes requested from the transport per read
    pub read_chunk_size: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            password: None,
            connect_timeout_ms: 5000,
            read_timeout_ms: 5000,
            write_timeout_ms: 5000,
            read_chunk_size: 4096,
        }
    }
}

// Keep the password out of logs.
impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("connect_timeout_ms", &self.connect_timeout_ms)
            .field("read_timeout_ms", &self.read_timeout_ms)
            .field("write_timeout_ms", &self.write_timeout_ms)
            .field("read_chunk_size", &self.read_chunk_size)
            .finish()
    }
}

impl ClientConfig {
    /// Create a new config builder
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    /// Validated server address
    pub fn address(&self) -> Result<Address> {
        Address::new(self.host.clone(), self.port)
    }

    /// Check the config for values the client cannot work with
    pub fn validate(&self) -> Result<()> {
        self.address()?;
        if self.read_chunk_size == 0 {
            return Err(RespError::Config(
                "read_chunk_size must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn connect_timeout(&self) -> Option<Duration> {
        millis(self.connect_timeout_ms)
    }

    pub fn read_timeout(&self) -> Option<Duration> {
        millis(self.read_timeout_ms)
    }

    pub fn write_timeout(&self) -> Option<Duration> {
        millis(self.write_timeout_ms)
    }
}

fn millis(ms: u64) -> Option<Duration> {
    (ms > 0).then(|| Duration::from_millis(ms))
}

/// Builder for ClientConfig
#[derive(Default)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    /// Set the server host
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    /// Set the server port
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Set the AUTH password
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.config.password = Some(password.into());
        self
    }

    /// Set the connect timeout (in milliseconds)
    pub fn connect_timeout_ms(mut self, ms: u64) -> Self {
        self.config.connect_timeout_ms = ms;
        self
    }

    /// Set the read timeout (in milliseconds)
    pub fn read_timeout_ms(mut self, ms: u64) -> Self {
        self.config.read_timeout_ms = ms;
        self
    }

    /// Set the write timeout (in milliseconds)
    pub fn write_timeout_ms(mut self, ms: u64) -> Self {
        self.config.write_timeout_ms = ms;
        self
    }

    /// Set read and write timeouts together (in milliseconds)
    pub fn io_timeout_ms(self, ms: u64) -> Self {
        self.read_timeout_ms(ms).write_timeout_ms(ms)
    }

    /// Set the per-read chunk size (in bytes)
    pub fn read_chunk_size(mut self, size: usize) -> Self {
        self.config.read_chunk_size = size;
        self
    }

    pub fn build(self) -> ClientConfig {
        self.config
    }
}
