//! Stream Reassembler
//!
//! Turns arbitrarily chunked transport reads into complete reply frames.

use bytes::{Buf, BytesMut};

use crate::error::{RespError, Result};
use crate::protocol::{decode, Decoded, ReplyFrame};

/// Accumulates raw bytes and hands out one complete frame at a time
///
/// A single read may hold part of a reply, or a reply plus the start of the
/// next one. Bytes not yet consumed always form the prefix of a frame.
#[derive(Debug, Default)]
pub struct Reassembler {
    buffer: BytesMut,
}

impl Reassembler {
    /// Create an empty reassembler
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(4096),
        }
    }

    /// Append a chunk read from the transport
    pub fn feed(&mut self, chunk: &[u8]) {
        self.buffer.extend_from_slice(chunk);
    }

    /// Take the next complete frame, if one is buffered
    ///
    /// Returns `Ok(None)` when more bytes are needed. A malformed frame is a
    /// `Protocol` error; the stream cannot be resynchronized after that, so
    /// the caller must drop the connection.
    pub fn try_take_frame(&mut self) -> Result<Option<ReplyFrame>> {
        match decode(&self.buffer) {
            Decoded::Complete(frame, consumed) => {
                self.buffer.advance(consumed);
                tracing::trace!("Reassembled frame {} ({} bytes left)", frame, self.buffer.len());
                Ok(Some(frame))
            }
            Decoded::Incomplete => Ok(None),
            Decoded::Malformed(reason) => Err(RespError::Protocol(reason)),
        }
    }

    /// Number of bytes buffered but not yet consumed
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Drop everything buffered
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}
