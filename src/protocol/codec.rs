//! Protocol codec
//!
//! Encoding and decoding functions for the RESP2 wire protocol.
//!
//! ## Wire Format
//!
//! ### Request (Command) Format
//! ```text
//! *<argc>\r\n
//! $<len>\r\n<name>\r\n
//! $<len>\r\n<arg 1>\r\n
//! ...
//! ```
//!
//! ### Reply Formats
//! ```text
//! +<text>\r\n                  status
//! -<text>\r\n                  error
//! :<integer>\r\n               integer
//! $<len>\r\n<len bytes>\r\n    bulk
//! $-1\r\n                      absent bulk
//! ```

use bytes::Bytes;

use super::{Command, ReplyFrame};

/// Line terminator
pub const CRLF: &[u8] = b"\r\n";

/// Longest header line accepted before the terminator shows up (64 KB)
pub const MAX_LINE_LENGTH: usize = 64 * 1024;

/// Largest bulk payload accepted (512 MB, same as the server's own limit)
pub const MAX_BULK_LENGTH: usize = 512 * 1024 * 1024;

/// Outcome of decoding the front of a byte buffer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    /// A full frame plus the number of bytes it occupied
    Complete(ReplyFrame, usize),

    /// The buffer holds the start of a frame; read more bytes
    Incomplete,

    /// The buffer can never become a valid frame
    Malformed(String),
}

// =============================================================================
// Command Encoding
// =============================================================================

/// Encode a command name and its arguments as an array of bulk strings
///
/// Format: `*<argc>\r\n` followed by `$<len>\r\n<bytes>\r\n` per element
pub fn encode(name: &[u8], args: &[&[u8]]) -> Vec<u8> {
    let payload: usize = args.iter().map(|arg| arg.len() + 16).sum();
    let mut message = Vec::with_capacity(16 + name.len() + 16 + payload);

    push_header(&mut message, b'*', args.len() + 1);
    push_bulk(&mut message, name);
    for arg in args {
        push_bulk(&mut message, arg);
    }

    message
}

/// Encode a typed command
pub fn encode_command(command: &Command) -> Vec<u8> {
    encode(command.command_type().name(), &command.args())
}

fn push_header(out: &mut Vec<u8>, marker: u8, len: usize) {
    out.push(marker);
    out.extend_from_slice(len.to_string().as_bytes());
    out.extend_from_slice(CRLF);
}

fn push_bulk(out: &mut Vec<u8>, data: &[u8]) {
    push_header(out, b'$', data.len());
    out.extend_from_slice(data);
    out.extend_from_slice(CRLF);
}

// =============================================================================
// Reply Decoding
// =============================================================================

/// Decode one reply from the front of `buf`
///
/// Never mutates `buf`. Bytes after the first frame are ignored; the caller
/// uses the consumed count to trim its buffer.
pub fn decode(buf: &[u8]) -> Decoded {
    let marker = match buf.first() {
        Some(&marker) => marker,
        None => return Decoded::Incomplete,
    };

    if !matches!(marker, b'+' | b'-' | b':' | b'$') {
        return Decoded::Malformed(format!("invalid type marker 0x{:02x}", marker));
    }

    let line_end = match find_line_end(buf) {
        Ok(Some(idx)) => idx,
        Ok(None) => return Decoded::Incomplete,
        Err(reason) => return Decoded::Malformed(reason),
    };

    let line = &buf[1..line_end];
    let header_len = line_end + CRLF.len();

    match marker {
        b'+' => Decoded::Complete(ReplyFrame::Status(text(line)), header_len),
        b'-' => Decoded::Complete(ReplyFrame::Error(text(line)), header_len),
        b':' => match parse_i64(line) {
            Some(value) => Decoded::Complete(ReplyFrame::Integer(value), header_len),
            None => Decoded::Malformed(format!("invalid integer {:?}", text(line))),
        },
        _ => decode_bulk(buf, line, header_len),
    }
}

/// Decode the payload of a bulk reply whose header line is already parsed
fn decode_bulk(buf: &[u8], line: &[u8], header_len: usize) -> Decoded {
    let len = match parse_i64(line) {
        Some(len) => len,
        None => return Decoded::Malformed(format!("invalid bulk length {:?}", text(line))),
    };

    if len == -1 {
        return Decoded::Complete(ReplyFrame::Bulk(None), header_len);
    }
    if len < 0 || len as u64 > MAX_BULK_LENGTH as u64 {
        return Decoded::Malformed(format!("bulk length {} out of range", len));
    }

    let payload_end = header_len + len as usize;
    let frame_end = payload_end + CRLF.len();

    // Reject a wrong terminator as soon as its first byte is visible.
    if buf.len() > payload_end && buf[payload_end] != b'\r' {
        return Decoded::Malformed("bulk payload not terminated by CRLF".to_string());
    }
    if buf.len() < frame_end {
        return Decoded::Incomplete;
    }
    if &buf[payload_end..frame_end] != CRLF {
        return Decoded::Malformed("bulk payload not terminated by CRLF".to_string());
    }

    let data = Bytes::copy_from_slice(&buf[header_len..payload_end]);
    Decoded::Complete(ReplyFrame::Bulk(Some(data)), frame_end)
}

/// Locate the `\r` ending the header line that starts at `buf[0]`
///
/// `Ok(None)` means the terminator has not arrived yet.
fn find_line_end(buf: &[u8]) -> Result<Option<usize>, String> {
    for (idx, &byte) in buf.iter().enumerate().skip(1) {
        if idx > MAX_LINE_LENGTH {
            return Err(format!("header line exceeds {} bytes", MAX_LINE_LENGTH));
        }
        match byte {
            b'\r' => {
                return match buf.get(idx + 1) {
                    Some(b'\n') => Ok(Some(idx)),
                    Some(_) => Err("carriage return not followed by line feed".to_string()),
                    None => Ok(None),
                };
            }
            b'\n' => return Err("line feed without carriage return".to_string()),
            _ => {}
        }
    }
    Ok(None)
}

fn text(line: &[u8]) -> String {
    String::from_utf8_lossy(line).into_owned()
}

/// Strict decimal parse: optional leading `-`, at least one digit, no
/// leading zeros, no `-0`, no overflow
fn parse_i64(data: &[u8]) -> Option<i64> {
    let (negative, digits) = match data.split_first() {
        Some((b'-', rest)) => (true, rest),
        _ => (false, data),
    };
    match digits {
        [] => return None,
        [b'0', _, ..] => return None,
        [b'0'] if negative => return None,
        _ => {}
    }

    let mut value: i64 = 0;
    for &b in digits {
        if !b.is_ascii_digit() {
            return None;
        }
        let digit = (b - b'0') as i64;
        value = value.checked_mul(10)?;
        value = if negative {
            value.checked_sub(digit)?
        } else {
            value.checked_add(digit)?
        };
    }
    Some(value)
}
