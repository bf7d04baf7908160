//! Protocol Module
//!
//! Pure encoding and decoding of the RESP2 subset used by the client. No I/O
//! happens here.
//!
//! ## Commands
//! - GET  key
//! - SET  key value
//! - AUTH password
//!
//! Every command goes out as an array of bulk strings, so keys and values may
//! contain spaces, CR/LF or any other byte.
//!
//! ## Replies
//! - `+` status, `-` error, `:` integer, `$` bulk (`$-1` = absent)
//!
//! Decoding distinguishes "need more bytes" from "protocol violation" so the
//! connection knows whether to read again or tear down.

mod command;
mod reply;
mod codec;

pub use command::{Command, CommandType};
pub use reply::ReplyFrame;
pub use codec::{decode, encode, encode_command, Decoded, CRLF, MAX_BULK_LENGTH, MAX_LINE_LENGTH};
