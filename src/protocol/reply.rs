//! Reply definitions
//!
//! Represents replies read back from the server.

use std::fmt;

use bytes::Bytes;

/// A single decoded reply frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyFrame {
    /// `+OK` style status line
    Status(String),

    /// `-ERR ...` error line
    Error(String),

    /// `$` bulk string, `None` for `$-1`
    Bulk(Option<Bytes>),

    /// `:123` integer
    Integer(i64),
}

impl ReplyFrame {
    /// True for `+OK`
    pub fn is_ok(&self) -> bool {
        matches!(self, ReplyFrame::Status(text) if text == "OK")
    }

    /// Short name of the reply type, used in error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            ReplyFrame::Status(_) => "status",
            ReplyFrame::Error(_) => "error",
            ReplyFrame::Bulk(Some(_)) => "bulk",
            ReplyFrame::Bulk(None) => "null bulk",
            ReplyFrame::Integer(_) => "integer",
        }
    }
}

impl fmt::Display for ReplyFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReplyFrame::Status(text) => write!(f, "+{}", text),
            ReplyFrame::Error(text) => write!(f, "-{}", text),
            ReplyFrame::Bulk(Some(data)) => write!(f, "${}", data.len()),
            ReplyFrame::Bulk(None) => write!(f, "$-1"),
            ReplyFrame::Integer(value) => write!(f, ":{}", value),
        }
    }
}
