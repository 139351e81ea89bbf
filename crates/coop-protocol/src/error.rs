//! Error types for frame parsing and encoding

use thiserror::Error;

/// Errors that can occur while parsing a frame
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// A required field is absent
    #[error("missing field {index}")]
    MissingField { index: usize },

    /// First field is not a known message kind
    #[error("unknown message kind: {0}")]
    UnknownKind(String),

    /// Position field is not a decimal integer
    #[error("invalid position: {0:?}")]
    InvalidPosition(String),

    /// Owner field is empty
    #[error("empty controller id")]
    EmptyOwner,

    /// Payload is not valid UTF-8
    #[error("payload is not valid UTF-8")]
    InvalidUtf8,

    /// Unterminated payload grew past the frame limit
    #[error("frame too long: {0} bytes")]
    FrameTooLong(usize),
}

/// Higher-level protocol errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Parse error
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// Outbound frame would not fit the radio payload
    #[error("outbound frame too long: {0} bytes")]
    Oversized(usize),
}
