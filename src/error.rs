//! Error types for the reader
//!
//! Every failure surfaces as one of four kinds:
//! - Stream: the underlying byte source failed a read or seek
//! - MalformedInput: the bytes violate the accepted XML subset
//! - InvalidArgument: the caller passed a rejected value
//! - Logic: the caller violated the pull protocol

use std::error;
use std::fmt;
use std::io;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Reader failure.
///
/// A raised error leaves the stream position undefined; the reader must be
/// discarded afterwards.
#[derive(Debug)]
pub enum Error {
    /// Underlying I/O failed (bad read, failed seek).
    Stream(io::Error),
    /// Input bytes violate the accepted XML subset (missing terminator,
    /// illegal byte in a name, unknown entity, misplaced `?>`, ...).
    MalformedInput(String),
    /// Caller passed an invalid value (e.g. redefinition of a predefined
    /// entity name).
    InvalidArgument(String),
    /// Caller violated the pull protocol (e.g. `next_event` without a prior
    /// truthy `has_next`).
    Logic(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Stream(e) => write!(f, "stream error: {}", e),
            Error::MalformedInput(msg) => write!(f, "malformed input: {}", msg),
            Error::InvalidArgument(msg) => write!(f, "invalid argument: {}", msg),
            Error::Logic(msg) => write!(f, "protocol violation: {}", msg),
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Error::Stream(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Stream(e)
    }
}

impl Error {
    /// True if this is a malformed-input error.
    pub fn is_malformed(&self) -> bool {
        matches!(self, Error::MalformedInput(_))
    }

    /// True if this is a pull-protocol violation.
    pub fn is_logic(&self) -> bool {
        matches!(self, Error::Logic(_))
    }
}
