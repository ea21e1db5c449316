//! Error types for the laser-string library.
//!
//! Every fallible operation in the crate returns [`Error`]. Encoding problems
//! ([`Error::UnknownColor`], [`Error::ProtocolRange`], [`Error::EmptyFrame`])
//! are detected before any network I/O happens, so a known-bad frame never
//! reaches the wire. [`Error::Transport`] is the only kind worth retrying.

use std::fmt;
use std::io;

use thiserror::Error;

/// Result type alias for laser-string operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Single-byte header fields of a write frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameField {
    Delay,
    StartIndex,
    LightCount,
}

impl fmt::Display for FrameField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FrameField::Delay => "delay",
            FrameField::StartIndex => "start index",
            FrameField::LightCount => "light count",
        };
        write!(f, "{}", name)
    }
}

/// What the link was doing when the transport failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportAction {
    Connect,
    Write,
    Close,
}

impl fmt::Display for TransportAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let action = match self {
            TransportAction::Connect => "connect to",
            TransportAction::Write => "write to",
            TransportAction::Close => "close",
        };
        write!(f, "{}", action)
    }
}

/// Error types that can occur while building or sending frames.
#[derive(Error, Debug)]
pub enum Error {
    /// The token is neither a known color name nor a hex color string.
    #[error("Unknown color {0:?}: expected a color name or a hex string like #RRGGBB")]
    UnknownColor(String),

    /// A header field does not fit in its single byte.
    #[error("Protocol range error: {field} {value} does not fit in one byte (max 255)")]
    ProtocolRange { field: FrameField, value: usize },

    /// No color tokens were supplied.
    #[error("A frame needs at least one color")]
    EmptyFrame,

    /// Bytes that do not form a valid write frame.
    #[error("Malformed frame: {0}")]
    MalformedFrame(String),

    /// Socket connect, write or close failure, including timeouts.
    #[error("Transport error: failed to {action} {endpoint}: {source}")]
    Transport {
        action: TransportAction,
        endpoint: String,
        #[source]
        source: io::Error,
    },
}

impl Error {
    pub(crate) fn transport(action: TransportAction, endpoint: &str, source: io::Error) -> Self {
        Error::Transport {
            action,
            endpoint: endpoint.to_string(),
            source,
        }
    }

    pub(crate) fn timed_out(action: TransportAction, endpoint: &str) -> Self {
        Self::transport(
            action,
            endpoint,
            io::Error::new(io::ErrorKind::TimedOut, "operation timed out"),
        )
    }

    /// Only transport failures may succeed when repeated; everything else is a
    /// caller bug or bad input.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Transport { .. })
    }

    /// The I/O error kind behind a transport failure.
    pub fn io_kind(&self) -> Option<io::ErrorKind> {
        match self {
            Error::Transport { source, .. } => Some(source.kind()),
            _ => None,
        }
    }
}
