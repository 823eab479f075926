//! Error types for channel setup and message transfer.

use std::fmt;
use std::io;

/// Errors from opening a channel endpoint.
#[derive(Debug)]
pub enum OpenError {
    /// Creating or mapping one of the channel's named objects failed.
    Io(io::Error),
    /// An existing channel page's size disagrees with this process's page
    /// size. The peers would compute different window sizes and corrupt each
    /// other's framing, so the channel cannot be joined.
    SizeMismatch { expected: usize, found: usize },
}

impl fmt::Display for OpenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "channel object setup failed: {e}"),
            Self::SizeMismatch { expected, found } => {
                write!(
                    f,
                    "channel page size mismatch: this process uses {expected} bytes, peer created {found}"
                )
            }
        }
    }
}

impl std::error::Error for OpenError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::SizeMismatch { .. } => None,
        }
    }
}

impl From<io::Error> for OpenError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

/// Errors from [`Sender::send_message`](crate::Sender::send_message).
#[derive(Debug)]
pub enum SendError {
    /// The sender was disposed; no further messages can be sent.
    Disposed,
    /// The user callback failed. The message was terminated with an empty
    /// final chunk, so the peer observed an aborted (empty or truncated)
    /// message, and the handshake completed normally.
    Callback(io::Error),
}

impl fmt::Display for SendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disposed => write!(f, "sender used after dispose"),
            Self::Callback(e) => write!(f, "send callback failed: {e}"),
        }
    }
}

impl std::error::Error for SendError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Disposed => None,
            Self::Callback(e) => Some(e),
        }
    }
}

/// Errors from [`Receiver::receive_message`](crate::Receiver::receive_message).
#[derive(Debug)]
pub enum ReceiveError {
    /// The receiver was disposed; no further messages can be received.
    Disposed,
    /// The user callback failed. The message-complete signal was withheld,
    /// so the peer's sender stays blocked and the channel is unusable; both
    /// peers must tear down.
    Callback(io::Error),
}

impl fmt::Display for ReceiveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disposed => write!(f, "receiver used after dispose"),
            Self::Callback(e) => write!(f, "receive callback failed: {e}"),
        }
    }
}

impl std::error::Error for ReceiveError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Disposed => None,
            Self::Callback(e) => Some(e),
        }
    }
}
