use std::time::Duration;

use crate::types::MessageId;

/// Errors that can occur while encoding, decoding, reading or writing messages.
#[derive(Debug, thiserror::Error)]
pub enum MessageError {
    /// The bytes are not parseable as a JSON document.
    #[error("message is not valid JSON: {0}")]
    Decode(#[source] serde_json::Error),

    /// The envelope could not be serialized.
    #[error("failed to encode message: {0}")]
    Encode(#[source] serde_json::Error),

    /// A loosely typed payload matched none of the known payload shapes.
    #[error("unsupported payload: {0}")]
    UnsupportedPayload(String),

    /// The encoded message does not fit in a single read on the receiving side.
    #[error("message too large ({size} bytes, max {max})")]
    MessageTooLarge { size: usize, max: usize },

    /// No bytes arrived before the read timeout expired.
    #[error("read timed out")]
    TimedOut,

    /// The remote side closed the stream.
    #[error("connection closed by peer")]
    ConnectionClosed,

    /// An I/O error occurred while reading or writing messages.
    #[error("message I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The transport rejected a socket option.
    #[error(transparent)]
    Transport(#[from] trackwire_transport::TransportError),
}

pub type Result<T> = std::result::Result<T, MessageError>;

/// Violations of the single-assignment contract of a [`crate::MessageFuture`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FutureError {
    /// The future already holds a result.
    #[error("reply for message {origin_id} has already been set")]
    AlreadySet { origin_id: MessageId },

    /// Another writer held the completion guard for longer than allowed.
    #[error("could not acquire completion guard for message {origin_id} within {waited:?}")]
    Contended {
        origin_id: MessageId,
        waited: Duration,
    },

    /// The result was read before any writer completed the future.
    #[error("reply for message {origin_id} has not been set")]
    NotSet { origin_id: MessageId },
}
