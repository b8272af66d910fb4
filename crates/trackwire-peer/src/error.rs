use trackwire_message::{FutureError, MessageError};

/// Errors that can occur in peer operations.
#[derive(Debug, thiserror::Error)]
pub enum PeerError {
    /// Fatal transport failure. The connection cannot be used any further.
    #[error("transport error: {0}")]
    Transport(#[from] trackwire_transport::TransportError),

    /// The remote side closed the connection.
    #[error("peer disconnected: {0}")]
    Disconnected(String),

    /// The payload matches none of the known message shapes.
    #[error("unsupported payload: {0}")]
    UnsupportedPayload(String),

    /// Message-level error while encoding or writing.
    #[error("message error: {0}")]
    Message(MessageError),

    /// A pending reply was completed twice or read before completion.
    #[error("reply correlation error: {0}")]
    Future(#[from] FutureError),

    /// The envelope validator could not be built.
    #[error("schema error: {0}")]
    Schema(#[from] trackwire_schema::SchemaError),

    /// Request timed out.
    #[error("request timed out after {0:?}")]
    Timeout(std::time::Duration),
}

impl PeerError {
    /// Whether the connection must be abandoned after this error.
    pub fn is_fatal(&self) -> bool {
        matches!(self, PeerError::Transport(_) | PeerError::Disconnected(_))
    }
}

impl From<MessageError> for PeerError {
    fn from(err: MessageError) -> Self {
        match err {
            MessageError::ConnectionClosed => {
                PeerError::Disconnected("connection closed by peer".to_string())
            }
            MessageError::Io(io) => PeerError::Transport(io.into()),
            MessageError::Transport(transport) => PeerError::Transport(transport),
            MessageError::UnsupportedPayload(reason) => PeerError::UnsupportedPayload(reason),
            other => PeerError::Message(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, PeerError>;
