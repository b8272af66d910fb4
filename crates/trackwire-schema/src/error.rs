use trackwire_message::MessageError;

/// Errors that can occur while decoding and validating envelopes.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    /// The document is JSON but does not have the shape of an envelope.
    #[error("invalid message at '{path}': {reason}")]
    Invalid {
        reason: String,
        /// JSON pointer to the offending member; empty for the document root.
        path: String,
    },

    /// The bytes are not a JSON document.
    #[error(transparent)]
    Decode(#[from] MessageError),

    /// The envelope schema could not be compiled.
    #[error("failed to compile schema: {0}")]
    CompileFailed(String),
}

impl SchemaError {
    /// JSON pointer of the offending member for [`SchemaError::Invalid`].
    pub fn path(&self) -> Option<&str> {
        match self {
            SchemaError::Invalid { path, .. } => Some(path),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, SchemaError>;
