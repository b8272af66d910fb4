use tracing::{error, warn};
use trackwire_message::{codec, Envelope, MessageError, Payload};
use trackwire_schema::{EnvelopeValidator, SchemaError};

use crate::error::{PeerError, Result};

/// Read and decode one message.
///
/// Returns `Ok(None)` when nothing usable arrived: either the read timed out
/// or the bytes could not be decoded or validated. In the latter case a
/// negative acknowledgment addressed to the id recovered from the raw bytes
/// is passed to `send` first.
///
/// Only a closed or failed connection is an error. A failure returned by
/// `send` while NACKing is propagated as well.
pub fn receive<B, R, S>(
    read_bytes: R,
    validator: &EnvelopeValidator,
    mut send: S,
) -> Result<Option<Envelope>>
where
    B: AsRef<[u8]>,
    R: FnOnce() -> trackwire_message::Result<B>,
    S: FnMut(Payload) -> Result<()>,
{
    let raw = match read_bytes() {
        Ok(raw) => raw,
        Err(MessageError::TimedOut) => return Ok(None),
        Err(err) => {
            let err = PeerError::from(err);
            if err.is_fatal() {
                error!(error = %err, "connection failed while reading");
            }
            return Err(err);
        }
    };
    let raw = raw.as_ref();

    match validator.decode(raw) {
        Ok(envelope) => Ok(Some(envelope)),
        Err(err @ (SchemaError::Decode(_) | SchemaError::Invalid { .. })) => {
            let to = codec::recover_identifier(raw);
            warn!(to, error = %err, bytes = raw.len(), "rejecting malformed message");
            send(Payload::nack(to))?;
            Ok(None)
        }
        Err(err @ SchemaError::CompileFailed(_)) => Err(err.into()),
    }
}
