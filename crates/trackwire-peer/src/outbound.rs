use std::sync::Arc;

use serde_json::Value;
use tracing::trace;
use trackwire_message::{Envelope, IdAllocator, MessageFuture, Payload};

use crate::error::Result;

/// Stamp a payload with an id and timestamp.
///
/// Every payload except an acknowledgment gets a [`MessageFuture`] whose
/// origin is the returned envelope. That future is passed to
/// `register_pending` exactly once before it is returned, so a reply that
/// races the caller can still find it. Acknowledgments return no future and
/// never call `register_pending`.
pub fn prepare<F>(
    payload: Payload,
    ids: &IdAllocator,
    register_pending: F,
) -> (Envelope, Option<Arc<MessageFuture>>)
where
    F: FnOnce(Arc<MessageFuture>),
{
    let (id, time) = ids.stamp();
    let envelope = Envelope::new(id, time, payload);

    if !envelope.kind().awaits_reply() {
        return (envelope, None);
    }

    let future = Arc::new(MessageFuture::new(envelope.clone()));
    trace!(id, kind = %envelope.kind(), "registering pending reply");
    register_pending(Arc::clone(&future));
    (envelope, Some(future))
}

/// [`prepare`] for a loosely typed payload object.
///
/// Fails with [`crate::PeerError::UnsupportedPayload`] before anything is
/// allocated or registered when the value matches no known payload shape.
pub fn prepare_value<F>(
    payload: Value,
    ids: &IdAllocator,
    register_pending: F,
) -> Result<(Envelope, Option<Arc<MessageFuture>>)>
where
    F: FnOnce(Arc<MessageFuture>),
{
    let payload = Payload::from_value(payload)?;
    Ok(prepare(payload, ids, register_pending))
}
