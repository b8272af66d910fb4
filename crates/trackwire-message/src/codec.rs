use bytes::{BufMut, BytesMut};
use serde_json::Value;
use tracing::trace;

use crate::error::{MessageError, Result};
use crate::types::{Envelope, MessageId, UNKNOWN_ID};

/// Text marker scanned for when an identifier must be recovered from input
/// that is not valid JSON.
pub const ID_MARKER: &str = "\"id\":";

/// Encode an envelope as one compact JSON document.
pub fn encode(envelope: &Envelope) -> Result<Vec<u8>> {
    serde_json::to_vec(envelope).map_err(MessageError::Encode)
}

/// Encode an envelope, appending to `dst`.
pub fn encode_into(envelope: &Envelope, dst: &mut BytesMut) -> Result<()> {
    serde_json::to_writer(dst.writer(), envelope).map_err(MessageError::Encode)
}

/// Parse raw bytes as an untyped JSON document.
///
/// Structural checks belong to the schema layer; this only rejects input
/// that is not JSON at all.
pub fn parse(raw: &[u8]) -> Result<Value> {
    serde_json::from_slice(raw).map_err(MessageError::Decode)
}

/// Best-effort extraction of the sender's identifier from a message that
/// failed to decode or validate.
///
/// A parseable document with an integer `id` yields that id. Otherwise the
/// text after the first [`ID_MARKER`] is scanned, skipping whitespace, for a
/// run of ASCII digits. Anything else, including a run too long for
/// [`MessageId`], yields [`UNKNOWN_ID`]. Never fails.
pub fn recover_identifier(raw: &[u8]) -> MessageId {
    if let Ok(value) = serde_json::from_slice::<Value>(raw) {
        if let Some(id) = value.get("id").and_then(Value::as_i64) {
            trace!(id, "recovered id from JSON document");
            return id;
        }
    }

    let text = String::from_utf8_lossy(raw);
    let Some(start) = text.find(ID_MARKER) else {
        trace!("no id marker in message");
        return UNKNOWN_ID;
    };
    let rest = text[start + ID_MARKER.len()..].trim_start();
    let digits_len = rest
        .bytes()
        .take_while(|byte| byte.is_ascii_digit())
        .count();

    match rest[..digits_len].parse::<MessageId>() {
        Ok(id) => {
            trace!(id, "recovered id from message text");
            id
        }
        Err(_) => {
            trace!(digits = digits_len, "id marker not followed by a usable number");
            UNKNOWN_ID
        }
    }
}
