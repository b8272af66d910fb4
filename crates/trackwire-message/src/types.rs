//! Envelope and payload types.
//!
//! [`Payload`] is a closed sum type: the envelope `type` tag is derived from
//! the variant during serialization, so an envelope whose tag disagrees with
//! its payload cannot be constructed in Rust.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{MessageError, Result};
use crate::kind::{MessageKind, ReportKind};

/// Message identifier as carried in the `id` and `to` fields.
pub type MessageId = i64;

/// Identifier used in a negative acknowledgment when the sender's id could
/// not be recovered.
pub const UNKNOWN_ID: MessageId = -1;

/// The outer message wrapper.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub id: MessageId,
    /// Wall-clock send time, seconds since the Unix epoch.
    pub time: f64,
    /// Serialized as the `type` and `data` keys.
    #[serde(flatten)]
    pub payload: Payload,
}

impl Envelope {
    pub fn new(id: MessageId, time: f64, payload: Payload) -> Self {
        Self { id, time, payload }
    }

    /// Top-level discriminant, derived from the payload.
    pub fn kind(&self) -> MessageKind {
        self.payload.kind()
    }

    /// The id this message answers, for acknowledgments and replies.
    pub fn reply_to(&self) -> Option<MessageId> {
        match &self.payload {
            Payload::Ack(ack) => Some(ack.to),
            Payload::Repl(reply) => Some(reply.to),
            Payload::Req(_) | Payload::Data(_) => None,
        }
    }
}

/// Payload variants, tagged on the wire by the envelope `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum Payload {
    Req(Request),
    Ack(Acknowledge),
    Repl(Reply),
    Data(DataReport),
}

impl Payload {
    pub fn kind(&self) -> MessageKind {
        match self {
            Payload::Req(_) => MessageKind::Req,
            Payload::Ack(_) => MessageKind::Ack,
            Payload::Repl(_) => MessageKind::Repl,
            Payload::Data(_) => MessageKind::Data,
        }
    }

    /// Named request.
    pub fn request(req: impl Into<String>) -> Self {
        Payload::Req(Request { req: req.into() })
    }

    /// Positive acknowledgment of `to`.
    pub fn ack(to: MessageId) -> Self {
        Payload::Ack(Acknowledge { to, ack: true })
    }

    /// Negative acknowledgment of `to`; [`UNKNOWN_ID`] when the id is unknown.
    pub fn nack(to: MessageId) -> Self {
        Payload::Ack(Acknowledge { to, ack: false })
    }

    /// Convert loosely typed payload data (the bare `data` object, without
    /// an envelope) into a known payload variant.
    ///
    /// Shapes are tried in the order request, acknowledgment, reply, data
    /// report; the first one whose required fields are all present wins.
    pub fn from_value(value: Value) -> Result<Self> {
        if !value.is_object() {
            return Err(MessageError::UnsupportedPayload(format!(
                "expected a JSON object, got {}",
                json_type_name(&value)
            )));
        }
        serde_json::from_value::<LoosePayload>(value)
            .map(Payload::from)
            .map_err(|_| {
                MessageError::UnsupportedPayload(
                    "object matches none of req, ack, repl or data payload shapes".to_string(),
                )
            })
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LoosePayload {
    Req(Request),
    Ack(Acknowledge),
    Repl(Reply),
    Data(DataReport),
}

impl From<LoosePayload> for Payload {
    fn from(loose: LoosePayload) -> Self {
        match loose {
            LoosePayload::Req(req) => Payload::Req(req),
            LoosePayload::Ack(ack) => Payload::Ack(ack),
            LoosePayload::Repl(repl) => Payload::Repl(repl),
            LoosePayload::Data(data) => Payload::Data(data),
        }
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// `req` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    pub req: String,
}

/// `ack` payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Acknowledge {
    pub to: MessageId,
    pub ack: bool,
}

/// `repl` payload. `data` is opaque to the protocol layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reply {
    pub to: MessageId,
    pub data: Map<String, Value>,
}

/// `data` payload, itself tagged by a nested `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum DataReport {
    #[serde(rename = "tres")]
    TrackResult2D(TrackResult2D),
    #[serde(rename = "tres3")]
    TrackResult3D(TrackResult3D),
    #[serde(rename = "sinf")]
    SensorInfo(SensorInfo),
}

impl DataReport {
    pub fn kind(&self) -> ReportKind {
        match self {
            DataReport::TrackResult2D(_) => ReportKind::TrackResult2D,
            DataReport::TrackResult3D(_) => ReportKind::TrackResult3D,
            DataReport::SensorInfo(_) => ReportKind::SensorInfo,
        }
    }
}

/// Direction to a track as seen by one camera, in image angles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CamAngle {
    pub cam_id: i64,
    pub direction: (f64, f64),
}

/// Per-camera 2D observations of one track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackResult2D {
    pub track_id: i64,
    pub cam_angles: Vec<CamAngle>,
}

/// Camera ray in world space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CamAngle3D {
    pub cam_id: i64,
    pub position: (f64, f64, f64),
    pub direction: (f64, f64, f64),
}

/// Triangulated track position with the rays it was computed from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackResult3D {
    pub track_id: i64,
    pub position: (f64, f64, f64),
    pub cam_angles: Vec<CamAngle3D>,
}

/// Static description of one camera.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorInfo {
    pub id: i64,
    pub position: (f64, f64, f64),
    pub direction: (f64, f64, f64),
    #[serde(rename = "fov")]
    pub field_of_view: (f64, f64),
    pub resolution: (f64, f64),
}
