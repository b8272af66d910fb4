//! Envelope types and the JSON message codec for trackwire.
//!
//! Every message on the wire is one JSON object:
//!
//! ```text
//! {"type": "req" | "ack" | "repl" | "data", "id": <int>, "time": <float>, "data": {...}}
//! ```
//!
//! There is no length prefix or delimiter. A single socket read is expected
//! to carry exactly one encoded message, so the reader here performs one
//! bounded read per message and leaves malformed input to the layers above.

pub mod codec;
pub mod error;
pub mod future;
pub mod id;
pub mod kind;
pub mod reader;
pub mod types;
pub mod writer;

pub use codec::{encode, encode_into, parse, recover_identifier, ID_MARKER};
pub use error::{FutureError, MessageError, Result};
pub use future::MessageFuture;
pub use id::{unix_time_now, DeviceIdentity, IdAllocator};
pub use kind::{MessageKind, ReportKind};
pub use reader::{MessageReader, StreamConfig, DEFAULT_MAX_MESSAGE_SIZE};
pub use types::{
    Acknowledge, CamAngle, CamAngle3D, DataReport, Envelope, MessageId, Payload, Reply, Request,
    SensorInfo, TrackResult2D, TrackResult3D, UNKNOWN_ID,
};
pub use writer::MessageWriter;
