//! Message discriminants.
//!
//! The top-level `type` tag of an envelope and the nested `type` tag of a
//! `data` report. Both are derived from the payload variant and never set
//! independently.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Top-level envelope discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    /// A named request for information.
    Req,
    /// Positive or negative acknowledgment of an earlier message.
    Ack,
    /// Reply carrying data for an earlier request.
    Repl,
    /// Unsolicited tracking or sensor report.
    Data,
}

impl MessageKind {
    /// Wire tag.
    pub fn tag(self) -> &'static str {
        match self {
            MessageKind::Req => "req",
            MessageKind::Ack => "ack",
            MessageKind::Repl => "repl",
            MessageKind::Data => "data",
        }
    }

    /// Whether a message of this kind expects a reply or acknowledgment.
    pub fn awaits_reply(self) -> bool {
        !matches!(self, MessageKind::Ack)
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Nested discriminant of a `data` envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReportKind {
    TrackResult2D,
    TrackResult3D,
    SensorInfo,
}

impl ReportKind {
    /// Wire tag.
    pub fn tag(self) -> &'static str {
        match self {
            ReportKind::TrackResult2D => "tres",
            ReportKind::TrackResult3D => "tres3",
            ReportKind::SensorInfo => "sinf",
        }
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}
