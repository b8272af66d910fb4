//! Typed request, reply and data messaging for multi-camera tracking peers.
//!
//! Cameras report track observations and sensor descriptions to a
//! coordinator, which exchanges requests, acknowledgments and replies with
//! them over one persistent socket per connection. Every message is a single
//! JSON envelope; malformed input is answered with a negative acknowledgment
//! instead of an error.
//!
//! # Crate Structure
//!
//! - [`transport`]: TCP and Unix domain socket connections
//! - [`message`]: Envelope types, identifiers, reply futures and the codec
//! - [`schema`]: Structural validation and decoding of envelopes
//! - [`peer`]: Preparation, reception and connected peers (behind `peer` feature)

/// Re-export transport types.
pub mod transport {
    pub use trackwire_transport::*;
}

/// Re-export message types.
pub mod message {
    pub use trackwire_message::*;
}

/// Re-export schema types.
pub mod schema {
    pub use trackwire_schema::*;
}

/// Re-export peer types (requires `peer` feature).
#[cfg(feature = "peer")]
pub mod peer {
    pub use trackwire_peer::*;
}
