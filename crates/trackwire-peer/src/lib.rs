//! Request/reply messaging between trackwire peers.
//!
//! [`prepare`] stamps outgoing payloads and hands a [`MessageFuture`] to a
//! pending registry for everything except acknowledgments. [`receive`] reads
//! one message, answers malformed input with a negative acknowledgment, and
//! only fails when the connection itself is gone.
//!
//! [`Peer`] wires both onto a live connection with a [`PendingRegistry`],
//! so replies complete the futures of the requests they answer.
//!
//! [`MessageFuture`]: trackwire_message::MessageFuture

pub mod config;
pub mod connector;
pub mod error;
pub mod inbound;
pub mod listener;
pub mod outbound;
pub mod peer;
pub mod pending;

pub use config::{PeerConfig, DEFAULT_REQUEST_TIMEOUT};
pub use connector::{connect, connect_with_config};
pub use error::{PeerError, Result};
pub use inbound::receive;
pub use listener::PeerListener;
pub use outbound::{prepare, prepare_value};
pub use peer::{Peer, PeerSender};
pub use pending::PendingRegistry;
