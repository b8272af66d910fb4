//! Blocking socket transport for trackwire peers.
//!
//! Cameras and the coordinator talk over one persistent stream socket per
//! connection. This crate hides whether that socket is TCP or a Unix domain
//! socket behind a single [`Connection`] type, and parses the textual
//! [`Endpoint`] form used on the command line.
//!
//! This is the lowest layer of trackwire. It knows nothing about messages.

pub mod endpoint;
pub mod error;
pub mod stream;
pub mod tcp;

#[cfg(unix)]
pub mod uds;

pub use endpoint::Endpoint;
pub use error::{Result, TransportError};
pub use stream::{connect, Connection, Listener};

#[cfg(unix)]
pub use uds::UnixDomainSocket;
