use std::net::{SocketAddr, TcpListener, TcpStream};

use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::stream::Connection;

/// TCP transport.
///
/// Camera clients usually sit on other hosts, so TCP is the default
/// transport. Nagle is disabled on every stream: messages are small and a
/// single write is expected to reach the peer as a single read.
pub struct TcpSocket {
    listener: TcpListener,
}

impl TcpSocket {
    /// Bind and listen on `host:port`.
    pub fn bind(address: &str) -> Result<Self> {
        let listener = TcpListener::bind(address).map_err(|source| TransportError::Bind {
            endpoint: format!("tcp://{address}"),
            source,
        })?;
        info!(
            address = %listener.local_addr().map(|a| a.to_string()).unwrap_or_default(),
            "listening on tcp"
        );
        Ok(Self { listener })
    }

    /// Accept an incoming connection.
    ///
    /// Blocks unless the socket was put into nonblocking mode. Accepted
    /// streams are always blocking.
    pub fn accept(&self) -> Result<Connection> {
        let (stream, addr) = self.listener.accept().map_err(TransportError::Accept)?;
        stream.set_nonblocking(false)?;
        stream.set_nodelay(true)?;
        debug!(%addr, "accepted tcp connection");
        Ok(Connection::from_tcp(stream))
    }

    /// Connect to a listening TCP socket (blocking).
    pub fn connect(address: &str) -> Result<Connection> {
        let stream = TcpStream::connect(address).map_err(|source| TransportError::Connect {
            endpoint: format!("tcp://{address}"),
            source,
        })?;
        stream.set_nodelay(true)?;
        debug!(%address, "connected over tcp");
        Ok(Connection::from_tcp(stream))
    }

    pub fn set_nonblocking(&self, nonblocking: bool) -> Result<()> {
        self.listener.set_nonblocking(nonblocking).map_err(Into::into)
    }

    /// Locally bound address.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener.local_addr().map_err(Into::into)
    }
}
