use std::io::{Read, Write};
use std::net::{Shutdown, TcpStream};
use std::time::Duration;

use tracing::debug;

use crate::endpoint::Endpoint;
use crate::error::Result;
#[cfg(not(unix))]
use crate::error::TransportError;
use crate::tcp::TcpSocket;

/// A connected socket, TCP or Unix domain. Implements `Read` and `Write`.
///
/// On every platform this may wrap a TCP stream. On Unix it may also wrap a
/// Unix domain socket stream.
pub struct Connection {
    inner: ConnectionInner,
}

enum ConnectionInner {
    Tcp(TcpStream),
    #[cfg(unix)]
    Unix(std::os::unix::net::UnixStream),
}

impl Read for Connection {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            ConnectionInner::Tcp(stream) => stream.read(buf),
            #[cfg(unix)]
            ConnectionInner::Unix(stream) => stream.read(buf),
        }
    }
}

impl Write for Connection {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            ConnectionInner::Tcp(stream) => stream.write(buf),
            #[cfg(unix)]
            ConnectionInner::Unix(stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match &mut self.inner {
            ConnectionInner::Tcp(stream) => stream.flush(),
            #[cfg(unix)]
            ConnectionInner::Unix(stream) => stream.flush(),
        }
    }
}

impl Connection {
    pub(crate) fn from_tcp(stream: TcpStream) -> Self {
        Self {
            inner: ConnectionInner::Tcp(stream),
        }
    }

    #[cfg(unix)]
    pub(crate) fn from_unix(stream: std::os::unix::net::UnixStream) -> Self {
        Self {
            inner: ConnectionInner::Unix(stream),
        }
    }

    /// Set read timeout on the underlying socket.
    ///
    /// A blocked read that hits the timeout fails with `WouldBlock` or
    /// `TimedOut` depending on the platform.
    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        match &self.inner {
            ConnectionInner::Tcp(stream) => stream.set_read_timeout(timeout).map_err(Into::into),
            #[cfg(unix)]
            ConnectionInner::Unix(stream) => stream.set_read_timeout(timeout).map_err(Into::into),
        }
    }

    /// Set write timeout on the underlying socket.
    pub fn set_write_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        match &self.inner {
            ConnectionInner::Tcp(stream) => stream.set_write_timeout(timeout).map_err(Into::into),
            #[cfg(unix)]
            ConnectionInner::Unix(stream) => stream.set_write_timeout(timeout).map_err(Into::into),
        }
    }

    /// Duplicate the socket handle so reads and writes can live on separate owners.
    pub fn try_clone(&self) -> Result<Self> {
        match &self.inner {
            ConnectionInner::Tcp(stream) => Ok(Self::from_tcp(stream.try_clone()?)),
            #[cfg(unix)]
            ConnectionInner::Unix(stream) => Ok(Self::from_unix(stream.try_clone()?)),
        }
    }

    /// Shut down both directions of the socket.
    pub fn shutdown(&self) -> Result<()> {
        match &self.inner {
            ConnectionInner::Tcp(stream) => stream.shutdown(Shutdown::Both).map_err(Into::into),
            #[cfg(unix)]
            ConnectionInner::Unix(stream) => stream.shutdown(Shutdown::Both).map_err(Into::into),
        }
    }

    /// Human-readable description of the remote side, used in logs.
    pub fn peer_label(&self) -> String {
        match &self.inner {
            ConnectionInner::Tcp(stream) => stream
                .peer_addr()
                .map(|addr| format!("tcp://{addr}"))
                .unwrap_or_else(|_| "tcp://<unknown>".to_string()),
            #[cfg(unix)]
            ConnectionInner::Unix(_) => "unix://<peer>".to_string(),
        }
    }
}

impl From<TcpStream> for Connection {
    fn from(stream: TcpStream) -> Self {
        Self::from_tcp(stream)
    }
}

#[cfg(unix)]
impl From<std::os::unix::net::UnixStream> for Connection {
    fn from(stream: std::os::unix::net::UnixStream) -> Self {
        Self::from_unix(stream)
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.inner {
            ConnectionInner::Tcp(_) => f.debug_struct("Connection").field("type", &"tcp").finish(),
            #[cfg(unix)]
            ConnectionInner::Unix(_) => f.debug_struct("Connection").field("type", &"unix").finish(),
        }
    }
}

/// Connect to a listening endpoint (blocking).
pub fn connect(endpoint: &Endpoint) -> Result<Connection> {
    match endpoint {
        Endpoint::Tcp(address) => TcpSocket::connect(address),
        #[cfg(unix)]
        Endpoint::Unix(path) => crate::uds::UnixDomainSocket::connect(path),
        #[cfg(not(unix))]
        Endpoint::Unix(path) => Err(TransportError::Connect {
            endpoint: endpoint.to_string(),
            source: std::io::Error::new(
                std::io::ErrorKind::Unsupported,
                format!("unix domain sockets are unavailable here: {}", path.display()),
            ),
        }),
    }
}

/// A bound listening socket for either transport.
pub enum Listener {
    Tcp(TcpSocket),
    #[cfg(unix)]
    Unix(crate::uds::UnixDomainSocket),
}

impl Listener {
    /// Bind and listen on an endpoint.
    pub fn bind(endpoint: &Endpoint) -> Result<Self> {
        match endpoint {
            Endpoint::Tcp(address) => Ok(Listener::Tcp(TcpSocket::bind(address)?)),
            #[cfg(unix)]
            Endpoint::Unix(path) => Ok(Listener::Unix(crate::uds::UnixDomainSocket::bind(path)?)),
            #[cfg(not(unix))]
            Endpoint::Unix(_) => Err(TransportError::Bind {
                endpoint: endpoint.to_string(),
                source: std::io::Error::new(
                    std::io::ErrorKind::Unsupported,
                    "unix domain sockets are unavailable on this platform",
                ),
            }),
        }
    }

    /// Accept an incoming connection.
    ///
    /// In nonblocking mode this fails with [`TransportError::Accept`](crate::TransportError::Accept)
    /// carrying `WouldBlock` when no client is waiting.
    pub fn accept(&self) -> Result<Connection> {
        let connection = match self {
            Listener::Tcp(socket) => socket.accept()?,
            #[cfg(unix)]
            Listener::Unix(socket) => socket.accept()?,
        };
        debug!(peer = %connection.peer_label(), "accepted connection");
        Ok(connection)
    }

    /// Switch accepting between blocking and nonblocking mode.
    pub fn set_nonblocking(&self, nonblocking: bool) -> Result<()> {
        match self {
            Listener::Tcp(socket) => socket.set_nonblocking(nonblocking),
            #[cfg(unix)]
            Listener::Unix(socket) => socket.set_nonblocking(nonblocking),
        }
    }

    /// The endpoint this listener is actually bound to.
    ///
    /// For TCP this reflects the OS-assigned port when binding to port 0.
    pub fn local_endpoint(&self) -> Result<Endpoint> {
        match self {
            Listener::Tcp(socket) => Ok(Endpoint::Tcp(socket.local_addr()?.to_string())),
            #[cfg(unix)]
            Listener::Unix(socket) => Ok(Endpoint::Unix(socket.path().to_path_buf())),
        }
    }
}

impl std::fmt::Debug for Listener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Listener::Tcp(_) => f.debug_struct("Listener").field("type", &"tcp").finish(),
            #[cfg(unix)]
            Listener::Unix(socket) => f
                .debug_struct("Listener")
                .field("type", &"unix")
                .field("path", &socket.path())
                .finish(),
        }
    }
}
