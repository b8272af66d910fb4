use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::debug;
use trackwire_schema::EnvelopeValidator;
use trackwire_transport::{Endpoint, Listener, TransportError};

use crate::config::PeerConfig;
use crate::error::{PeerError, Result};
use crate::peer::Peer;

/// Listens for and accepts peer connections.
#[derive(Debug)]
pub struct PeerListener {
    listener: Listener,
    validator: Arc<EnvelopeValidator>,
    peer_config: PeerConfig,
    next_peer_id: AtomicU64,
}

impl PeerListener {
    /// Bind to an endpoint with default peer configuration.
    pub fn bind(endpoint: &Endpoint) -> Result<Self> {
        Self::bind_with_config(endpoint, PeerConfig::default())
    }

    /// Bind to an endpoint; accepted peers use `config`.
    pub fn bind_with_config(endpoint: &Endpoint, config: PeerConfig) -> Result<Self> {
        let validator = Arc::new(EnvelopeValidator::with_config(config.validator)?);
        let listener = Listener::bind(endpoint)?;
        debug!(%endpoint, "listening for peers");
        Ok(Self {
            listener,
            validator,
            peer_config: config,
            next_peer_id: AtomicU64::new(1),
        })
    }

    /// Accept the next connection (blocking).
    ///
    /// Peers are labeled `peer-1`, `peer-2`, ... in accept order.
    pub fn accept(&self) -> Result<Peer> {
        let connection = self.listener.accept()?;
        let id = self.next_peer_id.fetch_add(1, Ordering::Relaxed);
        Peer::from_parts(
            format!("peer-{id}"),
            connection,
            Arc::clone(&self.validator),
            self.peer_config,
        )
    }

    /// Accept a waiting connection, or return `None` when there is none.
    ///
    /// Only meaningful after [`set_nonblocking(true)`](Self::set_nonblocking);
    /// a blocking listener waits here just like [`accept`](Self::accept).
    pub fn try_accept(&self) -> Result<Option<Peer>> {
        match self.accept() {
            Ok(peer) => Ok(Some(peer)),
            Err(PeerError::Transport(TransportError::Accept(err)))
                if err.kind() == io::ErrorKind::WouldBlock =>
            {
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    pub fn set_nonblocking(&self, nonblocking: bool) -> Result<()> {
        Ok(self.listener.set_nonblocking(nonblocking)?)
    }

    /// The endpoint actually bound, including an OS-assigned TCP port.
    pub fn local_endpoint(&self) -> Result<Endpoint> {
        Ok(self.listener.local_endpoint()?)
    }

    pub fn peer_config(&self) -> &PeerConfig {
        &self.peer_config
    }
}
