use std::time::Duration;

use trackwire_message::{DeviceIdentity, StreamConfig};
use trackwire_schema::ValidatorConfig;

/// How long [`crate::Peer::request`] waits for a reply by default.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Peer behavior configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeerConfig {
    /// Read size and socket timeouts. A read timeout lets [`crate::Peer::recv`]
    /// return periodically with no message instead of blocking.
    pub stream: StreamConfig,
    /// Leniency of inbound validation.
    pub validator: ValidatorConfig,
    /// Upper bound on waiting for a reply in [`crate::Peer::request`].
    pub request_timeout: Duration,
    /// Identity mixed into message ids. Detected once per process when unset.
    pub device: Option<DeviceIdentity>,
}

impl Default for PeerConfig {
    fn default() -> Self {
        Self {
            stream: StreamConfig::default(),
            validator: ValidatorConfig::default(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            device: None,
        }
    }
}
