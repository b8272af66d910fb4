use std::sync::Arc;

use trackwire_schema::EnvelopeValidator;
use trackwire_transport::Endpoint;

use crate::config::PeerConfig;
use crate::error::Result;
use crate::peer::Peer;

/// Connect to a listening peer.
pub fn connect(endpoint: &Endpoint) -> Result<Peer> {
    connect_with_config(endpoint, PeerConfig::default())
}

/// Connect with explicit configuration.
pub fn connect_with_config(endpoint: &Endpoint, config: PeerConfig) -> Result<Peer> {
    let validator = Arc::new(EnvelopeValidator::with_config(config.validator)?);
    let connection = trackwire_transport::connect(endpoint)?;
    Peer::from_parts(endpoint.to_string(), connection, validator, config)
}
