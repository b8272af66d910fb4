use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::TransportError;

const TCP_SCHEME: &str = "tcp://";
const UNIX_SCHEME: &str = "unix://";

/// Where a peer listens or connects.
///
/// Accepted textual forms:
/// - `tcp://host:port` or bare `host:port`
/// - `unix:///path/to.sock` or a bare filesystem path (anything containing `/`
///   or ending in `.sock`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// TCP socket address in `host:port` form.
    Tcp(String),
    /// Unix domain socket path.
    Unix(PathBuf),
}

impl FromStr for Endpoint {
    type Err = TransportError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let trimmed = input.trim();
        let invalid = |reason: &str| TransportError::InvalidEndpoint {
            input: input.to_string(),
            reason: reason.to_string(),
        };

        if trimmed.is_empty() {
            return Err(invalid("endpoint must not be empty"));
        }

        if let Some(path) = trimmed.strip_prefix(UNIX_SCHEME) {
            if path.is_empty() {
                return Err(invalid("unix endpoint is missing a path"));
            }
            return Ok(Endpoint::Unix(PathBuf::from(path)));
        }

        let (address, explicit_tcp) = match trimmed.strip_prefix(TCP_SCHEME) {
            Some(address) => (address, true),
            None => (trimmed, false),
        };

        if !explicit_tcp && (address.contains('/') || address.ends_with(".sock")) {
            return Ok(Endpoint::Unix(PathBuf::from(address)));
        }

        let (host, port) = address
            .rsplit_once(':')
            .ok_or_else(|| invalid("expected host:port"))?;
        if host.is_empty() {
            return Err(invalid("host must not be empty"));
        }
        port.parse::<u16>()
            .map_err(|_| invalid("port must be a number between 0 and 65535"))?;

        Ok(Endpoint::Tcp(address.to_string()))
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Tcp(address) => write!(f, "{TCP_SCHEME}{address}"),
            Endpoint::Unix(path) => write!(f, "{UNIX_SCHEME}{}", path.display()),
        }
    }
}
