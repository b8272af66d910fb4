use std::io::{ErrorKind, Read};
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use trackwire_transport::Connection;

use crate::error::{MessageError, Result};

/// Default size of a single message read, in bytes.
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 2048;

/// Per-stream message I/O settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamConfig {
    /// Upper bound on one encoded message. Reads are issued with a buffer
    /// of this size and the writer refuses to send anything larger.
    pub max_message_size: usize,
    /// How long a read may block before it reports [`MessageError::TimedOut`].
    pub read_timeout: Option<Duration>,
    /// How long a write may block before it reports [`MessageError::TimedOut`].
    pub write_timeout: Option<Duration>,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            read_timeout: None,
            write_timeout: None,
        }
    }
}

/// Reads one message per socket read from any `Read` stream.
///
/// The returned bytes are whatever that read delivered. They are not checked
/// for completeness or parsed here.
pub struct MessageReader<T> {
    inner: T,
    config: StreamConfig,
}

impl<T: Read> MessageReader<T> {
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, StreamConfig::default())
    }

    pub fn with_config(inner: T, config: StreamConfig) -> Self {
        Self { inner, config }
    }

    /// Read the next message (blocking).
    ///
    /// Returns `Err(MessageError::ConnectionClosed)` at end of stream and
    /// `Err(MessageError::TimedOut)` when the read timeout expires.
    pub fn read_message(&mut self) -> Result<Bytes> {
        let mut buf = BytesMut::zeroed(self.config.max_message_size.max(1));
        loop {
            match self.inner.read(&mut buf) {
                Ok(0) => return Err(MessageError::ConnectionClosed),
                Ok(n) => {
                    buf.truncate(n);
                    return Ok(buf.freeze());
                }
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                    return Err(MessageError::TimedOut)
                }
                Err(err) => return Err(MessageError::Io(err)),
            }
        }
    }

    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    pub fn into_inner(self) -> T {
        self.inner
    }

    pub fn config(&self) -> &StreamConfig {
        &self.config
    }
}

impl MessageReader<Connection> {
    /// Create a reader for a [`Connection`] and apply the read timeout from config.
    pub fn with_config_stream(inner: Connection, config: StreamConfig) -> Result<Self> {
        inner.set_read_timeout(config.read_timeout)?;
        Ok(Self::with_config(inner, config))
    }
}
