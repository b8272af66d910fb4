use std::io::{ErrorKind, Write};

use bytes::BytesMut;
use tracing::trace;
use trackwire_transport::Connection;

use crate::codec::encode_into;
use crate::error::{MessageError, Result};
use crate::reader::StreamConfig;
use crate::types::Envelope;

/// Writes encoded envelopes to any `Write` stream.
pub struct MessageWriter<T> {
    inner: T,
    buf: BytesMut,
    config: StreamConfig,
}

impl<T: Write> MessageWriter<T> {
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, StreamConfig::default())
    }

    pub fn with_config(inner: T, config: StreamConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(config.max_message_size),
            config,
        }
    }

    /// Encode and send one envelope (blocking).
    ///
    /// Messages larger than `max_message_size` are refused before anything
    /// is written, since the receiving side would split them across reads.
    pub fn send(&mut self, envelope: &Envelope) -> Result<()> {
        self.buf.clear();
        encode_into(envelope, &mut self.buf)?;
        if self.buf.len() > self.config.max_message_size {
            return Err(MessageError::MessageTooLarge {
                size: self.buf.len(),
                max: self.config.max_message_size,
            });
        }

        trace!(
            id = envelope.id,
            kind = %envelope.kind(),
            bytes = self.buf.len(),
            "sending message"
        );
        write_all(&mut self.inner, &self.buf)?;
        self.flush()
    }

    /// Send bytes exactly as given, without encoding or size checks.
    pub fn write_raw(&mut self, bytes: &[u8]) -> Result<()> {
        write_all(&mut self.inner, bytes)?;
        self.flush()
    }

    /// Flush the underlying stream.
    pub fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(write_error(err)),
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

impl MessageWriter<Connection> {
    /// Create a writer for a [`Connection`] and apply the write timeout from config.
    pub fn with_config_stream(inner: Connection, config: StreamConfig) -> Result<Self> {
        inner.set_write_timeout(config.write_timeout)?;
        Ok(Self::with_config(inner, config))
    }
}

fn write_all<W: Write>(inner: &mut W, bytes: &[u8]) -> Result<()> {
    let mut offset = 0usize;
    while offset < bytes.len() {
        match inner.write(&bytes[offset..]) {
            Ok(0) => return Err(MessageError::ConnectionClosed),
            Ok(n) => offset += n,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(write_error(err)),
        }
    }
    Ok(())
}

fn write_error(err: std::io::Error) -> MessageError {
    match err.kind() {
        ErrorKind::WouldBlock | ErrorKind::TimedOut => MessageError::TimedOut,
        ErrorKind::BrokenPipe | ErrorKind::ConnectionReset => MessageError::ConnectionClosed,
        _ => MessageError::Io(err),
    }
}
