use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde_json::Value;
use tracing::{debug, warn};
use trackwire_message::{
    DeviceIdentity, Envelope, IdAllocator, MessageFuture, MessageId, MessageReader,
    MessageWriter, Payload,
};
use trackwire_schema::EnvelopeValidator;
use trackwire_transport::Connection;

use crate::config::PeerConfig;
use crate::error::{PeerError, Result};
use crate::inbound::receive;
use crate::outbound::prepare;
use crate::pending::PendingRegistry;

/// A connected peer.
///
/// Reads happen on the peer itself and need `&mut self`. Sends only need
/// `&self` and can also be made from other threads through a [`PeerSender`].
pub struct Peer {
    label: String,
    reader: MessageReader<Connection>,
    sender: PeerSender,
    validator: Arc<EnvelopeValidator>,
    backlog: VecDeque<Envelope>,
    config: PeerConfig,
}

/// Cloneable, thread-safe sending half of a [`Peer`].
#[derive(Clone)]
pub struct PeerSender {
    writer: Arc<Mutex<MessageWriter<Connection>>>,
    ids: IdAllocator,
    pending: Arc<PendingRegistry>,
}

impl Peer {
    pub(crate) fn from_parts(
        label: String,
        connection: Connection,
        validator: Arc<EnvelopeValidator>,
        config: PeerConfig,
    ) -> Result<Self> {
        let reader_stream = connection.try_clone()?;
        let reader = MessageReader::with_config_stream(reader_stream, config.stream)?;
        let writer = MessageWriter::with_config_stream(connection, config.stream)?;
        let device = config.device.unwrap_or_else(DeviceIdentity::process);

        debug!(peer = %label, device = device.value(), "peer ready");
        Ok(Self {
            label,
            reader,
            sender: PeerSender {
                writer: Arc::new(Mutex::new(writer)),
                ids: IdAllocator::new(device),
                pending: Arc::new(PendingRegistry::new()),
            },
            validator,
            backlog: VecDeque::new(),
            config,
        })
    }

    /// Wrap an already connected socket.
    pub fn from_connection(connection: Connection, config: PeerConfig) -> Result<Self> {
        let validator = Arc::new(EnvelopeValidator::with_config(config.validator)?);
        let label = connection.peer_label();
        Self::from_parts(label, connection, validator, config)
    }

    /// Human-readable name of the remote side.
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn config(&self) -> &PeerConfig {
        &self.config
    }

    /// Replies still awaited by messages sent through this peer.
    pub fn pending(&self) -> &PendingRegistry {
        &self.sender.pending
    }

    /// Handle for sending from other threads.
    pub fn sender(&self) -> PeerSender {
        self.sender.clone()
    }

    /// See [`PeerSender::send`].
    pub fn send(&self, payload: Payload) -> Result<(Envelope, Option<Arc<MessageFuture>>)> {
        self.sender.send(payload)
    }

    /// See [`PeerSender::send_value`].
    pub fn send_value(&self, payload: Value) -> Result<(Envelope, Option<Arc<MessageFuture>>)> {
        self.sender.send_value(payload)
    }

    /// See [`PeerSender::acknowledge`].
    pub fn acknowledge(&self, to: MessageId, ok: bool) -> Result<Envelope> {
        self.sender.acknowledge(to, ok)
    }

    /// Receive the next message.
    ///
    /// Returns `Ok(None)` if the read timed out or the message was malformed,
    /// in which case a negative acknowledgment has already been sent. Replies
    /// and acknowledgments complete the matching pending future and are
    /// returned as well.
    pub fn recv(&mut self) -> Result<Option<Envelope>> {
        if let Some(envelope) = self.backlog.pop_front() {
            return Ok(Some(envelope));
        }
        self.receive_one()
    }

    /// Send a payload and wait for the message that answers it, up to the
    /// configured request timeout.
    pub fn request(&mut self, payload: Payload) -> Result<Envelope> {
        self.request_with_timeout(payload, self.config.request_timeout)
    }

    /// Send a payload and wait up to `timeout` for the message that answers it.
    ///
    /// Other messages that arrive meanwhile are kept and returned by later
    /// calls to [`recv`](Self::recv).
    pub fn request_with_timeout(&mut self, payload: Payload, timeout: Duration) -> Result<Envelope> {
        if !payload.kind().awaits_reply() {
            return Err(PeerError::UnsupportedPayload(
                "acknowledgments are never answered".to_string(),
            ));
        }

        let (_, future) = self.send(payload)?;
        let future = future.ok_or_else(|| {
            PeerError::UnsupportedPayload("message does not await a reply".to_string())
        })?;

        let outcome = self.pump_until_done(&future, Instant::now() + timeout);
        if !matches!(outcome, Ok(true)) {
            self.pending().remove(&future);
        }
        self.restore_read_timeout();

        match outcome {
            Ok(true) => Ok(future.message()?),
            Ok(false) => Err(PeerError::Timeout(timeout)),
            Err(err) => Err(err),
        }
    }

    /// A failure here resurfaces on the next read, so it is only logged.
    fn restore_read_timeout(&self) {
        let configured = self.config.stream.read_timeout;
        if let Err(err) = self.reader.get_ref().set_read_timeout(configured) {
            warn!(peer = %self.label, error = %err, "could not restore read timeout");
        }
    }

    /// Shut down both directions of the connection.
    pub fn shutdown(&self) -> Result<()> {
        self.reader.get_ref().shutdown()?;
        Ok(())
    }

    fn pump_until_done(&mut self, future: &Arc<MessageFuture>, deadline: Instant) -> Result<bool> {
        loop {
            if future.done() {
                return Ok(true);
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(false);
            }
            self.reader.get_ref().set_read_timeout(Some(deadline - now))?;

            if let Some(envelope) = self.receive_one()? {
                let answers_request = envelope.reply_to() == Some(future.origin_id())
                    && future.message().is_ok_and(|reply| reply == envelope);
                if !answers_request {
                    self.backlog.push_back(envelope);
                }
            }
        }
    }

    fn receive_one(&mut self) -> Result<Option<Envelope>> {
        let reader = &mut self.reader;
        let sender = &self.sender;
        let received = receive(
            || reader.read_message(),
            &self.validator,
            |payload| sender.send(payload).map(drop),
        )?;

        if let Some(envelope) = &received {
            if let Err(err) = sender.pending.resolve(envelope) {
                warn!(peer = %self.label, id = envelope.id, error = %err, "could not complete pending reply");
            }
        }
        Ok(received)
    }
}

impl std::fmt::Debug for Peer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Peer")
            .field("label", &self.label)
            .field("pending", &self.sender.pending.len())
            .field("backlog", &self.backlog.len())
            .field("config", &self.config)
            .finish()
    }
}

impl PeerSender {
    /// Prepare and write one message.
    ///
    /// For anything but an acknowledgment the returned future is already
    /// registered and completes when the answer is received by the owning
    /// [`Peer`]. If writing fails, the future is unregistered again.
    pub fn send(&self, payload: Payload) -> Result<(Envelope, Option<Arc<MessageFuture>>)> {
        let (envelope, future) = prepare(payload, &self.ids, |future| {
            self.pending.register(future)
        });

        let written = self.writer.lock().send(&envelope);
        if let Err(err) = written {
            if let Some(future) = &future {
                self.pending.remove(future);
            }
            return Err(err.into());
        }
        Ok((envelope, future))
    }

    /// Send a loosely typed payload object.
    pub fn send_value(&self, payload: Value) -> Result<(Envelope, Option<Arc<MessageFuture>>)> {
        self.send(Payload::from_value(payload)?)
    }

    /// Acknowledge message `to`, positively or negatively.
    pub fn acknowledge(&self, to: MessageId, ok: bool) -> Result<Envelope> {
        let payload = if ok { Payload::ack(to) } else { Payload::nack(to) };
        let (envelope, _) = self.send(payload)?;
        Ok(envelope)
    }

    /// Write bytes exactly as given, bypassing encoding.
    pub fn send_raw(&self, bytes: &[u8]) -> Result<()> {
        self.writer.lock().write_raw(bytes)?;
        Ok(())
    }
}

impl std::fmt::Debug for PeerSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PeerSender")
            .field("device", &self.ids.device())
            .field("pending", &self.pending.len())
            .finish_non_exhaustive()
    }
}
