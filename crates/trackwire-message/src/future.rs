use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use tracing::trace;

use crate::error::FutureError;
use crate::types::{Envelope, MessageId};

/// How long a writer may wait for the completion guard before giving up.
pub const SET_GUARD_TIMEOUT: Duration = Duration::from_millis(10);

/// One-shot slot correlating a sent message with its eventual reply or ack.
///
/// Any number of threads may wait on or read the future. Exactly one writer
/// may complete it; every later [`set`](Self::set) fails and leaves the stored
/// result untouched.
#[derive(Debug)]
pub struct MessageFuture {
    origin: Envelope,
    result: Mutex<Option<Envelope>>,
    completed: Condvar,
}

impl MessageFuture {
    pub fn new(origin: Envelope) -> Self {
        Self {
            origin,
            result: Mutex::new(None),
            completed: Condvar::new(),
        }
    }

    /// Copy of the message that created this future.
    pub fn origin(&self) -> Envelope {
        self.origin.clone()
    }

    pub fn origin_id(&self) -> MessageId {
        self.origin.id
    }

    pub fn done(&self) -> bool {
        self.result.lock().is_some()
    }

    /// Store the reply and wake all waiters.
    ///
    /// Fails with [`FutureError::AlreadySet`] if a result is already stored,
    /// or [`FutureError::Contended`] if the guard cannot be acquired within
    /// [`SET_GUARD_TIMEOUT`].
    pub fn set(&self, message: Envelope) -> Result<(), FutureError> {
        let origin_id = self.origin.id;
        let mut slot =
            self.result
                .try_lock_for(SET_GUARD_TIMEOUT)
                .ok_or(FutureError::Contended {
                    origin_id,
                    waited: SET_GUARD_TIMEOUT,
                })?;
        if slot.is_some() {
            return Err(FutureError::AlreadySet { origin_id });
        }

        trace!(origin_id, reply_id = message.id, "completing pending reply");
        *slot = Some(message);
        drop(slot);
        self.completed.notify_all();
        Ok(())
    }

    /// Copy of the stored reply.
    pub fn message(&self) -> Result<Envelope, FutureError> {
        self.result
            .lock()
            .clone()
            .ok_or(FutureError::NotSet {
                origin_id: self.origin.id,
            })
    }

    /// Block until the future is completed.
    ///
    /// Returns `false` if `timeout` elapses first. Timing out does not touch
    /// the future; a later `set` still succeeds.
    pub fn wait_until_done(&self, timeout: Option<Duration>) -> bool {
        let mut slot = self.result.lock();
        match timeout {
            None => {
                while slot.is_none() {
                    self.completed.wait(&mut slot);
                }
                true
            }
            Some(timeout) => {
                let deadline = Instant::now() + timeout;
                while slot.is_none() {
                    if self.completed.wait_until(&mut slot, deadline).timed_out() {
                        return slot.is_some();
                    }
                }
                true
            }
        }
    }

    /// Wait for completion and return the reply.
    pub fn wait(&self, timeout: Option<Duration>) -> Result<Envelope, FutureError> {
        self.wait_until_done(timeout);
        self.message()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;
    use crate::types::Payload;

    fn request(id: MessageId) -> Envelope {
        Envelope::new(id, 10.0, Payload::request("status"))
    }

    fn ack_of(id: MessageId) -> Envelope {
        Envelope::new(id + 1, 11.0, Payload::ack(id))
    }

    #[test]
    fn new_future_is_not_done() {
        let future = MessageFuture::new(request(5));
        assert!(!future.done());
        assert_eq!(future.message(), Err(FutureError::NotSet { origin_id: 5 }));
        assert_eq!(future.origin(), request(5));
        assert_eq!(future.origin_id(), 5);
    }

    #[test]
    fn set_once_then_read_many() {
        let future = MessageFuture::new(request(5));
        future.set(ack_of(5)).unwrap();

        assert!(future.done());
        assert_eq!(future.message().unwrap(), ack_of(5));
        assert_eq!(future.message().unwrap(), ack_of(5));
    }

    #[test]
    fn second_set_fails_and_keeps_first_result() {
        let future = MessageFuture::new(request(5));
        future.set(ack_of(5)).unwrap();

        let other = Envelope::new(99, 12.0, Payload::nack(5));
        assert_eq!(
            future.set(other),
            Err(FutureError::AlreadySet { origin_id: 5 })
        );
        assert_eq!(future.message().unwrap(), ack_of(5));
    }

    #[test]
    fn wait_times_out_without_set() {
        let future = MessageFuture::new(request(5));
        let started = Instant::now();
        assert!(!future.wait_until_done(Some(Duration::from_millis(30))));
        assert!(started.elapsed() >= Duration::from_millis(30));
        assert!(!future.done());

        // A timed-out wait leaves the future settable.
        future.set(ack_of(5)).unwrap();
        assert!(future.wait_until_done(Some(Duration::from_millis(1))));
    }

    #[test]
    fn wait_wakes_on_concurrent_set() {
        let future = Arc::new(MessageFuture::new(request(5)));
        let writer = {
            let future = Arc::clone(&future);
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(20));
                future.set(ack_of(5)).unwrap();
            })
        };

        assert!(future.wait_until_done(Some(Duration::from_secs(5))));
        assert_eq!(future.wait(None).unwrap(), ack_of(5));
        writer.join().unwrap();
    }

    #[test]
    fn wait_without_timeout_blocks_until_set() {
        let future = Arc::new(MessageFuture::new(request(5)));
        let waiter = {
            let future = Arc::clone(&future);
            thread::spawn(move || future.wait_until_done(None))
        };
        thread::sleep(Duration::from_millis(10));
        future.set(ack_of(5)).unwrap();
        assert!(waiter.join().unwrap());
    }

    #[test]
    fn racing_writers_have_exactly_one_winner() {
        let future = Arc::new(MessageFuture::new(request(5)));
        let writers: Vec<_> = (0..8)
            .map(|n| {
                let future = Arc::clone(&future);
                thread::spawn(move || future.set(Envelope::new(100 + n, 1.0, Payload::ack(5))))
            })
            .collect();

        let results: Vec<_> = writers.into_iter().map(|w| w.join().unwrap()).collect();
        let winners = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(winners, 1);
        assert!(results.iter().all(|r| matches!(
            r,
            Ok(()) | Err(FutureError::AlreadySet { .. }) | Err(FutureError::Contended { .. })
        )));
        assert!(future.done());
    }

    #[test]
    fn held_guard_makes_set_fail_loudly() {
        let future = MessageFuture::new(request(5));
        let guard = future.result.lock();
        assert!(matches!(
            future.set(ack_of(5)),
            Err(FutureError::Contended { origin_id: 5, .. })
        ));
        drop(guard);
        assert!(!future.done());
    }
}
