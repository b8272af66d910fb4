use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, trace};
use trackwire_message::{Envelope, FutureError, MessageFuture, MessageId};

/// Futures awaiting a reply, keyed by the id of the message they were created for.
///
/// Ids are only unique per wall-clock second, so several futures may share
/// one id. They are resolved oldest first.
#[derive(Debug, Default)]
pub struct PendingRegistry {
    pending: Mutex<HashMap<MessageId, VecDeque<Arc<MessageFuture>>>>,
}

impl PendingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a future until a reply for its origin id arrives.
    pub fn register(&self, future: Arc<MessageFuture>) {
        let id = future.origin_id();
        let mut pending = self.pending.lock();
        let waiting = pending.entry(id).or_default();
        waiting.push_back(future);
        trace!(id, waiting = waiting.len(), "pending reply registered");
    }

    /// Complete the oldest future awaiting the message `reply` answers.
    ///
    /// Returns the completed future, or `None` when `reply` is neither an
    /// acknowledgment nor a reply, or nothing is waiting for it.
    pub fn resolve(
        &self,
        reply: &Envelope,
    ) -> Result<Option<Arc<MessageFuture>>, FutureError> {
        let Some(to) = reply.reply_to() else {
            return Ok(None);
        };

        let future = {
            let mut pending = self.pending.lock();
            let Some(waiting) = pending.get_mut(&to) else {
                debug!(to, reply_id = reply.id, "reply matches no pending message");
                return Ok(None);
            };
            let future = waiting.pop_front();
            if waiting.is_empty() {
                pending.remove(&to);
            }
            future
        };

        match future {
            Some(future) => {
                future.set(reply.clone())?;
                Ok(Some(future))
            }
            None => Ok(None),
        }
    }

    /// Stop tracking `future`, for example after its wait timed out.
    ///
    /// Returns whether it was still registered.
    pub fn remove(&self, future: &Arc<MessageFuture>) -> bool {
        let id = future.origin_id();
        let mut pending = self.pending.lock();
        let Some(waiting) = pending.get_mut(&id) else {
            return false;
        };
        let before = waiting.len();
        waiting.retain(|candidate| !Arc::ptr_eq(candidate, future));
        let removed = waiting.len() != before;
        if waiting.is_empty() {
            pending.remove(&id);
        }
        removed
    }

    /// Number of futures still waiting.
    pub fn len(&self) -> usize {
        self.pending.lock().values().map(VecDeque::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.lock().is_empty()
    }

    /// Ids with at least one waiting future, in ascending order.
    pub fn pending_ids(&self) -> Vec<MessageId> {
        let mut ids: Vec<_> = self.pending.lock().keys().copied().collect();
        ids.sort_unstable();
        ids
    }
}
