//! Pending-call registry.
//!
//! Maps correlation ids to the one-shot slot a caller is waiting on. The
//! registry is shared between callers (register, take on timeout) and the
//! receive loop (deliver, close), so every operation is a single short
//! critical section on one shard.
//!
//! Whoever removes an id first owns its outcome: [`deliver`] hands the
//! response to the slot, [`take`] lets a timed-out caller report the timeout,
//! [`close`] drops every slot so waiters see the channel as closed.
//!
//! [`deliver`]: PendingRegistry::deliver
//! [`take`]: PendingRegistry::take
//! [`close`]: PendingRegistry::close

use std::collections::HashMap;
use std::hash::{BuildHasher, RandomState};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use mailrpc_protocol::InboundEnvelope;
use thiserror::Error;
use tokio::sync::oneshot;
use tracing::trace;
use uuid::Uuid;

const SHARDS: usize = 16;

type Slot = oneshot::Sender<InboundEnvelope>;

/// Generates a fresh correlation id (32 hex characters).
pub fn new_correlation_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Reasons a registration is refused.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegisterError {
    #[error("correlation id already pending")]
    Duplicate,
    #[error("registry is closed")]
    Closed,
}

/// Concurrent map from correlation id to the caller waiting on it.
#[derive(Debug)]
pub struct PendingRegistry {
    shards: Vec<Mutex<HashMap<String, Slot>>>,
    hasher: RandomState,
    closed: AtomicBool,
}

impl Default for PendingRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl PendingRegistry {
    pub fn new() -> Self {
        Self {
            shards: (0..SHARDS).map(|_| Mutex::new(HashMap::new())).collect(),
            hasher: RandomState::new(),
            closed: AtomicBool::new(false),
        }
    }

    /// Registers a pending call and returns the receiving end of its slot.
    ///
    /// Fails if `id` is already pending or the registry has been closed.
    pub fn register(&self, id: &str) -> Result<oneshot::Receiver<InboundEnvelope>, RegisterError> {
        let mut shard = self.shard(id);
        // checked under the shard lock so close() cannot miss this entry
        if self.closed.load(Ordering::Acquire) {
            return Err(RegisterError::Closed);
        }
        if shard.contains_key(id) {
            return Err(RegisterError::Duplicate);
        }

        let (tx, rx) = oneshot::channel();
        shard.insert(id.to_string(), tx);
        trace!(id, "registered pending call");
        Ok(rx)
    }

    /// Removes the slot for `id`, returning it if it was still pending.
    pub fn take(&self, id: &str) -> Option<oneshot::Sender<InboundEnvelope>> {
        self.shard(id).remove(id)
    }

    /// Completes the call matching the envelope's id.
    ///
    /// Hands the envelope back when no live caller waits for it: the id is
    /// unknown, already timed out or answered, or the caller went away.
    pub fn deliver(&self, envelope: InboundEnvelope) -> Result<(), InboundEnvelope> {
        match self.take(&envelope.id) {
            Some(slot) => slot.send(envelope),
            None => Err(envelope),
        }
    }

    /// Refuses new registrations and fails every pending call.
    ///
    /// Returns the number of calls that were pending.
    pub fn close(&self) -> usize {
        self.closed.store(true, Ordering::Release);
        self.shards
            .iter()
            .map(|shard| {
                let mut shard = shard.lock().unwrap_or_else(PoisonError::into_inner);
                let dropped = shard.len();
                shard.clear();
                dropped
            })
            .sum()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.shard(id).contains_key(id)
    }

    /// Number of pending calls.
    pub fn len(&self) -> usize {
        self.shards
            .iter()
            .map(|shard| shard.lock().unwrap_or_else(PoisonError::into_inner).len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn shard(&self, id: &str) -> MutexGuard<'_, HashMap<String, Slot>> {
        let index = (self.hasher.hash_one(id) as usize) % self.shards.len();
        self.shards[index]
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use mailrpc_protocol::Payload;
    use tokio::sync::oneshot::error::TryRecvError;

    fn response(id: &str) -> InboundEnvelope {
        InboundEnvelope::response(id, Payload::new(r#"{"success":true}"#))
    }

    #[test]
    fn correlation_ids_are_unique_hex() {
        let a = new_correlation_id();
        let b = new_correlation_id();
        assert_eq!(a.len(), 32);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn deliver_completes_the_matching_call() {
        let registry = PendingRegistry::new();
        let mut rx = registry.register("a").unwrap();
        assert_eq!(registry.len(), 1);

        registry.deliver(response("a")).unwrap();
        assert_eq!(rx.try_recv().unwrap().id, "a");
        assert!(registry.is_empty());
    }

    #[test]
    fn unknown_and_repeated_ids_are_not_delivered() {
        let registry = PendingRegistry::new();
        let _rx = registry.register("a").unwrap();

        assert_eq!(registry.deliver(response("zzz")).unwrap_err().id, "zzz");
        registry.deliver(response("a")).unwrap();
        assert!(registry.deliver(response("a")).is_err());
    }

    #[test]
    fn duplicate_registration_is_refused() {
        let registry = PendingRegistry::new();
        let _rx = registry.register("a").unwrap();
        assert_eq!(registry.register("a").unwrap_err(), RegisterError::Duplicate);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn take_wins_over_later_delivery() {
        let registry = PendingRegistry::new();
        let _rx = registry.register("a").unwrap();

        assert!(registry.take("a").is_some());
        assert!(!registry.contains("a"));
        assert!(registry.deliver(response("a")).is_err());
    }

    #[test]
    fn delivery_to_a_departed_caller_returns_the_envelope() {
        let registry = PendingRegistry::new();
        drop(registry.register("gone").unwrap());
        assert!(registry.deliver(response("gone")).is_err());
        assert!(registry.is_empty());
    }

    #[test]
    fn close_drops_every_slot_and_refuses_new_calls() {
        let registry = PendingRegistry::new();
        let mut a = registry.register("a").unwrap();
        let mut b = registry.register("b").unwrap();

        assert_eq!(registry.close(), 2);
        assert!(registry.is_closed());
        assert!(registry.is_empty());
        assert_eq!(a.try_recv().unwrap_err(), TryRecvError::Closed);
        assert_eq!(b.try_recv().unwrap_err(), TryRecvError::Closed);
        assert_eq!(registry.register("c").unwrap_err(), RegisterError::Closed);
    }

    #[test]
    fn concurrent_register_and_deliver() {
        let registry = Arc::new(PendingRegistry::new());
        let ids: Vec<String> = (0..200).map(|i| format!("id-{i}")).collect();

        let receivers: Vec<_> = ids
            .iter()
            .map(|id| registry.register(id).unwrap())
            .collect();

        let handles: Vec<_> = ids
            .chunks(50)
            .map(|chunk| {
                let registry = Arc::clone(&registry);
                let chunk = chunk.to_vec();
                std::thread::spawn(move || {
                    for id in chunk.iter().rev() {
                        registry.deliver(response(id)).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert!(registry.is_empty());
        for (id, mut rx) in ids.iter().zip(receivers) {
            assert_eq!(&rx.try_recv().unwrap().id, id);
        }
    }

    #[test]
    fn racing_take_and_deliver_have_one_winner() {
        for round in 0..100 {
            let registry = Arc::new(PendingRegistry::new());
            let id = format!("race-{round}");
            let _rx = registry.register(&id).unwrap();

            let deliverer = {
                let registry = Arc::clone(&registry);
                let id = id.clone();
                std::thread::spawn(move || registry.deliver(response(&id)).is_ok())
            };
            let taken = registry.take(&id).is_some();
            let delivered = deliverer.join().unwrap();

            assert!(taken ^ delivered, "round {round}: taken={taken} delivered={delivered}");
        }
    }
}
