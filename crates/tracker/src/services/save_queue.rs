//! Per-key single-flight coordination for saves.
//!
//! At most one write per key is in flight. A request that arrives while a
//! write is running waits its turn; if an even newer request for the same key
//! arrives before it starts, the older one is dropped without writing.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

/// What happened to a queued request.
#[derive(Debug, PartialEq, Eq)]
pub enum Queued<T> {
    /// The write ran and produced this result.
    Ran(T),
    /// A newer request for the same key took its place.
    Superseded,
}

#[derive(Debug, Default)]
struct Slot {
    /// Ticket of the most recent request for this key.
    latest: u64,
    /// Held for the duration of a write.
    gate: Arc<tokio::sync::Mutex<()>>,
}

impl Slot {
    /// A pruned and recreated slot restarts its tickets, so the gate is
    /// compared as well.
    fn is_current(&self, ticket: u64, gate: &Arc<tokio::sync::Mutex<()>>) -> bool {
        self.latest == ticket && Arc::ptr_eq(&self.gate, gate)
    }
}

/// Single-flight queue keyed by string.
#[derive(Debug, Default)]
pub struct SaveQueue {
    slots: Mutex<HashMap<String, Slot>>,
}

impl SaveQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `write` for `key` once any in-flight write for it has finished,
    /// unless a newer request for `key` arrives first.
    pub async fn run<F, Fut, T>(&self, key: &str, write: F) -> Queued<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let (ticket, gate) = {
            let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            let slot = slots.entry(key.to_string()).or_default();
            slot.latest += 1;
            (slot.latest, Arc::clone(&slot.gate))
        };

        // tokio's Mutex is fair, so waiters acquire in arrival order.
        let _in_flight = gate.lock().await;

        if !self.is_latest(key, ticket, &gate) {
            tracing::debug!(key, ticket, "Save superseded by a newer request");
            return Queued::Superseded;
        }

        let result = write().await;
        self.release(key, ticket, &gate);
        Queued::Ran(result)
    }

    /// Number of keys with a slot.
    #[must_use]
    pub fn tracked_keys(&self) -> usize {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// The slot still belongs to this gate and no newer ticket was issued.
    fn is_latest(&self, key: &str, ticket: u64, gate: &Arc<tokio::sync::Mutex<()>>) -> bool {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .is_some_and(|slot| slot.is_current(ticket, gate))
    }

    /// Drop the slot once its newest request has written.
    fn release(&self, key: &str, ticket: u64, gate: &Arc<tokio::sync::Mutex<()>>) {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        if slots.get(key).is_some_and(|slot| slot.is_current(ticket, gate)) {
            slots.remove(key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn test_single_request_runs() {
        let queue = SaveQueue::new();
        assert_eq!(queue.run("OPS-1", || async { 7 }).await, Queued::Ran(7));
    }

    #[tokio::test]
    async fn test_queued_request_is_superseded_by_newer_one() {
        let queue = Arc::new(SaveQueue::new());
        let writes = Arc::new(AtomicUsize::new(0));
        let (release, hold) = oneshot::channel::<()>();
        let (started_tx, started) = oneshot::channel::<()>();

        let first = {
            let queue = Arc::clone(&queue);
            let writes = Arc::clone(&writes);
            tokio::spawn(async move {
                queue
                    .run("OPS-1", || async move {
                        let _ = started_tx.send(());
                        let _ = hold.await;
                        writes.fetch_add(1, Ordering::SeqCst);
                        "first"
                    })
                    .await
            })
        };
        let _ = started.await;

        let spawn_save = |label: &'static str| {
            let queue = Arc::clone(&queue);
            let writes = Arc::clone(&writes);
            tokio::spawn(async move {
                queue
                    .run("OPS-1", || async move {
                        writes.fetch_add(1, Ordering::SeqCst);
                        label
                    })
                    .await
            })
        };
        let second = spawn_save("second");
        tokio::task::yield_now().await;
        let third = spawn_save("third");
        tokio::task::yield_now().await;

        let _ = release.send(());

        let results = (
            first.await.ok(),
            second.await.ok(),
            third.await.ok(),
        );
        assert_eq!(
            results,
            (
                Some(Queued::Ran("first")),
                Some(Queued::Superseded),
                Some(Queued::Ran("third")),
            )
        );
        assert_eq!(writes.load(Ordering::SeqCst), 2);
        assert_eq!(queue.tracked_keys(), 0);
    }

    #[tokio::test]
    async fn test_slots_are_pruned_after_writes() {
        let queue = SaveQueue::new();
        for key in ["OPS-1", "OPS-2", "OPS-3"] {
            assert_eq!(queue.run(key, || async {}).await, Queued::Ran(()));
        }
        assert_eq!(queue.tracked_keys(), 0);

        // A fresh slot for a pruned key works as before.
        assert_eq!(queue.run("OPS-1", || async { 2 }).await, Queued::Ran(2));
        assert_eq!(queue.tracked_keys(), 0);
    }

    #[tokio::test]
    async fn test_keys_are_independent() {
        let queue = Arc::new(SaveQueue::new());
        let (release, hold) = oneshot::channel::<()>();
        let (started_tx, started) = oneshot::channel::<()>();

        let blocked = {
            let queue = Arc::clone(&queue);
            tokio::spawn(async move {
                queue
                    .run("OPS-1", || async move {
                        let _ = started_tx.send(());
                        let _ = hold.await;
                    })
                    .await
            })
        };
        let _ = started.await;

        // A different key is not held up by OPS-1.
        assert_eq!(queue.run("OPS-2", || async { 1 }).await, Queued::Ran(1));
        assert_eq!(queue.tracked_keys(), 1);

        let _ = release.send(());
        assert_eq!(blocked.await.ok(), Some(Queued::Ran(())));
    }
}
