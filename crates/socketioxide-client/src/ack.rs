//! Acknowledgement correlation.
//!
//! Every ack request gets a unique id, its response is delivered through a oneshot channel
//! registered in the [`AckRegistry`].
use std::{
    collections::HashMap,
    sync::{
        Mutex, MutexGuard, PoisonError,
        atomic::{AtomicI64, Ordering},
    },
};

use socketioxide_core::value::PayloadValue;
use tokio::sync::oneshot;

type AckSender = oneshot::Sender<Vec<PayloadValue>>;

/// The pending ack requests of a connection
#[derive(Debug, Default)]
pub(crate) struct AckRegistry {
    counter: AtomicI64,
    waiters: Mutex<HashMap<i64, AckSender>>,
}

impl AckRegistry {
    /// Allocate a new ack id, ids are strictly increasing.
    pub fn next_id(&self) -> i64 {
        self.counter.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Allocate an id and register a waiter for its response.
    pub fn register(&self) -> (i64, oneshot::Receiver<Vec<PayloadValue>>) {
        let (tx, rx) = oneshot::channel();
        let id = self.next_id();
        self.waiters().insert(id, tx);
        (id, rx)
    }

    /// Deliver a response to its waiter.
    /// Returns `false` if no waiter is registered for this id.
    pub fn resolve(&self, id: i64, args: Vec<PayloadValue>) -> bool {
        match self.waiters().remove(&id) {
            Some(tx) => tx.send(args).is_ok(),
            None => false,
        }
    }

    /// Remove a waiter, for example after a timeout
    pub fn remove(&self, id: i64) {
        self.waiters().remove(&id);
    }

    /// Drop all the waiters, they will receive a closed error.
    pub fn clear(&self) {
        self.waiters().clear();
    }

    pub fn len(&self) -> usize {
        self.waiters().len()
    }

    fn waiters(&self) -> MutexGuard<'_, HashMap<i64, AckSender>> {
        self.waiters.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn ids_are_increasing() {
        let registry = AckRegistry::default();
        assert_eq!(registry.next_id(), 1);
        assert_eq!(registry.next_id(), 2);
        let (id, _rx) = registry.register();
        assert_eq!(id, 3);
    }

    #[tokio::test]
    async fn resolve_waiter() {
        let registry = AckRegistry::default();
        let (id, rx) = registry.register();
        assert_eq!(registry.len(), 1);
        assert!(registry.resolve(id, vec!["foo".into()]));
        assert_eq!(rx.await.unwrap(), vec![PayloadValue::from("foo")]);
        assert_eq!(registry.len(), 0);

        // A second response for the same id is dropped
        assert!(!registry.resolve(id, vec![]));
    }

    #[tokio::test]
    async fn clear_rejects_waiters() {
        let registry = AckRegistry::default();
        let (_, rx1) = registry.register();
        let (_, rx2) = registry.register();
        registry.clear();
        assert!(rx1.await.is_err());
        assert!(rx2.await.is_err());
    }

    #[test]
    fn concurrent_ids_are_unique() {
        let registry = Arc::new(AckRegistry::default());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = registry.clone();
                std::thread::spawn(move || (0..100).map(|_| registry.register().0).collect::<Vec<_>>())
            })
            .collect();
        let mut ids: Vec<i64> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 800);
        assert_eq!(registry.len(), 800);
    }
}
