//! Change subscriptions
//!
//! Observers are notified synchronously on the thread that applied the
//! change. Callbacks are snapshotted before the call so a callback may
//! subscribe or unsubscribe without deadlocking.

use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tracing::warn;

/// Identifier returned by [`Observers::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// List of change callbacks
pub struct Observers<T> {
    next_id: AtomicU64,
    callbacks: Mutex<Vec<(SubscriptionId, Callback<T>)>>,
}

impl<T> Observers<T> {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(0),
            callbacks: Mutex::new(Vec::new()),
        }
    }

    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.callbacks.lock().push((id, Arc::new(callback)));
        id
    }

    /// Returns `false` if the id was not subscribed
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut callbacks = self.callbacks.lock();
        let before = callbacks.len();
        callbacks.retain(|(sub, _)| *sub != id);
        callbacks.len() != before
    }

    /// Call every observer, returning how many completed
    pub fn notify(&self, value: &T) -> usize {
        let snapshot: Vec<Callback<T>> = self
            .callbacks
            .lock()
            .iter()
            .map(|(_, cb)| Arc::clone(cb))
            .collect();

        snapshot
            .into_iter()
            .filter(|cb| {
                let ok = catch_unwind(AssertUnwindSafe(|| cb(value))).is_ok();
                if !ok {
                    warn!("Change observer panicked");
                }
                ok
            })
            .count()
    }

    pub fn len(&self) -> usize {
        self.callbacks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> Default for Observers<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Observers<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observers")
            .field("subscribers", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notify_and_unsubscribe() {
        let observers = Observers::<u32>::new();
        let total = Arc::new(Mutex::new(0));

        let sum = Arc::clone(&total);
        let id = observers.subscribe(move |v| *sum.lock() += *v);

        assert_eq!(observers.notify(&5), 1);
        assert!(observers.unsubscribe(id));
        assert!(!observers.unsubscribe(id));
        assert_eq!(observers.notify(&5), 0);
        assert_eq!(*total.lock(), 5);
    }

    #[test]
    fn test_panicking_observer_isolated() {
        let observers = Observers::<()>::new();
        let hits = Arc::new(Mutex::new(0));

        observers.subscribe(|_| panic!("boom"));
        let counter = Arc::clone(&hits);
        observers.subscribe(move |_| *counter.lock() += 1);

        assert_eq!(observers.notify(&()), 1);
        assert_eq!(*hits.lock(), 1);
    }
}
