//! Shared state registry
//!
//! A small set of named, independently observable value slots. Each slot
//! holds the latest known value of one domain; writes replace the value
//! and synchronously notify the slot's observers in registration order.
//!
//! ```ignore
//! let registry = Registry::new();
//! let _sub = registry.balance.subscribe(|balance| println!("balance: {balance}"));
//! registry.balance.set(1000.0);
//! ```

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use tokio::sync::watch;

use crate::models::{ConnectionStatus, Position, ScreenerEntry};

type Observer<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct SlotInner<T> {
    name: &'static str,
    value: T,
    observers: Vec<(u64, Observer<T>)>,
    watchers: Vec<watch::Sender<T>>,
    next_id: u64,
}

/// A named, observable container holding one current value
///
/// Cloning a slot yields another handle to the same value.
pub struct Slot<T> {
    inner: Arc<Mutex<SlotInner<T>>>,
}

impl<T> Clone for Slot<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> fmt::Debug for Slot<T>
where
    T: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = lock(&self.inner);
        f.debug_struct("Slot")
            .field("name", &inner.name)
            .field("value", &inner.value)
            .field("observers", &inner.observers.len())
            .finish()
    }
}

impl<T> Slot<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create a slot with an initial value
    pub fn new(name: &'static str, initial: T) -> Self {
        Self {
            inner: Arc::new(Mutex::new(SlotInner {
                name,
                value: initial,
                observers: Vec::new(),
                watchers: Vec::new(),
                next_id: 0,
            })),
        }
    }

    /// Slot name
    pub fn name(&self) -> &'static str {
        lock(&self.inner).name
    }

    /// Current value
    pub fn get(&self) -> T {
        lock(&self.inner).value.clone()
    }

    /// Replace the current value and notify observers
    ///
    /// Observers run after the internal lock is released, so they may
    /// read or write slots themselves.
    pub fn set(&self, value: T) {
        let observers: Vec<Observer<T>> = {
            let mut inner = lock(&self.inner);
            inner.value = value.clone();
            inner
                .watchers
                .retain(|tx| tx.send(value.clone()).is_ok());
            inner
                .observers
                .iter()
                .map(|(_, observer)| Arc::clone(observer))
                .collect()
        };

        for observer in observers {
            observer(&value);
        }
    }

    /// Register an observer
    ///
    /// The observer is called once immediately with the current value and
    /// then on every subsequent write. It stays registered until the
    /// returned [`Subscription`] is dropped or unsubscribed.
    pub fn subscribe<F>(&self, observer: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let observer: Observer<T> = Arc::new(observer);
        let (id, current) = {
            let mut inner = lock(&self.inner);
            let id = inner.next_id;
            inner.next_id += 1;
            inner.observers.push((id, Arc::clone(&observer)));
            (id, inner.value.clone())
        };

        observer(&current);

        let weak: Weak<Mutex<SlotInner<T>>> = Arc::downgrade(&self.inner);
        Subscription {
            cancel: Some(Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    lock(&inner).observers.retain(|(oid, _)| *oid != id);
                }
            })),
        }
    }

    /// Watch the slot through a `tokio::sync::watch` channel
    ///
    /// The receiver starts at the current value and sees every later
    /// write. Senders whose receivers are all gone are pruned here and on
    /// every write.
    pub fn watch(&self) -> watch::Receiver<T> {
        let mut inner = lock(&self.inner);
        inner.watchers.retain(|tx| !tx.is_closed());
        let (tx, rx) = watch::channel(inner.value.clone());
        inner.watchers.push(tx);
        rx
    }

    /// Number of registered observers
    ///
    /// Counts subscriptions plus watch channels that still have a receiver.
    pub fn observer_count(&self) -> usize {
        let inner = lock(&self.inner);
        let live_watchers = inner.watchers.iter().filter(|tx| !tx.is_closed()).count();
        inner.observers.len() + live_watchers
    }
}

/// Handle that deregisters an observer when dropped
#[must_use = "dropping a Subscription immediately deregisters the observer"]
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    /// Deregister the observer now
    pub fn unsubscribe(mut self) {
        self.cancel_now();
    }

    fn cancel_now(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel_now();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}

/// The five slots published to observers
///
/// Cloning the registry shares the same slots. Only the connection manager
/// writes to them.
#[derive(Debug, Clone)]
pub struct Registry {
    pub balance: Slot<f64>,
    pub open_positions: Slot<u64>,
    pub positions: Slot<Vec<Position>>,
    pub screener_data: Slot<Vec<ScreenerEntry>>,
    pub connection_status: Slot<ConnectionStatus>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            balance: Slot::new("balance", 0.0),
            open_positions: Slot::new("open_positions", 0),
            positions: Slot::new("positions", Vec::new()),
            screener_data: Slot::new("screener_data", Vec::new()),
            connection_status: Slot::new("connection_status", ConnectionStatus::Connecting),
        }
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

// Observers never run under the lock, so a poisoned lock still holds a
// consistent value.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder<T: Clone + Send + 'static>() -> (Arc<Mutex<Vec<T>>>, impl Fn(&T) + Send + Sync) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        (seen, move |value: &T| sink.lock().unwrap().push(value.clone()))
    }

    #[test]
    fn test_registry_initial_values() {
        let registry = Registry::new();
        assert_eq!(registry.balance.get(), 0.0);
        assert_eq!(registry.open_positions.get(), 0);
        assert!(registry.positions.get().is_empty());
        assert!(registry.screener_data.get().is_empty());
        assert_eq!(
            registry.connection_status.get(),
            ConnectionStatus::Connecting
        );
        assert_eq!(registry.screener_data.name(), "screener_data");
    }

    #[test]
    fn test_subscribe_receives_current_value() {
        let slot = Slot::new("balance", 5.0);
        let (seen, observer) = recorder::<f64>();

        let _sub = slot.subscribe(observer);
        assert_eq!(*seen.lock().unwrap(), vec![5.0]);

        slot.set(7.5);
        slot.set(7.5);
        assert_eq!(*seen.lock().unwrap(), vec![5.0, 7.5, 7.5]);
    }

    #[test]
    fn test_observers_notified_in_registration_order() {
        let slot = Slot::new("open_positions", 0u64);
        let order = Arc::new(Mutex::new(Vec::new()));

        let first = Arc::clone(&order);
        let _a = slot.subscribe(move |v: &u64| first.lock().unwrap().push(("a", *v)));
        let second = Arc::clone(&order);
        let _b = slot.subscribe(move |v: &u64| second.lock().unwrap().push(("b", *v)));

        order.lock().unwrap().clear();
        slot.set(3);
        assert_eq!(*order.lock().unwrap(), vec![("a", 3), ("b", 3)]);
    }

    #[test]
    fn test_unsubscribe_stops_notifications() {
        let slot = Slot::new("balance", 0.0);
        let (seen, observer) = recorder::<f64>();

        let sub = slot.subscribe(observer);
        assert_eq!(slot.observer_count(), 1);
        sub.unsubscribe();
        assert_eq!(slot.observer_count(), 0);

        slot.set(1.0);
        assert_eq!(*seen.lock().unwrap(), vec![0.0]);
    }

    #[test]
    fn test_drop_subscription_deregisters() {
        let slot = Slot::new("balance", 0.0);
        {
            let _sub = slot.subscribe(|_| {});
            assert_eq!(slot.observer_count(), 1);
        }
        assert_eq!(slot.observer_count(), 0);
    }

    #[test]
    fn test_observer_may_write_slot() {
        let slot = Slot::new("open_positions", 0u64);
        let mirror = Slot::new("mirror", 0u64);

        let target = mirror.clone();
        let source = slot.clone();
        let _sub = slot.subscribe(move |v: &u64| {
            target.set(*v * 2);
            // Reading the notifying slot must not deadlock
            let _ = source.get();
        });

        slot.set(21);
        assert_eq!(mirror.get(), 42);
    }

    #[test]
    fn test_clone_shares_value() {
        let registry = Registry::new();
        let other = registry.clone();
        registry.balance.set(250.0);
        assert_eq!(other.balance.get(), 250.0);
    }

    #[tokio::test]
    async fn test_watch_receives_updates() {
        let slot = Slot::new("connection_status", ConnectionStatus::Connecting);
        let mut rx = slot.watch();
        assert_eq!(*rx.borrow(), ConnectionStatus::Connecting);

        slot.set(ConnectionStatus::Connected);
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), ConnectionStatus::Connected);
    }

    #[test]
    fn test_watch_deregisters_after_receiver_dropped() {
        let slot = Slot::new("balance", 0.0);
        let rx = slot.watch();
        assert_eq!(slot.observer_count(), 1);

        drop(rx);
        assert_eq!(slot.observer_count(), 0);
        slot.set(1.0);
        assert!(lock(&slot.inner).watchers.is_empty());
    }

    #[test]
    fn test_repeated_watch_without_writes_does_not_accumulate() {
        let slot = Slot::new("screener_data", Vec::<ScreenerEntry>::new());
        for _ in 0..100 {
            drop(slot.watch());
        }
        let rx = slot.watch();

        assert_eq!(lock(&slot.inner).watchers.len(), 1);
        assert_eq!(slot.observer_count(), 1);
        drop(rx);
    }
}
