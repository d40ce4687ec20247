//! One-to-many push notifications.
//!
//! Bevy already has observers (`commands.trigger` + `On<E>`), and the rest of
//! the game uses them for one-shot happenings like damage or the wormhole
//! finishing. Game state and gravity are different: a handful of long-lived
//! controllers each keep their *own copy* of the value, and the owner pushes
//! every change to exactly the controllers that are registered at that moment.
//! That is what `NotificationHub` does.
//!
//! The hub never owns an observer. It stores `Weak` handles, so despawning the
//! component that holds the `Arc` is enough to stop deliveries.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

/// Anything that wants to be told about values of type `T`.
///
/// `Send + Sync` because hubs live inside Bevy resources.
pub trait NotifyObserver<T>: Send + Sync {
    fn on_notify(&self, value: &T);
}

/// Registration-ordered set of weak observer handles.
pub struct NotificationHub<T: 'static> {
    observers: Vec<Weak<dyn NotifyObserver<T>>>,
}

impl<T: 'static> Default for NotificationHub<T> {
    fn default() -> Self {
        Self {
            observers: Vec::new(),
        }
    }
}

impl<T: 'static> NotificationHub<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the observer unless it is already registered.
    /// Returns true if it was added.
    pub fn register<O: NotifyObserver<T> + 'static>(&mut self, observer: &Arc<O>) -> bool {
        let handle: Weak<dyn NotifyObserver<T>> = Arc::<O>::downgrade(observer);
        if self.observers.iter().any(|existing| existing.ptr_eq(&handle)) {
            return false;
        }
        self.observers.push(handle);
        true
    }

    /// Removes the observer if present. Returns true if something was removed.
    pub fn unregister<O: NotifyObserver<T> + 'static>(&mut self, observer: &Arc<O>) -> bool {
        let handle: Weak<dyn NotifyObserver<T>> = Arc::<O>::downgrade(observer);
        let before = self.observers.len();
        self.observers.retain(|existing| !existing.ptr_eq(&handle));
        self.observers.len() != before
    }

    /// Calls `on_notify` on every live observer, in registration order.
    ///
    /// Handles whose observer has been dropped are pruned along the way.
    /// Returns how many observers received the value.
    ///
    /// `&mut self` means an observer can't reach back into the hub while it
    /// is being notified.
    pub fn publish(&mut self, value: &T) -> usize {
        let mut delivered = 0;
        self.observers.retain(|handle| match handle.upgrade() {
            Some(observer) => {
                observer.on_notify(value);
                delivered += 1;
                true
            }
            None => false,
        });
        delivered
    }

    /// Number of observers that are still alive.
    pub fn len(&self) -> usize {
        self.observers
            .iter()
            .filter(|handle| handle.strong_count() > 0)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The observer every controller in the game uses: values are queued as they
/// are pushed and the owning system drains them at the start of its tick.
pub struct Inbox<T> {
    pending: Mutex<VecDeque<T>>,
}

impl<T> Default for Inbox<T> {
    fn default() -> Self {
        Self {
            pending: Mutex::new(VecDeque::new()),
        }
    }
}

impl<T> Inbox<T> {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn queue(&self) -> MutexGuard<'_, VecDeque<T>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Everything pushed since the last drain, oldest first.
    pub fn drain(&self) -> Vec<T> {
        self.queue().drain(..).collect()
    }

    /// Drains the inbox and keeps only the newest value.
    pub fn latest(&self) -> Option<T> {
        self.queue().drain(..).last()
    }
}

impl<T: Clone + Send> NotifyObserver<T> for Inbox<T> {
    fn on_notify(&self, value: &T) {
        self.queue().push_back(value.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Records every delivery into a shared log together with its own tag,
    /// so tests can check ordering across several observers.
    struct Recorder {
        tag: &'static str,
        log: Arc<Mutex<Vec<(&'static str, u32)>>>,
    }

    impl NotifyObserver<u32> for Recorder {
        fn on_notify(&self, value: &u32) {
            self.log.lock().unwrap().push((self.tag, *value));
        }
    }

    fn recorder(tag: &'static str, log: &Arc<Mutex<Vec<(&'static str, u32)>>>) -> Arc<Recorder> {
        Arc::new(Recorder {
            tag,
            log: log.clone(),
        })
    }

    #[test]
    fn publish_reaches_registered_observers_in_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let a = recorder("a", &log);
        let b = recorder("b", &log);
        let c = recorder("c", &log);

        let mut hub = NotificationHub::new();
        hub.register(&b);
        hub.register(&a);
        hub.register(&c);

        assert_eq!(hub.publish(&7), 3);
        assert_eq!(*log.lock().unwrap(), vec![("b", 7), ("a", 7), ("c", 7)]);
    }

    #[test]
    fn register_is_idempotent() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let a = recorder("a", &log);

        let mut hub = NotificationHub::new();
        assert!(hub.register(&a));
        assert!(!hub.register(&a));
        assert_eq!(hub.len(), 1);

        hub.publish(&1);
        assert_eq!(log.lock().unwrap().len(), 1);
    }

    #[test]
    fn unregister_removes_only_that_observer() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let a = recorder("a", &log);
        let b = recorder("b", &log);

        let mut hub = NotificationHub::new();
        hub.register(&a);
        hub.register(&b);

        assert!(hub.unregister(&a));
        assert!(!hub.unregister(&a));

        hub.publish(&2);
        assert_eq!(*log.lock().unwrap(), vec![("b", 2)]);
    }

    #[test]
    fn reregistering_moves_observer_to_the_back() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let a = recorder("a", &log);
        let b = recorder("b", &log);

        let mut hub = NotificationHub::new();
        hub.register(&a);
        hub.register(&b);
        hub.unregister(&a);
        hub.register(&a);

        hub.publish(&3);
        assert_eq!(*log.lock().unwrap(), vec![("b", 3), ("a", 3)]);
    }

    #[test]
    fn hub_does_not_keep_observers_alive() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let a = recorder("a", &log);
        let b = recorder("b", &log);

        let mut hub = NotificationHub::new();
        hub.register(&a);
        hub.register(&b);
        drop(a);

        assert_eq!(hub.len(), 1);
        assert_eq!(hub.publish(&4), 1);
        assert_eq!(*log.lock().unwrap(), vec![("b", 4)]);
    }

    #[test]
    fn inbox_queues_values_until_drained() {
        let inbox = Inbox::<u32>::new();
        let mut hub = NotificationHub::new();
        hub.register(&inbox);

        hub.publish(&1);
        hub.publish(&2);
        assert_eq!(inbox.drain(), vec![1, 2]);
        assert!(inbox.drain().is_empty());

        hub.publish(&3);
        hub.publish(&4);
        assert_eq!(inbox.latest(), Some(4));
        assert_eq!(inbox.latest(), None);
    }
}
