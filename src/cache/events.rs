//! Typed publish/subscribe channels for cache notifications.
//!
//! Each event kind is a [`Event<A>`] callback registry. Listeners are fired
//! synchronously at the call site, in no particular order. Handles are cheap
//! to clone and share one underlying registry, so a cloned `Event` can be
//! moved into a forwarding closure while the original stays subscribable.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;

type Callback<A> = Box<dyn Fn(&A) + Send + Sync + 'static>;

/// Token identifying a subscribed listener, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// A broadcast channel for one event kind.
///
/// Listeners must not subscribe to or unsubscribe from the event they are
/// currently being fired from.
pub struct Event<A> {
    inner: Arc<EventInner<A>>,
}

struct EventInner<A> {
    listeners: DashMap<u64, Callback<A>>,
    next_id: AtomicU64,
}

impl<A> Clone for Event<A> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<A> Default for Event<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A> std::fmt::Debug for Event<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Event")
            .field("listeners", &self.inner.listeners.len())
            .finish()
    }
}

impl<A> Event<A> {
    /// Create an event with no listeners.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(EventInner {
                listeners: DashMap::new(),
                next_id: AtomicU64::new(0),
            }),
        }
    }

    /// Register a listener and return its id.
    pub fn subscribe<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&A) + Send + Sync + 'static,
    {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner.listeners.insert(id, Box::new(listener));
        ListenerId(id)
    }

    /// Deregister a listener. Returns false if the id was not subscribed.
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        self.inner.listeners.remove(&id.0).is_some()
    }

    /// Fire the event, invoking every listener with `args`.
    pub fn notify(&self, args: &A) {
        for entry in self.inner.listeners.iter() {
            (entry.value())(args);
        }
    }

    /// Number of currently subscribed listeners.
    pub fn listener_count(&self) -> usize {
        self.inner.listeners.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn notify_reaches_all_listeners() {
        let event: Event<u32> = Event::new();
        let count = Arc::new(AtomicUsize::new(0));

        let a = Arc::clone(&count);
        event.subscribe(move |n| {
            a.fetch_add(*n as usize, Ordering::SeqCst);
        });
        let b = Arc::clone(&count);
        event.subscribe(move |n| {
            b.fetch_add(*n as usize, Ordering::SeqCst);
        });

        event.notify(&3);
        assert_eq!(count.load(Ordering::SeqCst), 6);
        assert_eq!(event.listener_count(), 2);
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let event: Event<()> = Event::new();
        let count = Arc::new(AtomicUsize::new(0));

        let c = Arc::clone(&count);
        let id = event.subscribe(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });

        event.notify(&());
        assert!(event.unsubscribe(id));
        assert!(!event.unsubscribe(id));
        event.notify(&());

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn cloned_handles_share_listeners() {
        let event: Event<()> = Event::new();
        let clone = event.clone();
        let count = Arc::new(AtomicUsize::new(0));

        let c = Arc::clone(&count);
        event.subscribe(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });

        clone.notify(&());
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
