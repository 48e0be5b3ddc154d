//! Cascading store chains with read-through promotion.
//!
//! Caches can be chained to form several layers of caching, e.g.
//!
//! ```text
//! memory cache -> disk cache -> internet source
//! ```
//!
//! A [`CascadeCache`] presents a store interface backed by a local fast tier
//! plus at most one owned child store. A local miss consults the child; a
//! child hit is written into the local tier before being returned, so a value
//! found N levels down is progressively cached at every traversed tier on
//! the return path.

use std::sync::Arc;

use log::trace;

use crate::cache::events::ListenerId;
use crate::cache::tier::memory::LruCache;
use crate::cache::traits::core::{CacheKey, CacheValue};
use crate::cache::traits::store::{CacheNode, ReadStore, StoreEvents, WriteStore};
use crate::cache::types::CacheError;

/// A memory-backed cascading cache node: LRU fast tier plus optional child.
pub type LruMemoryCache<K, V> = CascadeCache<K, V, LruCache<K, V>>;

struct ChildListeners {
    on_has: ListenerId,
    on_get: ListenerId,
    on_add: ListenerId,
    on_update: ListenerId,
    on_remove: ListenerId,
    on_clear: ListenerId,
}

struct ChildLink<K: CacheKey, V: CacheValue> {
    store: Box<dyn CacheNode<K, V>>,
    listeners: ChildListeners,
}

/// A thread-safe cascading cache node.
///
/// Reads and writes on the local tier are internally synchronized, so a
/// `CascadeCache` can be shared across request-handling contexts. Structural
/// chain changes ([`set_child`](Self::set_child),
/// [`remove_child`](Self::remove_child)) take `&mut self`, which makes them
/// exclusive relative to concurrent `get` without any additional locking.
///
/// `add`, `update`, `remove`, and `clear` apply only to the local tier and
/// never cascade downward: a local invalidation must not destroy the
/// authoritative copy held by a slower, more durable tier.
pub struct CascadeCache<K: CacheKey, V: CacheValue, S = LruCache<K, V>>
where
    S: WriteStore<K, V>,
{
    local: S,
    child: Option<ChildLink<K, V>>,
    events: StoreEvents<K, V>,
    child_events: StoreEvents<K, V>,
}

impl<K: CacheKey, V: CacheValue> LruMemoryCache<K, V> {
    /// Create a memory cache node with an LRU fast tier of the given
    /// capacity and no child.
    pub fn with_capacity(capacity: usize) -> Result<Self, CacheError> {
        Ok(Self::new(LruCache::new(capacity)?))
    }
}

impl<K: CacheKey, V: CacheValue, S: WriteStore<K, V>> CascadeCache<K, V, S> {
    /// Create a cascading node over the given fast tier, with no child.
    pub fn new(local: S) -> Self {
        Self {
            local,
            child: None,
            events: StoreEvents::default(),
            child_events: StoreEvents::default(),
        }
    }

    /// The event channels fired by operations at this tier.
    pub fn events(&self) -> &StoreEvents<K, V> {
        &self.events
    }

    /// Re-published events from the attached child tier, if any.
    ///
    /// Subscribing here is the extension point for reacting to child-tier
    /// activity (statistics, cross-tier synchronization). With no
    /// subscribers, child events are ignored.
    pub fn child_events(&self) -> &StoreEvents<K, V> {
        &self.child_events
    }

    /// True iff the key is present at this tier. Fires `on_has`; never
    /// consults the child and has no side effects on recency.
    pub fn has(&self, key: &K) -> bool {
        self.events.on_has.notify(key);
        self.local.has(key)
    }

    /// Recursively get a value by its key.
    ///
    /// A local hit returns immediately. On a local miss the child (if
    /// attached) is consulted; a child hit is added to the local tier,
    /// firing `on_add`, before being returned. A child error propagates to
    /// the caller rather than becoming a negative cache entry: a miss and a
    /// failure are different things.
    ///
    /// This method is synchronous and blocks for the duration of the entire
    /// child chain; call it from a context willing to block or from inside
    /// a background task body.
    pub fn get(&self, key: &K) -> Result<Option<Arc<V>>, CacheError> {
        self.events.on_get.notify(key);

        if let Some(value) = self.local.get(key)? {
            return Ok(Some(value));
        }

        let Some(link) = &self.child else {
            return Ok(None);
        };

        match link.store.get(key)? {
            Some(value) => {
                trace!("cascade: promoting child hit into local tier");
                self.events.on_add.notify(&(key.clone(), Arc::clone(&value)));
                self.local.add(key.clone(), Arc::clone(&value));
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    /// Cache a value at this tier, overwriting any existing entry.
    pub fn add(&self, key: K, value: V) {
        self.add_shared(key, Arc::new(value));
    }

    /// Cache an already-shared value at this tier.
    ///
    /// Overwriting an existing key fires a deterministic one-remove-plus-
    /// one-add event sequence, never an update event: the old entry is
    /// removed and notified as removed before the new one is added.
    pub fn add_shared(&self, key: K, value: Arc<V>) {
        if self.local.has(&key) {
            self.events.on_remove.notify(&key);
            self.local.remove(&key);
        }
        self.events.on_add.notify(&(key.clone(), Arc::clone(&value)));
        self.local.add(key, value);
    }

    /// Update a value at this tier.
    ///
    /// Fires `on_update` if the key already exists, `on_add` otherwise.
    pub fn update(&self, key: K, value: V) {
        self.update_shared(key, Arc::new(value));
    }

    /// Update with an already-shared value.
    pub fn update_shared(&self, key: K, value: Arc<V>) {
        if self.local.has(&key) {
            self.events.on_update.notify(&(key.clone(), Arc::clone(&value)));
        } else {
            self.events.on_add.notify(&(key.clone(), Arc::clone(&value)));
        }
        self.local.add(key, value);
    }

    /// Remove a value from this tier only.
    ///
    /// Fires `on_remove` only if the key was present; removing an absent
    /// key is a silent no-op, never an error.
    pub fn remove(&self, key: &K) {
        if self.local.has(key) {
            self.events.on_remove.notify(key);
            self.local.remove(key);
        }
    }

    /// Number of entries at this tier.
    pub fn len(&self) -> usize {
        self.local.len()
    }

    /// True if this tier holds no entries.
    pub fn is_empty(&self) -> bool {
        self.local.is_empty()
    }

    /// Remove all entries at this tier. Fires `on_clear`.
    pub fn clear(&self) {
        self.events.on_clear.notify(&());
        self.local.clear();
    }

    /// The local fast tier.
    pub fn local(&self) -> &S {
        &self.local
    }

    /// Take ownership of a child store ("sink" semantics).
    ///
    /// The child's events are wired to this node's
    /// [`child_events`](Self::child_events) for as long as it stays
    /// attached. Attaching while a child is already attached replaces it;
    /// the previous child is unwired and dropped at the end of this call,
    /// so callers that need it back must call
    /// [`remove_child`](Self::remove_child) first.
    ///
    /// Returns a non-owning observation handle to the attached child.
    pub fn set_child(&mut self, store: Box<dyn CacheNode<K, V>>) -> &mut dyn CacheNode<K, V> {
        // Unwire and drop any previous child.
        let _ = self.remove_child();

        let listeners = Self::wire_child(store.as_ref(), &self.child_events);
        let link = self.child.insert(ChildLink { store, listeners });
        link.store.as_mut()
    }

    /// Release ownership of the child store.
    ///
    /// Detaches and unwires the child, handing ownership back to the
    /// caller; this node then holds none. Returns `None` if no child is
    /// attached.
    pub fn remove_child(&mut self) -> Option<Box<dyn CacheNode<K, V>>> {
        let link = self.child.take()?;
        let events = link.store.events();
        events.on_has.unsubscribe(link.listeners.on_has);
        events.on_get.unsubscribe(link.listeners.on_get);
        events.on_add.unsubscribe(link.listeners.on_add);
        events.on_update.unsubscribe(link.listeners.on_update);
        events.on_remove.unsubscribe(link.listeners.on_remove);
        events.on_clear.unsubscribe(link.listeners.on_clear);
        Some(link.store)
    }

    /// A non-owning view of the attached child, if any.
    pub fn child(&self) -> Option<&dyn CacheNode<K, V>> {
        self.child.as_ref().map(|link| link.store.as_ref())
    }

    fn wire_child(child: &dyn CacheNode<K, V>, hub: &StoreEvents<K, V>) -> ChildListeners {
        let events = child.events();

        let fwd = hub.on_has.clone();
        let on_has = events.on_has.subscribe(move |key| fwd.notify(key));
        let fwd = hub.on_get.clone();
        let on_get = events.on_get.subscribe(move |key| fwd.notify(key));
        let fwd = hub.on_add.clone();
        let on_add = events.on_add.subscribe(move |pair| fwd.notify(pair));
        let fwd = hub.on_update.clone();
        let on_update = events.on_update.subscribe(move |pair| fwd.notify(pair));
        let fwd = hub.on_remove.clone();
        let on_remove = events.on_remove.subscribe(move |key| fwd.notify(key));
        let fwd = hub.on_clear.clone();
        let on_clear = events.on_clear.subscribe(move |args| fwd.notify(args));

        ChildListeners {
            on_has,
            on_get,
            on_add,
            on_update,
            on_remove,
            on_clear,
        }
    }
}

impl<K: CacheKey, V: CacheValue, S: WriteStore<K, V>> ReadStore<K, V> for CascadeCache<K, V, S> {
    fn has(&self, key: &K) -> bool {
        CascadeCache::has(self, key)
    }

    fn get(&self, key: &K) -> Result<Option<Arc<V>>, CacheError> {
        CascadeCache::get(self, key)
    }
}

impl<K: CacheKey, V: CacheValue, S: WriteStore<K, V>> WriteStore<K, V> for CascadeCache<K, V, S> {
    fn add(&self, key: K, value: Arc<V>) -> Option<Arc<V>> {
        let replaced = if self.local.has(&key) {
            self.events.on_remove.notify(&key);
            self.local.remove(&key)
        } else {
            None
        };
        self.events.on_add.notify(&(key.clone(), Arc::clone(&value)));
        self.local.add(key, value);
        replaced
    }

    fn remove(&self, key: &K) -> Option<Arc<V>> {
        if self.local.has(key) {
            self.events.on_remove.notify(key);
            self.local.remove(key)
        } else {
            None
        }
    }

    fn len(&self) -> usize {
        CascadeCache::len(self)
    }

    fn clear(&self) {
        CascadeCache::clear(self)
    }
}

impl<K: CacheKey, V: CacheValue, S: WriteStore<K, V>> CacheNode<K, V> for CascadeCache<K, V, S> {
    fn events(&self) -> &StoreEvents<K, V> {
        &self.events
    }
}
