//! Store capability contracts.
//!
//! Every tier in a cascading chain satisfies one of these contracts. A
//! read-only byte-transport adapter (HTTP, file) implements [`ReadStore`];
//! writable tiers additionally implement [`WriteStore`]; anything that can
//! participate as a child in a store chain implements [`CacheNode`], which
//! adds the event surface a parent wires itself to on attach.

use std::sync::Arc;

use crate::cache::events::Event;
use crate::cache::traits::core::{CacheKey, CacheValue};
use crate::cache::types::CacheError;

/// A readable data store.
///
/// These are safe ("nullipotent") methods: calling them produces no side
/// effects in the underlying data. `has` must be synchronous and side-effect
/// free; `get` is best-effort and returns `Ok(None)` on "not found" rather
/// than an error. An `Err` from `get` means the tier itself failed (I/O,
/// transport) and is distinct from a miss.
pub trait ReadStore<K: CacheKey, V: CacheValue>: Send + Sync {
    /// Determine if the given key is available from this store.
    fn has(&self, key: &K) -> bool;

    /// Get a value by its key.
    ///
    /// This method is synchronous and may block until the get operation is
    /// complete.
    fn get(&self, key: &K) -> Result<Option<Arc<V>>, CacheError>;
}

/// A writable data store.
pub trait WriteStore<K: CacheKey, V: CacheValue>: ReadStore<K, V> {
    /// Cache a value, overwriting any existing value for the key.
    ///
    /// Returns the replaced value, if any.
    fn add(&self, key: K, value: Arc<V>) -> Option<Arc<V>>;

    /// Remove a value. Removing an absent key is a silent no-op.
    ///
    /// Returns the removed value, if any.
    fn remove(&self, key: &K) -> Option<Arc<V>>;

    /// Number of entries in this store.
    fn len(&self) -> usize;

    /// True if the store holds no entries.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove all entries.
    fn clear(&self);
}

/// The event surface of a store tier.
///
/// One typed broadcast channel per capability invocation. Handles are
/// cheap clones over shared registries.
pub struct StoreEvents<K: CacheKey, V: CacheValue> {
    /// Fired when `has` is called, with the queried key.
    pub on_has: Event<K>,
    /// Fired when `get` is called, with the queried key.
    pub on_get: Event<K>,
    /// Fired when a value is added at this tier.
    pub on_add: Event<(K, Arc<V>)>,
    /// Fired when an existing value is updated in place.
    pub on_update: Event<(K, Arc<V>)>,
    /// Fired when an existing value is removed.
    pub on_remove: Event<K>,
    /// Fired when the tier is cleared.
    pub on_clear: Event<()>,
}

impl<K: CacheKey, V: CacheValue> Default for StoreEvents<K, V> {
    fn default() -> Self {
        Self {
            on_has: Event::new(),
            on_get: Event::new(),
            on_add: Event::new(),
            on_update: Event::new(),
            on_remove: Event::new(),
            on_clear: Event::new(),
        }
    }
}

impl<K: CacheKey, V: CacheValue> Clone for StoreEvents<K, V> {
    fn clone(&self) -> Self {
        Self {
            on_has: self.on_has.clone(),
            on_get: self.on_get.clone(),
            on_add: self.on_add.clone(),
            on_update: self.on_update.clone(),
            on_remove: self.on_remove.clone(),
            on_clear: self.on_clear.clone(),
        }
    }
}

impl<K: CacheKey, V: CacheValue> std::fmt::Debug for StoreEvents<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreEvents").finish_non_exhaustive()
    }
}

/// A store that can participate as a node in a cascading chain.
///
/// Parents observe a child's events while it is attached, so every chainable
/// store exposes its event surface.
pub trait CacheNode<K: CacheKey, V: CacheValue>: ReadStore<K, V> {
    /// The event channels fired by this node's operations.
    fn events(&self) -> &StoreEvents<K, V>;
}
