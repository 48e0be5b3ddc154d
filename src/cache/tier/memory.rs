//! In-memory LRU fast tier.
//!
//! An LRU (least recently used) cache discards the least recently used
//! entries first; entries that are touched frequently stay resident. The
//! recency ledger is an intrusive doubly-linked list over a slab vector
//! paired with the key map, so touch, unlink, and evict-last are all O(1).

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::sync::Arc;

use crate::cache::traits::core::{CacheKey, CacheValue};
use crate::cache::traits::store::{ReadStore, WriteStore};
use crate::cache::types::CacheError;

/// The default number of entries an LRU tier holds.
pub const DEFAULT_CACHE_SIZE: usize = 2048;

const NIL: usize = usize::MAX;

#[derive(Debug)]
struct LedgerNode<K> {
    key: Option<K>,
    prev: usize,
    next: usize,
}

/// Ordered sequence of keys from most- to least-recently-used.
///
/// Invariant: the ledger and the owning cache's key map always hold
/// identical key sets.
#[derive(Debug)]
pub(crate) struct RecencyLedger<K> {
    nodes: Vec<LedgerNode<K>>,
    free: Vec<usize>,
    head: usize,
    tail: usize,
    len: usize,
}

impl<K: Clone> RecencyLedger<K> {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(capacity),
            free: Vec::new(),
            head: NIL,
            tail: NIL,
            len: 0,
        }
    }

    /// Insert a key at the most-recently-used end. Returns its slot.
    fn push_front(&mut self, key: K) -> usize {
        let slot = match self.free.pop() {
            Some(slot) => {
                self.nodes[slot] = LedgerNode {
                    key: Some(key),
                    prev: NIL,
                    next: self.head,
                };
                slot
            }
            None => {
                self.nodes.push(LedgerNode {
                    key: Some(key),
                    prev: NIL,
                    next: self.head,
                });
                self.nodes.len() - 1
            }
        };

        if self.head != NIL {
            self.nodes[self.head].prev = slot;
        }
        self.head = slot;
        if self.tail == NIL {
            self.tail = slot;
        }
        self.len += 1;
        slot
    }

    /// Detach a slot from the list and return it to the free pool.
    fn release(&mut self, slot: usize) {
        let (prev, next) = (self.nodes[slot].prev, self.nodes[slot].next);
        if prev != NIL {
            self.nodes[prev].next = next;
        } else {
            self.head = next;
        }
        if next != NIL {
            self.nodes[next].prev = prev;
        } else {
            self.tail = prev;
        }
        self.nodes[slot].key = None;
        self.free.push(slot);
        self.len -= 1;
    }

    /// Mark a slot most-recently-used.
    fn touch(&mut self, slot: usize) {
        if self.head == slot {
            return;
        }
        let key = match self.nodes[slot].key.take() {
            Some(key) => key,
            // Slot is always live when touched; the key map owns the slot.
            None => return,
        };
        self.release(slot);
        let new_slot = self.push_front(key);
        debug_assert_eq!(new_slot, slot);
    }

    /// Remove and return the least-recently-used key.
    fn pop_back(&mut self) -> Option<K> {
        if self.tail == NIL {
            return None;
        }
        let slot = self.tail;
        let key = self.nodes[slot].key.clone();
        self.release(slot);
        key
    }

    fn clear(&mut self) {
        self.nodes.clear();
        self.free.clear();
        self.head = NIL;
        self.tail = NIL;
        self.len = 0;
    }

    #[cfg(test)]
    fn keys_in_recency_order(&self) -> Vec<K> {
        let mut keys = Vec::with_capacity(self.len);
        let mut slot = self.head;
        while slot != NIL {
            if let Some(key) = &self.nodes[slot].key {
                keys.push(key.clone());
            }
            slot = self.nodes[slot].next;
        }
        keys
    }
}

#[derive(Debug)]
struct Slot<V> {
    value: Arc<V>,
    node: usize,
}

#[derive(Debug)]
struct LruState<K, V> {
    entries: HashMap<K, Slot<V>>,
    ledger: RecencyLedger<K>,
}

/// A thread-safe fixed-capacity LRU cache.
///
/// All operations are mutually exclusive on one instance; the structure is
/// shared across request-handling contexts and callers never need external
/// locking. Values are handed out as `Arc` clones, so a value may still be
/// read while it is evicted.
#[derive(Debug)]
pub struct LruCache<K: CacheKey, V: CacheValue> {
    state: Mutex<LruState<K, V>>,
    capacity: usize,
}

impl<K: CacheKey, V: CacheValue> LruCache<K, V> {
    /// Create an LRU cache holding at most `capacity` entries.
    ///
    /// A capacity of zero is an invalid configuration, not a silent no-op
    /// cache.
    pub fn new(capacity: usize) -> Result<Self, CacheError> {
        if capacity == 0 {
            return Err(CacheError::invalid_configuration(
                "LRU cache capacity must be at least 1",
            ));
        }
        Ok(Self {
            state: Mutex::new(LruState {
                entries: HashMap::with_capacity(capacity.min(DEFAULT_CACHE_SIZE)),
                ledger: RecencyLedger::with_capacity(capacity.min(DEFAULT_CACHE_SIZE)),
            }),
            capacity,
        })
    }

    fn state(&self) -> MutexGuard<'_, LruState<K, V>> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// True iff the key is present. Does not alter recency.
    pub fn has(&self, key: &K) -> bool {
        self.state().entries.contains_key(key)
    }

    /// Get a value, marking the key most-recently-used on hit.
    ///
    /// A miss has no side effects.
    pub fn get(&self, key: &K) -> Option<Arc<V>> {
        let mut state = self.state();
        let node = state.entries.get(key)?.node;
        state.ledger.touch(node);
        state.entries.get(key).map(|slot| Arc::clone(&slot.value))
    }

    /// Insert or overwrite a value. Returns the replaced value, if any.
    ///
    /// Overwriting applies remove-then-insert semantics. Inserting a new key
    /// at capacity evicts the least-recently-used entry first.
    pub fn add(&self, key: K, value: Arc<V>) -> Option<Arc<V>> {
        let mut state = self.state();

        let replaced = match state.entries.remove(&key) {
            Some(slot) => {
                state.ledger.release(slot.node);
                Some(slot.value)
            }
            None => None,
        };

        if state.entries.len() == self.capacity {
            if let Some(victim) = state.ledger.pop_back() {
                state.entries.remove(&victim);
            }
        }

        let node = state.ledger.push_front(key.clone());
        state.entries.insert(key, Slot { value, node });
        debug_assert_eq!(state.entries.len(), state.ledger.len);
        replaced
    }

    /// Remove a value. Removing an absent key is a silent no-op.
    pub fn remove(&self, key: &K) -> Option<Arc<V>> {
        let mut state = self.state();
        let slot = state.entries.remove(key)?;
        state.ledger.release(slot.node);
        Some(slot.value)
    }

    /// Number of entries currently held.
    pub fn len(&self) -> usize {
        self.state().entries.len()
    }

    /// True if the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The configured capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Remove all entries.
    pub fn clear(&self) {
        let mut state = self.state();
        state.entries.clear();
        state.ledger.clear();
    }
}

impl<K: CacheKey, V: CacheValue> ReadStore<K, V> for LruCache<K, V> {
    fn has(&self, key: &K) -> bool {
        LruCache::has(self, key)
    }

    fn get(&self, key: &K) -> Result<Option<Arc<V>>, CacheError> {
        Ok(LruCache::get(self, key))
    }
}

impl<K: CacheKey, V: CacheValue> WriteStore<K, V> for LruCache<K, V> {
    fn add(&self, key: K, value: Arc<V>) -> Option<Arc<V>> {
        LruCache::add(self, key, value)
    }

    fn remove(&self, key: &K) -> Option<Arc<V>> {
        LruCache::remove(self, key)
    }

    fn len(&self) -> usize {
        LruCache::len(self)
    }

    fn clear(&self) {
        LruCache::clear(self)
    }
}
