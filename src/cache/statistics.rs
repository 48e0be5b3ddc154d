//! Event-driven operation statistics for a cache tier.
//!
//! Subscribes to a node's event channels and counts operations with padded
//! atomics; a typical use is watching the fast tier of a chain to size it.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crossbeam_utils::CachePadded;

use crate::cache::events::ListenerId;
use crate::cache::traits::core::{CacheKey, CacheValue};
use crate::cache::traits::store::{CacheNode, StoreEvents};

#[derive(Debug, Default)]
struct StatCounters {
    has: CachePadded<AtomicU64>,
    gets: CachePadded<AtomicU64>,
    adds: CachePadded<AtomicU64>,
    updates: CachePadded<AtomicU64>,
    removes: CachePadded<AtomicU64>,
    clears: CachePadded<AtomicU64>,
}

/// Point-in-time view of a tier's operation counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct StatisticsSnapshot {
    pub has: u64,
    pub gets: u64,
    pub adds: u64,
    pub updates: u64,
    pub removes: u64,
    pub clears: u64,
}

struct StatListeners {
    on_has: ListenerId,
    on_get: ListenerId,
    on_add: ListenerId,
    on_update: ListenerId,
    on_remove: ListenerId,
    on_clear: ListenerId,
}

/// Operation counters attached to one store tier's events.
///
/// Counting stops when the statistics value is dropped; the listeners are
/// deregistered from the watched tier.
pub struct CacheStatistics<K: CacheKey, V: CacheValue> {
    counters: Arc<StatCounters>,
    events: StoreEvents<K, V>,
    listeners: StatListeners,
}

impl<K: CacheKey, V: CacheValue> CacheStatistics<K, V> {
    /// Attach counters to the given node's event channels.
    pub fn watch(node: &dyn CacheNode<K, V>) -> Self {
        Self::watch_events(node.events())
    }

    /// Attach counters to an event surface directly, e.g. a chain's
    /// re-published child events.
    pub fn watch_events(events: &StoreEvents<K, V>) -> Self {
        let counters = Arc::new(StatCounters::default());
        let events = events.clone();

        let c = Arc::clone(&counters);
        let on_has = events.on_has.subscribe(move |_| {
            c.has.fetch_add(1, Ordering::Relaxed);
        });
        let c = Arc::clone(&counters);
        let on_get = events.on_get.subscribe(move |_| {
            c.gets.fetch_add(1, Ordering::Relaxed);
        });
        let c = Arc::clone(&counters);
        let on_add = events.on_add.subscribe(move |_| {
            c.adds.fetch_add(1, Ordering::Relaxed);
        });
        let c = Arc::clone(&counters);
        let on_update = events.on_update.subscribe(move |_| {
            c.updates.fetch_add(1, Ordering::Relaxed);
        });
        let c = Arc::clone(&counters);
        let on_remove = events.on_remove.subscribe(move |_| {
            c.removes.fetch_add(1, Ordering::Relaxed);
        });
        let c = Arc::clone(&counters);
        let on_clear = events.on_clear.subscribe(move |_| {
            c.clears.fetch_add(1, Ordering::Relaxed);
        });

        Self {
            counters,
            events,
            listeners: StatListeners {
                on_has,
                on_get,
                on_add,
                on_update,
                on_remove,
                on_clear,
            },
        }
    }

    /// Current counter values.
    pub fn snapshot(&self) -> StatisticsSnapshot {
        StatisticsSnapshot {
            has: self.counters.has.load(Ordering::Relaxed),
            gets: self.counters.gets.load(Ordering::Relaxed),
            adds: self.counters.adds.load(Ordering::Relaxed),
            updates: self.counters.updates.load(Ordering::Relaxed),
            removes: self.counters.removes.load(Ordering::Relaxed),
            clears: self.counters.clears.load(Ordering::Relaxed),
        }
    }
}

impl<K: CacheKey, V: CacheValue> Drop for CacheStatistics<K, V> {
    fn drop(&mut self) {
        self.events.on_has.unsubscribe(self.listeners.on_has);
        self.events.on_get.unsubscribe(self.listeners.on_get);
        self.events.on_add.unsubscribe(self.listeners.on_add);
        self.events.on_update.unsubscribe(self.listeners.on_update);
        self.events.on_remove.unsubscribe(self.listeners.on_remove);
        self.events.on_clear.unsubscribe(self.listeners.on_clear);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::cascade::LruMemoryCache;

    #[test]
    fn counters_follow_tier_operations() {
        let cache = LruMemoryCache::<i32, String>::with_capacity(4).expect("valid capacity");
        let stats = CacheStatistics::watch(&cache);

        cache.add(1, "a".to_string());
        cache.add(1, "b".to_string()); // remove + add
        let _ = cache.get(&1);
        cache.has(&1);
        cache.remove(&1);
        cache.clear();

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.adds, 2);
        assert_eq!(snapshot.removes, 2); // overwrite + explicit remove
        assert_eq!(snapshot.gets, 1);
        assert_eq!(snapshot.has, 1);
        assert_eq!(snapshot.clears, 1);
        assert_eq!(snapshot.updates, 0);
    }

    #[test]
    fn dropping_statistics_stops_counting() {
        let cache = LruMemoryCache::<i32, String>::with_capacity(4).expect("valid capacity");
        let stats = CacheStatistics::watch(&cache);
        cache.add(1, "a".to_string());
        let before = stats.snapshot();
        drop(stats);

        // Events still fire, but nothing counts them; this must not panic.
        cache.add(2, "b".to_string());
        assert_eq!(before.adds, 1);
        assert_eq!(cache.events().on_add.listener_count(), 0);
    }
}
