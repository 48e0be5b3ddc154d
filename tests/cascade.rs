//! Multi-tier chain scenarios: promotion, local invalidation, statistics.

use cascara::{CacheStatistics, LruMemoryCache};

fn tier(capacity: usize) -> LruMemoryCache<String, String> {
    LruMemoryCache::with_capacity(capacity).expect("valid capacity")
}

#[test]
fn three_tier_chain_promotes_on_the_return_path() {
    let slow = tier(32);
    slow.add("k".to_string(), "origin".to_string());

    let mut middle = tier(8);
    middle.set_child(Box::new(slow));

    let mut fast = tier(2);
    fast.set_child(Box::new(middle));

    let value = fast.get(&"k".to_string()).expect("chain is healthy");
    assert_eq!(value.as_deref().map(String::as_str), Some("origin"));

    // Every traversed tier cached the value on the way back up.
    assert!(fast.local().has(&"k".to_string()));
    let middle = fast.child().expect("middle is attached");
    assert!(middle.has(&"k".to_string()));
}

#[test]
fn fast_tier_eviction_falls_back_to_the_child() {
    let slow = tier(32);
    slow.add("a".to_string(), "va".to_string());
    slow.add("b".to_string(), "vb".to_string());
    slow.add("c".to_string(), "vc".to_string());

    let mut fast = tier(1);
    fast.set_child(Box::new(slow));

    // Each promotion evicts the previous key from the capacity-1 fast tier.
    for key in ["a", "b", "c"] {
        let value = fast.get(&key.to_string()).expect("chain is healthy");
        assert!(value.is_some());
    }
    assert_eq!(fast.len(), 1);

    // Evicted keys are still reachable through the child.
    let value = fast.get(&"a".to_string()).expect("chain is healthy");
    assert_eq!(value.as_deref().map(String::as_str), Some("va"));
}

#[test]
fn statistics_observe_promotions_as_adds() {
    let slow = tier(8);
    slow.add("k".to_string(), "v".to_string());

    let mut fast = tier(4);
    fast.set_child(Box::new(slow));

    let fast_stats = CacheStatistics::watch(&fast);
    let child_stats = CacheStatistics::watch_events(fast.child_events());

    let _ = fast.get(&"k".to_string()).expect("chain is healthy");
    let _ = fast.get(&"k".to_string()).expect("chain is healthy");

    let fast_snapshot = fast_stats.snapshot();
    // Two lookups, one promotion add; the second get is a local hit.
    assert_eq!(fast_snapshot.gets, 2);
    assert_eq!(fast_snapshot.adds, 1);

    // Only the first lookup reached the child.
    let child_snapshot = child_stats.snapshot();
    assert_eq!(child_snapshot.gets, 1);
}

#[test]
fn reattaching_a_child_replaces_the_previous_one() {
    let first = tier(8);
    first.add("k".to_string(), "first".to_string());
    let second = tier(8);
    second.add("k".to_string(), "second".to_string());

    let mut fast = tier(4);
    fast.set_child(Box::new(first));
    fast.set_child(Box::new(second));

    let value = fast.get(&"k".to_string()).expect("chain is healthy");
    assert_eq!(value.as_deref().map(String::as_str), Some("second"));
}

#[test]
fn clear_is_local_and_the_chain_refills() {
    let slow = tier(8);
    slow.add("k".to_string(), "durable".to_string());

    let mut fast = tier(4);
    fast.set_child(Box::new(slow));

    let _ = fast.get(&"k".to_string()).expect("chain is healthy");
    assert_eq!(fast.len(), 1);

    fast.clear();
    assert!(fast.is_empty());

    // The durable tier was untouched and re-promotes.
    let value = fast.get(&"k".to_string()).expect("chain is healthy");
    assert_eq!(value.as_deref().map(String::as_str), Some("durable"));
    assert_eq!(fast.len(), 1);
}
