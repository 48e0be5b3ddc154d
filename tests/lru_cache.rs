//! End-to-end behavior of the LRU fast tier through the public store API.

use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicUsize, Ordering};

use cascara::{LruCache, LruMemoryCache};

#[test]
fn overwrite_at_a_cache_node_fires_remove_before_add() {
    let cache = LruMemoryCache::<i32, String>::with_capacity(4).expect("valid capacity");
    let order = Arc::new(Mutex::new(Vec::new()));

    let o = Arc::clone(&order);
    cache.events().on_remove.subscribe(move |key| {
        o.lock().unwrap().push(format!("remove:{}", key));
    });
    let o = Arc::clone(&order);
    cache.events().on_add.subscribe(move |(key, _)| {
        o.lock().unwrap().push(format!("add:{}", key));
    });

    cache.add(1, "a".to_string());
    cache.add(1, "b".to_string());

    let recorded = order.lock().unwrap().clone();
    assert_eq!(recorded, vec!["add:1", "remove:1", "add:1"]);
}

#[test]
fn capacity_eviction_is_silent() {
    let cache = LruMemoryCache::<i32, String>::with_capacity(2).expect("valid capacity");
    let removes = Arc::new(AtomicUsize::new(0));
    let r = Arc::clone(&removes);
    cache.events().on_remove.subscribe(move |_| {
        r.fetch_add(1, Ordering::SeqCst);
    });

    cache.add(1, "a".to_string());
    cache.add(2, "b".to_string());
    cache.add(3, "c".to_string());

    // Key 1 was evicted, but eviction is a capacity mechanism, not an
    // observable removal.
    assert!(!cache.has(&1));
    assert_eq!(removes.load(Ordering::SeqCst), 0);
}

#[test]
fn shared_cache_survives_concurrent_writers() {
    let cache = Arc::new(LruCache::<usize, usize>::new(64).expect("valid capacity"));

    let mut handles = Vec::new();
    for writer in 0..4usize {
        let cache = Arc::clone(&cache);
        handles.push(std::thread::spawn(move || {
            for i in 0..500usize {
                let key = writer * 1000 + (i % 100);
                cache.add(key, Arc::new(i));
                let _ = cache.get(&key);
                if i % 7 == 0 {
                    cache.remove(&key);
                }
            }
        }));
    }
    for handle in handles {
        handle.join().expect("writer thread panicked");
    }

    assert!(cache.len() <= cache.capacity());
}

#[test]
fn evicted_values_stay_readable_through_existing_handles() {
    let cache = LruCache::<i32, String>::new(1).expect("valid capacity");
    cache.add(1, Arc::new("first".to_string()));
    let held = cache.get(&1).expect("just added");

    cache.add(2, Arc::new("second".to_string()));
    assert!(!cache.has(&1));
    // The Arc handed out before eviction still dereferences.
    assert_eq!(held.as_str(), "first");
}
