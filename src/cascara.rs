//! High-level cache facade and builder.
//!
//! [`Cascara`] bundles the pieces most applications want: an LRU fast tier,
//! an optional child store chain, a worker-thread task queue, and a request
//! coordinator over a user-supplied [`Loader`]. [`CascaraBuilder`] provides
//! fluent configuration; the individual components stay public for
//! applications that need a different composition.

use std::sync::Arc;

use crate::cache::cascade::CascadeCache;
use crate::cache::config::CacheConfig;
use crate::cache::coordinator::request::RequestCoordinator;
use crate::cache::coordinator::types::{Loader, RequestEvents, RequestState};
use crate::cache::statistics::CacheStatistics;
use crate::cache::tier::memory::LruCache;
use crate::cache::traits::core::{CacheKey, CacheValue};
use crate::cache::traits::store::{CacheNode, StoreEvents};
use crate::cache::types::CacheError;
use crate::cache::worker::task_queue::TaskQueue;

/// Builder for a ready-to-use [`Cascara`] cache.
///
/// ```no_run
/// use std::sync::Arc;
/// use cascara::{CascaraBuilder, CacheError, LoadRequest, Loader};
///
/// struct UppercaseLoader;
///
/// impl Loader<String, String> for UppercaseLoader {
///     fn load(
///         &self,
///         request: &LoadRequest<'_, String>,
///     ) -> Result<Option<Arc<String>>, CacheError> {
///         Ok(Some(Arc::new(request.key().to_uppercase())))
///     }
///
///     fn to_task_id(&self, key: &String) -> String {
///         format!("upper/{}", key)
///     }
/// }
///
/// let cache = CascaraBuilder::new()
///     .capacity(512)
///     .worker_threads(4)
///     .build(UppercaseLoader)?;
/// cache.request(&"hello".to_string())?;
/// # Ok::<(), CacheError>(())
/// ```
pub struct CascaraBuilder<K: CacheKey, V: CacheValue> {
    config: CacheConfig,
    child: Option<Box<dyn CacheNode<K, V>>>,
}

impl<K: CacheKey, V: CacheValue> Default for CascaraBuilder<K, V> {
    fn default() -> Self {
        Self {
            config: CacheConfig::default(),
            child: None,
        }
    }
}

impl<K: CacheKey, V: CacheValue> CascaraBuilder<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing configuration, e.g. one deserialized from a
    /// settings file.
    pub fn with_config(config: CacheConfig) -> Self {
        Self {
            config,
            child: None,
        }
    }

    /// Fast-tier capacity in entries.
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.config.capacity = capacity;
        self
    }

    /// Worker threads running background loads.
    pub fn worker_threads(mut self, worker_threads: usize) -> Self {
        self.config.worker_threads = worker_threads;
        self
    }

    /// Attach a child store below the fast tier ("sink" semantics: the
    /// built cache owns it).
    pub fn child(mut self, child: Box<dyn CacheNode<K, V>>) -> Self {
        self.child = Some(child);
        self
    }

    /// Validate the configuration and assemble the cache.
    pub fn build<L: Loader<K, V>>(self, loader: L) -> Result<Cascara<K, V, L>, CacheError> {
        self.config.validate()?;

        let mut cache = CascadeCache::new(LruCache::new(self.config.capacity)?);
        if let Some(child) = self.child {
            cache.set_child(child);
        }

        let queue = TaskQueue::new(self.config.worker_threads)?;
        let coordinator = RequestCoordinator::new(cache, loader, queue);
        Ok(Cascara { coordinator })
    }
}

/// An assembled cache: LRU fast tier, optional child chain, worker pool,
/// and loader, behind one handle.
///
/// All methods take `&self`; the handle can be shared across threads inside
/// an `Arc`. Dropping the last handle shuts down the worker pool.
pub struct Cascara<K, V, L>
where
    K: CacheKey,
    V: CacheValue,
    L: Loader<K, V>,
{
    coordinator: RequestCoordinator<K, V, LruCache<K, V>, L>,
}

impl<K, V, L> Cascara<K, V, L>
where
    K: CacheKey,
    V: CacheValue,
    L: Loader<K, V>,
{
    /// Request a value; resolution arrives through [`events`](Self::events).
    /// See [`RequestCoordinator::request`].
    pub fn request(&self, key: &K) -> Result<(), CacheError> {
        self.coordinator.request(key)
    }

    /// Best-effort cancellation of an in-flight request.
    pub fn cancel_request(&self, key: &K) {
        self.coordinator.cancel_request(key)
    }

    /// Best-effort cancellation of a request that has not started running.
    pub fn cancel_queued_request(&self, key: &K) {
        self.coordinator.cancel_queued_request(key)
    }

    /// Progress of a request in `[0, 1]`.
    pub fn request_progress(&self, key: &K) -> f32 {
        self.coordinator.request_progress(key)
    }

    /// Lifecycle state of a request.
    pub fn request_state(&self, key: &K) -> RequestState {
        self.coordinator.request_state(key)
    }

    /// Number of live (scheduled but unresolved) requests.
    pub fn live_requests(&self) -> usize {
        self.coordinator.live_requests()
    }

    /// Synchronous, possibly blocking lookup through the whole chain.
    pub fn get(&self, key: &K) -> Result<Option<Arc<V>>, CacheError> {
        self.coordinator.cache().get(key)
    }

    /// True iff the key is cached at the fast tier.
    pub fn has(&self, key: &K) -> bool {
        self.coordinator.cache().has(key)
    }

    /// Cache a value directly, bypassing the loader.
    pub fn add(&self, key: K, value: V) {
        self.coordinator.cache().add(key, value)
    }

    /// Update a cached value directly.
    pub fn update(&self, key: K, value: V) {
        self.coordinator.cache().update(key, value)
    }

    /// Remove a value from the fast tier.
    pub fn remove(&self, key: &K) {
        self.coordinator.cache().remove(key)
    }

    /// Number of entries at the fast tier.
    pub fn len(&self) -> usize {
        self.coordinator.cache().len()
    }

    /// True if the fast tier holds no entries.
    pub fn is_empty(&self) -> bool {
        self.coordinator.cache().is_empty()
    }

    /// Remove all entries from the fast tier.
    pub fn clear(&self) {
        self.coordinator.cache().clear()
    }

    /// The request lifecycle event channels.
    pub fn events(&self) -> &RequestEvents<K, V> {
        self.coordinator.events()
    }

    /// The fast tier's store event channels.
    pub fn cache_events(&self) -> &StoreEvents<K, V> {
        self.coordinator.cache().events()
    }

    /// Attach operation counters to the fast tier.
    pub fn watch_statistics(&self) -> CacheStatistics<K, V> {
        CacheStatistics::watch_events(self.coordinator.cache().events())
    }

    /// The underlying request coordinator, for composition with components
    /// this facade does not expose.
    pub fn coordinator(&self) -> &RequestCoordinator<K, V, LruCache<K, V>, L> {
        &self.coordinator
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::coordinator::types::LoadRequest;
    use std::time::Duration;

    struct EchoLoader;

    impl Loader<String, String> for EchoLoader {
        fn load(
            &self,
            request: &LoadRequest<'_, String>,
        ) -> Result<Option<Arc<String>>, CacheError> {
            Ok(Some(Arc::new(format!("loaded:{}", request.key()))))
        }

        fn to_task_id(&self, key: &String) -> String {
            format!("echo/{}", key)
        }
    }

    #[test]
    fn builder_rejects_zero_capacity() {
        let result = CascaraBuilder::new().capacity(0).build(EchoLoader);
        assert!(matches!(
            result,
            Err(CacheError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn built_cache_loads_then_hits() {
        let cache = CascaraBuilder::new().build(EchoLoader).expect("valid config");
        let (tx, rx) = crossbeam_channel::unbounded();
        cache.events().on_request_complete.subscribe(move |args| {
            let _ = tx.send((args.key.clone(), (*args.value).clone(), args.status));
        });

        let key = "k".to_string();
        cache.request(&key).expect("fast path is healthy");
        let (k, v, status) = rx
            .recv_timeout(Duration::from_secs(5))
            .expect("load completes");
        assert_eq!(k, "k");
        assert_eq!(v, "loaded:k");
        assert_eq!(status, crate::cache::types::CacheStatus::Miss);

        // Second request resolves synchronously from the fast tier.
        cache.request(&key).expect("fast path is healthy");
        let (_, _, status) = rx
            .recv_timeout(Duration::from_secs(5))
            .expect("hit resolves");
        assert_eq!(status, crate::cache::types::CacheStatus::Hit);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn direct_store_methods_bypass_the_loader() {
        let cache = CascaraBuilder::new().build(EchoLoader).expect("valid config");
        cache.add("k".to_string(), "manual".to_string());
        assert!(cache.has(&"k".to_string()));
        let value = cache.get(&"k".to_string()).expect("no child to fail");
        assert_eq!(value.as_deref().map(String::as_str), Some("manual"));
        cache.remove(&"k".to_string());
        assert!(cache.is_empty());
    }
}
