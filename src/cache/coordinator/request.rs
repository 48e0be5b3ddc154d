//! The asynchronous request coordinator.
//!
//! Converts the cascading cache's blocking `get` into a non-blocking
//! `request` API: a synchronous fast-path check against the cache, and on a
//! miss a background load task keyed by a deterministic task id. Concurrent
//! requests for the same key coalesce into one in-flight task; consumers
//! observe resolution through the request event channels.

use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use log::{trace, warn};

use crate::cache::cascade::CascadeCache;
use crate::cache::coordinator::types::{
    LoadRequest, Loader, RequestCompleteArgs, RequestEvents, RequestFailedArgs, RequestState,
};
use crate::cache::traits::core::{CacheKey, CacheValue};
use crate::cache::traits::store::WriteStore;
use crate::cache::types::{CacheError, CacheStatus};
use crate::cache::worker::task_queue::TaskQueue;
use crate::cache::worker::types::TaskContext;

struct CoordinatorShared<K, V, S, L>
where
    K: CacheKey,
    V: CacheValue,
    S: WriteStore<K, V>,
    L: Loader<K, V>,
{
    cache: CascadeCache<K, V, S>,
    loader: L,
    /// Live request records: task id -> requested key. Exactly one live
    /// record may exist per task id.
    requests: DashMap<String, K>,
    events: RequestEvents<K, V>,
}

/// Coordinates background loads over a cascading cache.
///
/// Public methods are non-blocking apart from the fast-path cache check,
/// which is expected to be cheap. All request-table mutation happens under
/// the same exclusion discipline as the cache's fast tier, driven entirely
/// by scheduler callbacks.
pub struct RequestCoordinator<K, V, S, L>
where
    K: CacheKey,
    V: CacheValue,
    S: WriteStore<K, V> + 'static,
    L: Loader<K, V>,
{
    shared: Arc<CoordinatorShared<K, V, S, L>>,
    queue: TaskQueue<(K, Arc<V>)>,
}

impl<K, V, S, L> RequestCoordinator<K, V, S, L>
where
    K: CacheKey,
    V: CacheValue,
    S: WriteStore<K, V> + 'static,
    L: Loader<K, V>,
{
    /// Wrap a configured cache chain, loader, and task queue.
    ///
    /// The coordinator takes ownership of the chain; configure children
    /// with [`CascadeCache::set_child`] before constructing it.
    pub fn new(cache: CascadeCache<K, V, S>, loader: L, queue: TaskQueue<(K, Arc<V>)>) -> Self {
        let shared = Arc::new(CoordinatorShared {
            cache,
            loader,
            requests: DashMap::new(),
            events: RequestEvents::default(),
        });

        let completed = Arc::clone(&shared);
        queue.events().completed.subscribe(move |args| {
            // A completion for a task id no longer present (e.g. already
            // cancelled) is a silent no-op.
            if completed.requests.remove(&args.task_id).is_none() {
                return;
            }
            let (key, value) = &args.result;
            completed.cache.add_shared(key.clone(), Arc::clone(value));
            completed
                .events
                .on_request_complete
                .notify(&RequestCompleteArgs {
                    key: key.clone(),
                    value: Arc::clone(value),
                    status: CacheStatus::Miss,
                });
        });

        let cancelled = Arc::clone(&shared);
        queue.events().cancelled.subscribe(move |args| {
            if let Some((_, key)) = cancelled.requests.remove(&args.task_id) {
                cancelled.events.on_request_cancelled.notify(&key);
            }
        });

        let failed = Arc::clone(&shared);
        queue.events().failed.subscribe(move |args| {
            if let Some((_, key)) = failed.requests.remove(&args.task_id) {
                warn!("request for task {} failed: {}", args.task_id, args.error);
                failed.events.on_request_failed.notify(&RequestFailedArgs {
                    key,
                    error: args.error.to_string(),
                });
            }
        });

        Self { shared, queue }
    }

    /// The request lifecycle event channels.
    pub fn events(&self) -> &RequestEvents<K, V> {
        &self.shared.events
    }

    /// The wrapped cache chain.
    pub fn cache(&self) -> &CascadeCache<K, V, S> {
        &self.shared.cache
    }

    /// Request a value by its key.
    ///
    /// If the value is already cached anywhere in the chain,
    /// `on_request_complete` fires synchronously with a cache-hit status
    /// and no task is scheduled. Otherwise a background load is scheduled;
    /// a request for a key that already has an in-flight task is a silent
    /// no-op, coalesced into the existing task.
    ///
    /// An error here means the fast-path check itself failed (a broken
    /// child tier); scheduling failures for the background path surface
    /// through `on_request_failed`.
    pub fn request(&self, key: &K) -> Result<(), CacheError> {
        if let Some(value) = self.shared.cache.get(key)? {
            self.shared
                .events
                .on_request_complete
                .notify(&RequestCompleteArgs {
                    key: key.clone(),
                    value,
                    status: CacheStatus::Hit,
                });
            return Ok(());
        }

        let task_id = self.shared.loader.to_task_id(key);
        match self.shared.requests.entry(task_id.clone()) {
            // An in-flight task will satisfy this request too.
            Entry::Occupied(_) => return Ok(()),
            Entry::Vacant(slot) => {
                slot.insert(key.clone());
            }
        }

        trace!("scheduling load for task {}", task_id);
        let shared = Arc::clone(&self.shared);
        let key = key.clone();
        let started = self.queue.start(task_id.clone(), move |context: &TaskContext| {
            let request = LoadRequest::new(&key, context);
            match shared.loader.load(&request)? {
                Some(value) => Ok((key.clone(), value)),
                None => Err(CacheError::load_failed(format!(
                    "loader produced no value for task {}",
                    context.task_id()
                ))),
            }
        });

        match started {
            Ok(()) => Ok(()),
            // Lost a scheduling race; the winner's task satisfies this
            // request.
            Err(CacheError::TaskExists(_)) => Ok(()),
            Err(error) => {
                self.shared.requests.remove(&task_id);
                Err(error)
            }
        }
    }

    /// Best-effort cancellation of an in-flight or queued request.
    ///
    /// Cancelling a non-existent or already-terminal request is a silent
    /// no-op, never an error.
    pub fn cancel_request(&self, key: &K) {
        let task_id = self.shared.loader.to_task_id(key);
        if self.queue.cancel(&task_id).is_err() {
            trace!("cancel for task {} ignored: no live task", task_id);
        }
    }

    /// Best-effort cancellation of a request that has not started running.
    pub fn cancel_queued_request(&self, key: &K) {
        let task_id = self.shared.loader.to_task_id(key);
        if self.queue.cancel_queued(&task_id).is_err() {
            trace!("queued cancel for task {} ignored: no live task", task_id);
        }
    }

    /// Progress of a request in `[0, 1]`.
    ///
    /// 0 for unknown or not-started keys, the loader-reported value while
    /// running, and implicitly 1 once the value is cached.
    pub fn request_progress(&self, key: &K) -> f32 {
        if self.shared.cache.has(key) {
            return 1.0;
        }
        self.queue
            .task_progress(&self.shared.loader.to_task_id(key))
            .unwrap_or(0.0)
    }

    /// Lifecycle state of a request.
    pub fn request_state(&self, key: &K) -> RequestState {
        match self.queue.task_state(&self.shared.loader.to_task_id(key)) {
            Ok(state) => RequestState::from(state),
            Err(_) => RequestState::Unknown,
        }
    }

    /// Number of live (scheduled but unresolved) requests.
    pub fn live_requests(&self) -> usize {
        self.shared.requests.len()
    }
}
