//! Request lifecycle types and the loader collaborator contract.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::cache::events::Event;
use crate::cache::traits::core::{CacheKey, CacheValue};
use crate::cache::types::{CacheError, CacheStatus};
use crate::cache::worker::types::{TaskContext, TaskState};

/// Lifecycle state of an asynchronous request.
///
/// `Unknown` is returned for any key with no live request record, including
/// one that already reached a terminal state and was reaped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestState {
    /// No live request record for this key.
    Unknown,
    /// Scheduled, not yet picked up.
    Idle,
    /// About to run.
    Starting,
    /// The loader is executing.
    Running,
    /// Cancellation requested, loader has not yet stopped.
    Cancelling,
    /// The loader produced a value.
    Finished,
    /// The loader failed or produced no value.
    Failed,
}

impl From<TaskState> for RequestState {
    fn from(state: TaskState) -> Self {
        match state {
            TaskState::Idle => RequestState::Idle,
            TaskState::Starting => RequestState::Starting,
            TaskState::Running => RequestState::Running,
            TaskState::Cancelling => RequestState::Cancelling,
            TaskState::Finished => RequestState::Finished,
            TaskState::Failed => RequestState::Failed,
        }
    }
}

/// Payload for request completion events.
#[derive(Debug)]
pub struct RequestCompleteArgs<K: CacheKey, V: CacheValue> {
    /// The requested key.
    pub key: K,
    /// The resolved value.
    pub value: Arc<V>,
    /// Whether the value came from the cache or from upstream.
    pub status: CacheStatus,
}

/// Payload for request failure events.
#[derive(Debug, Clone)]
pub struct RequestFailedArgs<K: CacheKey> {
    /// The requested key.
    pub key: K,
    /// Human-readable description of the failure.
    pub error: String,
}

/// Request lifecycle event channels.
///
/// A consumer receives exactly one terminal event (complete, cancelled, or
/// failed) per `request` call that missed the fast path, and zero terminal
/// events for fast-path hits, which resolve synchronously inside `request`.
pub struct RequestEvents<K: CacheKey, V: CacheValue> {
    /// Fired when a request resolves with a value, either synchronously
    /// from the cache or after a background load.
    pub on_request_complete: Event<RequestCompleteArgs<K, V>>,
    /// Fired when an in-flight request is cancelled.
    pub on_request_cancelled: Event<K>,
    /// Fired when a background load fails.
    pub on_request_failed: Event<RequestFailedArgs<K>>,
}

impl<K: CacheKey, V: CacheValue> Default for RequestEvents<K, V> {
    fn default() -> Self {
        Self {
            on_request_complete: Event::new(),
            on_request_cancelled: Event::new(),
            on_request_failed: Event::new(),
        }
    }
}

impl<K: CacheKey, V: CacheValue> Clone for RequestEvents<K, V> {
    fn clone(&self) -> Self {
        Self {
            on_request_complete: self.on_request_complete.clone(),
            on_request_cancelled: self.on_request_cancelled.clone(),
            on_request_failed: self.on_request_failed.clone(),
        }
    }
}

/// Handle passed to a loader while its request runs.
///
/// Exposes the key being loaded, progress reporting, and the cooperative
/// cancellation flag.
pub struct LoadRequest<'a, K> {
    key: &'a K,
    context: &'a TaskContext,
}

impl<'a, K> LoadRequest<'a, K> {
    pub(crate) fn new(key: &'a K, context: &'a TaskContext) -> Self {
        Self { key, context }
    }

    /// The key being loaded.
    pub fn key(&self) -> &K {
        self.key
    }

    /// The task id this request runs under.
    pub fn task_id(&self) -> &str {
        self.context.task_id()
    }

    /// Report load progress, clamped to `[0, 1]`.
    pub fn set_progress(&self, progress: f32) {
        self.context.set_progress(progress);
    }

    /// True once cancellation has been requested. Loaders should poll this
    /// and stop promptly.
    pub fn is_cancelled(&self) -> bool {
        self.context.is_cancelled()
    }
}

/// Produces values for keys that miss the entire cache chain.
///
/// Supplied per concrete cache (e.g. HTTP-backed, file-backed). Invoked
/// from a background-task execution context, so implementations must be
/// thread-safe.
pub trait Loader<K: CacheKey, V: CacheValue>: Send + Sync + 'static {
    /// Load the value for the request's key.
    ///
    /// Returning `Ok(None)` means the loader could not produce a value; the
    /// coordinator treats it the same as an error: the request fails.
    fn load(&self, request: &LoadRequest<'_, K>) -> Result<Option<Arc<V>>, CacheError>;

    /// Convert a key to a unique, deterministic task id.
    ///
    /// Requests for the same key map to the same id, which is what
    /// deduplicates concurrent loads.
    fn to_task_id(&self, key: &K) -> String;
}
