//! Shared error and status types for the cache system.

/// Cache operation error types.
///
/// Synchronous errors (invalid configuration) propagate immediately to the
/// caller. Asynchronous errors never cross thread boundaries as panics; they
/// surface only through the failure event for the originating key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// Construction-time configuration error, fatal to that construction.
    InvalidConfiguration(String),
    /// A loader produced no value or failed while loading.
    LoadFailed(String),
    /// A store tier failed to produce a value (I/O, transport, corruption).
    StorageError(String),
    /// A task with the same id is already live in the queue.
    TaskExists(String),
    /// No live task with the given id.
    TaskNotFound(String),
    /// The task queue has shut down and accepts no further work.
    QueueShutdown,
}

impl std::fmt::Display for CacheError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheError::InvalidConfiguration(msg) => {
                write!(f, "Invalid configuration: {}", msg)
            }
            CacheError::LoadFailed(msg) => write!(f, "Load failed: {}", msg),
            CacheError::StorageError(msg) => write!(f, "Storage error: {}", msg),
            CacheError::TaskExists(id) => write!(f, "Task already exists: {}", id),
            CacheError::TaskNotFound(id) => write!(f, "Task not found: {}", id),
            CacheError::QueueShutdown => write!(f, "Task queue has shut down"),
        }
    }
}

impl std::error::Error for CacheError {}

impl CacheError {
    /// Create an invalid configuration error
    #[inline]
    pub fn invalid_configuration(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }

    /// Create a load failure error
    #[inline]
    pub fn load_failed(msg: impl Into<String>) -> Self {
        Self::LoadFailed(msg.into())
    }

    /// Create a storage error
    #[inline]
    pub fn storage_error(msg: impl Into<String>) -> Self {
        Self::StorageError(msg.into())
    }
}

/// How a completed request was satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum CacheStatus {
    /// An unknown or undetermined status.
    None,
    /// The response was generated from the cache with no upstream requests.
    Hit,
    /// The response came from an upstream store.
    Miss,
    /// The response was generated directly by the caching module.
    ModuleResponse,
    /// The response was served from cache after validating with the origin.
    Validated,
}
