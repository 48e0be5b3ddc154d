//! Convenience re-exports for common cascara usage.

pub use crate::cache::cascade::{CascadeCache, LruMemoryCache};
pub use crate::cache::config::CacheConfig;
pub use crate::cache::coordinator::request::RequestCoordinator;
pub use crate::cache::coordinator::types::{
    LoadRequest, Loader, RequestCompleteArgs, RequestEvents, RequestFailedArgs, RequestState,
};
pub use crate::cache::events::{Event, ListenerId};
pub use crate::cache::statistics::{CacheStatistics, StatisticsSnapshot};
pub use crate::cache::tier::memory::LruCache;
pub use crate::cache::traits::core::{CacheKey, CacheValue};
pub use crate::cache::traits::store::{CacheNode, ReadStore, StoreEvents, WriteStore};
pub use crate::cache::types::{CacheError, CacheStatus};
pub use crate::cache::worker::task_queue::TaskQueue;
pub use crate::cache::worker::types::{TaskContext, TaskState};
