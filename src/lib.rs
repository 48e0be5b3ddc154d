//! Cascara - Composable cascading cache engine
//!
//! A generic caching engine built as a chain of key/value stores of
//! increasing cost (memory -> disk -> network), with least-recently-used
//! eviction at the fast tier and an asynchronous request layer that
//! deduplicates, cancels, and tracks progress of background loads.
//!
//! # Features
//!
//! - **LRU fast tier**: fixed-capacity associative store with O(1) get/add
//!   and recency-ordered eviction
//! - **Cascading store chains**: read-through promotion writes a child hit
//!   into every ancestor tier on the return path
//! - **Async request coordination**: per-key deduplication, cooperative
//!   cancellation, progress reporting, and a request state machine
//! - **Event notification**: typed publish/subscribe channels for every
//!   store operation and request lifecycle transition
//! - **Internally synchronized**: callers never need external locking

// Public API modules
pub mod cascara;
pub mod prelude;

// Cache implementation modules - traits are public for user implementations
pub mod cache;

// Re-export the public API at the crate root for convenience
pub use crate::cascara::{Cascara, CascaraBuilder};
pub use crate::prelude::*;

// Public store traits and types that users need to implement custom tiers
pub mod traits {
    pub use crate::cache::traits::core::{CacheKey, CacheValue};
    pub use crate::cache::traits::store::{CacheNode, ReadStore, StoreEvents, WriteStore};
    pub use crate::cache::coordinator::types::{LoadRequest, Loader};
}
