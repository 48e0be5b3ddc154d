//! Capability contracts for cache tiers and store chains.

pub mod core;
pub mod store;

pub use self::core::{CacheKey, CacheValue};
pub use self::store::{CacheNode, ReadStore, StoreEvents, WriteStore};
