//! Core key and value traits for the cache system.

use std::fmt::Debug;
use std::hash::Hash;

/// Bounds required of every cache key.
///
/// Keys are cloned into the recency ledger and into event payloads, so they
/// should be cheap to clone (integers, small strings, interned handles).
pub trait CacheKey: Clone + Send + Sync + Debug + Hash + Eq + 'static {}

impl<T> CacheKey for T where T: Clone + Send + Sync + Debug + Hash + Eq + 'static {}

/// Bounds required of every cache value.
///
/// Values are held behind `Arc`, so they never need to be `Clone`; callers
/// receive shared handles and a value may still be read while it is being
/// evicted from a tier.
pub trait CacheValue: Send + Sync + 'static {}

impl<T> CacheValue for T where T: Send + Sync + 'static {}
