//! Cache engine internals: tiers, store chains, workers, and coordination.

pub mod cascade;
pub mod config;
pub mod coordinator;
pub mod events;
pub mod statistics;
pub mod tier;
pub mod traits;
pub mod types;
pub mod worker;
