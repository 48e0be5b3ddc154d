//! Fast-tier storage implementations.

pub mod memory;

pub use memory::LruCache;
