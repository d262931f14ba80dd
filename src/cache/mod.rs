//! Cache Module
//!
//! Provides the shared in-memory store with TTL expiration and LRU eviction.

mod entry;
mod lru;
mod stats;
mod store;


use std::sync::Arc;

use tokio::sync::RwLock;

// Re-export public types
pub use entry::{CacheEntry, CacheValue, InFlight, SharedComputation};
pub use lru::LruTracker;
pub use stats::CacheStats;
pub use store::CacheStore;

// == Public Constants ==
/// Capacity of the process-wide store
pub const DEFAULT_MAX_ENTRIES: usize = 10_000;

/// Handle to the one store built at startup and injected everywhere.
pub type SharedCache = Arc<RwLock<CacheStore>>;

/// Wraps a store into a shareable handle.
pub fn shared(store: CacheStore) -> SharedCache {
    Arc::new(RwLock::new(store))
}
