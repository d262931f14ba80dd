//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL support, and the
//! value a slot can hold: either a settled result or a computation still in flight.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures_util::future::{BoxFuture, Shared};
use serde_json::Value;
use tokio::time::Instant;

use crate::error::Result;

/// A computation that every waiter on the same key can poll to completion.
pub type SharedComputation = Shared<BoxFuture<'static, Result<Value>>>;

static NEXT_COMPUTATION_ID: AtomicU64 = AtomicU64::new(1);

// == In-Flight Handle ==
/// Handle to a memoized call that has been published but not yet settled.
///
/// The id lets the publisher recognise its own slot when it settles, so a slot
/// overwritten or deleted in the meantime is left alone.
#[derive(Clone)]
pub struct InFlight {
    pub id: u64,
    pub computation: SharedComputation,
}

impl InFlight {
    pub fn new(computation: SharedComputation) -> Self {
        Self {
            id: NEXT_COMPUTATION_ID.fetch_add(1, Ordering::Relaxed),
            computation,
        }
    }
}

impl fmt::Debug for InFlight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InFlight").field("id", &self.id).finish()
    }
}

// == Cache Value ==
/// What a cache slot holds.
#[derive(Debug, Clone)]
pub enum CacheValue {
    /// A settled, serializable result
    Ready(Value),
    /// A computation other callers should await instead of re-running
    Pending(InFlight),
}

impl CacheValue {
    /// Returns the settled value, if any.
    pub fn as_ready(&self) -> Option<&Value> {
        match self {
            CacheValue::Ready(value) => Some(value),
            CacheValue::Pending(_) => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, CacheValue::Pending(_))
    }
}

impl From<Value> for CacheValue {
    fn from(value: Value) -> Self {
        CacheValue::Ready(value)
    }
}

// == Cache Entry ==
/// Represents a single cache entry with value and metadata.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The stored value
    pub value: CacheValue,
    /// Insertion time
    pub created_at: Instant,
    /// Absolute expiration time, None = no expiration
    pub expires_at: Option<Instant>,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new cache entry with optional TTL.
    ///
    /// The expiry is fixed here; nothing that reads the entry moves it.
    pub fn new(value: CacheValue, ttl: Option<Duration>) -> Self {
        let now = Instant::now();
        Self {
            value,
            created_at: now,
            expires_at: ttl.map(|ttl| now + ttl),
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired.
    ///
    /// Boundary condition: an entry is expired once the current time is greater
    /// than or equal to the expiration time.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Instant::now())
    }

    /// Checks expiry against an explicit instant.
    pub fn is_expired_at(&self, now: Instant) -> bool {
        match self.expires_at {
            Some(expires) => now >= expires,
            None => false,
        }
    }

    // == Time To Live ==
    /// Returns the remaining TTL, or None if no expiration is set.
    ///
    /// # Returns
    /// - `Some(Duration::ZERO)` if the entry has expired
    /// - `Some(remaining)` if the entry has TTL and hasn't expired
    /// - `None` if the entry never expires
    pub fn ttl_remaining(&self) -> Option<Duration> {
        self.expires_at
            .map(|expires| expires.saturating_duration_since(Instant::now()))
    }
}
