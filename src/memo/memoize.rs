//! Memoizing Wrapper
//!
//! Wraps an asynchronous operation so calls that derive the same key share one
//! result from the cache instead of running the operation again.

use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::cache::{CacheValue, InFlight, SharedCache};
use crate::error::{GatewayError, Result};
use crate::memo::{argument_list, CacheKeySpec, KeyDeriver};

type Operation<A, T> = Arc<dyn Fn(A) -> BoxFuture<'static, Result<T>> + Send + Sync>;

// == Memoized ==
/// An asynchronous operation bound to the shared cache.
///
/// Only operations returning a future can be wrapped; the bounds on [`Memoized::new`]
/// make a synchronous callable a compile error. A spec that cannot be applied
/// (malformed key paths) fails at wrap time with [`GatewayError::CacheApply`].
///
/// At most one execution per key runs at a time: the pending computation is
/// published under the write lock before anyone awaits it, and concurrent callers
/// join it. A failed computation is removed so the next call runs again.
pub struct Memoized<A, T> {
    cache: SharedCache,
    deriver: KeyDeriver,
    ttl: Option<Duration>,
    op: Operation<A, T>,
    _result: PhantomData<fn() -> T>,
}

impl<A, T> Clone for Memoized<A, T> {
    fn clone(&self) -> Self {
        Self {
            cache: self.cache.clone(),
            deriver: self.deriver.clone(),
            ttl: self.ttl,
            op: self.op.clone(),
            _result: PhantomData,
        }
    }
}

impl<A, T> std::fmt::Debug for Memoized<A, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Memoized")
            .field("deriver", &self.deriver)
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl<A, T> Memoized<A, T>
where
    A: Serialize + Send + 'static,
    T: Serialize + DeserializeOwned + Send + 'static,
{
    /// Wraps `op` using `spec` for keys and TTL.
    pub fn new<F, Fut>(cache: SharedCache, spec: CacheKeySpec, op: F) -> Result<Self>
    where
        F: Fn(A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let deriver = spec.compile()?;
        Ok(Self {
            cache,
            deriver,
            ttl: spec.ttl_value(),
            op: Arc::new(move |args| op(args).boxed()),
            _result: PhantomData,
        })
    }

    /// The key a call with `args` reads and writes.
    pub fn cache_key(&self, args: &A) -> Result<String> {
        Ok(self.deriver.derive(&argument_list(args)?))
    }

    // == Call ==
    /// Returns the cached result for `args`, running the operation on a miss.
    pub async fn call(&self, args: A) -> Result<T> {
        // Keys can embed credentials, so only the prefix is ever logged
        let key = self.cache_key(&args)?;

        let in_flight = {
            let mut store = self.cache.write().await;
            match store.get(&key) {
                Some(CacheValue::Ready(value)) => {
                    debug!(prefix = self.key_prefix(), "memo hit");
                    return decode(value);
                }
                Some(CacheValue::Pending(in_flight)) => {
                    debug!(prefix = self.key_prefix(), "joining in-flight computation");
                    in_flight
                }
                None => {
                    debug!(prefix = self.key_prefix(), "memo miss");
                    let computation = (self.op)(args)
                        .map(|outcome| outcome.and_then(encode))
                        .boxed()
                        .shared();
                    let in_flight = InFlight::new(computation);
                    store.set(key.clone(), CacheValue::Pending(in_flight.clone()), self.ttl);
                    in_flight
                }
            }
        };

        let outcome = in_flight.computation.clone().await;

        // Every waiter settles the slot; only the first one to get here has any
        // effect, and a slot reused by a newer computation is left alone.
        {
            let mut store = self.cache.write().await;
            match &outcome {
                Ok(value) => {
                    store.resolve(&key, in_flight.id, value.clone());
                }
                Err(err) => {
                    if store.discard(&key, in_flight.id) {
                        warn!(prefix = self.key_prefix(), error = %err, "memoized call failed, entry dropped");
                    }
                }
            }
        }

        outcome.and_then(decode)
    }

    /// Drops the cached result for `args`.
    pub async fn invalidate(&self, args: &A) -> Result<bool> {
        let key = self.cache_key(args)?;
        Ok(self.cache.write().await.delete(&key))
    }

    pub fn key_prefix(&self) -> &str {
        self.deriver.prefix()
    }
}

fn encode<T: Serialize>(value: T) -> Result<Value> {
    serde_json::to_value(value)
        .map_err(|e| GatewayError::Internal(format!("memoized result is not serializable: {e}")))
}

fn decode<T: DeserializeOwned>(value: Value) -> Result<T> {
    serde_json::from_value(value)
        .map_err(|e| GatewayError::Internal(format!("cached value has unexpected shape: {e}")))
}
