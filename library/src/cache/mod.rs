//! Key-value cache with expiry
//!
//! The cache never holds authoritative data. Every value is a derived copy which may vanish at any
//! time, readers go back to the source on a miss through [`CacheStoreExt::get_or_load`]. Failures of
//! the cache itself are thus logged and otherwise treated like a miss.

mod memory;
mod redis;

pub use self::memory::MemoryCache;
pub use self::redis::RedisCache;

use crate::{BoxedError, EmptyResult};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use std::time::Duration;
use tracing::{trace, warn};

/// Raw string cache with per-key expiry
#[async_trait]
pub trait CacheStore {
    /// Retrieves a live value
    async fn get(&self, key: &str) -> Result<Option<String>, BoxedError>;

    /// Stores a value which expires after `ttl`, replacing any previous value and expiry
    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> EmptyResult;

    /// Removes a value, absent keys are not an error
    async fn delete(&self, key: &str) -> EmptyResult;

    /// Atomically adds `delta` to an integer value if it is present, flooring the result at zero
    /// and refreshing its expiry. Returns the new value or `None` if the key was absent.
    async fn adjust(&self, key: &str, delta: i64, ttl: Duration)
        -> Result<Option<i64>, BoxedError>;
}

/// Typed access to a [`CacheStore`] using [`serde_json`]
#[async_trait]
pub trait CacheStoreExt: CacheStore {
    /// Retrieves and decodes a value, undecodable values count as a miss
    async fn get_json<T>(&self, key: &str) -> Result<Option<T>, BoxedError>
    where
        T: DeserializeOwned;

    /// Encodes and stores a value
    async fn set_json<T>(&self, key: &str, value: &T, ttl: Duration) -> EmptyResult
    where
        T: Serialize + Sync;

    /// Returns the cached value or invokes the loader and caches its result
    ///
    /// Loader errors are passed through untouched and nothing is cached in that case.
    async fn get_or_load<T, E, L, Fut>(&self, key: &str, ttl: Duration, loader: L) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned + Send + Sync,
        E: Send,
        L: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<T, E>> + Send;
}

#[async_trait]
impl<S> CacheStoreExt for S
where
    S: CacheStore + Send + Sync + ?Sized,
{
    async fn get_json<T>(&self, key: &str) -> Result<Option<T>, BoxedError>
    where
        T: DeserializeOwned,
    {
        let raw = match self.get(key).await? {
            Some(raw) => raw,
            None => return Ok(None),
        };

        match serde_json::from_str(&raw) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                warn!(key, error = %e, "Discarding undecodable cache value");
                Ok(None)
            }
        }
    }

    async fn set_json<T>(&self, key: &str, value: &T, ttl: Duration) -> EmptyResult
    where
        T: Serialize + Sync,
    {
        let raw = serde_json::to_string(value)?;
        self.set_with_ttl(key, &raw, ttl).await
    }

    async fn get_or_load<T, E, L, Fut>(&self, key: &str, ttl: Duration, loader: L) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned + Send + Sync,
        E: Send,
        L: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<T, E>> + Send,
    {
        match self.get_json::<T>(key).await {
            Ok(Some(value)) => {
                trace!(key, "Cache hit");
                return Ok(value);
            }
            Ok(None) => trace!(key, "Cache miss"),
            Err(e) => warn!(key, error = %e, "Cache read failed, loading from source"),
        }

        let value = loader().await?;

        if let Err(e) = self.set_json(key, &value, ttl).await {
            warn!(key, error = %e, "Failed to populate cache");
        }

        Ok(value)
    }
}
