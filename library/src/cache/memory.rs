use super::CacheStore;
use crate::{BoxedError, EmptyResult};
use async_trait::async_trait;
use lru::LruCache;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::time::Instant;

#[derive(Debug, Error)]
#[error("value at {0} is not an integer")]
struct NotAnInteger(String);

struct CachedValue {
    value: String,
    expires_at: Instant,
}

/// In-process [`CacheStore`] bounded in size, evicting the least recently used entries first
///
/// Clones share the same storage.
#[derive(Clone)]
pub struct MemoryCache {
    entries: Arc<Mutex<LruCache<String, CachedValue>>>,
}

impl MemoryCache {
    /// Creates a cache holding at most `capacity` entries
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Arc::new(Mutex::new(LruCache::new(capacity.max(1)))),
        }
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>, BoxedError> {
        let key = key.to_owned();
        let mut entries = self.entries.lock().await;

        let cached = entries
            .get(&key)
            .map(|cached| (cached.expires_at > Instant::now(), cached.value.clone()));

        match cached {
            Some((true, value)) => Ok(Some(value)),
            Some((false, _)) => {
                entries.pop(&key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> EmptyResult {
        self.entries.lock().await.put(
            key.to_owned(),
            CachedValue {
                value: value.to_owned(),
                expires_at: Instant::now() + ttl,
            },
        );

        Ok(())
    }

    async fn delete(&self, key: &str) -> EmptyResult {
        self.entries.lock().await.pop(&key.to_owned());
        Ok(())
    }

    async fn adjust(
        &self,
        key: &str,
        delta: i64,
        ttl: Duration,
    ) -> Result<Option<i64>, BoxedError> {
        let key = key.to_owned();
        let now = Instant::now();
        let mut entries = self.entries.lock().await;

        match entries.get(&key).map(|cached| cached.expires_at > now) {
            Some(true) => {}
            Some(false) => {
                entries.pop(&key);
                return Ok(None);
            }
            None => return Ok(None),
        }

        let cached = match entries.get_mut(&key) {
            Some(cached) => cached,
            None => return Ok(None),
        };

        let current: i64 = cached
            .value
            .parse()
            .map_err(|_| NotAnInteger(key.clone()))?;
        let updated = current.saturating_add(delta).max(0);

        cached.value = updated.to_string();
        cached.expires_at = now + ttl;

        Ok(Some(updated))
    }
}

#[cfg(test)]
mod does {
    use super::super::CacheStoreExt;
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const TTL: Duration = Duration::from_secs(300);

    #[tokio::test(start_paused = true)]
    async fn expire_values() {
        let cache = MemoryCache::new(16);
        cache.set_with_ttl("post:5", "{}", TTL).await.unwrap();

        tokio::time::advance(Duration::from_secs(299)).await;
        assert_eq!(cache.get("post:5").await.unwrap(), Some("{}".to_owned()));

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(cache.get("post:5").await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn evict_least_recently_used() {
        let cache = MemoryCache::new(2);
        cache.set_with_ttl("a", "1", TTL).await.unwrap();
        cache.set_with_ttl("b", "2", TTL).await.unwrap();
        cache.get("a").await.unwrap();
        cache.set_with_ttl("c", "3", TTL).await.unwrap();

        assert_eq!(cache.get("b").await.unwrap(), None);
        assert_eq!(cache.get("a").await.unwrap(), Some("1".to_owned()));
    }

    #[tokio::test(start_paused = true)]
    async fn adjust_only_present_values() {
        let cache = MemoryCache::new(16);
        assert_eq!(cache.adjust("count", 1, TTL).await.unwrap(), None);
        assert_eq!(cache.get("count").await.unwrap(), None);

        cache.set_with_ttl("count", "1", TTL).await.unwrap();
        assert_eq!(cache.adjust("count", 1, TTL).await.unwrap(), Some(2));
        assert_eq!(cache.adjust("count", -5, TTL).await.unwrap(), Some(0));
    }

    #[tokio::test(start_paused = true)]
    async fn refresh_expiry_on_adjust() {
        let cache = MemoryCache::new(16);
        cache.set_with_ttl("count", "3", TTL).await.unwrap();

        tokio::time::advance(Duration::from_secs(200)).await;
        cache.adjust("count", 1, TTL).await.unwrap();
        tokio::time::advance(Duration::from_secs(200)).await;

        assert_eq!(cache.get("count").await.unwrap(), Some("4".to_owned()));
    }

    #[tokio::test(start_paused = true)]
    async fn load_only_on_miss() {
        let cache = MemoryCache::new(16);
        let loads = AtomicUsize::new(0);

        for _ in 0..2 {
            let value: Result<Vec<String>, BoxedError> = cache
                .get_or_load("user_comments:7", TTL, || async {
                    loads.fetch_add(1, Ordering::SeqCst);
                    Ok(vec!["first".to_owned()])
                })
                .await;

            assert_eq!(value.unwrap(), vec!["first".to_owned()]);
        }

        assert_eq!(loads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn not_cache_loader_failures() {
        let cache = MemoryCache::new(16);

        let failed: Result<u64, &str> = cache
            .get_or_load("like_count:post:1", TTL, || async { Err("unavailable") })
            .await;

        assert_eq!(failed, Err("unavailable"));
        assert_eq!(cache.get("like_count:post:1").await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn treat_undecodable_values_as_miss() {
        let cache = MemoryCache::new(16);
        cache.set_with_ttl("like_count:post:1", "not json", TTL).await.unwrap();

        let value: Result<u64, BoxedError> = cache
            .get_or_load("like_count:post:1", TTL, || async { Ok(4) })
            .await;

        assert_eq!(value.unwrap(), 4);
        assert_eq!(cache.get("like_count:post:1").await.unwrap(), Some("4".to_owned()));
    }
}
