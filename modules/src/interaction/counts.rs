use domain::counts::{CountError, LikeCountSource};
use domain::{CacheKey, EntityId, EntityKind};
use library::cache::{CacheStore, CacheStoreExt};
use library::{BoxedError, EmptyResult};
use std::convert::TryFrom;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Cached view onto the authoritative like counts
///
/// Reads go through the cache and fall back to the [`LikeCountSource`] on a miss.
pub struct LikeCounts<S, C> {
    source: Arc<S>,
    cache: C,
    ttl: Duration,
}

impl<S, C> LikeCounts<S, C>
where
    S: LikeCountSource + Send + Sync,
    C: CacheStore + Send + Sync,
{
    /// Creates a new instance from raw parts
    pub fn new(source: Arc<S>, cache: C, ttl: Duration) -> Self {
        Self { source, cache, ttl }
    }

    /// Number of likes of an entity
    ///
    /// A temporarily unavailable source yields zero, which is not cached.
    #[instrument(skip(self))]
    pub async fn count(&self, kind: EntityKind, id: EntityId) -> Result<u64, CountError> {
        let key = CacheKey::LikeCount(kind, id).to_string();

        let loaded = self
            .cache
            .get_or_load(&key, self.ttl, || self.source.like_count(kind, id))
            .await;

        match loaded {
            Err(CountError::Transient(e)) => {
                warn!(error = %e, "Like service unavailable, reporting zero likes");
                Ok(0)
            }
            result => result,
        }
    }

    /// Replaces the cached count with the authoritative one
    #[instrument(skip(self))]
    pub async fn reconcile(&self, kind: EntityKind, id: EntityId) -> Result<u64, CountError> {
        let count = self.source.like_count(kind, id).await?;

        if let Err(e) = self.store(kind, id, count).await {
            warn!(error = %e, "Failed to cache reconciled count");
        }

        debug!(count, "Reconciled like count");
        Ok(count)
    }

    /// Overwrites the cached count
    pub async fn store(&self, kind: EntityKind, id: EntityId, count: u64) -> EmptyResult {
        let key = CacheKey::LikeCount(kind, id).to_string();
        self.cache.set_json(&key, &count, self.ttl).await
    }

    /// Applies a relative change to a cached count, returns `None` when nothing is cached
    pub async fn adjust(
        &self,
        kind: EntityKind,
        id: EntityId,
        delta: i64,
    ) -> Result<Option<u64>, BoxedError> {
        let key = CacheKey::LikeCount(kind, id).to_string();

        Ok(self
            .cache
            .adjust(&key, delta, self.ttl)
            .await?
            .map(|count| u64::try_from(count).unwrap_or_default()))
    }
}

#[cfg(test)]
mod does {
    use super::*;
    use async_trait::async_trait;
    use library::cache::MemoryCache;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const TTL: Duration = Duration::from_secs(300);
    const POST: EntityKind = EntityKind::Post;

    #[derive(Default)]
    struct FlakySource {
        calls: AtomicUsize,
        available: bool,
    }

    #[async_trait]
    impl LikeCountSource for FlakySource {
        async fn like_count(&self, _kind: EntityKind, _id: EntityId) -> Result<u64, CountError> {
            self.calls.fetch_add(1, Ordering::SeqCst);

            if self.available {
                Ok(4)
            } else {
                Err(CountError::Transient("connection refused".into()))
            }
        }
    }

    fn counts(available: bool) -> (LikeCounts<FlakySource, MemoryCache>, Arc<FlakySource>, MemoryCache) {
        let source = Arc::new(FlakySource {
            available,
            ..Default::default()
        });
        let cache = MemoryCache::new(16);
        (LikeCounts::new(source.clone(), cache.clone(), TTL), source, cache)
    }

    #[tokio::test(start_paused = true)]
    async fn load_counts_once_within_the_ttl() {
        let (counts, source, _) = counts(true);

        assert_eq!(counts.count(POST, 42.into()).await.unwrap(), 4);
        assert_eq!(counts.count(POST, 42.into()).await.unwrap(), 4);
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);

        tokio::time::advance(TTL).await;
        counts.count(POST, 42.into()).await.unwrap();
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn fall_back_to_zero_without_caching_it() {
        let (counts, source, cache) = counts(false);

        assert_eq!(counts.count(POST, 42.into()).await.unwrap(), 0);
        assert_eq!(cache.get("like_count:post:42").await.unwrap(), None);

        counts.count(POST, 42.into()).await.unwrap();
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn overwrite_stale_counts_on_reconcile() {
        let (counts, _, cache) = counts(true);
        counts.store(POST, 42.into(), 17).await.unwrap();

        assert_eq!(counts.reconcile(POST, 42.into()).await.unwrap(), 4);
        assert_eq!(cache.get("like_count:post:42").await.unwrap(), Some("4".to_owned()));
    }

    #[tokio::test(start_paused = true)]
    async fn adjust_only_cached_counts() {
        let (counts, _, _) = counts(true);

        assert_eq!(counts.adjust(POST, 42.into(), 1).await.unwrap(), None);

        counts.store(POST, 42.into(), 1).await.unwrap();
        assert_eq!(counts.adjust(POST, 42.into(), -1).await.unwrap(), Some(0));
        assert_eq!(counts.adjust(POST, 42.into(), -1).await.unwrap(), Some(0));
    }
}
