use super::LikeCounts;
use async_trait::async_trait;
use domain::counts::{CountError, LikeCountSource};
use domain::event::LikeEvent;
use harness::Service;
use library::communication::event::Consumer;
use library::communication::CommunicationFactory;
use library::EmptyResult;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Keeps cached like counts current
///
/// Consumes:
/// - any [`LikeEvent`], e.g. [`PostLikeEvent`](domain::event::PostLikeEvent) or [`CommentLikeEvent`](domain::event::CommentLikeEvent)
///
/// Events reporting the count observed by the producer overwrite the cached value. All others
/// adjust a cached value by one. When nothing is cached the count is reconciled with the
/// [`LikeCountSource`], which already includes the interaction at hand.
pub struct LikeAggregationService<N, S, F: CommunicationFactory> {
    counts: LikeCounts<S, <F as CommunicationFactory>::CacheStore>,
    event: PhantomData<fn() -> N>,
}

impl<N, S, F> Service<F> for LikeAggregationService<N, S, F>
where
    N: LikeEvent + Send + Sync + 'static,
    S: LikeCountSource + Send + Sync,
    F: CommunicationFactory + Send + Sync,
{
    const NAME: &'static str = "LikeAggregationService";
    type Instance = LikeAggregationService<N, S, F>;
    type Config = (Arc<S>, Duration);

    fn instantiate(factory: F, config: &Self::Config) -> Self::Instance {
        Self {
            counts: LikeCounts::new(config.0.clone(), factory.cache_store(), config.1),
            event: PhantomData,
        }
    }
}

#[async_trait]
impl<N, S, F> Consumer for LikeAggregationService<N, S, F>
where
    N: LikeEvent + Send + Sync + 'static,
    S: LikeCountSource + Send + Sync,
    F: CommunicationFactory + Send + Sync,
{
    type Notification = N;

    #[instrument(skip(self, event), fields(target = ?event.target(), action = ?event.action()))]
    async fn consume(&self, event: Self::Notification) -> EmptyResult {
        let (kind, id) = event.target();

        if let Some(count) = event.like_count() {
            self.counts.store(kind, id, count).await?;
            debug!(count, "Stored reported count");
            return Ok(());
        }

        if let Some(count) = self.counts.adjust(kind, id, event.action().delta()).await? {
            debug!(count, "Adjusted cached count");
            return Ok(());
        }

        match self.counts.reconcile(kind, id).await {
            Ok(_) => Ok(()),
            Err(CountError::Transient(e)) => {
                warn!(error = %e, "Like service unavailable, leaving count uncached");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod does {
    use super::*;
    use domain::event::{CommentLikeEvent, LikeAction, PostLikeEvent};
    use domain::{EntityId, EntityKind};
    use library::cache::CacheStore;
    use library::communication::implementation::memory::MemoryCommunicationFactory;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

    const TTL: Duration = Duration::from_secs(300);

    type Factory = MemoryCommunicationFactory;

    /// Like store which counts committed likes the way the producer does before publishing
    #[derive(Default)]
    struct LikeStore {
        committed: AtomicU64,
        lookups: AtomicUsize,
        offline: bool,
    }

    impl LikeStore {
        fn commit(&self, action: LikeAction) {
            match action {
                LikeAction::Like => self.committed.fetch_add(1, Ordering::SeqCst),
                LikeAction::Unlike => self.committed.fetch_sub(1, Ordering::SeqCst),
            };
        }
    }

    #[async_trait]
    impl LikeCountSource for LikeStore {
        async fn like_count(&self, _kind: EntityKind, _id: EntityId) -> Result<u64, CountError> {
            self.lookups.fetch_add(1, Ordering::SeqCst);

            if self.offline {
                Err(CountError::Transient("connection refused".into()))
            } else {
                Ok(self.committed.load(Ordering::SeqCst))
            }
        }
    }

    fn service<N>(factory: &Factory, store: &Arc<LikeStore>) -> LikeAggregationService<N, LikeStore, Factory>
    where
        N: LikeEvent + Send + Sync + 'static,
    {
        <LikeAggregationService<N, LikeStore, Factory> as Service<Factory>>::instantiate(
            factory.clone(),
            &(store.clone(), TTL),
        )
    }

    fn post_like(action: LikeAction) -> PostLikeEvent {
        PostLikeEvent {
            post_id: 42.into(),
            user_id: Some(7.into()),
            action,
            like_count: None,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn count_likes_starting_from_a_cold_cache() {
        let factory = Factory::default();
        let store = Arc::new(LikeStore::default());
        let likes = service::<PostLikeEvent>(&factory, &store);

        for _ in 0..3 {
            store.commit(LikeAction::Like);
            likes.consume(post_like(LikeAction::Like)).await.unwrap();
        }

        assert_eq!(factory.cache().get("like_count:post:42").await.unwrap(), Some("3".to_owned()));
        assert_eq!(store.lookups.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn prefer_reported_counts() {
        let factory = Factory::default();
        let store = Arc::new(LikeStore::default());
        let likes = service::<CommentLikeEvent>(&factory, &store);
        factory.cache().set_with_ttl("like_count:comment:9", "2", TTL).await.unwrap();

        likes
            .consume(CommentLikeEvent {
                comment_id: 9.into(),
                user_id: None,
                action: LikeAction::Like,
                like_count: Some(12),
            })
            .await
            .unwrap();

        assert_eq!(factory.cache().get("like_count:comment:9").await.unwrap(), Some("12".to_owned()));
        assert_eq!(store.lookups.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn never_count_below_zero() {
        let factory = Factory::default();
        let store = Arc::new(LikeStore::default());
        let likes = service::<PostLikeEvent>(&factory, &store);
        factory.cache().set_with_ttl("like_count:post:42", "0", TTL).await.unwrap();

        likes.consume(post_like(LikeAction::Unlike)).await.unwrap();

        assert_eq!(factory.cache().get("like_count:post:42").await.unwrap(), Some("0".to_owned()));
    }

    #[tokio::test(start_paused = true)]
    async fn leave_counts_cold_while_the_source_is_unavailable() {
        let factory = Factory::default();
        let store = Arc::new(LikeStore {
            offline: true,
            ..Default::default()
        });
        let likes = service::<PostLikeEvent>(&factory, &store);

        likes.consume(post_like(LikeAction::Like)).await.unwrap();

        assert_eq!(factory.cache().get("like_count:post:42").await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn recover_after_expiry() {
        let factory = Factory::default();
        let store = Arc::new(LikeStore::default());
        let likes = service::<PostLikeEvent>(&factory, &store);

        store.commit(LikeAction::Like);
        likes.consume(post_like(LikeAction::Like)).await.unwrap();
        tokio::time::advance(TTL).await;

        store.commit(LikeAction::Like);
        likes.consume(post_like(LikeAction::Like)).await.unwrap();

        assert_eq!(factory.cache().get("like_count:post:42").await.unwrap(), Some("2".to_owned()));
        assert_eq!(store.lookups.load(Ordering::SeqCst), 2);
    }
}
