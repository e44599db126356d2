use async_trait::async_trait;
use domain::event::{EntityEvent, EntityEventType};
use harness::Service;
use library::cache::{CacheStore, CacheStoreExt};
use library::communication::event::Consumer;
use library::communication::CommunicationFactory;
use library::EmptyResult;
use std::marker::PhantomData;
use std::time::Duration;
use tracing::{debug, instrument, trace};

/// Applies entity change events to the cached snapshots
///
/// Consumes:
/// - any [`EntityEvent`], e.g. [`PostEvent`](domain::event::PostEvent) or [`CommentEvent`](domain::event::CommentEvent)
///
/// Creations and updates overwrite the snapshot, deletions remove it. Keys derived from the
/// entity are evicted in either case. Redelivered events converge to the same cache state.
pub struct ContentInvalidationService<N, F: CommunicationFactory> {
    cache: <F as CommunicationFactory>::CacheStore,
    ttl: Duration,
    event: PhantomData<fn() -> N>,
}

impl<N, F> Service<F> for ContentInvalidationService<N, F>
where
    N: EntityEvent + Send + Sync + 'static,
    F: CommunicationFactory + Send + Sync,
{
    const NAME: &'static str = "ContentInvalidationService";
    type Instance = ContentInvalidationService<N, F>;
    type Config = Duration;

    fn instantiate(factory: F, ttl: &Self::Config) -> Self::Instance {
        Self {
            cache: factory.cache_store(),
            ttl: *ttl,
            event: PhantomData,
        }
    }
}

#[async_trait]
impl<N, F> Consumer for ContentInvalidationService<N, F>
where
    N: EntityEvent + Send + Sync + 'static,
    F: CommunicationFactory + Send + Sync,
{
    type Notification = N;

    #[instrument(skip(self, event), fields(key = %event.entity_key(), event_type = ?event.event_type()))]
    async fn consume(&self, event: Self::Notification) -> EmptyResult {
        let key = event.entity_key().to_string();

        match event.event_type() {
            EntityEventType::Create | EntityEventType::Update => {
                self.cache.set_json(&key, &event.snapshot(), self.ttl).await?;
                debug!("Refreshed snapshot");
            }
            EntityEventType::Delete => {
                self.cache.delete(&key).await?;
                debug!("Removed snapshot");
            }
        }

        for evicted in event.evicted_keys() {
            let evicted = evicted.to_string();
            self.cache.delete(&evicted).await?;
            trace!(%evicted, "Evicted derived key");
        }

        Ok(())
    }
}
