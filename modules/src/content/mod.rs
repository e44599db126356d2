//! Keeps cached post and comment snapshots in line with the content store

mod options;
mod service;

use async_trait::async_trait;
use domain::event::{CommentEvent, PostEvent};
use harness::{Heart, Module, ServiceRunner};
use jatsl::{schedule, JobScheduler};
use library::communication::event::{
    ConsumerGroupDescriptor, ConsumerGroupIdentifier, QueueLocation,
};
use library::communication::implementation::redis::RedisBus;
use library::BoxedError;
use tracing::{debug, instrument};

pub use options::Options;
pub use service::ContentInvalidationService;

/// Module implementation
pub struct Content {
    options: Options,
}

impl Content {
    /// Creates a new instance from raw parts
    pub fn new(options: Options) -> Self {
        Self { options }
    }
}

#[async_trait]
impl Module for Content {
    type Bus = RedisBus;

    async fn connect(&self) -> Result<RedisBus, BoxedError> {
        self.options.redis.connect().await
    }

    #[instrument(skip(self, bus, scheduler))]
    async fn run(
        &mut self,
        bus: &RedisBus,
        scheduler: &JobScheduler,
    ) -> Result<Option<Heart>, BoxedError> {
        let group = ConsumerGroupDescriptor::new(
            ConsumerGroupIdentifier::ContentCache,
            QueueLocation::Tail,
        );
        let consumer = self.options.queueing.id.to_string();

        let post_invalidator = ServiceRunner::<ContentInvalidationService<PostEvent, _>>::new(
            bus.clone(),
            group.clone(),
            consumer.clone(),
            (&self.options.consumer).into(),
            self.options.cache.post_ttl,
        );

        let comment_invalidator =
            ServiceRunner::<ContentInvalidationService<CommentEvent, _>>::new(
                bus.clone(),
                group,
                consumer,
                (&self.options.consumer).into(),
                self.options.cache.comment_ttl,
            );

        debug!("Scheduling jobs");
        schedule!(scheduler, {
            post_invalidator,
            comment_invalidator
        });

        Ok(Some(Heart::without_heart_stone()))
    }
}
