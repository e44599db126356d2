//! Aggregates like interactions into cached counters

mod counts;
mod options;
mod service;

use async_trait::async_trait;
use domain::counts::HttpLikeCountSource;
use domain::event::{CommentLikeEvent, PostLikeEvent};
use harness::{Heart, Module, ServiceRunner};
use jatsl::{schedule, JobScheduler};
use library::communication::event::{
    ConsumerGroupDescriptor, ConsumerGroupIdentifier, QueueLocation,
};
use library::communication::implementation::redis::RedisBus;
use library::BoxedError;
use std::sync::Arc;
use tracing::{debug, instrument};

pub use counts::LikeCounts;
pub use options::Options;
pub use service::LikeAggregationService;

/// Module implementation
pub struct Interaction {
    options: Options,
}

impl Interaction {
    /// Creates a new instance from raw parts
    pub fn new(options: Options) -> Self {
        Self { options }
    }
}

#[async_trait]
impl Module for Interaction {
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
        let group =
            ConsumerGroupDescriptor::new(ConsumerGroupIdentifier::LikeCounter, QueueLocation::Tail);
        let consumer = self.options.queueing.id.to_string();
        let source = Arc::new(HttpLikeCountSource::new(&self.options.like_service));
        let config = (source, self.options.cache.like_count_ttl);

        let post_likes = ServiceRunner::<LikeAggregationService<PostLikeEvent, HttpLikeCountSource, _>>::new(
            bus.clone(),
            group.clone(),
            consumer.clone(),
            (&self.options.consumer).into(),
            config.clone(),
        );

        let comment_likes = ServiceRunner::<LikeAggregationService<CommentLikeEvent, HttpLikeCountSource, _>>::new(
            bus.clone(),
            group,
            consumer,
            (&self.options.consumer).into(),
            config,
        );

        debug!("Scheduling jobs");
        schedule!(scheduler, {
            post_likes,
            comment_likes
        });

        Ok(Some(Heart::without_heart_stone()))
    }
}
