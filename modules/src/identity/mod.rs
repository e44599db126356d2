//! Resolves access tokens into identities on behalf of other services

mod client;
mod options;
mod service;

use async_trait::async_trait;
use domain::identity::JwtTokenValidator;
use harness::{Heart, Module, ServiceRunner};
use jatsl::JobScheduler;
use library::communication::event::{
    ConsumerGroupDescriptor, ConsumerGroupIdentifier, QueueLocation,
};
use library::communication::implementation::redis::RedisBus;
use library::BoxedError;
use std::sync::Arc;
use tracing::{debug, instrument};

pub use client::{AuthenticationError, IdentityClient};
pub use options::Options;
pub use service::AuthenticationService;

/// Module implementation
pub struct Identity {
    options: Options,
}

impl Identity {
    /// Creates a new instance from raw parts
    pub fn new(options: Options) -> Self {
        Self { options }
    }
}

#[async_trait]
impl Module for Identity {
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
            ConsumerGroupDescriptor::new(ConsumerGroupIdentifier::Identity, QueueLocation::Tail);
        let consumer = self.options.queueing.id.to_string();

        let validator = Arc::new(JwtTokenValidator::new(self.options.jwt_secret.as_bytes()));
        let runner = ServiceRunner::<AuthenticationService<JwtTokenValidator, _>>::new(
            bus.clone(),
            group,
            consumer,
            (&self.options.consumer).into(),
            (validator, self.options.cache.user_profile_ttl),
        );

        debug!("Scheduling authentication service");
        scheduler.spawn_job(runner).await;

        Ok(Some(Heart::without_heart_stone()))
    }
}
