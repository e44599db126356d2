use super::RedisCommunicationFactory;
use async_trait::async_trait;
use jatsl::{Job, JobManager};
use library::communication::event::{ConsumerExt, ConsumerGroupDescriptor, ConsumptionOptions};
use library::communication::implementation::redis::RedisBus;
use library::communication::CommunicationFactory;
use library::EmptyResult;
use tracing::info;

/// Structure which can be instantiated with a [`CommunicationFactory`]
pub trait Service<F: CommunicationFactory + Send + Sync> {
    /// Name of the service displayed in log messages
    const NAME: &'static str;
    /// Instance type which will be instantiated
    type Instance: Send + Sync;
    /// Configuration type passed to the service
    type Config: Send + Sync;

    /// Creates a new instance which could be of a different type.
    /// This is common when `Self: RequestProcessor` where this
    /// function would return an instance of [`Responder`](library::communication::request::Responder)
    /// containing an instance of `Self`.
    fn instantiate(factory: F, config: &Self::Config) -> Self::Instance;
}

/// Runner for [`Service`] implementations where [`Service::Instance`] is conforming to the [`ConsumerExt`] trait
pub struct ServiceRunner<S: Service<RedisCommunicationFactory>> {
    bus: RedisBus,
    group: ConsumerGroupDescriptor,
    consumer: String,
    options: ConsumptionOptions,
    config: <S as Service<RedisCommunicationFactory>>::Config,
}

impl<S> ServiceRunner<S>
where
    S: Service<RedisCommunicationFactory>,
    S::Instance: ConsumerExt + Send + Sync,
{
    /// Creates a new runner job which will use the given bus, consumer group and consumer name.
    pub fn new(
        bus: RedisBus,
        group: ConsumerGroupDescriptor,
        consumer: String,
        options: ConsumptionOptions,
        config: <S as Service<RedisCommunicationFactory>>::Config,
    ) -> Self {
        Self {
            bus,
            group,
            consumer,
            options,
            config,
        }
    }
}

#[async_trait]
impl<S> Job for ServiceRunner<S>
where
    S: Service<RedisCommunicationFactory> + Send + Sync,
    S::Instance: ConsumerExt,
{
    const NAME: &'static str = "ServiceRunner";

    fn name(&self) -> String {
        format!("{}({})", Self::NAME, S::NAME)
    }

    async fn execute(&self, manager: JobManager) -> EmptyResult {
        self.bus.ping().await?;

        let factory = RedisCommunicationFactory::new(self.bus.clone());
        let provider = factory.queue_provider();
        let service = S::instantiate(factory, &self.config);

        manager.ready().await;
        info!(service = S::NAME, group = %self.group.identifier(), consumer = %self.consumer, "Consuming queue");

        service
            .consume_queue(provider, &self.group, &self.consumer, &self.options)
            .await?;

        Ok(())
    }
}
