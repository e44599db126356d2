use library::cache::RedisCache;
use library::communication::implementation::redis::{
    RedisBus, RedisPublisher, RedisQueueProvider, RedisResponseCollector,
};
use library::communication::request::CompositeRequestor;
use library::communication::CommunicationFactory;

/// [`CommunicationFactory`] handing out primitives which talk to a redis server
///
/// Every primitive shares the multiplexed connection of the underlying [`RedisBus`].
#[derive(Clone)]
pub struct RedisCommunicationFactory {
    bus: RedisBus,
}

impl RedisCommunicationFactory {
    /// Creates a new instance on top of an existing bus handle
    pub fn new(bus: RedisBus) -> Self {
        Self { bus }
    }
}

impl CommunicationFactory for RedisCommunicationFactory {
    type QueueProvider = RedisQueueProvider<RedisBus>;
    type NotificationPublisher = RedisPublisher<RedisBus>;
    type Requestor = CompositeRequestor<RedisPublisher<RedisBus>, RedisResponseCollector<RedisBus>>;
    type ResponsePublisher = RedisPublisher<RedisBus>;
    type CacheStore = RedisCache<RedisBus>;

    fn queue_provider(&self) -> Self::QueueProvider {
        RedisQueueProvider::new(self.bus.clone())
    }

    fn notification_publisher(&self) -> Self::NotificationPublisher {
        RedisPublisher::new(self.bus.clone())
    }

    fn requestor(&self) -> Self::Requestor {
        CompositeRequestor::new(
            RedisPublisher::new(self.bus.clone()),
            RedisResponseCollector::new(self.bus.clone()),
        )
    }

    fn response_publisher(&self) -> Self::ResponsePublisher {
        RedisPublisher::new(self.bus.clone())
    }

    fn cache_store(&self) -> Self::CacheStore {
        RedisCache::new(self.bus.clone())
    }
}
