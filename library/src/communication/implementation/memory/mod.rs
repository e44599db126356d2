//! In-process implementation of the message bus
//!
//! Mirrors the semantics of the [Redis](super::redis) implementation closely enough to run
//! services and their tests without a server: consumer groups with pending entries and idle claims
//! on the log side, fire-and-forget delivery to current subscribers on the channel side.

mod channel;
mod log;

pub use self::log::MemoryQueueEntry;

use super::super::request::CompositeRequestor;
use super::super::CommunicationFactory;
use crate::cache::MemoryCache;
use futures::channel::mpsc::UnboundedSender;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Shared in-process log and channel broker
///
/// Clones share the same state.
#[derive(Clone, Default)]
pub struct MemoryBroker {
    state: Arc<Mutex<BrokerState>>,
}

#[derive(Default)]
struct BrokerState {
    topics: HashMap<String, log::Topic>,
    channels: HashMap<String, Vec<UnboundedSender<Vec<u8>>>>,
}

/// [`CommunicationFactory`] backed by a [`MemoryBroker`] and a [`MemoryCache`]
#[derive(Clone)]
pub struct MemoryCommunicationFactory {
    broker: MemoryBroker,
    cache: MemoryCache,
}

impl MemoryCommunicationFactory {
    /// Creates a new instance from raw parts
    pub fn new(broker: MemoryBroker, cache: MemoryCache) -> Self {
        Self { broker, cache }
    }

    /// Broker shared by every primitive created by this factory
    pub fn broker(&self) -> &MemoryBroker {
        &self.broker
    }

    /// Cache shared by every primitive created by this factory
    pub fn cache(&self) -> &MemoryCache {
        &self.cache
    }
}

impl Default for MemoryCommunicationFactory {
    fn default() -> Self {
        Self::new(MemoryBroker::default(), MemoryCache::new(1024))
    }
}

impl CommunicationFactory for MemoryCommunicationFactory {
    type QueueProvider = MemoryBroker;
    type NotificationPublisher = MemoryBroker;
    type Requestor = CompositeRequestor<MemoryBroker, MemoryBroker>;
    type ResponsePublisher = MemoryBroker;
    type CacheStore = MemoryCache;

    fn queue_provider(&self) -> Self::QueueProvider {
        self.broker.clone()
    }

    fn notification_publisher(&self) -> Self::NotificationPublisher {
        self.broker.clone()
    }

    fn requestor(&self) -> Self::Requestor {
        CompositeRequestor::new(self.broker.clone(), self.broker.clone())
    }

    fn response_publisher(&self) -> Self::ResponsePublisher {
        self.broker.clone()
    }

    fn cache_store(&self) -> Self::CacheStore {
        self.cache.clone()
    }
}
