use super::{ConsumerGroupDescriptor, QueueDescriptor, QueueEntry};
use crate::BoxedError;
use async_trait::async_trait;
use futures::stream::BoxStream;
use std::time::Duration;

/// Tuning knobs for reading from a queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumptionOptions {
    /// Maximum number of entries fetched per read
    pub batch_size: usize,
    /// How long a single read blocks waiting for new entries
    pub poll_interval: Duration,
    /// Entries pending at other consumers for longer than this are taken over, `None` disables it
    pub claim_idle: Option<Duration>,
}

impl Default for ConsumptionOptions {
    fn default() -> Self {
        Self {
            batch_size: 10,
            poll_interval: Duration::from_secs(1),
            claim_idle: Some(Duration::from_secs(30)),
        }
    }
}

/// Allows consumption of notification queues using [consumer groups](ConsumerGroupDescriptor)
#[async_trait]
pub trait QueueProvider {
    /// Type of [`QueueEntry`] returned by the provider
    type Entry: QueueEntry + Send + Sync;

    /// Subscribes to notifications on a given queue joining the specified [`ConsumerGroup`](ConsumerGroupDescriptor)
    /// with the given [`ConsumerIdentifier`](super::ConsumerIdentifier), creating the group if it does not exist.
    ///
    /// Entries previously delivered to this consumer but never acknowledged are yielded first.
    /// The stream ends with an error item when the underlying transport fails.
    async fn consume(
        &self,
        queue: QueueDescriptor,
        group: &ConsumerGroupDescriptor,
        consumer: &str,
        options: &ConsumptionOptions,
    ) -> Result<BoxStream<'static, Result<Self::Entry, BoxedError>>, BoxedError>;
}
