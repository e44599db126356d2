use super::{ConsumerGroupDescriptor, ConsumptionOptions};
use super::{MalformedEntry, Notification, QueueEntry, QueueProvider};
use crate::EmptyResult;
use async_trait::async_trait;
use futures::StreamExt;
use std::any::type_name;
use tracing::{debug, warn};

/// Entity which may consume and process [`Notifications`](Notification)
#[async_trait]
pub trait Consumer {
    /// Notification to consume
    type Notification: Notification;

    /// Processes an event notification and returns whether it succeeded or failed
    ///
    /// Returning a boxed [`MalformedEntry`] marks the entry as permanently unprocessable.
    async fn consume(&self, notification: Self::Notification) -> EmptyResult;
}

/// Fate of an entry after it has been handed to a [`Consumer`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Processed successfully and acknowledged
    Acknowledged,
    /// Unprocessable, acknowledged without effect
    Dropped,
    /// Left pending for redelivery
    Retained,
}

/// Decodes an entry, runs it through the consumer and acknowledges it where appropriate
pub async fn deliver<C, E>(consumer: &C, entry: &mut E) -> Delivery
where
    C: Consumer + Send + Sync,
    C::Notification: Send,
    E: QueueEntry + Send + Sync,
{
    let notification = type_name::<C::Notification>();

    let outcome = match entry.parse_payload::<C::Notification>() {
        Ok(payload) => consumer.consume(payload).await,
        Err(e) => Err(e.into()),
    };

    let delivery = match outcome {
        Ok(_) => Delivery::Acknowledged,
        Err(e) if e.is::<MalformedEntry>() => {
            warn!(entry = entry.id(), notification, error = %e, "Dropping malformed entry");
            Delivery::Dropped
        }
        Err(e) => {
            warn!(entry = entry.id(), notification, error = %e, "Failed to consume entry, leaving it for redelivery");
            return Delivery::Retained;
        }
    };

    match entry.acknowledge().await {
        Ok(_) => {
            debug!(entry = entry.id(), notification, ?delivery, "Acknowledged entry");
            delivery
        }
        Err(e) => {
            warn!(entry = entry.id(), notification, error = %e, "Failed to acknowledge entry");
            Delivery::Retained
        }
    }
}

/// Helper functions to aid the consumption of messages
#[async_trait]
pub trait ConsumerExt {
    /// Consumes notifications from a queue using the given provider, one at a time and in log order.
    ///
    /// Only returns when the underlying stream fails or ends.
    async fn consume_queue<Q>(
        &self,
        provider: Q,
        group: &ConsumerGroupDescriptor,
        consumer: &str,
        options: &ConsumptionOptions,
    ) -> EmptyResult
    where
        Q: QueueProvider + Send + Sync;
}

#[async_trait]
impl<C> ConsumerExt for C
where
    C: Consumer + Send + Sync,
    C::Notification: Send + Sync,
{
    async fn consume_queue<Q>(
        &self,
        provider: Q,
        group: &ConsumerGroupDescriptor,
        consumer: &str,
        options: &ConsumptionOptions,
    ) -> EmptyResult
    where
        Q: QueueProvider + Send + Sync,
    {
        let mut stream = provider
            .consume(C::Notification::queue(), group, consumer, options)
            .await?;

        while let Some(item) = stream.next().await {
            let mut entry = item?;
            deliver(self, &mut entry).await;
        }

        Ok(())
    }
}

#[cfg(test)]
mod does {
    use super::super::{
        ConsumerGroupIdentifier, NotificationPublisher, QueueDescriptor, QueueLocation,
        RawNotificationPublisher,
    };
    use super::*;
    use crate::communication::implementation::memory::MemoryBroker;
    use pretty_assertions::assert_eq;
    use serde::{Deserialize, Serialize};
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Greeting {
        message: String,
    }

    impl Notification for Greeting {
        fn queue() -> QueueDescriptor {
            QueueDescriptor::new("greetings".into(), 100)
        }
    }

    #[derive(Clone, Default)]
    struct Recorder {
        seen: Arc<Mutex<Vec<String>>>,
    }

    impl Recorder {
        fn seen(&self) -> Vec<String> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Consumer for Recorder {
        type Notification = Greeting;

        async fn consume(&self, notification: Greeting) -> EmptyResult {
            self.seen.lock().unwrap().push(notification.message.clone());

            match notification.message.as_str() {
                "transient" => Err("backend unavailable".into()),
                "garbage" => Err(MalformedEntry::Rejected("garbage".into()).into()),
                _ => Ok(()),
            }
        }
    }

    fn group() -> ConsumerGroupDescriptor {
        ConsumerGroupDescriptor::new(ConsumerGroupIdentifier::Other("test".into()), QueueLocation::Head)
    }

    fn options() -> ConsumptionOptions {
        ConsumptionOptions {
            claim_idle: None,
            ..Default::default()
        }
    }

    async fn greet(broker: &MemoryBroker, message: &str) {
        broker
            .publish(&Greeting {
                message: message.into(),
            })
            .await
            .unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn classify_deliveries() {
        let broker = MemoryBroker::default();
        let recorder = Recorder::default();

        greet(&broker, "hello").await;
        greet(&broker, "transient").await;
        greet(&broker, "garbage").await;
        broker
            .publish_raw(&HashMap::new(), Greeting::queue())
            .await
            .unwrap();

        let mut stream = broker
            .consume(Greeting::queue(), &group(), "c1", &options())
            .await
            .unwrap();

        let mut deliveries = Vec::new();
        for _ in 0..4 {
            let mut entry = stream.next().await.unwrap().unwrap();
            deliveries.push(deliver(&recorder, &mut entry).await);
        }

        assert_eq!(
            deliveries,
            vec![
                Delivery::Acknowledged,
                Delivery::Retained,
                Delivery::Dropped,
                Delivery::Dropped
            ]
        );
        assert_eq!(recorder.seen(), vec!["hello", "transient", "garbage"]);
        assert_eq!(broker.pending_count("greetings", "test").await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn process_entries_in_log_order() {
        let broker = MemoryBroker::default();
        let recorder = Recorder::default();

        for message in ["one", "two", "three"] {
            greet(&broker, message).await;
        }

        let task = tokio::spawn({
            let broker = broker.clone();
            let recorder = recorder.clone();
            async move {
                recorder
                    .consume_queue(broker, &group(), "c1", &options())
                    .await
            }
        });

        tokio::time::sleep(Duration::from_secs(3)).await;
        greet(&broker, "four").await;
        tokio::time::sleep(Duration::from_secs(3)).await;
        task.abort();

        assert_eq!(recorder.seen(), vec!["one", "two", "three", "four"]);
        assert_eq!(broker.pending_count("greetings", "test").await, 0);
    }
}
