use super::super::super::request::{RawResponseCollector, RawResponsePublisher, ResponseLocation};
use super::super::json::{JsonResponseCollector, JsonResponsePublisher};
use super::MemoryBroker;
use crate::{BoxedError, EmptyResult};
use async_trait::async_trait;
use futures::channel::mpsc;
use futures::stream::BoxStream;
use futures::StreamExt;
use tracing::trace;

impl MemoryBroker {
    /// Number of live subscriptions on a channel
    pub async fn subscriber_count(&self, location: &str) -> usize {
        let state = self.state.lock().await;

        state
            .channels
            .get(location)
            .map(|subscribers| subscribers.iter().filter(|s| !s.is_closed()).count())
            .unwrap_or_default()
    }
}

#[async_trait]
impl RawResponsePublisher for MemoryBroker {
    async fn publish_raw(&self, data: &[u8], location: &ResponseLocation) -> EmptyResult {
        let mut state = self.state.lock().await;

        let delivered = match state.channels.get_mut(location) {
            Some(subscribers) => {
                subscribers.retain(|s| !s.is_closed());
                subscribers
                    .iter()
                    .filter(|s| s.unbounded_send(data.to_vec()).is_ok())
                    .count()
            }
            None => 0,
        };

        if delivered == 0 {
            state.channels.remove(location);
            trace!(%location, "Nobody listening, message dropped");
        }

        Ok(())
    }
}

#[async_trait]
impl RawResponseCollector for MemoryBroker {
    async fn subscribe_raw(
        &self,
        location: &ResponseLocation,
    ) -> Result<BoxStream<'static, Result<Vec<u8>, BoxedError>>, BoxedError> {
        let (sender, receiver) = mpsc::unbounded();

        self.state
            .lock()
            .await
            .channels
            .entry(location.to_owned())
            .or_default()
            .push(sender);

        Ok(receiver.map(Ok).boxed())
    }
}

impl JsonResponsePublisher for MemoryBroker {}
impl JsonResponseCollector for MemoryBroker {}

#[cfg(test)]
mod does {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn deliver_only_to_current_subscribers() {
        let broker = MemoryBroker::default();
        let location: ResponseLocation = "reply:abc".into();

        broker.publish_raw(b"early", &location).await.unwrap();

        let mut first = broker.subscribe_raw(&location).await.unwrap();
        let mut second = broker.subscribe_raw(&location).await.unwrap();
        broker.publish_raw(b"hello", &location).await.unwrap();

        assert_eq!(first.next().await.unwrap().unwrap(), b"hello".to_vec());
        assert_eq!(second.next().await.unwrap().unwrap(), b"hello".to_vec());
    }

    #[tokio::test]
    async fn unsubscribe_on_drop() {
        let broker = MemoryBroker::default();
        let location: ResponseLocation = "reply:abc".into();

        let stream = broker.subscribe_raw(&location).await.unwrap();
        assert_eq!(broker.subscriber_count(&location).await, 1);

        drop(stream);
        assert_eq!(broker.subscriber_count(&location).await, 0);
    }
}
