use super::super::super::request::{RawResponseCollector, ResponseLocation};
use super::super::json::JsonResponseCollector;
use super::RedisFactory;
use crate::BoxedError;
use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;

/// [`ResponseCollector`](super::super::super::request::ResponseCollector) implementation based on [`SUBSCRIBE`](https://redis.io/commands/subscribe)
pub struct RedisResponseCollector<F: RedisFactory> {
    factory: F,
}

impl<F> RedisResponseCollector<F>
where
    F: RedisFactory,
{
    /// Creates a new instance with a given [`RedisFactory`]
    pub fn new(factory: F) -> Self {
        Self { factory }
    }
}

impl<F> JsonResponseCollector for RedisResponseCollector<F> where F: RedisFactory + Send + Sync {}

#[async_trait]
impl<F> RawResponseCollector for RedisResponseCollector<F>
where
    F: RedisFactory + Send + Sync,
{
    /// Every call uses a dedicated subscriber connection which is closed with the stream
    async fn subscribe_raw(
        &self,
        location: &ResponseLocation,
    ) -> Result<BoxStream<'static, Result<Vec<u8>, BoxedError>>, BoxedError> {
        let mut pubsub = self.factory.pubsub().await?;

        // Resolves once the server confirmed the subscription
        pubsub.subscribe(location).await?;

        let stream = pubsub
            .into_on_message()
            .map(|message| Ok(message.get_payload_bytes().to_vec()))
            .boxed();

        Ok(stream)
    }
}
