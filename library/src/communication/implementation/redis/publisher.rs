use super::super::super::event::{EntryFields, QueueDescriptor, RawNotificationPublisher};
use super::super::super::request::{RawResponsePublisher, ResponseLocation};
use super::super::fields::FieldNotificationPublisher;
use super::super::json::JsonResponsePublisher;
use super::{RedisFactory, STREAM_ID_NEW};
use crate::EmptyResult;
use async_trait::async_trait;
use redis::streams::StreamMaxlen;
use redis::AsyncCommands;
use tracing::trace;

/// Multi-purpose publisher implementation using redis
///
/// - [`NotificationPublisher`](super::super::super::event::NotificationPublisher) implementation using [`XADD`](https://redis.io/commands/xadd)
/// - [`ResponsePublisher`](super::super::super::request::ResponsePublisher) implementation using [`PUBLISH`](https://redis.io/commands/publish)
#[derive(Clone)]
pub struct RedisPublisher<F: RedisFactory> {
    factory: F,
}

impl<F> RedisPublisher<F>
where
    F: RedisFactory,
{
    /// Creates a new instance with a given [`RedisFactory`]
    pub fn new(factory: F) -> Self {
        Self { factory }
    }
}

impl<F> FieldNotificationPublisher for RedisPublisher<F> where F: RedisFactory + Send + Sync {}
impl<F> JsonResponsePublisher for RedisPublisher<F> where F: RedisFactory + Send + Sync {}

#[async_trait]
impl<F> RawNotificationPublisher for RedisPublisher<F>
where
    F: RedisFactory + Send + Sync,
{
    async fn publish_raw(&self, fields: &EntryFields, descriptor: QueueDescriptor) -> EmptyResult {
        let limit = StreamMaxlen::Approx(descriptor.limit());
        let items: Vec<(&str, &str)> = fields
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
            .collect();

        let mut con = self.factory.shared().await?;
        con.xadd_maxlen::<_, _, _, _, ()>(descriptor.key(), limit, STREAM_ID_NEW, &items)
            .await?;

        Ok(())
    }
}

#[async_trait]
impl<F> RawResponsePublisher for RedisPublisher<F>
where
    F: RedisFactory + Send + Sync,
{
    async fn publish_raw(&self, data: &[u8], location: &ResponseLocation) -> EmptyResult {
        let mut con = self.factory.shared().await?;
        let receivers: usize = con.publish(location, data).await?;

        if receivers == 0 {
            trace!(%location, "Nobody listening, message dropped");
        }

        Ok(())
    }
}
