//! Both ends of the ephemeral reply channel
//!
//! Replies are fire-and-forget: whatever is published while nobody is subscribed to a
//! [`ResponseLocation`] is gone. Requestors therefore subscribe before sending their request.

use super::ResponseLocation;
use crate::{BoxedError, EmptyResult};
use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Sends opaque reply payloads
#[async_trait]
pub trait RawResponsePublisher {
    /// Hands the payload to every current subscriber of `location`, dropping it if there are none
    async fn publish_raw(&self, data: &[u8], location: &ResponseLocation) -> EmptyResult;
}

/// Sends typed replies to [`Requests`](super::Request)
#[async_trait]
pub trait ResponsePublisher {
    /// Encodes and publishes `response` to `location`
    async fn publish<R: Send + Sync + Serialize>(
        &self,
        response: &R,
        location: &ResponseLocation,
    ) -> EmptyResult;
}

/// Listens for opaque reply payloads
#[async_trait]
pub trait RawResponseCollector {
    /// Subscribes to a response location
    ///
    /// Only returns once the subscription is active, anything published afterwards is guaranteed
    /// to appear on the stream. Dropping the stream ends the subscription.
    async fn subscribe_raw(
        &self,
        location: &ResponseLocation,
    ) -> Result<BoxStream<'static, Result<Vec<u8>, BoxedError>>, BoxedError>;
}

/// Listens for typed replies to [`Requests`](super::Request)
#[async_trait]
pub trait ResponseCollector {
    /// Subscribes to a response location and decodes everything arriving on it
    async fn subscribe<R: DeserializeOwned + Send + 'static>(
        &self,
        location: &ResponseLocation,
    ) -> Result<BoxStream<'static, Result<R, BoxedError>>, BoxedError>;
}
