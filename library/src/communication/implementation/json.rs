//! Serialization and deserialization of responses provided by [`serde_json`] using marker traits
//!
//! Implementors of the raw response traits get the typed counterparts for free by implementing
//! the marker traits in here.

use super::super::request::{
    RawResponseCollector, RawResponsePublisher, ResponseCollector, ResponseLocation,
    ResponsePublisher,
};
use crate::{BoxedError, EmptyResult};
use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Marker trait providing a default [`ResponseCollector`] implementation based on [`serde_json`]
pub trait JsonResponseCollector: RawResponseCollector + Send + Sync {}

#[async_trait]
impl<C> ResponseCollector for C
where
    C: JsonResponseCollector,
{
    /// Parses each payload using [`serde_json::from_slice`]
    async fn subscribe<R: DeserializeOwned + Send + 'static>(
        &self,
        location: &ResponseLocation,
    ) -> Result<BoxStream<'static, Result<R, BoxedError>>, BoxedError> {
        let stream = self
            .subscribe_raw(location)
            .await?
            .map(|item| item.and_then(|bytes| serde_json::from_slice(&bytes).map_err(Into::into)))
            .boxed();

        Ok(stream)
    }
}

/// Marker trait providing a default [`ResponsePublisher`] implementation based on [`serde_json`]
pub trait JsonResponsePublisher: RawResponsePublisher + Send + Sync {}

#[async_trait]
impl<P> ResponsePublisher for P
where
    P: JsonResponsePublisher,
{
    /// Serializes the response using [`serde_json::to_string`]
    async fn publish<R: Send + Sync + Serialize>(
        &self,
        response: &R,
        location: &ResponseLocation,
    ) -> EmptyResult {
        let data = serde_json::to_string(response)?;
        self.publish_raw(data.as_bytes(), location).await
    }
}
