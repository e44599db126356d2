use super::super::event::NotificationPublisher;
use super::{Refusal, Request, Response, ResponseCollector};
use crate::BoxedError;
use async_trait::async_trait;
use futures::StreamExt;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Error type for sending requests
#[derive(Error, Debug)]
pub enum RequestError {
    /// Publishing of the request failed
    #[error("sending of request failed")]
    SendingFailure(#[source] BoxedError),
    /// Response collector was unable to start listening for responses
    #[error("unable to collect responses")]
    ResponseCollectionFailed(#[source] BoxedError),
    /// The response could not be received or parsed
    #[error("response not receivable")]
    ReceptionFailed(#[source] BoxedError),
    /// Nobody replied within the given bound
    #[error("no response received within {0:?}")]
    Timeout(Duration),
    /// The responder replied with a rejection
    #[error("request rejected: {0}")]
    Rejected(String),
    /// The responder replied that it is unable to answer at the moment
    #[error("responder unavailable: {0}")]
    Unavailable(String),
}

impl From<Refusal> for RequestError {
    fn from(refusal: Refusal) -> Self {
        match refusal {
            Refusal::Rejected(reason) => Self::Rejected(reason),
            Refusal::Unavailable(reason) => Self::Unavailable(reason),
        }
    }
}

#[derive(Error, Debug)]
#[error("reply channel closed before a response arrived")]
struct ReplyChannelClosed;

/// Handler for sending requests and awaiting their response
#[async_trait]
pub trait Requestor {
    /// Sends out a request and waits at most `timeout` for the first reply
    ///
    /// Replies arriving after the bound are discarded.
    async fn request<R>(
        &self,
        request: &R,
        timeout: Duration,
    ) -> Result<<R::Response as Response>::Value, RequestError>
    where
        R: Request + Send + Sync,
        R::Response: Send + 'static,
        <R::Response as Response>::Value: Send;
}

/// [`Requestor`] implementation by combining a [`NotificationPublisher`] and [`ResponseCollector`]
#[derive(Clone)]
pub struct CompositeRequestor<P: NotificationPublisher, C: ResponseCollector> {
    publisher: P,
    collector: C,
}

impl<P, C> CompositeRequestor<P, C>
where
    P: NotificationPublisher,
    C: ResponseCollector,
{
    /// Creates a new instance from raw parts
    pub fn new(publisher: P, collector: C) -> Self {
        Self {
            publisher,
            collector,
        }
    }
}

#[async_trait]
impl<P, C> Requestor for CompositeRequestor<P, C>
where
    P: NotificationPublisher + Send + Sync,
    C: ResponseCollector + Send + Sync,
{
    /// Subscribes using the [`ResponseCollector`], then publishes through the [`NotificationPublisher`]
    async fn request<R>(
        &self,
        request: &R,
        timeout: Duration,
    ) -> Result<<R::Response as Response>::Value, RequestError>
    where
        R: Request + Send + Sync,
        R::Response: Send + 'static,
        <R::Response as Response>::Value: Send,
    {
        let location = request.reply_to();

        let exchange = async {
            // Subscribing first guarantees that a fast reply can not slip through
            let mut replies = self
                .collector
                .subscribe::<R::Response>(&location)
                .await
                .map_err(RequestError::ResponseCollectionFailed)?;

            self.publisher
                .publish(request)
                .await
                .map_err(RequestError::SendingFailure)?;

            match replies.next().await {
                Some(Ok(response)) => Ok(response),
                Some(Err(e)) => Err(RequestError::ReceptionFailed(e)),
                None => Err(RequestError::ReceptionFailed(ReplyChannelClosed.into())),
            }
        };

        let response = match tokio::time::timeout(timeout, exchange).await {
            Ok(result) => result?,
            Err(_) => {
                debug!(%location, ?timeout, "Request timed out");
                return Err(RequestError::Timeout(timeout));
            }
        };

        Ok(response.into_outcome()?)
    }
}
