use super::super::event::Consumer;
use super::{Request, ResponsePublisher};
use crate::{BoxedError, EmptyResult};
use async_trait::async_trait;
use thiserror::Error;
use tracing::warn;

/// Error that may be thrown while responding to a request
#[derive(Error, Debug)]
pub enum ResponderError {
    /// Unable to deliver the response
    #[error("sending response failed")]
    ResponseUndeliverable(#[source] BoxedError),
}

/// Structure which processes requests and produces responses
#[async_trait]
pub trait RequestProcessor {
    /// Type of request to process
    type Request: Request;

    /// Handler for requests, returning a response
    ///
    /// Errors are not fatal, they are turned into a [rejection](Request::reject) for the requestor.
    async fn process(
        &self,
        request: &Self::Request,
    ) -> Result<<Self::Request as Request>::Response, BoxedError>;
}

/// Convenience wrapper to process requests and send responses
pub struct Responder<R, C: RequestProcessor<Request = R>, P> {
    processor: C,
    publisher: P,
}

impl<R, C, P> Responder<R, C, P>
where
    R: Request,
    C: RequestProcessor<Request = R>,
    P: ResponsePublisher,
{
    /// Creates a new responder from raw parts
    pub fn new(processor: C, publisher: P) -> Self {
        Self {
            processor,
            publisher,
        }
    }
}

#[async_trait]
impl<R, C, P> Consumer for Responder<R, C, P>
where
    R: Request + Send + Sync,
    R::Response: Send + Sync,
    C: RequestProcessor<Request = R> + Send + Sync,
    P: ResponsePublisher + Send + Sync,
{
    type Notification = R;

    /// Replies to every request. Only a failed publish leaves the request unacknowledged.
    async fn consume(&self, request: Self::Notification) -> EmptyResult {
        let location = request.reply_to();

        let response = match self.processor.process(&request).await {
            Ok(response) => response,
            Err(e) => {
                warn!(%location, error = %e, "Request processing failed, rejecting");
                request.reject(e.to_string())
            }
        };

        self.publisher
            .publish(&response, &location)
            .await
            .map_err(ResponderError::ResponseUndeliverable)?;

        Ok(())
    }
}
