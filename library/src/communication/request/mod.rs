//! Request and response over a durable log with ephemeral replies
//!
//! A [`Request`] is an ordinary [`Notification`](super::event::Notification) that additionally
//! names a [`ResponseLocation`]. Responders consume requests through a consumer group like any other
//! notification and publish their reply to that location. Requestors subscribe to the location
//! *before* they publish the request and wait for the first reply within a fixed bound.

mod reply;
#[allow(clippy::module_inception)]
mod request;
mod requestor;
mod responder;

pub use reply::*;
pub use request::*;
pub use requestor::*;
pub use responder::*;
