//! Structures to communicate between services over a shared message bus
//!
//! There are two modes of operation:
//!
//! 1. Durable event notifications
//! 2. Request and response
//!
//! The first is built on an append-only log with consumer groups. Whenever something noteworthy
//! happens in the system, a notification describing it is appended to the log and each interested
//! consumer group receives it exactly once per group (at-least-once, strictly speaking). Entries
//! are only acknowledged after they have been processed, anything else is redelivered. For details
//! consult the [`event`] module.
//!
//! The second mode pairs a durable request with an ephemeral reply. The requesting party subscribes
//! to a reply channel derived from a fresh [`CorrelationId`](request::CorrelationId), appends the
//! request to the log and waits for the first reply for a bounded amount of time. Replies are never
//! stored; if nobody listens when one is published it is lost and the requestor times out.

mod communication_factory;

pub mod event;
pub mod implementation;
pub mod request;

pub use communication_factory::CommunicationFactory;
