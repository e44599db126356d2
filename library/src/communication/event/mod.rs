//! Structures to realise an event-driven service architecture
//!
//! Services have no knowledge of each other. Whenever something of relevance to others happens,
//! an event [`Notification`] is appended to its [`Queue`](QueueDescriptor). Every interested party
//! may then read the queue through a [`ConsumerGroup`](ConsumerGroupDescriptor) and process it.
//!
//! Notifications are stored in a log-like data structure of limited length. Each group keeps its
//! own read position and every entry handed to a [`Consumer`](ConsumerIdentifier) stays pending
//! until it is acknowledged. Crashed or slow consumers thus never lose entries, they are either
//! re-read by the same consumer on restart or claimed by another member of the group once they have
//! been idle for long enough.
//!
//! Multiple consumers may share a group, in which case each entry is assigned to exactly one of
//! them. Distinct groups on the same queue each receive every entry.

mod consumer;
mod consumer_group;
mod publisher;
mod queue;
mod queue_provider;

pub use consumer::*;
pub use consumer_group::*;
pub use publisher::*;
pub use queue::*;
pub use queue_provider::*;
