//! Trait implementations using [`redis`](::redis)
//!
//! Queues map onto [streams](https://redis.io/topics/streams-intro) with consumer groups,
//! response locations onto plain [pub/sub](https://redis.io/topics/pubsub) channels.

const STREAM_ID_NEW: &str = "*";
const STREAM_ID_HEAD: &str = "0";
const STREAM_ID_TAIL: &str = "$";
const STREAM_ID_ADDITIONS: &str = ">";

mod collector;
mod factory;
mod publisher;
mod queue_entry;
mod queue_provider;

pub use collector::*;
pub use factory::*;
pub use publisher::*;
pub use queue_entry::*;
pub use queue_provider::*;
