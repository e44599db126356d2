//! Domain specific structures of the content platform's message bus
//!
//! Everything in here is specific to the platform the switchboard serves: the events exchanged
//! between its services, the keys under which derived data is cached and the authoritative
//! sources the workers consult.
#![deny(missing_docs)]

pub mod counts;
pub mod entity;
pub mod event;
pub mod identity;
pub mod keys;

pub use entity::{EntityId, EntityKind};
pub use keys::CacheKey;
