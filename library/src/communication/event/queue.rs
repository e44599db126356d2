use crate::{BoxedError, EmptyResult};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt::Debug;
use thiserror::Error;

/// Flat field/value mapping which makes up the body of a queue entry
pub type EntryFields = HashMap<String, String>;

/// Describes a notification queue and its parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueDescriptor {
    key: String,
    limit: usize,
}

impl QueueDescriptor {
    /// Creates a new instance from raw parts
    pub fn new(key: String, limit: usize) -> Self {
        Self { key, limit }
    }

    /// Value which may be used by queue implementations to identify a queue
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Approximate maximum number of notifications to be retained in the queue
    pub fn limit(&self) -> usize {
        self.limit
    }
}

/// Event payload bound to exactly one queue
///
/// The queue is a property of the type, so publishers and consumers of the same notification
/// always agree on where it lives.
pub trait Notification: Serialize + DeserializeOwned + PartialEq + Debug {
    /// Queue every instance is appended to
    fn queue() -> QueueDescriptor;
}

/// Location within the queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueLocation {
    /// Start of the queue (not necessarily the first notification as a queue is limited in length)
    Head,
    /// End of the queue (exclusive of the last message)
    Tail,
}

/// Entry which could not be turned into something a consumer can act upon
///
/// Consumers return this (boxed) to signal that retrying would not help. The entry is acknowledged
/// and thereby dropped instead of being redelivered forever.
#[derive(Debug, Error)]
pub enum MalformedEntry {
    /// Fields do not decode into the expected notification
    #[error("entry could not be decoded")]
    Undecodable(#[source] BoxedError),
    /// Entry decoded fine but carries values the consumer refuses to process
    #[error("entry rejected: {0}")]
    Rejected(String),
}

/// Entry retrieved from a [`Queue`](QueueDescriptor) providing raw fields
#[async_trait]
pub trait RawQueueEntry {
    /// Log assigned identifier of the entry
    fn id(&self) -> &str;

    /// Body of the item
    fn fields(&self) -> &EntryFields;

    /// Acknowledge the item as processed
    async fn acknowledge(&mut self) -> EmptyResult;
}

/// Useful functions for [`QueueEntry`] implementations
pub trait QueueEntry: RawQueueEntry {
    /// Attempts to decode the fields into a given data structure
    fn parse_payload<T>(&self) -> Result<T, MalformedEntry>
    where
        T: DeserializeOwned;
}
