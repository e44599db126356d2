use super::QueueLocation;
use std::fmt;

/// Unique identifier for a group of consumers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsumerGroupIdentifier {
    /// Token validation workers
    Identity,
    /// Workers keeping entity snapshots coherent
    ContentCache,
    /// Workers maintaining derived like counters
    LikeCounter,
    /// Unknown consumer group
    Other(String),
}

impl fmt::Display for ConsumerGroupIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Identity => write!(f, "identity"),
            Self::ContentCache => write!(f, "content-cache"),
            Self::LikeCounter => write!(f, "like-counter"),
            Self::Other(identifier) => write!(f, "{}", identifier),
        }
    }
}

/// Definition of a consumer group
///
/// Each message is only delivered to one consumer within the same group, identified by a
/// [`ConsumerGroupIdentifier`]. When it is created, the group starts processing messages from the
/// provided [`QueueLocation`].
#[derive(Debug, Clone)]
pub struct ConsumerGroupDescriptor {
    identifier: ConsumerGroupIdentifier,
    start: QueueLocation,
}

impl ConsumerGroupDescriptor {
    /// Creates a new instance from raw parts
    pub fn new(identifier: ConsumerGroupIdentifier, start: QueueLocation) -> Self {
        Self { identifier, start }
    }

    /// Unique identifier of the group
    pub fn identifier(&self) -> &ConsumerGroupIdentifier {
        &self.identifier
    }

    /// Location from where a consumer group begins to consume messages
    ///
    /// Note that this is only honored when the group is created, an existing group keeps its position!
    pub fn start(&self) -> &QueueLocation {
        &self.start
    }
}

/// Unique identifier of a consumer within a [`ConsumerGroup`](ConsumerGroupDescriptor)
pub type ConsumerIdentifier = String;
