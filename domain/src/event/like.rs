use super::QUEUE_SIZE_EVENTS;
use crate::{EntityId, EntityKind};
use library::communication::event::{Notification, QueueDescriptor};
use library::communication::implementation::fields::textual;
use serde::{Deserialize, Serialize};

/// Direction of a like interaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LikeAction {
    /// A like was added
    Like,
    /// A like was withdrawn
    Unlike,
}

impl LikeAction {
    /// Change this action applies to a like counter
    pub fn delta(self) -> i64 {
        match self {
            Self::Like => 1,
            Self::Unlike => -1,
        }
    }
}

impl Default for LikeAction {
    /// Producers that predate the `action` field only ever reported likes
    fn default() -> Self {
        Self::Like
    }
}

/// Interaction with an entity affecting its like counter
pub trait LikeEvent: Notification {
    /// Liked entity
    fn target(&self) -> (EntityKind, EntityId);

    /// Whether a like was added or withdrawn
    fn action(&self) -> LikeAction;

    /// Count the producer observed after committing the interaction, if it reported one
    fn like_count(&self) -> Option<u64>;
}

/// Like interaction with a post
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PostLikeEvent {
    /// Liked post
    pub post_id: EntityId,
    /// Interacting user
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<EntityId>,
    /// Whether a like was added or withdrawn
    #[serde(default)]
    pub action: LikeAction,
    /// Authoritative count after the interaction
    #[serde(
        default,
        deserialize_with = "textual::deserialize_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub like_count: Option<u64>,
}

impl Notification for PostLikeEvent {
    fn queue() -> QueueDescriptor {
        QueueDescriptor::new("post_like_events".into(), QUEUE_SIZE_EVENTS)
    }
}

impl LikeEvent for PostLikeEvent {
    fn target(&self) -> (EntityKind, EntityId) {
        (EntityKind::Post, self.post_id)
    }

    fn action(&self) -> LikeAction {
        self.action
    }

    fn like_count(&self) -> Option<u64> {
        self.like_count
    }
}

/// Like interaction with a comment
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommentLikeEvent {
    /// Liked comment
    pub comment_id: EntityId,
    /// Interacting user
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<EntityId>,
    /// Whether a like was added or withdrawn
    #[serde(default)]
    pub action: LikeAction,
    /// Authoritative count after the interaction
    #[serde(
        default,
        deserialize_with = "textual::deserialize_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub like_count: Option<u64>,
}

impl Notification for CommentLikeEvent {
    fn queue() -> QueueDescriptor {
        QueueDescriptor::new("comment_like_events".into(), QUEUE_SIZE_EVENTS)
    }
}

impl LikeEvent for CommentLikeEvent {
    fn target(&self) -> (EntityKind, EntityId) {
        (EntityKind::Comment, self.comment_id)
    }

    fn action(&self) -> LikeAction {
        self.action
    }

    fn like_count(&self) -> Option<u64> {
        self.like_count
    }
}
