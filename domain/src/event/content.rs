use super::QUEUE_SIZE_EVENTS;
use crate::{CacheKey, EntityId, EntityKind};
use library::communication::event::{Notification, QueueDescriptor};
use serde::{Deserialize, Serialize};

/// Kind of change an entity went through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityEventType {
    /// Entity came into existence
    Create,
    /// Entity content changed
    Update,
    /// Entity is gone
    Delete,
}

/// Change notification of a cached entity
pub trait EntityEvent: Notification {
    /// Cached representation of the entity
    type Snapshot: Serialize + Send + Sync;

    /// What happened to the entity
    fn event_type(&self) -> EntityEventType;

    /// Key holding the snapshot
    fn entity_key(&self) -> CacheKey;

    /// Representation stored under [`entity_key`](EntityEvent::entity_key)
    fn snapshot(&self) -> Self::Snapshot;

    /// Further derived keys that become stale with this event
    fn evicted_keys(&self) -> Vec<CacheKey>;
}

/// Change of a board post
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PostEvent {
    /// What happened
    pub event_type: EntityEventType,
    /// Affected post
    pub post_id: EntityId,
    /// Title after the change
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Body after the change
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Display name of the author
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    /// Identifier of the author
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_id: Option<EntityId>,
    /// Creation timestamp as sent by the producer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    /// Modification timestamp as sent by the producer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

/// Cached representation of a post
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PostSnapshot {
    /// Snapshotted post
    pub post_id: EntityId,
    /// Title
    pub title: Option<String>,
    /// Body
    pub content: Option<String>,
    /// Display name of the author
    pub author: Option<String>,
    /// Identifier of the author
    pub author_id: Option<EntityId>,
    /// Creation timestamp
    pub created_at: Option<String>,
    /// Modification timestamp
    pub updated_at: Option<String>,
}

impl Notification for PostEvent {
    fn queue() -> QueueDescriptor {
        QueueDescriptor::new("post_events".into(), QUEUE_SIZE_EVENTS)
    }
}

impl EntityEvent for PostEvent {
    type Snapshot = PostSnapshot;

    fn event_type(&self) -> EntityEventType {
        self.event_type
    }

    fn entity_key(&self) -> CacheKey {
        CacheKey::Post(self.post_id)
    }

    fn snapshot(&self) -> PostSnapshot {
        PostSnapshot {
            post_id: self.post_id,
            title: self.title.clone(),
            content: self.content.clone(),
            author: self.author.clone(),
            author_id: self.author_id,
            created_at: self.created_at.clone(),
            updated_at: self.updated_at.clone(),
        }
    }

    fn evicted_keys(&self) -> Vec<CacheKey> {
        match self.event_type {
            EntityEventType::Delete => vec![CacheKey::LikeCount(EntityKind::Post, self.post_id)],
            _ => Vec::new(),
        }
    }
}

/// Change of a comment
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommentEvent {
    /// What happened
    pub event_type: EntityEventType,
    /// Affected comment
    pub comment_id: EntityId,
    /// Post the comment belongs to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_id: Option<EntityId>,
    /// Body after the change
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Display name of the author
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    /// Identifier of the author
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_id: Option<EntityId>,
    /// Creation timestamp as sent by the producer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    /// Modification timestamp as sent by the producer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

/// Cached representation of a comment
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommentSnapshot {
    /// Snapshotted comment
    pub comment_id: EntityId,
    /// Post the comment belongs to
    pub post_id: Option<EntityId>,
    /// Body
    pub content: Option<String>,
    /// Display name of the author
    pub author: Option<String>,
    /// Identifier of the author
    pub author_id: Option<EntityId>,
    /// Creation timestamp
    pub created_at: Option<String>,
    /// Modification timestamp
    pub updated_at: Option<String>,
}

impl Notification for CommentEvent {
    fn queue() -> QueueDescriptor {
        QueueDescriptor::new("comment_events".into(), QUEUE_SIZE_EVENTS)
    }
}

impl EntityEvent for CommentEvent {
    type Snapshot = CommentSnapshot;

    fn event_type(&self) -> EntityEventType {
        self.event_type
    }

    fn entity_key(&self) -> CacheKey {
        CacheKey::Comment(self.comment_id)
    }

    fn snapshot(&self) -> CommentSnapshot {
        CommentSnapshot {
            comment_id: self.comment_id,
            post_id: self.post_id,
            content: self.content.clone(),
            author: self.author.clone(),
            author_id: self.author_id,
            created_at: self.created_at.clone(),
            updated_at: self.updated_at.clone(),
        }
    }

    fn evicted_keys(&self) -> Vec<CacheKey> {
        let mut keys: Vec<CacheKey> = self.author_id.map(CacheKey::UserComments).into_iter().collect();

        if self.event_type == EntityEventType::Delete {
            keys.push(CacheKey::LikeCount(EntityKind::Comment, self.comment_id));
        }

        keys
    }
}

#[cfg(test)]
mod does {
    use super::*;
    use library::communication::implementation::fields::{decode_fields, encode_fields};
    use pretty_assertions::assert_eq;

    #[test]
    fn decode_producer_fields() {
        let fields = vec![
            ("event_type", "create"),
            ("comment_id", "12"),
            ("post_id", "5"),
            ("content", "First!"),
            ("author", "alice"),
            ("created_at", "2024-03-01 10:00:00"),
        ]
        .into_iter()
        .map(|(name, value)| (name.to_owned(), value.to_owned()))
        .collect();

        let event: CommentEvent = decode_fields(&fields).unwrap();

        assert_eq!(event.event_type, EntityEventType::Create);
        assert_eq!(event.comment_id, EntityId::from(12));
        assert_eq!(event.post_id, Some(EntityId::from(5)));
        assert_eq!(event.author_id, None);
    }

    #[test]
    fn survive_the_field_codec() {
        let event = PostEvent {
            event_type: EntityEventType::Update,
            post_id: EntityId::from(5),
            title: Some("X".into()),
            content: None,
            author: Some("bob".into()),
            author_id: Some(EntityId::from(3)),
            created_at: None,
            updated_at: Some("2024-03-01 10:00:00".into()),
        };

        let decoded: PostEvent = decode_fields(&encode_fields(&event).unwrap()).unwrap();
        assert_eq!(decoded, event);
    }

    #[test]
    fn evict_author_comments_and_counts() {
        let mut event: CommentEvent = serde_json::from_value(serde_json::json!({
            "event_type": "update",
            "comment_id": 12,
            "author_id": 3
        }))
        .unwrap();

        assert_eq!(event.evicted_keys(), vec![CacheKey::UserComments(EntityId::from(3))]);

        event.event_type = EntityEventType::Delete;
        assert_eq!(
            event.evicted_keys(),
            vec![
                CacheKey::UserComments(EntityId::from(3)),
                CacheKey::LikeCount(EntityKind::Comment, EntityId::from(12))
            ]
        );
    }
}
