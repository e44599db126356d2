//! Cache key layout
//!
//! Keys are only ever built through [`CacheKey`] so that writers and invalidators can not drift apart.

use crate::{EntityId, EntityKind};
use std::fmt;

/// Location of a derived value in the cache
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// Snapshot of a post
    Post(EntityId),
    /// Snapshot of a comment
    Comment(EntityId),
    /// Number of likes of a post or comment
    LikeCount(EntityKind, EntityId),
    /// Identity of a user as resolved from their last validated token
    UserProfile(EntityId),
    /// Comments written by a user
    UserComments(EntityId),
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Post(id) => write!(f, "post:{}", id),
            Self::Comment(id) => write!(f, "comment:{}", id),
            Self::LikeCount(kind, id) => write!(f, "like_count:{}:{}", kind, id),
            Self::UserProfile(id) => write!(f, "user_profile:{}", id),
            Self::UserComments(id) => write!(f, "user_comments:{}", id),
        }
    }
}

#[cfg(test)]
mod does {
    use super::*;

    #[test]
    fn render_keys() {
        let id = EntityId::from(42);

        assert_eq!(CacheKey::Post(id).to_string(), "post:42");
        assert_eq!(CacheKey::Comment(id).to_string(), "comment:42");
        assert_eq!(
            CacheKey::LikeCount(EntityKind::Post, id).to_string(),
            "like_count:post:42"
        );
        assert_eq!(
            CacheKey::LikeCount(EntityKind::Comment, id).to_string(),
            "like_count:comment:42"
        );
        assert_eq!(CacheKey::UserProfile(id).to_string(), "user_profile:42");
        assert_eq!(CacheKey::UserComments(id).to_string(), "user_comments:42");
    }
}
