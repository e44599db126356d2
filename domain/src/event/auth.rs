use super::QUEUE_SIZE_REQUESTS;
use crate::identity::UserIdentity;
use library::communication::event::{Notification, QueueDescriptor};
use library::communication::request::{
    CorrelationId, Refusal, Request, Response, ResponseLocation,
};
use serde::{Deserialize, Serialize};

const QUEUE_KEY: &str = "auth_request";
const QUEUE_SIZE: usize = QUEUE_SIZE_REQUESTS;

const EMPTY_REPLY: &str = "reply carried neither a user nor an error";

/// Request to resolve an access token into the identity it was issued to
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthRequest {
    /// Identifier the reply is addressed with
    pub correlation_id: CorrelationId,
    /// Raw token without any scheme prefix
    pub access_token: String,
}

impl AuthRequest {
    /// Creates a request with a fresh correlation id
    pub fn new(access_token: String) -> Self {
        Self {
            correlation_id: CorrelationId::new(),
            access_token,
        }
    }
}

impl Notification for AuthRequest {
    fn queue() -> QueueDescriptor {
        QueueDescriptor::new(QUEUE_KEY.into(), QUEUE_SIZE)
    }
}

impl Request for AuthRequest {
    type Response = AuthResponse;

    fn reply_to(&self) -> ResponseLocation {
        self.correlation_id.reply_location()
    }

    fn reject(&self, reason: String) -> AuthResponse {
        AuthResponse::rejected(self.correlation_id.clone(), reason)
    }
}

/// Reply to an [`AuthRequest`], carrying exactly one of `user` or `error`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthResponse {
    /// Identifier of the answered request
    pub correlation_id: CorrelationId,
    /// Identity the token belongs to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<UserIdentity>,
    /// Reason the token was not accepted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Set when the token could not be checked at all, as opposed to being refused
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub unavailable: bool,
}

impl AuthResponse {
    /// Reply for a valid token
    pub fn accepted(correlation_id: CorrelationId, user: UserIdentity) -> Self {
        Self {
            correlation_id,
            user: Some(user),
            error: None,
            unavailable: false,
        }
    }

    /// Reply for a token that could not be validated
    pub fn rejected(correlation_id: CorrelationId, reason: String) -> Self {
        Self {
            correlation_id,
            user: None,
            error: Some(reason),
            unavailable: false,
        }
    }

    /// Reply for a token whose validity could not be determined
    pub fn unavailable(correlation_id: CorrelationId, reason: String) -> Self {
        Self {
            unavailable: true,
            ..Self::rejected(correlation_id, reason)
        }
    }
}

impl Response for AuthResponse {
    type Value = UserIdentity;

    fn into_outcome(self) -> Result<UserIdentity, Refusal> {
        match (self.user, self.error) {
            (_, Some(error)) if self.unavailable => Err(Refusal::Unavailable(error)),
            (_, Some(error)) => Err(Refusal::Rejected(error)),
            (Some(user), None) => Ok(user),
            (None, None) => Err(Refusal::Rejected(EMPTY_REPLY.to_owned())),
        }
    }
}
