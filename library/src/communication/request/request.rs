use super::super::event::Notification;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Debug};
use uuid::Uuid;

/// Prefix of every reply channel derived from a [`CorrelationId`]
pub const REPLY_CHANNEL_PREFIX: &str = "reply:";

/// Describes an ephemeral channel where a response should be sent to
///
/// Messages published to it are delivered to whoever is subscribed at that very moment and
/// are lost otherwise.
pub type ResponseLocation = String;

/// Identifier tying a reply to the request it answers
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationId(String);

impl CorrelationId {
    /// Generates a fresh, random identifier
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Reply channel dedicated to this identifier
    pub fn reply_location(&self) -> ResponseLocation {
        format!("{}{}", REPLY_CHANNEL_PREFIX, self.0)
    }

    /// Raw textual representation
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for CorrelationId {
    fn from(raw: &str) -> Self {
        Self(raw.to_owned())
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Query for information which can be replied to
///
/// Replies are not acknowledged and may get lost, in which case the requestor gives up and the
/// request may be repeated. Side effects of processing a request must thus be idempotent.
pub trait Request: Notification {
    /// Expected response type
    type Response: Response;

    /// Location where a reply should be sent to
    fn reply_to(&self) -> ResponseLocation;

    /// Builds the reply sent when processing the request failed
    fn reject(&self, reason: String) -> Self::Response;
}

/// Why a responder answered without a value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Refusal {
    /// The request itself is unacceptable, repeating it yields the same answer
    Rejected(String),
    /// The responder could not decide right now, e.g. because a backend it depends on is down
    Unavailable(String),
}

/// Reply to a [`Request`] which either carries a value or a [`Refusal`]
pub trait Response: Serialize + DeserializeOwned + Debug + PartialEq {
    /// Value carried by a successful reply
    type Value;

    /// Unwraps the reply into its value or the reason there is none
    fn into_outcome(self) -> Result<Self::Value, Refusal>;
}

#[cfg(test)]
mod does {
    use super::*;

    #[test]
    fn derive_reply_location_from_correlation_id() {
        let id = CorrelationId::from("abc");
        assert_eq!(id.reply_location(), "reply:abc");
    }

    #[test]
    fn generate_distinct_correlation_ids() {
        assert_ne!(CorrelationId::new(), CorrelationId::new());
    }

    #[test]
    fn serialize_correlation_id_transparently() {
        let id = CorrelationId::from("abc");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"abc\"");
    }
}
