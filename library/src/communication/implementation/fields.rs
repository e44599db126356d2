//! Flat field encoding of notifications using marker traits
//!
//! Log entries are flat mappings of field names to strings. Notifications are serialized with
//! [`serde_json`] first and every top-level member becomes one field:
//!
//! - strings are stored verbatim
//! - numbers and booleans are stored in their textual form
//! - nested structures are stored as JSON text
//! - `null` members are omitted
//!
//! When decoding, every field is handed to serde as a string. Non-string members thus need to
//! accept their textual form, which the [`textual`] helpers provide.

use super::super::event::{
    EntryFields, MalformedEntry, Notification, NotificationPublisher, QueueEntry,
    RawNotificationPublisher, RawQueueEntry,
};
use crate::EmptyResult;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

/// Error raised when a value can not be flattened into fields
#[derive(Debug, Error)]
pub enum FieldEncodingError {
    /// Only structures with named members can be flattened
    #[error("expected a structure with named fields, got {0}")]
    NotAStructure(String),
    /// Serialization itself failed
    #[error("serialization failed")]
    Serialization(#[from] serde_json::Error),
}

/// Flattens a serializable structure into entry fields
pub fn encode_fields<T: Serialize>(value: &T) -> Result<EntryFields, FieldEncodingError> {
    let members = match serde_json::to_value(value)? {
        Value::Object(members) => members,
        other => return Err(FieldEncodingError::NotAStructure(other.to_string())),
    };

    let fields = members
        .into_iter()
        .filter_map(|(name, value)| match value {
            Value::Null => None,
            Value::String(text) => Some((name, text)),
            other => Some((name, other.to_string())),
        })
        .collect();

    Ok(fields)
}

/// Rebuilds a structure from entry fields
pub fn decode_fields<T: DeserializeOwned>(fields: &EntryFields) -> Result<T, serde_json::Error> {
    let members: Map<String, Value> = fields
        .iter()
        .map(|(name, text)| (name.clone(), Value::String(text.clone())))
        .collect();

    serde_json::from_value(Value::Object(members))
}

/// Deserializers accepting values in either their native or textual form
pub mod textual {
    use serde::{Deserialize, Deserializer};
    use std::fmt::Display;
    use std::str::FromStr;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Textual<T> {
        Native(T),
        Text(String),
    }

    impl<T> Textual<T>
    where
        T: FromStr,
        T::Err: Display,
    {
        fn resolve<E: serde::de::Error>(self) -> Result<T, E> {
            match self {
                Self::Native(value) => Ok(value),
                Self::Text(text) => text.trim().parse().map_err(E::custom),
            }
        }
    }

    /// Use with `#[serde(deserialize_with = "textual::deserialize")]`
    pub fn deserialize<'de, D, T>(deserializer: D) -> Result<T, D::Error>
    where
        D: Deserializer<'de>,
        T: Deserialize<'de> + FromStr,
        T::Err: Display,
    {
        Textual::<T>::deserialize(deserializer)?.resolve()
    }

    /// Use with `#[serde(default, deserialize_with = "textual::deserialize_option")]`
    pub fn deserialize_option<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: Deserialize<'de> + FromStr,
        T::Err: Display,
    {
        Option::<Textual<T>>::deserialize(deserializer)?
            .map(Textual::resolve)
            .transpose()
    }
}

/// Marker trait providing a default [`NotificationPublisher`] implementation based on field encoding
pub trait FieldNotificationPublisher: RawNotificationPublisher + Send + Sync {}

#[async_trait]
impl<P> NotificationPublisher for P
where
    P: FieldNotificationPublisher,
{
    async fn publish<N: Notification + Send + Sync>(&self, notification: &N) -> EmptyResult {
        let fields = encode_fields(notification)?;
        self.publish_raw(&fields, N::queue()).await
    }
}

/// Marker trait providing a default [`QueueEntry`] implementation based on field decoding
pub trait FieldQueueEntry: RawQueueEntry {}

impl<E> QueueEntry for E
where
    E: FieldQueueEntry,
{
    fn parse_payload<T>(&self) -> Result<T, MalformedEntry>
    where
        T: DeserializeOwned,
    {
        decode_fields(self.fields()).map_err(|e| MalformedEntry::Undecodable(Box::new(e)))
    }
}

#[cfg(test)]
mod does {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Liked {
        #[serde(deserialize_with = "textual::deserialize")]
        post_id: i64,
        action: String,
        #[serde(default, deserialize_with = "textual::deserialize_option")]
        like_count: Option<u64>,
        #[serde(default, deserialize_with = "textual::deserialize_option")]
        public: Option<bool>,
    }

    #[test]
    fn flatten_scalars_and_omit_nulls() {
        let fields = encode_fields(&Liked {
            post_id: 42,
            action: "like".into(),
            like_count: None,
            public: Some(true),
        })
        .unwrap();

        assert_eq!(fields.len(), 3);
        assert_eq!(fields["post_id"], "42");
        assert_eq!(fields["action"], "like");
        assert_eq!(fields["public"], "true");
    }

    #[test]
    fn decode_textual_numbers() {
        let fields: EntryFields = vec![
            ("post_id".to_owned(), "42".to_owned()),
            ("action".to_owned(), "unlike".to_owned()),
            ("like_count".to_owned(), "7".to_owned()),
            ("producer".to_owned(), "board-service".to_owned()),
        ]
        .into_iter()
        .collect();

        let liked: Liked = decode_fields(&fields).unwrap();

        assert_eq!(
            liked,
            Liked {
                post_id: 42,
                action: "unlike".into(),
                like_count: Some(7),
                public: None,
            }
        );
    }

    #[test]
    fn reject_non_numeric_text() {
        let fields: EntryFields = vec![
            ("post_id".to_owned(), "forty-two".to_owned()),
            ("action".to_owned(), "like".to_owned()),
        ]
        .into_iter()
        .collect();

        assert!(decode_fields::<Liked>(&fields).is_err());
    }

    #[test]
    fn refuse_to_flatten_scalars() {
        assert!(matches!(
            encode_fields(&5),
            Err(FieldEncodingError::NotAStructure(_))
        ));
    }
}
