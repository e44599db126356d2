//! Authoritative like counts

use crate::{EntityId, EntityKind};
use async_trait::async_trait;
use hyper::client::HttpConnector;
use hyper::{Client, StatusCode, Uri};
use library::BoxedError;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, instrument};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(3);

/// Failures while consulting the authoritative count
#[derive(Debug, Error)]
pub enum CountError {
    /// The source is temporarily out of reach, retrying later may succeed
    #[error("like service unavailable")]
    Transient(#[source] BoxedError),
    /// The source answered with something that is not a count
    #[error("unexpected answer from like service: {0}")]
    Unexpected(String),
}

/// Owner of the authoritative like counts
#[async_trait]
pub trait LikeCountSource {
    /// Current number of likes of an entity, unknown entities have zero likes
    async fn like_count(&self, kind: EntityKind, id: EntityId) -> Result<u64, CountError>;
}

#[derive(Deserialize)]
struct CountBody {
    like_count: u64,
}

/// [`LikeCountSource`] querying the like service over HTTP
#[derive(Clone)]
pub struct HttpLikeCountSource {
    base: String,
    client: Client<HttpConnector>,
}

impl HttpLikeCountSource {
    /// Creates a source for the service reachable at `base`, e.g. `http://like-service:8000`
    pub fn new(base: &str) -> Self {
        Self {
            base: base.trim_end_matches('/').to_owned(),
            client: Client::new(),
        }
    }

    fn endpoint(&self, kind: EntityKind, id: EntityId) -> String {
        match kind {
            EntityKind::Post => format!("{}/board_like/post/{}/count", self.base, id),
            EntityKind::Comment => format!("{}/comment_like/comment/{}/count", self.base, id),
        }
    }
}

#[async_trait]
impl LikeCountSource for HttpLikeCountSource {
    #[instrument(skip(self))]
    async fn like_count(&self, kind: EntityKind, id: EntityId) -> Result<u64, CountError> {
        let uri: Uri = self
            .endpoint(kind, id)
            .parse()
            .map_err(|e: hyper::http::uri::InvalidUri| CountError::Unexpected(e.to_string()))?;

        let response = match tokio::time::timeout(REQUEST_TIMEOUT, self.client.get(uri)).await {
            Ok(response) => response.map_err(|e| CountError::Transient(e.into()))?,
            Err(e) => return Err(CountError::Transient(e.into())),
        };

        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            debug!("Entity unknown to like service");
            return Ok(0);
        } else if status.is_server_error() {
            return Err(CountError::Transient(
                format!("like service answered {}", status).into(),
            ));
        } else if !status.is_success() {
            return Err(CountError::Unexpected(status.to_string()));
        }

        let body = hyper::body::to_bytes(response.into_body())
            .await
            .map_err(|e| CountError::Transient(e.into()))?;

        let parsed: CountBody =
            serde_json::from_slice(&body).map_err(|e| CountError::Unexpected(e.to_string()))?;

        Ok(parsed.like_count)
    }
}
