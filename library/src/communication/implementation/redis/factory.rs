use crate::{BoxedError, EmptyResult};
use async_trait::async_trait;
use redis::aio::{Connection, MultiplexedConnection, PubSub};
use redis::{Client, RedisResult};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, warn};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Errors raised while establishing connections
#[derive(Debug, Error)]
pub enum RedisBusError {
    /// The server did not accept a connection in time
    #[error("connecting to redis timed out after {0:?}")]
    ConnectTimeout(Duration),
}

/// Factory for redis connections of different kinds
#[async_trait]
pub trait RedisFactory {
    /// Establishes a dedicated connection which may be used for blocking commands
    async fn owned(&self) -> Result<Connection, BoxedError>;

    /// Hands out a handle to a connection shared with other users, blocking commands are forbidden
    async fn shared(&self) -> Result<MultiplexedConnection, BoxedError>;

    /// Establishes a dedicated connection in subscriber mode
    async fn pubsub(&self) -> Result<PubSub, BoxedError>;
}

/// Handle to a redis server which lazily establishes a shared connection
///
/// Clones share the same multiplexed connection. Dedicated connections are established on demand.
#[derive(Clone)]
pub struct RedisBus {
    client: Client,
    shared: Arc<Mutex<Option<MultiplexedConnection>>>,
}

impl RedisBus {
    /// Prepares a handle for the given URL without connecting yet
    pub fn open(url: &str) -> Result<Self, BoxedError> {
        Ok(Self {
            client: Client::open(url)?,
            shared: Arc::new(Mutex::new(None)),
        })
    }

    /// Verifies that the shared connection is usable
    ///
    /// A failing shared connection is discarded so that the next user establishes a fresh one.
    pub async fn ping(&self) -> EmptyResult {
        let mut con = self.shared().await?;

        match redis::cmd("PING").query_async::<_, String>(&mut con).await {
            Ok(_) => Ok(()),
            Err(e) => {
                warn!(error = %e, "Shared redis connection is broken, discarding it");
                self.shared.lock().await.take();
                Err(e.into())
            }
        }
    }

    async fn connect<T, F>(attempt: F) -> Result<T, BoxedError>
    where
        F: Future<Output = RedisResult<T>> + Send,
    {
        match tokio::time::timeout(CONNECT_TIMEOUT, attempt).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(RedisBusError::ConnectTimeout(CONNECT_TIMEOUT).into()),
        }
    }
}

#[async_trait]
impl RedisFactory for RedisBus {
    async fn owned(&self) -> Result<Connection, BoxedError> {
        Self::connect(self.client.get_async_connection()).await
    }

    async fn shared(&self) -> Result<MultiplexedConnection, BoxedError> {
        let mut shared = self.shared.lock().await;

        if let Some(con) = shared.as_ref() {
            return Ok(con.clone());
        }

        debug!("Establishing shared redis connection");
        let con = Self::connect(self.client.get_multiplexed_tokio_connection()).await?;
        *shared = Some(con.clone());

        Ok(con)
    }

    async fn pubsub(&self) -> Result<PubSub, BoxedError> {
        Ok(self.owned().await?.into_pubsub())
    }
}
