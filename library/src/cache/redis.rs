use super::CacheStore;
use crate::communication::implementation::redis::RedisFactory;
use crate::{BoxedError, EmptyResult};
use async_trait::async_trait;
use redis::{AsyncCommands, Script};
use std::convert::TryFrom;
use std::time::Duration;

/// Adds ARGV[1] to an existing integer, floors at zero and sets the expiry to ARGV[2] milliseconds
const ADJUST_SCRIPT: &str = r"
    if redis.call('EXISTS', KEYS[1]) == 0 then
        return false
    end

    local value = redis.call('INCRBY', KEYS[1], ARGV[1])
    if value < 0 then
        value = 0
        redis.call('SET', KEYS[1], 0)
    end

    redis.call('PEXPIRE', KEYS[1], ARGV[2])
    return value
";

/// [`CacheStore`] implementation on top of plain redis strings
#[derive(Clone)]
pub struct RedisCache<F: RedisFactory> {
    factory: F,
    adjust: Script,
}

impl<F> RedisCache<F>
where
    F: RedisFactory,
{
    /// Creates a new instance with a given [`RedisFactory`]
    pub fn new(factory: F) -> Self {
        Self {
            factory,
            adjust: Script::new(ADJUST_SCRIPT),
        }
    }
}

fn millis(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1)
}

#[async_trait]
impl<F> CacheStore for RedisCache<F>
where
    F: RedisFactory + Send + Sync,
{
    async fn get(&self, key: &str) -> Result<Option<String>, BoxedError> {
        let mut con = self.factory.shared().await?;
        Ok(con.get(key).await?)
    }

    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> EmptyResult {
        let mut con = self.factory.shared().await?;

        redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("PX")
            .arg(millis(ttl))
            .query_async::<_, ()>(&mut con)
            .await?;

        Ok(())
    }

    async fn delete(&self, key: &str) -> EmptyResult {
        let mut con = self.factory.shared().await?;
        con.del::<_, ()>(key).await?;
        Ok(())
    }

    async fn adjust(
        &self,
        key: &str,
        delta: i64,
        ttl: Duration,
    ) -> Result<Option<i64>, BoxedError> {
        let mut con = self.factory.shared().await?;

        let value: Option<i64> = self
            .adjust
            .key(key)
            .arg(delta)
            .arg(millis(ttl))
            .invoke_async(&mut con)
            .await?;

        Ok(value)
    }
}
