use super::super::fields::FieldQueueEntry;
use crate::communication::event::{EntryFields, RawQueueEntry};
use crate::EmptyResult;
use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::streams::StreamId;
use redis::{AsyncCommands, RedisResult};

/// Redis based implementation of the [`QueueEntry`](crate::communication::event::QueueEntry) trait
pub struct RedisQueueEntry {
    con: MultiplexedConnection,
    id: String,
    key: String,
    group: String,
    fields: EntryFields,
}

impl RedisQueueEntry {
    pub(super) fn new(
        con: MultiplexedConnection,
        entry: StreamId,
        key: String,
        group: String,
    ) -> RedisResult<Self> {
        let fields = entry
            .map
            .iter()
            .map(|(name, value)| Ok((name.clone(), redis::from_redis_value(value)?)))
            .collect::<RedisResult<EntryFields>>()?;

        Ok(Self {
            con,
            id: entry.id,
            key,
            group,
            fields,
        })
    }
}

#[async_trait]
impl RawQueueEntry for RedisQueueEntry {
    fn id(&self) -> &str {
        &self.id
    }

    fn fields(&self) -> &EntryFields {
        &self.fields
    }

    async fn acknowledge(&mut self) -> EmptyResult {
        self.con
            .xack::<_, _, _, ()>(&self.key, &self.group, &[&self.id])
            .await?;

        Ok(())
    }
}

impl FieldQueueEntry for RedisQueueEntry {}
