use super::super::super::event::{
    ConsumerGroupDescriptor, ConsumptionOptions, QueueDescriptor, QueueLocation, QueueProvider,
};
use super::{RedisFactory, RedisQueueEntry, STREAM_ID_ADDITIONS, STREAM_ID_HEAD, STREAM_ID_TAIL};
use crate::BoxedError;
use async_trait::async_trait;
use futures::stream::{self, BoxStream};
use futures::StreamExt;
use redis::aio::{Connection, MultiplexedConnection};
use redis::streams::{
    StreamClaimReply, StreamId, StreamPendingCountReply, StreamPendingId, StreamReadOptions, StreamReadReply,
};
use redis::{AsyncCommands, RedisResult};
use std::convert::TryFrom;
use std::time::{Duration, Instant};
use tracing::{debug, error};

/// Queue provider implementation using [Redis Streams](https://redis.io/topics/streams-intro)
pub struct RedisQueueProvider<F: RedisFactory + Send + Sync> {
    factory: F,
}

impl<F: RedisFactory + Send + Sync> RedisQueueProvider<F> {
    /// Creates a new instance with a given [`RedisFactory`]
    pub fn new(factory: F) -> Self {
        Self { factory }
    }
}

#[async_trait]
impl<F> QueueProvider for RedisQueueProvider<F>
where
    F: RedisFactory + Send + Sync,
{
    type Entry = RedisQueueEntry;

    /// Consumes a redis stream data structure using the following steps:
    ///
    /// 1. Create the stream and/or consumer group if it does not exist
    /// 2. Stream entries pending at this consumer from a previous run
    /// 3. Wait for and stream new entries in a blocking manner
    /// 4. Claim entries other consumers left idle for too long, whenever a blocking read comes back
    ///    empty and at least once per `claim_idle` while new entries keep arriving
    async fn consume(
        &self,
        queue: QueueDescriptor,
        group: &ConsumerGroupDescriptor,
        consumer: &str,
        options: &ConsumptionOptions,
    ) -> Result<BoxStream<'static, Result<Self::Entry, BoxedError>>, BoxedError> {
        let key = queue.key().to_owned();
        let group_name = group.identifier().to_string();

        // Dedicated connection for the blocking XREADGROUP command
        let mut con = self.factory.owned().await?;
        create_consumer_group(&mut con, &key, &group_name, group.start()).await?;

        // Entries are acknowledged over the shared connection
        let ack_con = self.factory.shared().await?;

        let reader = StreamReader {
            con,
            key: key.clone(),
            group: group_name.clone(),
            consumer: consumer.to_owned(),
            options: options.clone(),
            cursor: Cursor::Backlog(STREAM_ID_HEAD.to_owned()),
            last_claim: Instant::now(),
        };

        let stream = read_stream(reader)
            .map(move |item| {
                let entry = item?;
                RedisQueueEntry::new(ack_con.clone(), entry, key.clone(), group_name.clone())
                    .map_err(Into::into)
            })
            .boxed();

        Ok(stream)
    }
}

async fn create_consumer_group(
    con: &mut Connection,
    key: &str,
    group: &str,
    start: &QueueLocation,
) -> RedisResult<()> {
    let start_id = match start {
        QueueLocation::Head => STREAM_ID_HEAD,
        QueueLocation::Tail => STREAM_ID_TAIL,
    };

    match con
        .xgroup_create_mkstream::<_, _, _, ()>(key, group, start_id)
        .await
    {
        Ok(_) => {
            debug!(key, group, "Created consumer group");
            Ok(())
        }
        Err(e) if e.code() == Some("BUSYGROUP") => Ok(()),
        Err(e) => Err(e),
    }
}

enum Cursor {
    /// Re-reading entries pending at this consumer, starting after the contained id
    Backlog(String),
    /// Blocking on new additions
    Live,
}

struct StreamReader {
    con: Connection,
    key: String,
    group: String,
    consumer: String,
    options: ConsumptionOptions,
    cursor: Cursor,
    last_claim: Instant,
}

impl StreamReader {
    async fn read(&mut self, id: &str, block: bool) -> RedisResult<Vec<StreamId>> {
        let mut options = StreamReadOptions::default()
            .group(&self.group, &self.consumer)
            .count(self.options.batch_size);

        if block {
            options = options.block(millis(self.options.poll_interval));
        }

        let reply: Option<StreamReadReply> = self
            .con
            .xread_options(&[&self.key], &[id], &options)
            .await?;

        Ok(reply
            .and_then(|mut reply| reply.keys.pop())
            .map(|stream| stream.ids)
            .unwrap_or_default())
    }

    /// Pages through the pending entries list of the group and claims up to `batch_size` entries
    /// that have been idle for at least `min_idle`
    async fn claim_stale(&mut self, min_idle: Duration) -> RedisResult<Vec<StreamId>> {
        self.last_claim = Instant::now();

        let min_idle = millis(min_idle);
        let mut scan = PendingScan::new(self.options.batch_size, min_idle);

        while let Some(start) = scan.next_start() {
            let page: StreamPendingCountReply = self
                .con
                .xpending_count(&self.key, &self.group, &start, "+", scan.limit)
                .await?;

            scan.absorb(page.ids);
        }

        let stale = scan.into_stale();

        if stale.is_empty() {
            return Ok(Vec::new());
        }

        let claimed: StreamClaimReply = self
            .con
            .xclaim(&self.key, &self.group, &self.consumer, min_idle, stale.as_slice())
            .await?;

        debug!(key = %self.key, group = %self.group, claimed = claimed.ids.len(), "Claimed idle entries");

        Ok(claimed.ids)
    }

    fn claim_due(&self) -> Option<Duration> {
        self.options
            .claim_idle
            .filter(|min_idle| self.last_claim.elapsed() >= *min_idle)
    }

    async fn next_batch(&mut self) -> RedisResult<Vec<StreamId>> {
        loop {
            match &self.cursor {
                Cursor::Backlog(after) => {
                    let after = after.clone();
                    let batch = self.read(&after, false).await?;

                    match batch.last() {
                        Some(last) => {
                            self.cursor = Cursor::Backlog(last.id.clone());
                            return Ok(batch);
                        }
                        None => self.cursor = Cursor::Live,
                    }
                }
                Cursor::Live => {
                    // A steady flow of additions must not starve idle entries
                    if let Some(min_idle) = self.claim_due() {
                        let claimed = self.claim_stale(min_idle).await?;

                        if !claimed.is_empty() {
                            return Ok(claimed);
                        }
                    }

                    let batch = self.read(STREAM_ID_ADDITIONS, true).await?;

                    if !batch.is_empty() {
                        return Ok(batch);
                    }

                    if let Some(min_idle) = self.options.claim_idle {
                        let claimed = self.claim_stale(min_idle).await?;

                        if !claimed.is_empty() {
                            return Ok(claimed);
                        }
                    }
                }
            }
        }
    }
}

/// Walks the pending entries list page by page, collecting entries which have been idle for long
/// enough. Recently claimed entries at the front of the list thus never hide older ones behind them.
struct PendingScan {
    limit: usize,
    min_idle: usize,
    start: Option<String>,
    stale: Vec<String>,
}

impl PendingScan {
    fn new(limit: usize, min_idle: usize) -> Self {
        Self {
            limit: limit.max(1),
            min_idle,
            start: Some("-".to_owned()),
            stale: Vec::new(),
        }
    }

    /// Lower bound of the next page or `None` once the scan is complete
    fn next_start(&self) -> Option<String> {
        if self.stale.len() >= self.limit {
            None
        } else {
            self.start.clone()
        }
    }

    fn absorb(&mut self, page: Vec<StreamPendingId>) {
        self.start = match page.last() {
            Some(last) if page.len() >= self.limit => Some(format!("({}", last.id)),
            _ => None,
        };

        let min_idle = self.min_idle;
        self.stale.extend(
            page.into_iter()
                .filter(|entry| entry.last_delivered_ms >= min_idle)
                .map(|entry| entry.id),
        );
    }

    fn into_stale(mut self) -> Vec<String> {
        self.stale.truncate(self.limit);
        self.stale
    }
}

fn millis(duration: Duration) -> usize {
    usize::try_from(duration.as_millis()).unwrap_or(usize::MAX)
}

/// Flattens the batches read from redis, ending the stream after the first error
fn read_stream(reader: StreamReader) -> BoxStream<'static, RedisResult<StreamId>> {
    stream::unfold(Some(reader), |state| async move {
        let mut reader = state?;

        match reader.next_batch().await {
            Ok(batch) => Some((Ok(batch), Some(reader))),
            Err(e) => {
                error!(key = %reader.key, error = %e, "Encountered error reading from redis stream");
                Some((Err(e), None))
            }
        }
    })
    .flat_map(|result| match result {
        Ok(batch) => stream::iter(batch).map(Ok).boxed(),
        Err(e) => stream::once(async { Err(e) }).boxed(),
    })
    .boxed()
}

#[cfg(test)]
mod does {
    use super::*;
    use pretty_assertions::assert_eq;

    fn pending(id: &str, idle: usize) -> StreamPendingId {
        StreamPendingId {
            id: id.to_owned(),
            consumer: "c1".to_owned(),
            last_delivered_ms: idle,
            times_delivered: 1,
        }
    }

    #[test]
    fn look_past_recently_claimed_entries() {
        let mut scan = PendingScan::new(2, 30_000);

        assert_eq!(scan.next_start(), Some("-".to_owned()));
        scan.absorb(vec![pending("1-0", 10), pending("2-0", 10)]);

        assert_eq!(scan.next_start(), Some("(2-0".to_owned()));
        scan.absorb(vec![pending("3-0", 45_000), pending("4-0", 20)]);

        assert_eq!(scan.next_start(), Some("(4-0".to_owned()));
        scan.absorb(vec![pending("5-0", 60_000)]);

        assert_eq!(scan.next_start(), None);
        assert_eq!(scan.into_stale(), vec!["3-0", "5-0"]);
    }

    #[test]
    fn stop_once_a_batch_worth_of_entries_is_stale() {
        let mut scan = PendingScan::new(2, 30_000);

        scan.absorb(vec![pending("1-0", 31_000), pending("2-0", 10)]);
        scan.absorb(vec![pending("3-0", 45_000), pending("4-0", 50_000)]);

        assert_eq!(scan.next_start(), None);
        assert_eq!(scan.into_stale(), vec!["1-0", "3-0"]);
    }
}
