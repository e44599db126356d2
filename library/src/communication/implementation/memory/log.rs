use super::super::super::event::{
    ConsumerGroupDescriptor, ConsumptionOptions, EntryFields, QueueDescriptor, QueueLocation,
    QueueProvider, RawNotificationPublisher, RawQueueEntry,
};
use super::super::fields::{FieldNotificationPublisher, FieldQueueEntry};
use super::MemoryBroker;
use crate::{BoxedError, EmptyResult};
use async_trait::async_trait;
use futures::stream::{self, BoxStream};
use futures::StreamExt;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::{timeout, Instant};

type Batch = Vec<(u64, EntryFields)>;

#[derive(Default)]
pub(super) struct Topic {
    entries: VecDeque<(u64, EntryFields)>,
    last_seq: u64,
    groups: HashMap<String, GroupState>,
    appended: Arc<Notify>,
}

struct GroupState {
    next_seq: u64,
    pending: BTreeMap<u64, Pending>,
}

struct Pending {
    consumer: String,
    delivered_at: Instant,
}

fn lookup(entries: &VecDeque<(u64, EntryFields)>, seq: u64) -> Option<&EntryFields> {
    entries
        .binary_search_by_key(&seq, |(s, _)| *s)
        .ok()
        .map(|index| &entries[index].1)
}

impl Topic {
    fn append(&mut self, fields: EntryFields, limit: usize) {
        self.last_seq += 1;
        self.entries.push_back((self.last_seq, fields));

        while self.entries.len() > limit.max(1) {
            self.entries.pop_front();
        }
    }

    fn ensure_group(&mut self, name: &str, start: &QueueLocation) {
        let next_seq = match start {
            QueueLocation::Head => 0,
            QueueLocation::Tail => self.last_seq + 1,
        };

        self.groups
            .entry(name.to_owned())
            .or_insert_with(|| GroupState {
                next_seq,
                pending: BTreeMap::new(),
            });
    }

    /// Entries pending at `consumer` with a sequence number past `after`
    fn read_pending(&mut self, group: &str, consumer: &str, after: u64, count: usize) -> Batch {
        let Topic {
            entries, groups, ..
        } = self;

        let group = match groups.get_mut(group) {
            Some(group) => group,
            None => return Vec::new(),
        };

        let mut batch = Vec::new();
        let mut trimmed = Vec::new();

        for (seq, pending) in group.pending.range(after + 1..) {
            if pending.consumer != consumer {
                continue;
            }

            match lookup(entries, *seq) {
                Some(fields) => batch.push((*seq, fields.clone())),
                None => trimmed.push(*seq),
            }

            if batch.len() >= count {
                break;
            }
        }

        for seq in trimmed {
            group.pending.remove(&seq);
        }

        batch
    }

    /// Never delivered entries, assigned to `consumer` on return
    fn read_new(&mut self, group: &str, consumer: &str, count: usize, now: Instant) -> Batch {
        let Topic {
            entries, groups, ..
        } = self;

        let group = match groups.get_mut(group) {
            Some(group) => group,
            None => return Vec::new(),
        };

        let next_seq = group.next_seq;
        let batch: Batch = entries
            .iter()
            .filter(|(seq, _)| *seq >= next_seq)
            .take(count)
            .cloned()
            .collect();

        for (seq, _) in batch.iter() {
            group.pending.insert(
                *seq,
                Pending {
                    consumer: consumer.to_owned(),
                    delivered_at: now,
                },
            );
        }

        if let Some((last, _)) = batch.last() {
            group.next_seq = last + 1;
        }

        batch
    }

    /// Entries pending anywhere in the group for at least `min_idle`, reassigned to `consumer`
    fn claim(
        &mut self,
        group: &str,
        consumer: &str,
        min_idle: Duration,
        count: usize,
        now: Instant,
    ) -> Batch {
        let Topic {
            entries, groups, ..
        } = self;

        let group = match groups.get_mut(group) {
            Some(group) => group,
            None => return Vec::new(),
        };

        let stale: Vec<u64> = group
            .pending
            .iter()
            .filter(|(_, pending)| now.duration_since(pending.delivered_at) >= min_idle)
            .map(|(seq, _)| *seq)
            .take(count)
            .collect();

        let mut batch = Vec::new();

        for seq in stale {
            match lookup(entries, seq) {
                Some(fields) => {
                    group.pending.insert(
                        seq,
                        Pending {
                            consumer: consumer.to_owned(),
                            delivered_at: now,
                        },
                    );
                    batch.push((seq, fields.clone()));
                }
                None => {
                    group.pending.remove(&seq);
                }
            }
        }

        batch
    }
}

/// Entry handed out by the [`MemoryBroker`]
pub struct MemoryQueueEntry {
    broker: MemoryBroker,
    key: String,
    group: String,
    seq: u64,
    id: String,
    fields: EntryFields,
}

#[async_trait]
impl RawQueueEntry for MemoryQueueEntry {
    fn id(&self) -> &str {
        &self.id
    }

    fn fields(&self) -> &EntryFields {
        &self.fields
    }

    async fn acknowledge(&mut self) -> EmptyResult {
        let mut state = self.broker.state.lock().await;

        if let Some(group) = state
            .topics
            .get_mut(&self.key)
            .and_then(|topic| topic.groups.get_mut(&self.group))
        {
            group.pending.remove(&self.seq);
        }

        Ok(())
    }
}

impl FieldQueueEntry for MemoryQueueEntry {}

#[derive(Clone, Copy)]
enum Cursor {
    Backlog(u64),
    Live,
}

struct Reader {
    broker: MemoryBroker,
    key: String,
    group: String,
    consumer: String,
    options: ConsumptionOptions,
    cursor: Cursor,
    appended: Arc<Notify>,
    last_claim: Instant,
}

impl Reader {
    async fn next_batch(&mut self) -> Batch {
        loop {
            let appended = self.appended.clone();
            let notified = appended.notified();

            if let Cursor::Live = self.cursor {
                // A steady flow of additions must not starve idle entries
                if self.claim_due() {
                    let batch = self.claim().await;

                    if !batch.is_empty() {
                        return batch;
                    }
                }
            }

            {
                let mut state = self.broker.state.lock().await;
                let topic = state.topics.entry(self.key.clone()).or_default();

                match self.cursor {
                    Cursor::Backlog(after) => {
                        let batch = topic.read_pending(
                            &self.group,
                            &self.consumer,
                            after,
                            self.options.batch_size,
                        );

                        match batch.last() {
                            Some((seq, _)) => {
                                self.cursor = Cursor::Backlog(*seq);
                                return batch;
                            }
                            None => {
                                self.cursor = Cursor::Live;
                                continue;
                            }
                        }
                    }
                    Cursor::Live => {
                        let batch = topic.read_new(
                            &self.group,
                            &self.consumer,
                            self.options.batch_size,
                            Instant::now(),
                        );

                        if !batch.is_empty() {
                            return batch;
                        }
                    }
                }
            }

            if timeout(self.options.poll_interval, notified).await.is_ok() {
                continue;
            }

            let batch = self.claim().await;

            if !batch.is_empty() {
                return batch;
            }
        }
    }

    fn claim_due(&self) -> bool {
        matches!(self.options.claim_idle, Some(min_idle) if self.last_claim.elapsed() >= min_idle)
    }

    async fn claim(&mut self) -> Batch {
        let min_idle = match self.options.claim_idle {
            Some(min_idle) => min_idle,
            None => return Vec::new(),
        };

        let now = Instant::now();
        self.last_claim = now;

        let mut state = self.broker.state.lock().await;
        state.topics.entry(self.key.clone()).or_default().claim(
            &self.group,
            &self.consumer,
            min_idle,
            self.options.batch_size,
            now,
        )
    }
}

impl MemoryBroker {
    /// Number of entries handed out to the group but not yet acknowledged
    pub async fn pending_count(&self, key: &str, group: &str) -> usize {
        let state = self.state.lock().await;

        state
            .topics
            .get(key)
            .and_then(|topic| topic.groups.get(group))
            .map(|group| group.pending.len())
            .unwrap_or_default()
    }

    /// Number of entries currently retained in the log
    pub async fn retained_count(&self, key: &str) -> usize {
        let state = self.state.lock().await;

        state
            .topics
            .get(key)
            .map(|topic| topic.entries.len())
            .unwrap_or_default()
    }
}

#[async_trait]
impl RawNotificationPublisher for MemoryBroker {
    async fn publish_raw(
        &self,
        fields: &EntryFields,
        descriptor: QueueDescriptor,
    ) -> EmptyResult {
        let appended = {
            let mut state = self.state.lock().await;
            let topic = state
                .topics
                .entry(descriptor.key().to_owned())
                .or_default();

            topic.append(fields.clone(), descriptor.limit());
            topic.appended.clone()
        };

        appended.notify_waiters();

        Ok(())
    }
}

impl FieldNotificationPublisher for MemoryBroker {}

#[async_trait]
impl QueueProvider for MemoryBroker {
    type Entry = MemoryQueueEntry;

    async fn consume(
        &self,
        queue: QueueDescriptor,
        group: &ConsumerGroupDescriptor,
        consumer: &str,
        options: &ConsumptionOptions,
    ) -> Result<BoxStream<'static, Result<Self::Entry, BoxedError>>, BoxedError> {
        let key = queue.key().to_owned();
        let group_name = group.identifier().to_string();

        let appended = {
            let mut state = self.state.lock().await;
            let topic = state.topics.entry(key.clone()).or_default();

            topic.ensure_group(&group_name, group.start());
            topic.appended.clone()
        };

        let reader = Reader {
            broker: self.clone(),
            key,
            group: group_name,
            consumer: consumer.to_owned(),
            options: options.clone(),
            cursor: Cursor::Backlog(0),
            appended,
            last_claim: Instant::now(),
        };

        let stream = stream::unfold(reader, |mut reader| async move {
            let entries: Vec<Result<MemoryQueueEntry, BoxedError>> = reader
                .next_batch()
                .await
                .into_iter()
                .map(|(seq, fields)| {
                    Ok(MemoryQueueEntry {
                        broker: reader.broker.clone(),
                        key: reader.key.clone(),
                        group: reader.group.clone(),
                        seq,
                        id: format!("{}-0", seq),
                        fields,
                    })
                })
                .collect();

            Some((stream::iter(entries), reader))
        })
        .flatten()
        .boxed();

        Ok(stream)
    }
}
