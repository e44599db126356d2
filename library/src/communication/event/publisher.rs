use super::{EntryFields, Notification, QueueDescriptor};
use crate::EmptyResult;
use async_trait::async_trait;

/// Structure which allows appending raw fields to a queue
#[async_trait]
pub trait RawNotificationPublisher {
    /// Appends an entry to a [`Queue`](QueueDescriptor), trimming it to the queue's limit
    async fn publish_raw(&self, fields: &EntryFields, descriptor: QueueDescriptor) -> EmptyResult;
}

/// Publisher for [`Notifications`](Notification)
#[async_trait]
pub trait NotificationPublisher {
    /// Publishes a [`Notification`] to its designated queue
    async fn publish<N: Notification + Send + Sync>(&self, notification: &N) -> EmptyResult;
}
