use super::event::{NotificationPublisher, QueueProvider};
use super::request::{Requestor, ResponsePublisher};
use crate::cache::CacheStore;

/// Factory for communication primitives
///
/// Services are instantiated from a factory so that they can run against the real bus or the
/// in-process broker without knowing which one they got.
pub trait CommunicationFactory {
    /// [`QueueProvider`] implementation
    type QueueProvider: QueueProvider + Send + Sync;
    /// [`NotificationPublisher`] implementation
    type NotificationPublisher: NotificationPublisher + Send + Sync;
    /// [`Requestor`] implementation
    type Requestor: Requestor + Send + Sync;
    /// [`ResponsePublisher`] implementation
    type ResponsePublisher: ResponsePublisher + Send + Sync;
    /// [`CacheStore`] implementation
    type CacheStore: CacheStore + Send + Sync;

    /// Creates a new [`QueueProvider`]
    fn queue_provider(&self) -> Self::QueueProvider;

    /// Creates a new [`NotificationPublisher`]
    fn notification_publisher(&self) -> Self::NotificationPublisher;

    /// Creates a new [`Requestor`]
    fn requestor(&self) -> Self::Requestor;

    /// Creates a new [`ResponsePublisher`]
    fn response_publisher(&self) -> Self::ResponsePublisher;

    /// Creates a handle to the shared [`CacheStore`]
    fn cache_store(&self) -> Self::CacheStore;
}
