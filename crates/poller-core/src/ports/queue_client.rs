//! QueueClient port - queue provider（SQS または InMemory）
//!
//! The poller only needs four calls from a provider: exact lookup, listing,
//! long-poll receive and delete.

use std::time::Duration;

use async_trait::async_trait;

use crate::domain::{Message, QueueError, QueueHandle, ReceiptHandle};

/// Access to a remote message queue.
///
/// Implementations must be cheap to share (`Arc<dyn QueueClient>`); the loop
/// never calls them concurrently.
#[async_trait]
pub trait QueueClient: Send + Sync {
    /// Look a queue up by its exact name.
    ///
    /// `Ok(None)` means the provider did not return a handle; callers may try
    /// [`list_queues`](Self::list_queues) next.
    async fn get_queue(&self, name: &str) -> Result<Option<QueueHandle>, QueueError>;

    /// Every queue the credentials can see, in provider order.
    async fn list_queues(&self) -> Result<Vec<QueueHandle>, QueueError>;

    /// Long-poll for up to `max_messages`, waiting at most `wait_time` for the
    /// first one to arrive. An empty vec means nothing arrived in time.
    async fn receive(
        &self,
        queue: &QueueHandle,
        max_messages: usize,
        wait_time: Duration,
    ) -> Result<Vec<Message>, QueueError>;

    /// Remove a message for every consumer. Irreversible.
    async fn delete(&self, queue: &QueueHandle, receipt: &ReceiptHandle) -> Result<(), QueueError>;
}
