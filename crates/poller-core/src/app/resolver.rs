//! QueueResolver - キュー名から QueueHandle を解決
//!
//! Exact lookup first. Some permission setups make the exact lookup come back
//! empty even though the queue is visible in a listing, so the fallback scans
//! the listing for the first queue whose name contains the requested one.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::domain::{PollerError, QueueHandle};
use crate::ports::QueueClient;

pub struct QueueResolver {
    client: Arc<dyn QueueClient>,
}

impl QueueResolver {
    pub fn new(client: Arc<dyn QueueClient>) -> Self {
        Self { client }
    }

    /// Resolve `name` to a queue handle.
    ///
    /// With several substring matches the first one in provider listing order
    /// wins. That order is not guaranteed to be stable; queues sharing a
    /// prefix should be addressed by their exact name.
    pub async fn resolve(&self, name: &str) -> Result<QueueHandle, PollerError> {
        match self.client.get_queue(name).await {
            Ok(Some(handle)) => {
                debug!(queue = %handle, "resolved queue by name");
                return Ok(handle);
            }
            Ok(None) => {
                debug!(queue = name, "could not get queue by name, will try to search all queues");
            }
            Err(e) => {
                warn!(queue = name, error = %e, "queue lookup by name failed, will try to search all queues");
            }
        }

        let all = self.client.list_queues().await?;
        debug!(
            queue = name,
            visible = ?all.iter().map(QueueHandle::name).collect::<Vec<_>>(),
            "listed accessible queues"
        );

        all.into_iter()
            .find(|q| q.name().contains(name))
            .ok_or_else(|| PollerError::QueueNotFound(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::QueueError;
    use crate::impls::InMemoryQueueClient;

    #[tokio::test]
    async fn exact_match_skips_listing() {
        let client = Arc::new(InMemoryQueueClient::new("us-east-1"));
        client.create_queue("orders-dev").await;
        client.create_queue("orders").await;

        let resolver = QueueResolver::new(client.clone());
        let handle = resolver.resolve("orders").await.unwrap();

        assert_eq!(handle.name(), "orders");
        assert_eq!(client.list_calls(), 0);
    }

    #[tokio::test]
    async fn falls_back_to_first_substring_match() {
        let client = Arc::new(InMemoryQueueClient::new("us-east-1").with_exact_lookup_hidden());
        client.create_queue("audit").await;
        client.create_queue("prod-orders-v2").await;
        client.create_queue("orders-archive").await;

        let resolver = QueueResolver::new(client.clone());
        let handle = resolver.resolve("orders").await.unwrap();

        assert_eq!(handle.name(), "prod-orders-v2");
        assert_eq!(client.list_calls(), 1);
    }

    #[tokio::test]
    async fn no_match_anywhere_is_queue_not_found() {
        let client = Arc::new(InMemoryQueueClient::new("us-east-1"));
        client.create_queue("audit").await;

        let resolver = QueueResolver::new(client);
        let err = resolver.resolve("orders").await.unwrap_err();
        assert!(matches!(err, PollerError::QueueNotFound(name) if name == "orders"));
    }

    #[tokio::test]
    async fn lookup_error_still_tries_listing() {
        let client = Arc::new(InMemoryQueueClient::new("us-east-1"));
        client.create_queue("orders").await;
        client
            .fail_next_lookup(QueueError::service("AccessDenied", "no GetQueueUrl"))
            .await;

        let resolver = QueueResolver::new(client.clone());
        let handle = resolver.resolve("orders").await.unwrap();
        assert_eq!(handle.name(), "orders");
        assert_eq!(client.list_calls(), 1);
    }

    #[tokio::test]
    async fn listing_failure_is_fatal() {
        let client = Arc::new(InMemoryQueueClient::new("us-east-1").with_exact_lookup_hidden());
        client.fail_next_listing(QueueError::Transport("reset".into())).await;

        let resolver = QueueResolver::new(client);
        let err = resolver.resolve("orders").await.unwrap_err();
        assert!(matches!(err, PollerError::Queue(QueueError::Transport(_))));
    }
}
