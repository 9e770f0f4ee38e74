//! PollLoop の end-to-end テスト（InMemoryQueueClient + 仮想時間）

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use poller_core::app::{PollLoop, PollSettings, PollerBuilder};
use poller_core::domain::{HandlerError, Message, QueueError, StopReason, WorkerMode};
use poller_core::impls::{BodyMode, InMemoryQueueClient, NotificationLogHandler};
use poller_core::ports::MessageHandler;
use tokio::time::Instant;
use tracing_test::traced_test;

/// Takes `delay` per message; fails bodies starting with "bad".
struct SlowHandler {
    delay: Duration,
    seen: Mutex<Vec<String>>,
}

impl SlowHandler {
    fn new(delay: Duration) -> Self {
        Self {
            delay,
            seen: Mutex::new(Vec::new()),
        }
    }

    fn seen(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl MessageHandler for SlowHandler {
    async fn handle(&self, message: &Message) -> Result<(), HandlerError> {
        tokio::time::sleep(self.delay).await;
        self.seen.lock().unwrap().push(message.body.clone());
        if message.body.starts_with("bad") {
            return Err(HandlerError::failed("cannot process"));
        }
        Ok(())
    }
}

async fn queue_with(bodies: &[&str]) -> Arc<InMemoryQueueClient> {
    let client = Arc::new(InMemoryQueueClient::new("local"));
    let q = client.create_queue("orders").await;
    for body in bodies {
        client.push(&q, *body).await.unwrap();
    }
    client
}

async fn build(
    client: Arc<InMemoryQueueClient>,
    handler: Arc<dyn MessageHandler>,
    mode: WorkerMode,
) -> PollLoop {
    PollerBuilder::new()
        .client(client)
        .handler(handler)
        .mode(mode)
        .build("orders")
        .await
        .unwrap()
}

#[tokio::test(start_paused = true)]
#[traced_test]
async fn bounded_worker_stops_after_uptime_with_all_messages_deleted() {
    let client = queue_with(&["one", "two", "three"]).await;
    // 3 x 14 s of work, then a 20 s empty poll: past the 60 s bound
    let handler = Arc::new(SlowHandler::new(Duration::from_secs(14)));

    let poller = build(client.clone(), handler.clone(), WorkerMode::Bounded).await;
    let report = poller.run().await;

    assert_eq!(report.iterations, 2);
    assert_eq!(report.stop_reason, Some(StopReason::UptimeExceeded));
    assert_eq!(client.deleted().await.len(), 3);
    assert_eq!(handler.seen(), vec!["one", "two", "three"]);
    assert!(!report.had_errors());

    assert!(!logs_contain("ERROR"));
    assert!(logs_contain("worker uptime exceeded. exiting"));
}

#[tokio::test(start_paused = true)]
async fn bounded_worker_stops_on_first_empty_poll() {
    let client = queue_with(&["only"]).await;
    let poller = build(
        client.clone(),
        Arc::new(SlowHandler::new(Duration::ZERO)),
        WorkerMode::Bounded,
    )
    .await;

    let report = poller.run().await;

    assert_eq!(report.iterations, 2);
    assert_eq!(report.stop_reason, Some(StopReason::QueueEmpty));
    assert_eq!(client.receive_calls(), 2);
}

#[tokio::test(start_paused = true)]
#[traced_test]
async fn failed_message_is_logged_with_body_deleted_and_loop_moves_on() {
    let bad_body = r#"bad {"order": 42}"#;
    let client = queue_with(&["first", bad_body, "third"]).await;
    let handler = Arc::new(SlowHandler::new(Duration::ZERO));

    let started = Instant::now();
    let poller = build(client.clone(), handler.clone(), WorkerMode::Bounded).await;
    let report = poller.run().await;

    assert_eq!(handler.seen(), vec!["first", bad_body, "third"]);
    assert_eq!(client.deleted().await.len(), 3);
    assert_eq!(report.handler_failures, 1);
    // only the empty long-poll took time: no backoff pause after the failure
    assert!(started.elapsed() < Duration::from_secs(30));

    assert!(logs_contain("error while handling message"));
    assert!(logs_contain(bad_body));
}

#[tokio::test(start_paused = true)]
async fn transient_fetch_failure_pauses_then_fetches_again() {
    let client = queue_with(&["after-outage"]).await;
    client
        .fail_next_receive(QueueError::AddressResolution("sqs.local".into()))
        .await;
    let handler = Arc::new(SlowHandler::new(Duration::ZERO));

    let started = Instant::now();
    let poller = build(client.clone(), handler.clone(), WorkerMode::Bounded).await;
    let report = poller.run().await;
    let elapsed = started.elapsed();

    assert_eq!(report.fetch_failures, 1);
    assert_eq!(handler.seen(), vec!["after-outage"]);
    assert_eq!(client.receive_calls(), 3);
    // 30 s pause + 20 s empty poll
    assert!(elapsed >= Duration::from_secs(50), "elapsed {elapsed:?}");
    assert!(elapsed < Duration::from_secs(60), "elapsed {elapsed:?}");
    assert_eq!(report.stop_reason, Some(StopReason::QueueEmpty));
}

#[tokio::test(start_paused = true)]
#[traced_test]
async fn unexpected_fetch_failure_pauses_longer() {
    let client = queue_with(&["late"]).await;
    client
        .fail_next_receive(QueueError::service("InternalError", "try later"))
        .await;

    let started = Instant::now();
    let poller = build(
        client.clone(),
        Arc::new(SlowHandler::new(Duration::ZERO)),
        WorkerMode::Bounded,
    )
    .await;
    let report = poller.run().await;

    assert!(started.elapsed() >= Duration::from_secs(60));
    assert_eq!(client.deleted().await.len(), 1);
    assert_eq!(report.stop_reason, Some(StopReason::UptimeExceeded));
    assert!(logs_contain("InternalError"));
}

#[tokio::test(start_paused = true)]
async fn forever_worker_keeps_polling_an_empty_queue() {
    let client = queue_with(&[]).await;
    let poller = build(
        client.clone(),
        Arc::new(SlowHandler::new(Duration::ZERO)),
        WorkerMode::Forever,
    )
    .await;

    let outcome = tokio::time::timeout(Duration::from_secs(600), poller.run()).await;

    assert!(outcome.is_err(), "forever worker returned");
    assert!(client.receive_calls() >= 29);
}

#[tokio::test(start_paused = true)]
#[traced_test]
async fn default_handler_logs_the_notification_payload() {
    let client = queue_with(&[
        r#"{"Type": "Notification", "Message": "order 42 shipped"}"#,
        "not json at all",
    ])
    .await;

    let poller = build(
        client.clone(),
        Arc::new(NotificationLogHandler::new(BodyMode::Notification)),
        WorkerMode::Bounded,
    )
    .await;
    let report = poller.run().await;

    assert_eq!(report.handled, 1);
    assert_eq!(report.handler_failures, 1);
    assert_eq!(client.deleted().await.len(), 2);

    assert!(logs_contain("order 42 shipped"));
    assert!(logs_contain("not json at all"));
}

#[tokio::test(start_paused = true)]
async fn small_batches_are_requested_when_configured() {
    let client = queue_with(&["a", "b", "c", "d", "e"]).await;
    let poller = PollerBuilder::new()
        .client(client.clone())
        .handler(Arc::new(SlowHandler::new(Duration::ZERO)))
        .settings(PollSettings {
            batch_size: 2,
            ..PollSettings::default()
        })
        .build("orders")
        .await
        .unwrap();

    let report = poller.run().await;

    // 2 + 2 + 1 + empty
    assert_eq!(report.iterations, 4);
    assert_eq!(report.deleted, 5);
}

/// Never returns.
struct HungHandler;

#[async_trait]
impl MessageHandler for HungHandler {
    async fn handle(&self, _message: &Message) -> Result<(), HandlerError> {
        std::future::pending::<()>().await;
        Ok(())
    }
}

#[tokio::test(start_paused = true)]
#[traced_test]
async fn hung_handler_cannot_stall_a_bounded_worker_with_default_settings() {
    let client = queue_with(&["stuck-1", "stuck-2"]).await;
    let poller = build(client.clone(), Arc::new(HungHandler), WorkerMode::Bounded).await;

    let report = tokio::time::timeout(Duration::from_secs(3600), poller.run())
        .await
        .expect("bounded worker should finish");

    assert_eq!(report.handler_failures, 2);
    assert_eq!(client.deleted().await.len(), 2);
    assert_eq!(client.in_flight().await, 0);
    assert!(logs_contain("handler did not finish within 30s"));
}
