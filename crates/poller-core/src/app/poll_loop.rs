//! PollLoop - メッセージ処理ループ
//!
//! # フロー
//! 1. QueueClient::receive() で long-poll（最大 batch_size 件, wait_time 秒）
//! 2. 各 message を fetch 順に MessageHandler へ渡す（失敗はログのみ）
//! 3. DeletePolicy に従って delete
//! 4. BackoffPolicy + WorkerLifecycle で continue / pause / terminate を決定

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::FutureExt;
use tracing::{Instrument, debug, error, info, info_span, warn};

use crate::app::{BackoffPolicy, WorkerLifecycle};
use crate::domain::{
    BackoffDecision, DeletePolicy, FailureKind, HandlerError, Message, QueueError, QueueHandle,
    StopReason,
};
use crate::observability::RunReport;
use crate::ports::{MessageHandler, QueueClient};

/// Fetch and acknowledge tunables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollSettings {
    /// Messages requested per fetch. The provider caps this at 10.
    pub batch_size: usize,

    /// Server-side long-poll wait.
    pub wait_time: Duration,

    pub delete_policy: DeletePolicy,

    /// A handler still running after this long is abandoned and counted as
    /// failed. `None` waits for as long as the handler takes, so one hung
    /// handler stalls the worker.
    pub handler_timeout: Option<Duration>,
}

impl PollSettings {
    pub const MAX_BATCH_SIZE: usize = 10;
    /// Longest long-poll the provider accepts.
    pub const MAX_WAIT_TIME: Duration = Duration::from_secs(20);
    pub const DEFAULT_WAIT_TIME: Duration = Self::MAX_WAIT_TIME;
    pub const DEFAULT_HANDLER_TIMEOUT: Duration = Duration::from_secs(30);

    /// `batch_size` clamped into the range the provider accepts.
    pub fn effective_batch_size(&self) -> usize {
        self.batch_size.clamp(1, Self::MAX_BATCH_SIZE)
    }
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            batch_size: Self::MAX_BATCH_SIZE,
            wait_time: Self::DEFAULT_WAIT_TIME,
            delete_policy: DeletePolicy::default(),
            handler_timeout: Some(Self::DEFAULT_HANDLER_TIMEOUT),
        }
    }
}

/// The running worker: owns the resolved queue for its whole life.
pub struct PollLoop {
    client: Arc<dyn QueueClient>,
    queue: QueueHandle,
    handler: Arc<dyn MessageHandler>,
    lifecycle: WorkerLifecycle,
    backoff: BackoffPolicy,
    settings: PollSettings,
}

impl PollLoop {
    pub fn new(
        client: Arc<dyn QueueClient>,
        queue: QueueHandle,
        handler: Arc<dyn MessageHandler>,
        lifecycle: WorkerLifecycle,
        backoff: BackoffPolicy,
        settings: PollSettings,
    ) -> Self {
        Self {
            client,
            queue,
            handler,
            lifecycle,
            backoff,
            settings,
        }
    }

    pub fn queue(&self) -> &QueueHandle {
        &self.queue
    }

    pub fn lifecycle(&self) -> &WorkerLifecycle {
        &self.lifecycle
    }

    pub fn settings(&self) -> &PollSettings {
        &self.settings
    }

    /// Run until the lifecycle says stop.
    ///
    /// In Forever mode this future never completes.
    pub async fn run(mut self) -> RunReport {
        let span = info_span!(
            "poll_loop",
            queue = %self.queue.name(),
            mode = %self.lifecycle.mode()
        );
        self.run_inner().instrument(span).await
    }

    async fn run_inner(&mut self) -> RunReport {
        let mut report = RunReport::started(Utc::now());
        info!(
            url = %self.queue.url(),
            batch_size = self.settings.effective_batch_size(),
            wait_secs = self.settings.wait_time.as_secs(),
            delete_policy = ?self.settings.delete_policy,
            "polling started"
        );

        loop {
            report.iterations += 1;
            let outcome = self.poll_once(&mut report).await;
            let kind = self.backoff.classify(&outcome);

            match &outcome {
                Ok(count) => self.lifecycle.record_batch(*count),
                Err(e) => {
                    report.fetch_failures += 1;
                    self.lifecycle.record_failed_fetch();
                    self.log_fetch_failure(kind, e);
                }
            }

            match self.backoff.decide(kind, self.lifecycle.should_terminate()) {
                BackoffDecision::ContinueImmediately => {}
                BackoffDecision::PauseThenRetry(pause) => tokio::time::sleep(pause).await,
                BackoffDecision::Terminate(reason) => {
                    match reason {
                        StopReason::UptimeExceeded => info!(
                            elapsed_secs = self.lifecycle.elapsed().as_secs(),
                            "worker uptime exceeded. exiting"
                        ),
                        StopReason::QueueEmpty => info!("queue is empty. exiting"),
                    }
                    report.finish(Utc::now(), reason);
                    info!(
                        iterations = report.iterations,
                        received = report.received,
                        deleted = report.deleted,
                        handler_failures = report.handler_failures,
                        fetch_failures = report.fetch_failures,
                        "poll loop finished"
                    );
                    return report;
                }
            }
        }
    }

    /// One fetch plus a sequential pass over the batch.
    async fn poll_once(&mut self, report: &mut RunReport) -> Result<usize, QueueError> {
        let batch = self
            .client
            .receive(
                &self.queue,
                self.settings.effective_batch_size(),
                self.settings.wait_time,
            )
            .await?;
        debug!(count = batch.len(), "got {} result(s) this time", batch.len());
        report.received += batch.len() as u64;

        for message in &batch {
            self.process(message, report).await;
        }
        Ok(batch.len())
    }

    async fn process(&self, message: &Message, report: &mut RunReport) {
        let handled_ok = match self.invoke_handler(message).await {
            Ok(()) => {
                report.handled += 1;
                true
            }
            Err(e) => {
                report.handler_failures += 1;
                error!(
                    message_id = %message.log_id(),
                    error = %e,
                    body = %message.body,
                    "error while handling message"
                );
                false
            }
        };

        if !self.settings.delete_policy.should_delete(handled_ok) {
            report.retained += 1;
            warn!(
                message_id = %message.log_id(),
                "message left on the queue for redelivery"
            );
            return;
        }

        match self.client.delete(&self.queue, &message.receipt).await {
            Ok(()) => report.deleted += 1,
            Err(e) => {
                report.delete_failures += 1;
                error!(message_id = %message.log_id(), error = %e, "failed to delete message");
            }
        }
    }

    /// Run the handler with panics and the optional timeout folded into
    /// `HandlerError`.
    async fn invoke_handler(&self, message: &Message) -> Result<(), HandlerError> {
        let call = AssertUnwindSafe(self.handler.handle(message)).catch_unwind();
        let caught = match self.settings.handler_timeout {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .map_err(|_| HandlerError::TimedOut(limit))?,
            None => call.await,
        };
        caught.unwrap_or_else(|panic| Err(HandlerError::Panicked(panic_message(panic.as_ref()))))
    }

    fn log_fetch_failure(&self, kind: FailureKind, e: &QueueError) {
        let pause_secs = self.backoff.delay_for(kind).as_secs();
        match kind {
            FailureKind::TransientNetwork => warn!(
                error = %e,
                pause_secs,
                "queue endpoint could not be resolved. will retry in {pause_secs} seconds"
            ),
            _ => error!(
                error = %e,
                error_debug = ?e,
                pause_secs,
                "unexpected error. will retry in {pause_secs} seconds"
            ),
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    panic
        .downcast_ref::<String>()
        .cloned()
        .or_else(|| panic.downcast_ref::<&str>().map(|s| s.to_string()))
        .unwrap_or_else(|| "unknown panic".to_string())
}
