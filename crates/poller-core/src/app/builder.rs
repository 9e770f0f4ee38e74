//! PollerBuilder - PollLoop の構築とワイヤリング
//!
//! # 学習ポイント
//! - Builder パターンの実装
//! - 起動時検証（Fail-fast: queue が見つからなければ build() が失敗）

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::app::{BackoffPolicy, PollLoop, PollSettings, QueueResolver, WorkerLifecycle};
use crate::config::PollerConfig;
use crate::domain::{PollerError, WorkerMode};
use crate::ports::{Clock, MessageHandler, QueueClient, SystemClock};

/// PollerBuilder は PollLoop を構築
///
/// # 使用例
/// ```ignore
/// let poller = PollerBuilder::new()
///     .client(Arc::new(sqs))
///     .handler(Arc::new(NotificationLogHandler::default()))
///     .mode(WorkerMode::Bounded)
///     .build("orders")
///     .await?;
/// let report = poller.run().await;
/// ```
pub struct PollerBuilder {
    client: Option<Arc<dyn QueueClient>>,
    handler: Option<Arc<dyn MessageHandler>>,
    clock: Arc<dyn Clock>,
    mode: WorkerMode,
    max_uptime: Duration,
    backoff: BackoffPolicy,
    settings: PollSettings,
}

/// BuildError は PollLoop 構築時のエラー
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("no queue client configured")]
    MissingClient,

    #[error("no message handler configured")]
    MissingHandler,

    #[error(transparent)]
    Poller(#[from] PollerError),
}

impl PollerBuilder {
    pub fn new() -> Self {
        Self {
            client: None,
            handler: None,
            clock: Arc::new(SystemClock),
            mode: WorkerMode::Bounded,
            max_uptime: WorkerLifecycle::DEFAULT_MAX_UPTIME,
            backoff: BackoffPolicy::default(),
            settings: PollSettings::default(),
        }
    }

    /// Take tunables (uptime, backoff, fetch settings) from a loaded config.
    pub fn from_config(config: &PollerConfig) -> Self {
        Self::new()
            .max_uptime(config.max_uptime())
            .backoff(config.backoff_policy())
            .settings(config.poll_settings())
    }

    pub fn client(mut self, client: Arc<dyn QueueClient>) -> Self {
        self.client = Some(client);
        self
    }

    pub fn handler(mut self, handler: Arc<dyn MessageHandler>) -> Self {
        self.handler = Some(handler);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn mode(mut self, mode: WorkerMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn max_uptime(mut self, max_uptime: Duration) -> Self {
        self.max_uptime = max_uptime;
        self
    }

    pub fn backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn settings(mut self, settings: PollSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Resolve `queue_name` and assemble the loop.
    ///
    /// # 検証
    /// - client / handler が設定されているか
    /// - queue が解決できるか（できなければ `PollerError::QueueNotFound`）
    ///
    /// The uptime clock starts here, after resolution.
    pub async fn build(self, queue_name: &str) -> Result<PollLoop, BuildError> {
        let client = self.client.ok_or(BuildError::MissingClient)?;
        let handler = self.handler.ok_or(BuildError::MissingHandler)?;

        let queue = QueueResolver::new(client.clone()).resolve(queue_name).await?;
        info!(queue = %queue, url = %queue.url(), "queue resolved");

        let lifecycle = WorkerLifecycle::start(self.mode, self.max_uptime, self.clock);
        Ok(PollLoop::new(
            client,
            queue,
            handler,
            lifecycle,
            self.backoff,
            self.settings,
        ))
    }
}

impl Default for PollerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
