//! InMemoryQueueClient - 開発・テスト用の queue provider
//!
//! # 実装詳細
//! - queue は作成順に `Vec` で保持（listing の順序 = provider order）
//! - tokio `Mutex` で排他制御、`Notify` で push 時に long-poll を起こす
//! - receive した message は in-flight に入り、delete で削除ログへ移る
//! - fault injection: lookup / listing / receive / delete を次の 1 回だけ失敗させられる

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};
use tokio::time::Instant;

use crate::domain::{Message, QueueError, QueueHandle, ReceiptHandle};
use crate::ports::QueueClient;

const NON_EXISTENT_QUEUE: &str = "AWS.SimpleQueueService.NonExistentQueue";
const INVALID_RECEIPT: &str = "ReceiptHandleIsInvalid";

struct StoredQueue {
    handle: QueueHandle,
    ready: VecDeque<Message>,
}

#[derive(Default)]
struct State {
    queues: Vec<StoredQueue>,
    in_flight: HashMap<ReceiptHandle, Message>,
    deleted: Vec<ReceiptHandle>,
    lookup_failures: VecDeque<QueueError>,
    listing_failures: VecDeque<QueueError>,
    receive_failures: VecDeque<QueueError>,
    delete_failures: VecDeque<QueueError>,
    next_message: u64,
}

impl State {
    fn queue_mut(&mut self, url: &str) -> Result<&mut StoredQueue, QueueError> {
        self.queues
            .iter_mut()
            .find(|q| q.handle.url() == url)
            .ok_or_else(|| QueueError::service(NON_EXISTENT_QUEUE, format!("no queue at {url}")))
    }
}

/// A queue provider living entirely in process memory.
pub struct InMemoryQueueClient {
    region: String,
    hide_exact_lookup: bool,
    state: Mutex<State>,
    notify: Notify,
    lookup_calls: AtomicUsize,
    list_calls: AtomicUsize,
    receive_calls: AtomicUsize,
}

impl InMemoryQueueClient {
    pub fn new(region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            hide_exact_lookup: false,
            state: Mutex::new(State::default()),
            notify: Notify::new(),
            lookup_calls: AtomicUsize::new(0),
            list_calls: AtomicUsize::new(0),
            receive_calls: AtomicUsize::new(0),
        }
    }

    /// Exact lookups always come back empty, like an account whose policy
    /// allows listing but not `GetQueueUrl`.
    pub fn with_exact_lookup_hidden(mut self) -> Self {
        self.hide_exact_lookup = true;
        self
    }

    pub async fn create_queue(&self, name: &str) -> QueueHandle {
        let url = format!("memory://{}/{}", self.region, name);
        let handle = QueueHandle::new(name, url, self.region.clone());
        let mut state = self.state.lock().await;
        if let Some(existing) = state.queues.iter().find(|q| q.handle.name() == name) {
            return existing.handle.clone();
        }
        state.queues.push(StoredQueue {
            handle: handle.clone(),
            ready: VecDeque::new(),
        });
        handle
    }

    /// Enqueue a message body and wake a waiting long-poll.
    pub async fn push(&self, queue: &QueueHandle, body: impl Into<String>) -> Result<(), QueueError> {
        let mut state = self.state.lock().await;
        state.next_message += 1;
        let seq = state.next_message;
        let message = Message::new(body, ReceiptHandle::new(format!("{}-rh-{seq}", queue.name())))
            .with_id(format!("msg-{seq}"));
        state.queue_mut(queue.url())?.ready.push_back(message);
        drop(state);

        self.notify.notify_one();
        Ok(())
    }

    pub async fn fail_next_lookup(&self, err: QueueError) {
        self.state.lock().await.lookup_failures.push_back(err);
    }

    pub async fn fail_next_listing(&self, err: QueueError) {
        self.state.lock().await.listing_failures.push_back(err);
    }

    /// Queue up a failure for the next `receive`. Several calls stack.
    pub async fn fail_next_receive(&self, err: QueueError) {
        self.state.lock().await.receive_failures.push_back(err);
    }

    /// Queue up a failure for the next `delete`. The message stays in flight.
    pub async fn fail_next_delete(&self, err: QueueError) {
        self.state.lock().await.delete_failures.push_back(err);
    }

    /// Receipt handles of deleted messages, in deletion order.
    pub async fn deleted(&self) -> Vec<ReceiptHandle> {
        self.state.lock().await.deleted.clone()
    }

    /// Messages received but neither deleted nor returned.
    pub async fn in_flight(&self) -> usize {
        self.state.lock().await.in_flight.len()
    }

    pub async fn pending(&self, queue: &QueueHandle) -> usize {
        let mut state = self.state.lock().await;
        state.queue_mut(queue.url()).map(|q| q.ready.len()).unwrap_or(0)
    }

    pub fn lookup_calls(&self) -> usize {
        self.lookup_calls.load(Ordering::Relaxed)
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::Relaxed)
    }

    pub fn receive_calls(&self) -> usize {
        self.receive_calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl QueueClient for InMemoryQueueClient {
    async fn get_queue(&self, name: &str) -> Result<Option<QueueHandle>, QueueError> {
        self.lookup_calls.fetch_add(1, Ordering::Relaxed);
        let mut state = self.state.lock().await;
        if let Some(err) = state.lookup_failures.pop_front() {
            return Err(err);
        }
        if self.hide_exact_lookup {
            return Ok(None);
        }
        Ok(state
            .queues
            .iter()
            .find(|q| q.handle.name() == name)
            .map(|q| q.handle.clone()))
    }

    async fn list_queues(&self) -> Result<Vec<QueueHandle>, QueueError> {
        self.list_calls.fetch_add(1, Ordering::Relaxed);
        let mut state = self.state.lock().await;
        if let Some(err) = state.listing_failures.pop_front() {
            return Err(err);
        }
        Ok(state.queues.iter().map(|q| q.handle.clone()).collect())
    }

    async fn receive(
        &self,
        queue: &QueueHandle,
        max_messages: usize,
        wait_time: Duration,
    ) -> Result<Vec<Message>, QueueError> {
        self.receive_calls.fetch_add(1, Ordering::Relaxed);
        let deadline = Instant::now() + wait_time;
        loop {
            {
                let mut state = self.state.lock().await;
                if let Some(err) = state.receive_failures.pop_front() {
                    return Err(err);
                }
                let stored = state.queue_mut(queue.url())?;
                let take = max_messages.min(stored.ready.len());
                if take > 0 {
                    let batch: Vec<Message> = stored.ready.drain(..take).collect();
                    for m in &batch {
                        state.in_flight.insert(m.receipt.clone(), m.clone());
                    }
                    return Ok(batch);
                }
            }

            // push が来るか deadline まで待つ
            if tokio::time::timeout_at(deadline, self.notify.notified())
                .await
                .is_err()
            {
                return Ok(Vec::new());
            }
        }
    }

    async fn delete(&self, queue: &QueueHandle, receipt: &ReceiptHandle) -> Result<(), QueueError> {
        let mut state = self.state.lock().await;
        if let Some(err) = state.delete_failures.pop_front() {
            return Err(err);
        }
        state.queue_mut(queue.url())?;
        if state.in_flight.remove(receipt).is_none() {
            return Err(QueueError::service(
                INVALID_RECEIPT,
                format!("receipt {receipt} is not in flight"),
            ));
        }
        state.deleted.push(receipt.clone());
        Ok(())
    }
}
