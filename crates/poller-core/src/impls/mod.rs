//! Impls - ports の実装
//!
//! # 含まれる実装
//! - **InMemoryQueueClient**: 開発・テスト用の queue provider
//! - **SqsQueueClient**: Amazon SQS（feature `sqs`）
//! - **NotificationLogHandler**: 既定の MessageHandler（本文をログに出す）

pub mod inmem_queue;
pub mod log_handler;
#[cfg(feature = "sqs")]
pub mod sqs;

pub use self::inmem_queue::InMemoryQueueClient;
pub use self::log_handler::{BodyMode, NotificationLogHandler};
#[cfg(feature = "sqs")]
pub use self::sqs::SqsQueueClient;
