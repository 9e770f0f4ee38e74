//! poller-core
//!
//! Core building blocks for the queue poller worker.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（message, queue_handle, state, decision, errors）
//! - **ports**: 抽象化レイヤー（QueueClient, MessageHandler, Clock）
//! - **app**: アプリケーションロジック（resolver, poll_loop, backoff, lifecycle, builder）
//! - **impls**: 実装（SqsQueueClient, InMemoryQueueClient, NotificationLogHandler）
//! - **config**: TOML 設定
//! - **observability**: RunReport

pub mod app;
pub mod config;
pub mod domain;
pub mod impls;
pub mod observability;
pub mod ports;
