//! Errors - エラー型と分類
//!
//! - `QueueError`: queue provider との通信エラー（fetch / delete / lookup）
//! - `HandlerError`: MessageHandler が返す（または loop が合成する）エラー
//! - `PollerError`: 起動時の致命的エラー（queue 解決失敗など）

use std::time::Duration;

use thiserror::Error;

/// Errors reported by a [`QueueClient`](crate::ports::QueueClient).
///
/// The variants are coarse on purpose: the loop only needs to tell address
/// resolution failures apart from everything else.
#[derive(Debug, Error)]
pub enum QueueError {
    /// The provider endpoint could not be resolved (DNS / getaddrinfo).
    #[error("address resolution failed: {0}")]
    AddressResolution(String),

    /// The provider answered with an error.
    #[error("service error {code}: {message}")]
    Service { code: String, message: String },

    /// Connection, TLS or timeout failure after the endpoint was resolved.
    #[error("transport error: {0}")]
    Transport(String),

    #[error("{0}")]
    Other(String),
}

impl QueueError {
    pub fn service(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Service {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Is this a name/address resolution failure?
    pub fn is_address_resolution(&self) -> bool {
        matches!(self, QueueError::AddressResolution(_))
    }
}

/// Failure of a single message handler invocation.
///
/// Never escapes the per-message step of the poll loop.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// The body did not have the shape the handler expects.
    #[error("malformed message body: {0}")]
    Decode(String),

    #[error("{0}")]
    Failed(String),

    #[error("handler panicked: {0}")]
    Panicked(String),

    #[error("handler did not finish within {0:?}")]
    TimedOut(Duration),
}

impl HandlerError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

/// Fatal errors surfaced while wiring the poller.
#[derive(Debug, Error)]
pub enum PollerError {
    #[error("queue not found: no queue named or containing '{0}'")]
    QueueNotFound(String),

    #[error("queue error: {0}")]
    Queue(#[from] QueueError),
}
