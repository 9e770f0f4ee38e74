//! Backoff policy: classifies fetch failures and decides pause lengths.

use std::time::Duration;

use crate::domain::{BackoffDecision, FailureKind, QueueError, StopReason};

/// Pause lengths applied after a failed fetch.
///
/// No failure is fatal here: the loop always retries after pausing, only the
/// worker lifecycle can end it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackoffPolicy {
    /// Pause after the provider endpoint could not be resolved.
    pub transient_pause: Duration,

    /// Pause after any other fetch failure.
    pub unexpected_pause: Duration,
}

impl BackoffPolicy {
    pub const DEFAULT_TRANSIENT_PAUSE: Duration = Duration::from_secs(30);
    pub const DEFAULT_UNEXPECTED_PAUSE: Duration = Duration::from_secs(60);

    pub fn new(transient_pause: Duration, unexpected_pause: Duration) -> Self {
        Self {
            transient_pause,
            unexpected_pause,
        }
    }

    /// Classify the outcome of a fetch.
    pub fn classify<T>(&self, outcome: &Result<T, QueueError>) -> FailureKind {
        match outcome {
            Ok(_) => FailureKind::None,
            Err(e) if e.is_address_resolution() => FailureKind::TransientNetwork,
            Err(_) => FailureKind::Unexpected,
        }
    }

    /// How long to wait before the next fetch.
    pub fn delay_for(&self, kind: FailureKind) -> Duration {
        match kind {
            FailureKind::None => Duration::ZERO,
            FailureKind::TransientNetwork => self.transient_pause,
            FailureKind::Unexpected => self.unexpected_pause,
        }
    }

    /// Combine the fetch classification with the lifecycle verdict.
    ///
    /// A pending stop wins over a pause: there is no point sleeping before
    /// exiting.
    pub fn decide(&self, kind: FailureKind, stop: Option<StopReason>) -> BackoffDecision {
        if let Some(reason) = stop {
            return BackoffDecision::Terminate(reason);
        }
        let pause = self.delay_for(kind);
        if pause.is_zero() {
            BackoffDecision::ContinueImmediately
        } else {
            BackoffDecision::PauseThenRetry(pause)
        }
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::new(Self::DEFAULT_TRANSIENT_PAUSE, Self::DEFAULT_UNEXPECTED_PAUSE)
    }
}
