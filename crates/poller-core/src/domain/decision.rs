//! Decision model: what the loop does after an iteration.
//!
//! Failures are classified into a [`FailureKind`] value and matched into a
//! pause; nothing here relies on unwinding.

use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Classification of an iteration's fetch outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The fetch succeeded (possibly with zero messages).
    None,

    /// Endpoint name resolution failed; expected to clear up by itself.
    TransientNetwork,

    /// Anything else that went wrong while fetching.
    Unexpected,
}

/// The next action to take after an iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackoffDecision {
    /// Fetch again right away.
    ContinueImmediately,

    /// Sleep for the given duration, then fetch again.
    PauseThenRetry(Duration),

    /// Leave the loop.
    Terminate(StopReason),
}

/// Why a bounded worker stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    UptimeExceeded,
    QueueEmpty,
}

/// When a fetched message is deleted.
///
/// `Always` guarantees forward progress: a message that keeps failing can
/// never block the queue, but a failed message is gone for good.
/// `OnSuccess` leaves failed messages to the provider's visibility timeout,
/// which is where a dead-letter queue can take over.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeletePolicy {
    #[default]
    Always,
    OnSuccess,
}

impl DeletePolicy {
    pub fn should_delete(self, handled_ok: bool) -> bool {
        match self {
            DeletePolicy::Always => true,
            DeletePolicy::OnSuccess => handled_ok,
        }
    }
}

impl FromStr for DeletePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "always" => Ok(DeletePolicy::Always),
            "on_success" => Ok(DeletePolicy::OnSuccess),
            other => Err(format!("unknown delete policy '{other}'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(DeletePolicy::Always, true, true)]
    #[case(DeletePolicy::Always, false, true)]
    #[case(DeletePolicy::OnSuccess, true, true)]
    #[case(DeletePolicy::OnSuccess, false, false)]
    fn delete_policy_decides(#[case] policy: DeletePolicy, #[case] ok: bool, #[case] expected: bool) {
        assert_eq!(policy.should_delete(ok), expected);
    }

    #[test]
    fn delete_policy_default_is_always() {
        assert_eq!(DeletePolicy::default(), DeletePolicy::Always);
        assert_eq!("on_success".parse::<DeletePolicy>(), Ok(DeletePolicy::OnSuccess));
        assert!("never".parse::<DeletePolicy>().is_err());
    }
}
