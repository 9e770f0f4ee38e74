use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::StopReason;

/// Counters for one worker run, logged when the loop exits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub stop_reason: Option<StopReason>,
    pub iterations: u64,
    pub received: u64,
    pub handled: u64,
    pub handler_failures: u64,
    pub deleted: u64,
    pub delete_failures: u64,
    /// Failed messages left on the queue under `DeletePolicy::OnSuccess`.
    pub retained: u64,
    pub fetch_failures: u64,
}

impl RunReport {
    pub fn started(at: DateTime<Utc>) -> Self {
        Self {
            started_at: at,
            finished_at: None,
            stop_reason: None,
            iterations: 0,
            received: 0,
            handled: 0,
            handler_failures: 0,
            deleted: 0,
            delete_failures: 0,
            retained: 0,
            fetch_failures: 0,
        }
    }

    pub fn finish(&mut self, at: DateTime<Utc>, reason: StopReason) {
        self.finished_at = Some(at);
        self.stop_reason = Some(reason);
    }

    /// Were any errors recorded during the run?
    pub fn had_errors(&self) -> bool {
        self.handler_failures + self.delete_failures + self.fetch_failures > 0
    }
}
