//! WorkerLifecycle - いつループを終了するかの判断
//!
//! Bounded workers are meant to be started periodically by an external
//! scheduler; Forever workers run until the process is killed.

use std::sync::Arc;
use std::time::Duration;

use crate::domain::{StopReason, WorkerMode, WorkerState};
use crate::ports::Clock;

/// Tracks run time and the last batch size for the termination check.
pub struct WorkerLifecycle {
    state: WorkerState,
    max_uptime: Duration,
    clock: Arc<dyn Clock>,
}

impl WorkerLifecycle {
    pub const DEFAULT_MAX_UPTIME: Duration = Duration::from_secs(60);

    /// Start the lifecycle now, as read from `clock`.
    pub fn start(mode: WorkerMode, max_uptime: Duration, clock: Arc<dyn Clock>) -> Self {
        let state = WorkerState::new(mode, clock.now());
        Self {
            state,
            max_uptime,
            clock,
        }
    }

    pub fn mode(&self) -> WorkerMode {
        self.state.mode
    }

    pub fn state(&self) -> &WorkerState {
        &self.state
    }

    pub fn max_uptime(&self) -> Duration {
        self.max_uptime
    }

    pub fn elapsed(&self) -> Duration {
        self.clock.now().saturating_duration_since(self.state.start_time)
    }

    /// A fetch returned `size` messages.
    pub fn record_batch(&mut self, size: usize) {
        self.state.last_batch_size = Some(size);
    }

    /// A fetch failed; the queue was not observed.
    pub fn record_failed_fetch(&mut self) {
        self.state.last_batch_size = None;
    }

    /// Should the loop end after the iteration that just completed?
    ///
    /// Always `None` in Forever mode.
    pub fn should_terminate(&self) -> Option<StopReason> {
        if self.state.mode == WorkerMode::Forever {
            return None;
        }
        if self.elapsed() > self.max_uptime {
            return Some(StopReason::UptimeExceeded);
        }
        if self.state.last_batch_size == Some(0) {
            return Some(StopReason::QueueEmpty);
        }
        None
    }
}
