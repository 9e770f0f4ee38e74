//! Clock port - 時刻の抽象化
//!
//! `SystemClock` reads tokio's clock, so tests running with paused time
//! (`#[tokio::test(start_paused = true)]`) see virtual time advance.
//! `ManualClock` is advanced explicitly for lifecycle tests that have no
//! runtime at all.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::Instant;

/// Clock は現在時刻を提供
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Production clock backed by `tokio::time::Instant`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock that only moves when told to.
///
/// Clones share the same time, so a test can keep one copy and hand the
/// other to the code under test.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<Instant>>,
}

impl ManualClock {
    pub fn new(start: Instant) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(Instant::now())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}
