//! Worker state: run mode and what the lifecycle remembers between iterations.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

/// How long a worker is allowed to live.
///
/// Fixed at process start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerMode {
    /// Poll until the process is killed.
    Forever,

    /// Exit after the uptime ceiling or the first empty poll.
    Bounded,
}

impl WorkerMode {
    /// Mode selected by the presence of the "run forever" startup flag.
    pub fn from_forever_flag(forever: bool) -> Self {
        if forever {
            WorkerMode::Forever
        } else {
            WorkerMode::Bounded
        }
    }
}

impl fmt::Display for WorkerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerMode::Forever => f.write_str("forever"),
            WorkerMode::Bounded => f.write_str("bounded"),
        }
    }
}

impl FromStr for WorkerMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "forever" => Ok(WorkerMode::Forever),
            "bounded" => Ok(WorkerMode::Bounded),
            other => Err(format!("unknown worker mode '{other}'")),
        }
    }
}

/// Mutable state owned by the worker lifecycle.
///
/// `last_batch_size` is `None` until a fetch succeeds and after a failed
/// fetch: a failure says nothing about whether the queue is empty.
#[derive(Debug, Clone)]
pub struct WorkerState {
    pub start_time: Instant,
    pub mode: WorkerMode,
    pub last_batch_size: Option<usize>,
}

impl WorkerState {
    pub fn new(mode: WorkerMode, start_time: Instant) -> Self {
        Self {
            start_time,
            mode,
            last_batch_size: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forever_flag_selects_mode() {
        assert_eq!(WorkerMode::from_forever_flag(true), WorkerMode::Forever);
        assert_eq!(WorkerMode::from_forever_flag(false), WorkerMode::Bounded);
    }

    #[test]
    fn mode_parses_case_insensitively() {
        assert_eq!("FOREVER".parse::<WorkerMode>(), Ok(WorkerMode::Forever));
        assert_eq!("bounded".parse::<WorkerMode>(), Ok(WorkerMode::Bounded));
        assert!("sometimes".parse::<WorkerMode>().is_err());
    }

    #[test]
    fn mode_serializes_snake_case() {
        let s = serde_json::to_string(&WorkerMode::Forever).unwrap();
        assert_eq!(s, "\"forever\"");
    }
}
