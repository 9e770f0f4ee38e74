//! Config - TOML 設定ファイル
//!
//! ```toml
//! [aws]
//! queue_name = "orders"
//! region = "eu-west-1"
//!
//! [console]
//! enabled = true
//!
//! [poller]
//! max_uptime_secs = 60
//! ```
//!
//! 省略したセクション / 値は既定値になる。

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::app::{BackoffPolicy, PollSettings, WorkerLifecycle};
use crate::domain::DeletePolicy;
use crate::impls::BodyMode;

pub const DEFAULT_CONFIG_PATH: &str = "./poller.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollerConfig {
    pub aws: AwsConfig,
    pub console: ConsoleConfig,
    pub file_logger: FileLoggerConfig,
    pub syslog: SyslogConfig,
    pub poller: PollerTunables,
    pub handler: HandlerConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AwsConfig {
    pub key: Option<String>,
    pub secret: Option<String>,
    pub queue_name: String,
    pub region: String,
    /// Override for local emulators (e.g. `http://localhost:4566`).
    pub endpoint_url: Option<String>,
}

impl AwsConfig {
    /// Key and secret, only when both are non-empty.
    pub fn static_credentials(&self) -> Option<(&str, &str)> {
        let key = self.key.as_deref().filter(|k| !k.is_empty())?;
        let secret = self.secret.as_deref().filter(|s| !s.is_empty())?;
        Some((key, secret))
    }
}

impl Default for AwsConfig {
    fn default() -> Self {
        Self {
            key: None,
            secret: None,
            queue_name: String::new(),
            region: "us-east-1".to_string(),
            endpoint_url: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    pub enabled: bool,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileLoggerConfig {
    pub enabled: bool,
    pub log_path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyslogConfig {
    pub enabled: bool,
    pub host: Option<String>,
    pub port: u16,
}

impl Default for SyslogConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            host: None,
            port: 514,
        }
    }
}

/// `[poller]` section. Durations are whole seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollerTunables {
    pub batch_size: usize,
    pub wait_time_secs: u64,
    pub max_uptime_secs: u64,
    pub transient_pause_secs: u64,
    pub unexpected_pause_secs: u64,
    pub delete_policy: DeletePolicy,
    /// `0` waits for the handler however long it takes.
    pub handler_timeout_secs: Option<u64>,
}

impl Default for PollerTunables {
    fn default() -> Self {
        Self {
            batch_size: PollSettings::MAX_BATCH_SIZE,
            wait_time_secs: PollSettings::DEFAULT_WAIT_TIME.as_secs(),
            max_uptime_secs: WorkerLifecycle::DEFAULT_MAX_UPTIME.as_secs(),
            transient_pause_secs: BackoffPolicy::DEFAULT_TRANSIENT_PAUSE.as_secs(),
            unexpected_pause_secs: BackoffPolicy::DEFAULT_UNEXPECTED_PAUSE.as_secs(),
            delete_policy: DeletePolicy::Always,
            handler_timeout_secs: Some(PollSettings::DEFAULT_HANDLER_TIMEOUT.as_secs()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HandlerConfig {
    pub body_mode: BodyMode,
}

impl PollerConfig {
    /// Read, parse and validate a config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.aws.queue_name.trim().is_empty() {
            return Err(ConfigError::Invalid("aws.queue_name must not be empty".into()));
        }
        if self.aws.region.trim().is_empty() {
            return Err(ConfigError::Invalid("aws.region must not be empty".into()));
        }
        let max_wait = PollSettings::MAX_WAIT_TIME.as_secs();
        if self.poller.wait_time_secs > max_wait {
            return Err(ConfigError::Invalid(format!(
                "poller.wait_time_secs must be between 0 and {max_wait}, got {}",
                self.poller.wait_time_secs
            )));
        }
        if self.file_logger.enabled && self.file_logger.log_path.is_none() {
            return Err(ConfigError::Invalid(
                "file_logger is enabled but file_logger.log_path is missing".into(),
            ));
        }
        if self.syslog.enabled && self.syslog.host.as_deref().is_none_or(str::is_empty) {
            return Err(ConfigError::Invalid(
                "syslog is enabled but syslog.host is missing".into(),
            ));
        }
        Ok(())
    }

    pub fn poll_settings(&self) -> PollSettings {
        PollSettings {
            batch_size: self.poller.batch_size,
            wait_time: Duration::from_secs(self.poller.wait_time_secs),
            delete_policy: self.poller.delete_policy,
            handler_timeout: self
                .poller
                .handler_timeout_secs
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs),
        }
    }

    pub fn backoff_policy(&self) -> BackoffPolicy {
        BackoffPolicy::new(
            Duration::from_secs(self.poller.transient_pause_secs),
            Duration::from_secs(self.poller.unexpected_pause_secs),
        )
    }

    pub fn max_uptime(&self) -> Duration {
        Duration::from_secs(self.poller.max_uptime_secs)
    }
}
