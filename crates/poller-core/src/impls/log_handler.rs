//! NotificationLogHandler - 既定の MessageHandler
//!
//! Logs every message body. In notification mode the body is expected to be
//! the JSON envelope a notification relay wraps around the payload, and only
//! its `"Message"` field is logged.

use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::domain::{HandlerError, Message};
use crate::ports::MessageHandler;

/// How a message body is interpreted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BodyMode {
    /// JSON object with a `"Message"` field.
    #[default]
    Notification,

    /// The body is the payload.
    Raw,
}

impl FromStr for BodyMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "notification" => Ok(BodyMode::Notification),
            "raw" => Ok(BodyMode::Raw),
            other => Err(format!("unknown body mode '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct NotificationLogHandler {
    mode: BodyMode,
}

impl NotificationLogHandler {
    pub fn new(mode: BodyMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> BodyMode {
        self.mode
    }

    /// Extract the payload this handler would log.
    pub fn payload(&self, body: &str) -> Result<String, HandlerError> {
        match self.mode {
            BodyMode::Raw => Ok(body.to_string()),
            BodyMode::Notification => {
                let envelope: serde_json::Value = serde_json::from_str(body)
                    .map_err(|e| HandlerError::Decode(format!("json decode: {e}")))?;
                match envelope.get("Message") {
                    Some(serde_json::Value::String(s)) => Ok(s.clone()),
                    Some(other) => Ok(other.to_string()),
                    None => Err(HandlerError::Decode(
                        "notification envelope has no \"Message\" field".to_string(),
                    )),
                }
            }
        }
    }
}

#[async_trait]
impl MessageHandler for NotificationLogHandler {
    async fn handle(&self, message: &Message) -> Result<(), HandlerError> {
        let payload = self.payload(&message.body)?;
        info!(target: "poller::message", message_id = %message.log_id(), "{payload}");
        Ok(())
    }
}
