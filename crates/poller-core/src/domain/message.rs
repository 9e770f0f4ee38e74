//! Message model: what a fetch returns and what a handler consumes.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque token the provider hands out with every received message.
///
/// It is only meaningful to the queue it came from and is the sole input of
/// a delete call.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReceiptHandle(String);

impl ReceiptHandle {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReceiptHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A received queue message.
///
/// Immutable once fetched. The loop hands it to the handler exactly once and
/// then deletes it through `receipt`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Provider-assigned id, when the provider reports one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    pub body: String,

    pub receipt: ReceiptHandle,
}

impl Message {
    pub fn new(body: impl Into<String>, receipt: ReceiptHandle) -> Self {
        Self {
            id: None,
            body: body.into(),
            receipt,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Id for log fields; falls back to the receipt handle.
    pub fn log_id(&self) -> &str {
        self.id.as_deref().unwrap_or(self.receipt.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_id_prefers_provider_id() {
        let m = Message::new("{}", ReceiptHandle::new("rh-1")).with_id("m-1");
        assert_eq!(m.log_id(), "m-1");

        let m = Message::new("{}", ReceiptHandle::new("rh-2"));
        assert_eq!(m.log_id(), "rh-2");
    }
}
