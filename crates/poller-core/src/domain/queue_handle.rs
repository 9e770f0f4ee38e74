//! QueueHandle - 解決済みキューへの参照

use std::fmt;

use serde::{Deserialize, Serialize};

/// A resolved queue.
///
/// Created once by the resolver and then only read. `url` is what the
/// provider uses to address the queue; `name` is what operators configure.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QueueHandle {
    name: String,
    url: String,
    region: String,
}

impl QueueHandle {
    pub fn new(name: impl Into<String>, url: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            region: region.into(),
        }
    }

    /// Build a handle from a queue url, taking the last path segment as name.
    pub fn from_url(url: impl Into<String>, region: impl Into<String>) -> Self {
        let url = url.into();
        let name = url
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or_default()
            .to_string();
        Self::new(name, url, region)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn region(&self) -> &str {
        &self.region
    }
}

impl fmt::Display for QueueHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.region)
    }
}
