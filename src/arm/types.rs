use std::time::Duration;

use serde::Deserialize;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Attempts made for a throttled (429) request before giving up.
pub const MAX_RETRIES: u32 = 3;

/// The ARM error envelope, `{"error": {"code": "...", "message": "..."}}`.
///
/// A few older APIs return the code and message at the top level instead.
#[derive(Debug, Default, Deserialize)]
pub struct ErrorEnvelope {
    #[serde(default)]
    pub error: Option<ErrorDetail>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorDetail {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
}

impl ErrorEnvelope {
    pub fn into_detail(self) -> ErrorDetail {
        match self.error {
            Some(detail) => detail,
            None => ErrorDetail {
                code: self.code.unwrap_or_default(),
                message: self.message.unwrap_or_default(),
            },
        }
    }
}

/// One page of an OData list response.
#[derive(Debug, Deserialize)]
pub struct Page<T> {
    #[serde(default = "Vec::new")]
    pub value: Vec<T>,
    #[serde(default, rename = "nextLink")]
    pub next_link: Option<String>,
}

/// Body of an `Azure-AsyncOperation` status endpoint.
#[derive(Debug, Deserialize)]
pub struct OperationStatusBody {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub error: Option<ErrorDetail>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollingStatus {
    InProgress,
    Succeeded,
    Failed,
    Cancelled,
}

impl PollingStatus {
    /// Maps an operation status or provisioning state onto a polling status.
    /// Anything that isn't terminal (`Accepted`, `Creating`, `Updating`, ...)
    /// counts as in progress.
    pub fn from_status(status: &str) -> Self {
        match status.to_ascii_lowercase().as_str() {
            "succeeded" => PollingStatus::Succeeded,
            "failed" => PollingStatus::Failed,
            "canceled" | "cancelled" => PollingStatus::Cancelled,
            _ => PollingStatus::InProgress,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, PollingStatus::InProgress)
    }
}
