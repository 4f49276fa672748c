use std::time::Duration;

use reqwest::Method;
use serde_json::Value;

use super::types::{OperationStatusBody, PollingStatus};
use super::{ArmClient, ArmError, ArmRequest, ArmResponse};

const AZURE_ASYNC_OPERATION: &str = "Azure-AsyncOperation";
const LOCATION: &str = "Location";

/// How a long-running operation reports progress.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollingStrategy {
    /// Poll the status resource named by `Azure-AsyncOperation`.
    AsyncOperation(String),
    /// Poll `Location` until it stops answering 202.
    Location(String),
    /// Re-read the resource until `properties.provisioningState` is terminal.
    ProvisioningState(String),
    /// The operation completed with the initial response.
    Done,
}

impl PollingStrategy {
    pub fn from_response(response: &ArmResponse) -> Self {
        if let Some(url) = response.header(AZURE_ASYNC_OPERATION) {
            return PollingStrategy::AsyncOperation(url.to_string());
        }

        if matches!(response.status, 201 | 202) {
            if let Some(url) = response.header(LOCATION) {
                return PollingStrategy::Location(url.to_string());
            }
        }

        if matches!(response.method, Method::PUT | Method::PATCH) {
            if let Some(state) = provisioning_state(&response.body) {
                if !PollingStatus::from_status(state).is_terminal() {
                    return PollingStrategy::ProvisioningState(response.url.clone());
                }
            }
        }

        if response.status == 202 {
            tracing::warn!(url = %response.url, "202 Accepted without a polling header, treating as done");
        }

        PollingStrategy::Done
    }
}

fn provisioning_state(body: &Value) -> Option<&str> {
    body.get("properties")
        .and_then(|p| p.get("provisioningState"))
        .and_then(Value::as_str)
}

fn terminal_result(status: PollingStatus, raw: &str, message: String) -> Option<Result<(), ArmError>> {
    match status {
        PollingStatus::Succeeded => Some(Ok(())),
        PollingStatus::Failed => Some(Err(ArmError::PollingFailed {
            status: raw.to_string(),
            message,
        })),
        PollingStatus::Cancelled => Some(Err(ArmError::PollingCancelled { message })),
        PollingStatus::InProgress => None,
    }
}

impl ArmClient {
    fn next_delay(&self, response: &ArmResponse) -> Duration {
        response.retry_after().unwrap_or(self.poll_interval())
    }

    /// Blocks until the long-running operation started by `response`
    /// finishes. Callers bound the total wait with their own timeout.
    pub async fn poll_until_done(&self, response: &ArmResponse) -> Result<(), ArmError> {
        let strategy = PollingStrategy::from_response(response);
        tracing::debug!(?strategy, "polling long-running operation");

        let mut delay = self.next_delay(response);

        match strategy {
            PollingStrategy::Done => Ok(()),

            PollingStrategy::AsyncOperation(url) => loop {
                tokio::time::sleep(delay).await;
                let poll = self
                    .send(ArmRequest::get_url(url.clone()).expect(&[200, 201, 202]))
                    .await?;
                delay = self.next_delay(&poll);

                let body: OperationStatusBody = poll.into_model()?;
                let status = PollingStatus::from_status(&body.status);
                let message = body
                    .error
                    .map(|e| format!("{}: {}", e.code, e.message))
                    .unwrap_or_else(|| format!("operation finished with status {:?}", body.status));

                if let Some(result) = terminal_result(status, &body.status, message) {
                    return result;
                }
            },

            PollingStrategy::Location(url) => loop {
                tokio::time::sleep(delay).await;
                let poll = self
                    .send(ArmRequest::get_url(url.clone()).expect(&[200, 201, 202, 204]))
                    .await?;
                if poll.status != 202 {
                    return Ok(());
                }
                delay = self.next_delay(&poll);
            },

            PollingStrategy::ProvisioningState(url) => loop {
                tokio::time::sleep(delay).await;
                let poll = self
                    .send(ArmRequest::get_url(url.clone()).expect(&[200, 201]))
                    .await?;
                delay = self.next_delay(&poll);

                let raw = provisioning_state(&poll.body).unwrap_or("Succeeded").to_string();
                let status = PollingStatus::from_status(&raw);
                let message = format!("provisioningState is {:?}", raw);

                if let Some(result) = terminal_result(status, &raw, message) {
                    return result;
                }
            },
        }
    }
}
