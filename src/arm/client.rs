use std::sync::Arc;
use std::time::Duration;

use reqwest::Method;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::ArmError;
use super::types::{DEFAULT_POLL_INTERVAL, ErrorEnvelope, MAX_RETRIES};
use crate::auth::TokenCredential;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Target {
    /// A path below the resource manager endpoint, plus its API version.
    Path { path: String, api_version: String },
    /// A fully formed URL handed back by the API (`nextLink`, poll URLs).
    Absolute(String),
}

/// One request against the resource manager.
#[derive(Debug, Clone)]
pub struct ArmRequest {
    method: Method,
    target: Target,
    body: Option<Value>,
    expected: Vec<u16>,
}

impl ArmRequest {
    fn new(method: Method, path: impl Into<String>, api_version: &str) -> Self {
        Self {
            method,
            target: Target::Path {
                path: path.into(),
                api_version: api_version.to_string(),
            },
            body: None,
            expected: vec![200],
        }
    }

    pub fn get(path: impl Into<String>, api_version: &str) -> Self {
        Self::new(Method::GET, path, api_version)
    }

    pub fn put(path: impl Into<String>, api_version: &str, body: Value) -> Self {
        Self::new(Method::PUT, path, api_version)
            .with_body(body)
            .expect(&[200, 201])
    }

    pub fn patch(path: impl Into<String>, api_version: &str, body: Value) -> Self {
        Self::new(Method::PATCH, path, api_version)
            .with_body(body)
            .expect(&[200, 202])
    }

    pub fn post(path: impl Into<String>, api_version: &str, body: Option<Value>) -> Self {
        let request = Self::new(Method::POST, path, api_version).expect(&[200, 202]);
        match body {
            Some(body) => request.with_body(body),
            None => request,
        }
    }

    pub fn delete(path: impl Into<String>, api_version: &str) -> Self {
        Self::new(Method::DELETE, path, api_version).expect(&[200, 202, 204])
    }

    /// A GET against a URL returned by the API.
    pub fn get_url(url: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            target: Target::Absolute(url.into()),
            body: None,
            expected: vec![200],
        }
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Overrides the success codes this operation is allowed to return.
    pub fn expect(mut self, codes: &[u16]) -> Self {
        self.expected = codes.to_vec();
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }
}

/// A successful response; the body is `Null` when the API sent none.
#[derive(Debug, Clone)]
pub struct ArmResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Value,
    pub method: Method,
    pub url: String,
}

impl ArmResponse {
    pub fn into_model<T: DeserializeOwned>(self) -> Result<T, ArmError> {
        serde_json::from_value(self.body).map_err(|e| ArmError::Decode {
            message: format!("Failed to parse {} {}: {}", self.method, self.url, e),
        })
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
    }

    /// `Retry-After` in whole seconds; HTTP-date values are ignored.
    pub fn retry_after(&self) -> Option<Duration> {
        retry_after_seconds(&self.headers).map(Duration::from_secs)
    }
}

/// Serializes a request model into a JSON body.
pub fn json_body<T: Serialize>(model: &T) -> Result<Value, ArmError> {
    serde_json::to_value(model).map_err(|e| ArmError::Decode {
        message: format!("encoding request body: {}", e),
    })
}

fn retry_after_seconds(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
}

#[derive(Clone)]
pub struct ArmClient {
    client: reqwest::Client,
    credential: Arc<dyn TokenCredential>,
    endpoint: String,
    poll_interval: Duration,
}

impl ArmClient {
    pub fn new(
        endpoint: impl Into<String>,
        credential: Arc<dyn TokenCredential>,
    ) -> Result<Self, ArmError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("azurerm/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(ArmError::Network)?;

        Ok(Self {
            client,
            credential,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        })
    }

    /// NOTE: Primarily used by tests to keep polling loops fast.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    fn url_for(&self, target: &Target) -> String {
        match target {
            Target::Path { path, api_version } => {
                format!("{}{}?api-version={}", self.endpoint, path, api_version)
            }
            Target::Absolute(url) => url.clone(),
        }
    }

    pub async fn send(&self, request: ArmRequest) -> Result<ArmResponse, ArmError> {
        let url = self.url_for(&request.target);
        let mut attempt = 0u32;

        loop {
            let token = self.credential.token().await?;

            let mut builder = self
                .client
                .request(request.method.clone(), &url)
                .bearer_auth(token.secret());
            if let Some(body) = &request.body {
                builder = builder.json(body);
            }

            let response = builder.send().await?;
            let status = response.status().as_u16();
            tracing::debug!(method = %request.method, url = %url, status, "ARM request");

            if status == 429 {
                let retry_after = retry_after_seconds(response.headers()).unwrap_or(1);
                if attempt < MAX_RETRIES {
                    attempt += 1;
                    tracing::warn!(retry_after, attempt, url = %url, "throttled by ARM, retrying");
                    tokio::time::sleep(Duration::from_secs(retry_after)).await;
                    continue;
                }
                return Err(ArmError::RateLimited { retry_after });
            }

            let headers = response.headers().clone();
            let text = response.text().await?;

            if !(200..300).contains(&status) {
                let envelope: ErrorEnvelope = serde_json::from_str(&text).unwrap_or_default();
                let detail = envelope.into_detail();
                return Err(ArmError::Api {
                    status,
                    code: if detail.code.is_empty() {
                        "Unknown".to_string()
                    } else {
                        detail.code
                    },
                    message: if detail.message.is_empty() {
                        format!("{} {} failed", request.method, url)
                    } else {
                        detail.message
                    },
                });
            }

            if !request.expected.contains(&status) {
                return Err(ArmError::UnexpectedStatus {
                    status,
                    expected: request.expected.clone(),
                });
            }

            let body = if text.trim().is_empty() {
                Value::Null
            } else {
                serde_json::from_str(&text).map_err(|e| ArmError::Decode {
                    message: format!("Failed to parse response from {}: {}", url, e),
                })?
            };

            return Ok(ArmResponse {
                status,
                headers,
                body,
                method: request.method,
                url,
            });
        }
    }

    pub async fn get_model<T: DeserializeOwned>(
        &self,
        path: &str,
        api_version: &str,
    ) -> Result<T, ArmError> {
        self.send(ArmRequest::get(path, api_version))
            .await?
            .into_model()
    }

    /// Sends a long-running request and polls it to completion.
    pub async fn send_and_poll(&self, request: ArmRequest) -> Result<ArmResponse, ArmError> {
        let response = self.send(request).await?;
        self.poll_until_done(&response).await?;
        Ok(response)
    }
}

impl std::fmt::Debug for ArmClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArmClient")
            .field("endpoint", &self.endpoint)
            .field("credential", &self.credential.name())
            .field("poll_interval", &self.poll_interval)
            .finish()
    }
}
