use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::RwLock;

use super::{AccessToken, AuthError, TOKEN_EXPIRY_BUFFER, TokenCredential};

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

/// OAuth2 client-credentials flow against Azure Active Directory.
#[derive(Clone)]
pub struct ClientSecretCredential {
    http: reqwest::Client,
    authority: String,
    tenant_id: String,
    client_id: String,
    client_secret: String,
    scope: String,
    cache: Arc<RwLock<Option<AccessToken>>>,
}

impl ClientSecretCredential {
    pub fn new(
        authority: impl Into<String>,
        tenant_id: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        resource_manager_endpoint: &str,
    ) -> Result<Self, AuthError> {
        let http = reqwest::Client::builder().build()?;

        Ok(Self {
            http,
            authority: authority.into().trim_end_matches('/').to_string(),
            tenant_id: tenant_id.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            scope: format!("{}/.default", resource_manager_endpoint.trim_end_matches('/')),
            cache: Arc::new(RwLock::new(None)),
        })
    }

    fn token_url(&self) -> String {
        format!("{}/{}/oauth2/v2.0/token", self.authority, self.tenant_id)
    }

    async fn request_token(&self) -> Result<AccessToken, AuthError> {
        let form = [
            ("grant_type", "client_credentials"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("scope", self.scope.as_str()),
        ];

        let response = self.http.post(self.token_url()).form(&form).send().await?;
        let status = response.status();

        if !status.is_success() {
            let body: TokenErrorResponse =
                response.json().await.unwrap_or(TokenErrorResponse {
                    error: None,
                    error_description: None,
                });
            let message = body
                .error_description
                .or(body.error)
                .unwrap_or_else(|| "Unknown token error".to_string());
            return Err(AuthError::TokenRequest {
                status: status.as_u16(),
                message,
            });
        }

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| AuthError::InvalidResponse(format!("Failed to parse token: {}", e)))?;

        let lifetime = body
            .expires_in
            .map(Duration::from_secs)
            .unwrap_or(super::DEFAULT_TOKEN_TTL);

        Ok(AccessToken::new(
            body.access_token,
            Instant::now() + lifetime.saturating_sub(TOKEN_EXPIRY_BUFFER),
        ))
    }
}

#[async_trait]
impl TokenCredential for ClientSecretCredential {
    fn name(&self) -> &str {
        "client_secret"
    }

    async fn token(&self) -> Result<AccessToken, AuthError> {
        {
            let cache = self.cache.read().await;
            if let Some(cached) = cache.as_ref() {
                if cached.is_valid() {
                    return Ok(cached.clone());
                }
                tracing::debug!("cached token expired, requesting a new one");
            }
        }

        let token = self.request_token().await?;
        *self.cache.write().await = Some(token.clone());
        tracing::debug!(client_id = %self.client_id, "obtained token via client secret");

        Ok(token)
    }
}

impl std::fmt::Debug for ClientSecretCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientSecretCredential")
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_and_token_url() {
        let credential = ClientSecretCredential::new(
            "https://login.microsoftonline.com/",
            "tenant1",
            "client1",
            "secret1",
            "https://management.azure.com/",
        )
        .unwrap();

        assert_eq!(credential.scope, "https://management.azure.com/.default");
        assert_eq!(
            credential.token_url(),
            "https://login.microsoftonline.com/tenant1/oauth2/v2.0/token"
        );
    }

    #[test]
    fn test_debug_redacts_secret() {
        let credential = ClientSecretCredential::new(
            "https://login.microsoftonline.com",
            "tenant1",
            "client1",
            "very_secret_value",
            "https://management.azure.com",
        )
        .unwrap();
        let debug = format!("{:?}", credential);
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("very_secret_value"));
    }
}
