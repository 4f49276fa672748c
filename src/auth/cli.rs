use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;
use tokio::sync::RwLock;

use super::{AccessToken, AuthError, DEFAULT_TOKEN_TTL, TOKEN_EXPIRY_BUFFER, TokenCredential};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CliToken {
    access_token: String,
    /// Unix timestamp; only emitted by newer versions of the CLI.
    #[serde(default, rename = "expires_on")]
    expires_on: Option<u64>,
}

/// Borrows the token of the user logged in with `az login`.
#[derive(Debug, Clone)]
pub struct AzureCliCredential {
    resource: String,
    tenant_id: Option<String>,
    cache: Arc<RwLock<Option<AccessToken>>>,
}

impl AzureCliCredential {
    pub fn new(resource_manager_endpoint: &str, tenant_id: Option<String>) -> Self {
        Self {
            resource: resource_manager_endpoint.trim_end_matches('/').to_string(),
            tenant_id,
            cache: Arc::new(RwLock::new(None)),
        }
    }

    fn args(&self) -> Vec<String> {
        let mut args = vec![
            "account".to_string(),
            "get-access-token".to_string(),
            "--resource".to_string(),
            self.resource.clone(),
            "--output".to_string(),
            "json".to_string(),
        ];
        if let Some(tenant) = &self.tenant_id {
            args.push("--tenant".to_string());
            args.push(tenant.clone());
        }
        args
    }

    async fn request_token(&self) -> Result<AccessToken, AuthError> {
        let output = Command::new("az")
            .args(self.args())
            .output()
            .await
            .map_err(|e| AuthError::Cli(format!("failed to run `az`: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AuthError::Cli(stderr.trim().to_string()));
        }

        let token: CliToken = serde_json::from_slice(&output.stdout)
            .map_err(|e| AuthError::InvalidResponse(format!("Failed to parse az output: {}", e)))?;

        Ok(AccessToken::new(
            token.access_token,
            Instant::now() + remaining_lifetime(token.expires_on),
        ))
    }
}

fn remaining_lifetime(expires_on: Option<u64>) -> Duration {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);

    let lifetime = match expires_on {
        Some(expiry) if expiry > now => Duration::from_secs(expiry - now),
        Some(_) => Duration::ZERO,
        None => DEFAULT_TOKEN_TTL,
    };
    lifetime.saturating_sub(TOKEN_EXPIRY_BUFFER)
}

#[async_trait]
impl TokenCredential for AzureCliCredential {
    fn name(&self) -> &str {
        "azure_cli"
    }

    async fn token(&self) -> Result<AccessToken, AuthError> {
        {
            let cache = self.cache.read().await;
            if let Some(cached) = cache.as_ref().filter(|t| t.is_valid()) {
                return Ok(cached.clone());
            }
        }

        let token = self.request_token().await?;
        *self.cache.write().await = Some(token.clone());
        tracing::debug!("obtained token from azure cli");

        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_with_tenant() {
        let credential =
            AzureCliCredential::new("https://management.azure.com/", Some("tenant1".to_string()));
        let args = credential.args();
        assert_eq!(args[3], "https://management.azure.com");
        assert_eq!(&args[6..], &["--tenant".to_string(), "tenant1".to_string()]);
    }

    #[test]
    fn test_cli_token_deserialization() {
        let json = r#"{
            "accessToken": "eyJ0eXAi",
            "expiresOn": "2026-10-16 12:00:00.000000",
            "expires_on": 1792152000,
            "subscription": "sub1",
            "tenant": "tenant1",
            "tokenType": "Bearer"
        }"#;
        let token: CliToken = serde_json::from_str(json).unwrap();
        assert_eq!(token.access_token, "eyJ0eXAi");
        assert_eq!(token.expires_on, Some(1792152000));
    }

    #[test]
    fn test_remaining_lifetime_defaults() {
        assert_eq!(
            remaining_lifetime(None),
            DEFAULT_TOKEN_TTL - TOKEN_EXPIRY_BUFFER
        );
        assert_eq!(remaining_lifetime(Some(1)), Duration::ZERO);
    }
}
