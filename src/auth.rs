mod cli;
mod client_secret;
mod error;

pub use cli::AzureCliCredential;
pub use client_secret::ClientSecretCredential;
pub use error::AuthError;

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use crate::config::ProviderConfig;

/// Refresh tokens this long before they actually expire.
const TOKEN_EXPIRY_BUFFER: Duration = Duration::from_secs(60);

/// Lifetime assumed when the issuer doesn't say.
const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(30 * 60);

#[derive(Clone)]
pub struct AccessToken {
    token: String,
    expires_at: Instant,
}

impl AccessToken {
    pub fn new(token: impl Into<String>, expires_at: Instant) -> Self {
        Self {
            token: token.into(),
            expires_at,
        }
    }

    pub fn secret(&self) -> &str {
        &self.token
    }

    pub fn is_valid(&self) -> bool {
        Instant::now() < self.expires_at
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken")
            .field("token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[async_trait]
pub trait TokenCredential: Send + Sync {
    fn name(&self) -> &str;
    async fn token(&self) -> Result<AccessToken, AuthError>;
}

/// A pre-issued token, e.g. from `ARM_ACCESS_TOKEN`. Never refreshed.
#[derive(Clone)]
pub struct StaticTokenCredential {
    token: String,
}

impl StaticTokenCredential {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

#[async_trait]
impl TokenCredential for StaticTokenCredential {
    fn name(&self) -> &str {
        "access_token"
    }

    async fn token(&self) -> Result<AccessToken, AuthError> {
        Ok(AccessToken::new(
            self.token.clone(),
            Instant::now() + DEFAULT_TOKEN_TTL,
        ))
    }
}

impl std::fmt::Debug for StaticTokenCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticTokenCredential")
            .field("token", &"[REDACTED]")
            .finish()
    }
}

/// Picks a credential: an explicit access token wins, then a client secret,
/// then the Azure CLI when enabled.
pub fn credential_from_config(
    config: &ProviderConfig,
) -> Result<Arc<dyn TokenCredential>, AuthError> {
    let endpoints = config.environment.endpoints();

    if let Some(token) = &config.access_token {
        return Ok(Arc::new(StaticTokenCredential::new(token.clone())));
    }

    if let Some(secret) = &config.client_secret {
        let tenant_id = config.tenant_id.clone().ok_or_else(|| {
            AuthError::MissingCredentials(
                "a tenant ID is required for client secret authentication. Set ARM_TENANT_ID"
                    .to_string(),
            )
        })?;
        let client_id = config.client_id.clone().ok_or_else(|| {
            AuthError::MissingCredentials(
                "a client ID is required for client secret authentication. Set ARM_CLIENT_ID"
                    .to_string(),
            )
        })?;

        return Ok(Arc::new(ClientSecretCredential::new(
            endpoints.active_directory,
            tenant_id,
            client_id,
            secret.clone(),
            endpoints.resource_manager,
        )?));
    }

    if config.use_cli {
        return Ok(Arc::new(AzureCliCredential::new(
            endpoints.resource_manager,
            config.tenant_id.clone(),
        )));
    }

    Err(AuthError::MissingCredentials(
        "set ARM_ACCESS_TOKEN, ARM_CLIENT_SECRET or enable ARM_USE_CLI".to_string(),
    ))
}
