use thiserror::Error;

/// Errors raised while obtaining an access token.
///
/// SECURITY: messages must never include secrets or tokens.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("no credentials configured: {0}")]
    MissingCredentials(String),

    #[error("token request failed ({status}): {message}")]
    TokenRequest { status: u16, message: String },

    #[error("network error while requesting a token: {0}")]
    Network(#[from] reqwest::Error),

    #[error("azure cli authentication failed: {0}")]
    Cli(String),

    #[error("invalid token response: {0}")]
    InvalidResponse(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_request_display() {
        let err = AuthError::TokenRequest {
            status: 401,
            message: "invalid_client".to_string(),
        };
        assert_eq!(err.to_string(), "token request failed (401): invalid_client");
    }

    #[test]
    fn test_missing_credentials_display() {
        let err = AuthError::MissingCredentials("set ARM_CLIENT_SECRET".to_string());
        assert!(err.to_string().starts_with("no credentials configured"));
    }
}
