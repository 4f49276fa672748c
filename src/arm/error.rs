use thiserror::Error;

use crate::auth::AuthError;

/// Errors returned by the ARM HTTP layer.
///
/// SECURITY: Error messages must NEVER contain bearer tokens.
#[derive(Debug, Error)]
pub enum ArmError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// ARM returned a non-success status with an error envelope
    #[error("API error ({status}) {code}: {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },

    /// The status was a success code, but not one this operation expects
    #[error("unexpected status {status}, expected one of {expected:?}")]
    UnexpectedStatus { status: u16, expected: Vec<u16> },

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("rate limited, retry after {retry_after}s")]
    RateLimited { retry_after: u64 },

    #[error("decoding response: {message}")]
    Decode { message: String },

    #[error("polling failed with status {status:?}: {message}")]
    PollingFailed { status: String, message: String },

    #[error("polling was cancelled: {message}")]
    PollingCancelled { message: String },

    #[error("listing {path}: more results remain after {pages} pages")]
    PageLimitExceeded { path: String, pages: usize },
}

impl ArmError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ArmError::Api { status, .. } | ArmError::UnexpectedStatus { status, .. } => {
                Some(*status)
            }
            ArmError::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

pub trait OptionalExt<T> {
    /// Turns a 404 into `Ok(None)`, passing every other error through.
    fn optional(self) -> Result<Option<T>, ArmError>;
}

impl<T> OptionalExt<T> for Result<T, ArmError> {
    fn optional(self) -> Result<Option<T>, ArmError> {
        match self {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn not_found() -> ArmError {
        ArmError::Api {
            status: 404,
            code: "ResourceNotFound".to_string(),
            message: "The Resource was not found.".to_string(),
        }
    }

    #[test]
    fn test_api_error_display() {
        assert_eq!(
            not_found().to_string(),
            "API error (404) ResourceNotFound: The Resource was not found."
        );
    }

    #[test]
    fn test_is_not_found() {
        assert!(not_found().is_not_found());
        assert!(
            ArmError::UnexpectedStatus {
                status: 404,
                expected: vec![200]
            }
            .is_not_found()
        );
        assert!(!ArmError::RateLimited { retry_after: 5 }.is_not_found());
    }

    #[test]
    fn test_optional_maps_not_found_to_none() {
        let result: Result<u32, ArmError> = Err(not_found());
        assert!(result.optional().unwrap().is_none());

        let result: Result<u32, ArmError> = Ok(7);
        assert_eq!(result.optional().unwrap(), Some(7));
    }

    #[test]
    fn test_optional_passes_other_errors() {
        let result: Result<u32, ArmError> = Err(ArmError::Api {
            status: 403,
            code: "AuthorizationFailed".to_string(),
            message: "denied".to_string(),
        });
        assert!(result.optional().is_err());
    }

    #[test]
    fn test_polling_failed_display() {
        let err = ArmError::PollingFailed {
            status: "Failed".to_string(),
            message: "quota exceeded".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "polling failed with status \"Failed\": quota exceeded"
        );
    }
}
