use thiserror::Error;

use crate::arm::ArmError;
use crate::auth::AuthError;
use crate::config::ConfigError;
use crate::definition::DefinitionError;
use crate::resource::ResourceError;
use crate::resourceids::ResourceIdError;
use crate::state::StateError;

#[derive(Debug, Error)]
pub enum AzurermError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("authentication failed: {0}")]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Arm(#[from] ArmError),

    #[error(transparent)]
    Resource(#[from] ResourceError),

    #[error(transparent)]
    ResourceId(#[from] ResourceIdError),

    #[error(transparent)]
    State(#[from] StateError),

    #[error(transparent)]
    Definition(#[from] DefinitionError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_config_error_display() {
        let err: AzurermError = ConfigError::Missing("a subscription ID is required".to_string()).into();
        assert_eq!(
            err.to_string(),
            "configuration error: missing configuration: a subscription ID is required"
        );
    }

    #[test]
    fn test_auth_error_display() {
        let err: AzurermError = AuthError::Cli("az not found".to_string()).into();
        assert_eq!(
            err.to_string(),
            "authentication failed: azure cli authentication failed: az not found"
        );
    }

    #[test]
    fn test_io_error_from_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err: AzurermError = io_err.into();
        assert!(matches!(err, AzurermError::Io(_)));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_resource_error_is_transparent() {
        let err: AzurermError = ResourceError::NotFound("Resource Group".to_string()).into();
        assert_eq!(err.to_string(), "Resource Group was not found");
    }
}
