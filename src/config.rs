//! Provider configuration.
//!
//! Credentials and the target cloud come from CLI flags (with `ARM_*`
//! environment fallbacks, see `cli::args`); behavioural toggles live in a
//! JSON features file.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing configuration: {0}")]
    Missing(String),

    #[error("unknown cloud environment {0:?}, expected one of: public, usgovernment, china")]
    UnknownEnvironment(String),

    #[error("reading features file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("parsing features file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Endpoints of one Azure cloud.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Endpoints {
    pub resource_manager: &'static str,
    pub active_directory: &'static str,
    pub storage_suffix: &'static str,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CloudEnvironment {
    #[default]
    Public,
    UsGovernment,
    China,
}

impl CloudEnvironment {
    pub fn endpoints(&self) -> Endpoints {
        match self {
            CloudEnvironment::Public => Endpoints {
                resource_manager: "https://management.azure.com",
                active_directory: "https://login.microsoftonline.com",
                storage_suffix: "core.windows.net",
            },
            CloudEnvironment::UsGovernment => Endpoints {
                resource_manager: "https://management.usgovcloudapi.net",
                active_directory: "https://login.microsoftonline.us",
                storage_suffix: "core.usgovcloudapi.net",
            },
            CloudEnvironment::China => Endpoints {
                resource_manager: "https://management.chinacloudapi.cn",
                active_directory: "https://login.chinacloudapi.cn",
                storage_suffix: "core.chinacloudapi.cn",
            },
        }
    }
}

impl FromStr for CloudEnvironment {
    type Err = ConfigError;

    // NOTE: Also accepts the SDK-style names (`AzurePublicCloud` etc.)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "public" | "azurepubliccloud" => Ok(CloudEnvironment::Public),
            "usgovernment" | "azureusgovernmentcloud" => Ok(CloudEnvironment::UsGovernment),
            "china" | "azurechinacloud" => Ok(CloudEnvironment::China),
            _ => Err(ConfigError::UnknownEnvironment(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceGroupFeatures {
    pub prevent_deletion_if_contains_resources: bool,
}

impl Default for ResourceGroupFeatures {
    fn default() -> Self {
        Self {
            prevent_deletion_if_contains_resources: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageFeatures {
    pub data_plane_available: bool,
}

impl Default for StorageFeatures {
    fn default() -> Self {
        Self {
            data_plane_available: true,
        }
    }
}

/// Toggles for behaviour that differs between users, mirroring the
/// provider's `features {}` block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Features {
    pub resource_group: ResourceGroupFeatures,
    pub storage: StorageFeatures,
}

impl Features {
    fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("azurerm").join("features.json"))
    }

    /// Loads features from `path`, or from the user config directory when no
    /// path is given. A missing default file yields the defaults; a missing
    /// explicit file is an error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let (path, explicit) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => match Self::default_path() {
                Some(p) => (p, false),
                None => return Ok(Self::default()),
            },
        };

        if !explicit && !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;

        serde_json::from_str(&content).map_err(|source| ConfigError::Parse { path, source })
    }
}

#[derive(Clone, Default)]
pub struct ProviderConfig {
    pub subscription_id: String,
    pub tenant_id: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub access_token: Option<String>,
    pub use_cli: bool,
    pub environment: CloudEnvironment,
    /// Overrides the environment's resource manager endpoint.
    pub endpoint: Option<String>,
    pub features: Features,
}

impl ProviderConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.subscription_id.trim().is_empty() {
            return Err(ConfigError::Missing(
                "a subscription ID is required. Set ARM_SUBSCRIPTION_ID or use --subscription-id"
                    .to_string(),
            ));
        }

        if self.client_secret.is_some() {
            if self.tenant_id.is_none() {
                return Err(ConfigError::Missing(
                    "`tenant_id` is required when authenticating with a client secret".to_string(),
                ));
            }
            if self.client_id.is_none() {
                return Err(ConfigError::Missing(
                    "`client_id` is required when authenticating with a client secret".to_string(),
                ));
            }
        }

        Ok(())
    }

    pub fn resource_manager_endpoint(&self) -> String {
        self.endpoint
            .clone()
            .unwrap_or_else(|| self.environment.endpoints().resource_manager.to_string())
            .trim_end_matches('/')
            .to_string()
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("subscription_id", &self.subscription_id)
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field(
                "client_secret",
                &self.client_secret.as_ref().map(|_| "[REDACTED]"),
            )
            .field(
                "access_token",
                &self.access_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("use_cli", &self.use_cli)
            .field("environment", &self.environment)
            .field("endpoint", &self.endpoint)
            .field("features", &self.features)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_environment_from_str() {
        assert_eq!("public".parse::<CloudEnvironment>().unwrap(), CloudEnvironment::Public);
        assert_eq!(
            "AzureChinaCloud".parse::<CloudEnvironment>().unwrap(),
            CloudEnvironment::China
        );
        assert_eq!(
            "USGovernment".parse::<CloudEnvironment>().unwrap(),
            CloudEnvironment::UsGovernment
        );
        assert!(matches!(
            "german".parse::<CloudEnvironment>(),
            Err(ConfigError::UnknownEnvironment(_))
        ));
    }

    #[test]
    fn test_features_defaults() {
        let features = Features::default();
        assert!(features.resource_group.prevent_deletion_if_contains_resources);
        assert!(features.storage.data_plane_available);
    }

    #[test]
    fn test_features_partial_json() {
        let features: Features = serde_json::from_str(
            r#"{"resource_group": {"prevent_deletion_if_contains_resources": false}}"#,
        )
        .unwrap();
        assert!(!features.resource_group.prevent_deletion_if_contains_resources);
        assert!(features.storage.data_plane_available);
    }

    #[test]
    fn test_features_load_explicit_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"storage": {{"data_plane_available": false}}}}"#).unwrap();

        let features = Features::load(Some(file.path())).unwrap();
        assert!(!features.storage.data_plane_available);
    }

    #[test]
    fn test_features_load_missing_explicit_file() {
        let result = Features::load(Some(Path::new("/nonexistent/azurerm/features.json")));
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }

    #[test]
    fn test_validate_requires_subscription() {
        let config = ProviderConfig::default();
        assert!(matches!(config.validate(), Err(ConfigError::Missing(_))));
    }

    #[test]
    fn test_validate_client_secret_requires_tenant() {
        let config = ProviderConfig {
            subscription_id: "sub".to_string(),
            client_id: Some("client".to_string()),
            client_secret: Some("secret".to_string()),
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("tenant_id"));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = ProviderConfig {
            subscription_id: "sub".to_string(),
            client_secret: Some("hunter2".to_string()),
            access_token: Some("eyJtoken".to_string()),
            ..Default::default()
        };
        let debug = format!("{:?}", config);
        assert!(!debug.contains("hunter2"));
        assert!(!debug.contains("eyJtoken"));
    }

    #[test]
    fn test_endpoint_override() {
        let config = ProviderConfig {
            endpoint: Some("http://127.0.0.1:8080/".to_string()),
            ..Default::default()
        };
        assert_eq!(config.resource_manager_endpoint(), "http://127.0.0.1:8080");
        assert_eq!(
            ProviderConfig::default().resource_manager_endpoint(),
            "https://management.azure.com"
        );
    }
}
