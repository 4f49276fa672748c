use std::path::PathBuf;

use azurerm::config::{CloudEnvironment, ConfigError, Features, ProviderConfig};
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    #[command(flatten)]
    pub auth: AuthArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Parse a Resource ID and print its segments
    ParseId {
        /// Validate against a specific ID type, e.g. `agent_pool`
        #[arg(long = "type")]
        id_type: Option<String>,

        id: String,
    },
    /// List the supported resource types
    Resources,
    /// Show the changes applying a definition would make
    Plan(DefinitionArgs),
    /// Apply a definition and write the resulting state
    Apply(DefinitionArgs),
    /// Re-read every resource in state and report drift
    Refresh(StateArgs),
    /// Bring an existing resource under management
    Import {
        resource_type: String,
        name: String,
        id: String,

        #[command(flatten)]
        state: StateArgs,
    },
    /// Destroy every resource in state
    Destroy(StateArgs),
}

#[derive(clap::Args, Debug)]
pub struct DefinitionArgs {
    /// Definition in Terraform JSON syntax
    #[arg(long, short)]
    pub file: PathBuf,

    #[command(flatten)]
    pub state: StateArgs,
}

#[derive(clap::Args, Debug)]
pub struct StateArgs {
    #[arg(long = "state", default_value = "terraform.tfstate")]
    pub path: PathBuf,
}

#[derive(clap::Args, Debug)]
pub struct AuthArgs {
    #[arg(long, global = true, env = "ARM_SUBSCRIPTION_ID")]
    pub subscription_id: Option<String>,

    #[arg(long, global = true, env = "ARM_TENANT_ID")]
    pub tenant_id: Option<String>,

    #[arg(long, global = true, env = "ARM_CLIENT_ID")]
    pub client_id: Option<String>,

    #[arg(long, global = true, env = "ARM_CLIENT_SECRET", hide_env_values = true)]
    pub client_secret: Option<String>,

    #[arg(long, global = true, env = "ARM_ACCESS_TOKEN", hide_env_values = true)]
    pub access_token: Option<String>,

    /// Authenticate with `az account get-access-token`
    #[arg(long, global = true, env = "ARM_USE_CLI")]
    pub use_cli: bool,

    #[arg(long, global = true, env = "ARM_ENVIRONMENT", default_value = "public")]
    pub environment: String,

    /// Override the resource manager endpoint
    #[arg(long, global = true, env = "ARM_ENDPOINT")]
    pub endpoint: Option<String>,

    /// JSON file with provider features; defaults to the user config directory
    #[arg(long, global = true, env = "ARM_FEATURES_FILE")]
    pub features_file: Option<PathBuf>,
}

impl AuthArgs {
    pub fn provider_config(&self) -> Result<ProviderConfig, ConfigError> {
        let environment: CloudEnvironment = self.environment.parse()?;
        let features = Features::load(self.features_file.as_deref())?;

        Ok(ProviderConfig {
            subscription_id: self.subscription_id.clone().unwrap_or_default(),
            tenant_id: self.tenant_id.clone(),
            client_id: self.client_id.clone(),
            client_secret: self.client_secret.clone(),
            access_token: self.access_token.clone(),
            use_cli: self.use_cli,
            environment,
            endpoint: self.endpoint.clone(),
            features,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use serial_test::serial;

    const ENV_KEYS: &[&str] = &[
        "ARM_SUBSCRIPTION_ID",
        "ARM_TENANT_ID",
        "ARM_CLIENT_ID",
        "ARM_CLIENT_SECRET",
        "ARM_ACCESS_TOKEN",
        "ARM_USE_CLI",
        "ARM_ENVIRONMENT",
        "ARM_ENDPOINT",
        "ARM_FEATURES_FILE",
    ];

    /// Runs `f` with every `ARM_*` variable cleared except `vars`, then restores them.
    fn with_env<T>(vars: &[(&str, &str)], f: impl FnOnce() -> T) -> T {
        let backup: Vec<(&str, Option<String>)> =
            ENV_KEYS.iter().map(|k| (*k, std::env::var(k).ok())).collect();
        unsafe {
            for key in ENV_KEYS {
                std::env::remove_var(key);
            }
            for (key, value) in vars {
                std::env::set_var(key, value);
            }
        }

        let result = f();

        unsafe {
            for (key, value) in backup {
                match value {
                    Some(v) => std::env::set_var(key, v),
                    None => std::env::remove_var(key),
                }
            }
        }
        result
    }

    #[test]
    fn test_parse_id_with_type() {
        let cli = Cli::parse_from([
            "azurerm",
            "parse-id",
            "--type",
            "resource_group",
            "/subscriptions/sub1/resourceGroups/rg1",
        ]);

        if let Command::ParseId { id_type, id } = cli.command {
            assert_eq!(id_type.as_deref(), Some("resource_group"));
            assert_eq!(id, "/subscriptions/sub1/resourceGroups/rg1");
        } else {
            panic!("Expected ParseId command, got {:?}", cli.command);
        }
    }

    #[test]
    fn test_apply_args() {
        let cli = Cli::parse_from(["azurerm", "apply", "--file", "main.tf.json", "--state", "s.tfstate"]);

        if let Command::Apply(args) = cli.command {
            assert_eq!(args.file, PathBuf::from("main.tf.json"));
            assert_eq!(args.state.path, PathBuf::from("s.tfstate"));
        } else {
            panic!("Expected Apply command, got {:?}", cli.command);
        }
    }

    #[test]
    fn test_state_defaults() {
        let cli = Cli::parse_from(["azurerm", "destroy"]);

        if let Command::Destroy(args) = cli.command {
            assert_eq!(args.path, PathBuf::from("terraform.tfstate"));
        } else {
            panic!("Expected Destroy command, got {:?}", cli.command);
        }
    }

    #[test]
    fn test_import_args() {
        let cli = Cli::parse_from([
            "azurerm",
            "import",
            "azurerm_resource_group",
            "example",
            "/subscriptions/sub1/resourceGroups/rg1",
        ]);

        if let Command::Import {
            resource_type,
            name,
            id,
            state,
        } = cli.command
        {
            assert_eq!(resource_type, "azurerm_resource_group");
            assert_eq!(name, "example");
            assert_eq!(id, "/subscriptions/sub1/resourceGroups/rg1");
            assert_eq!(state.path, PathBuf::from("terraform.tfstate"));
        } else {
            panic!("Expected Import command, got {:?}", cli.command);
        }
    }

    #[test]
    #[serial]
    fn test_auth_from_env() {
        let cli = with_env(
            &[
                ("ARM_SUBSCRIPTION_ID", "env-sub"),
                ("ARM_TENANT_ID", "env-tenant"),
                ("ARM_ENVIRONMENT", "china"),
            ],
            || Cli::parse_from(["azurerm", "resources"]),
        );

        assert_eq!(cli.auth.subscription_id.as_deref(), Some("env-sub"));
        assert_eq!(cli.auth.tenant_id.as_deref(), Some("env-tenant"));
        assert_eq!(cli.auth.environment, "china");
        assert!(!cli.auth.use_cli);
    }

    #[test]
    #[serial]
    fn test_flag_takes_precedence_over_env() {
        let cli = with_env(&[("ARM_SUBSCRIPTION_ID", "env-sub")], || {
            Cli::parse_from(["azurerm", "resources", "--subscription-id", "flag-sub"])
        });

        assert_eq!(cli.auth.subscription_id.as_deref(), Some("flag-sub"));
    }

    #[test]
    #[serial]
    fn test_provider_config_redacts_secret() {
        let dir = tempfile::tempdir().unwrap();
        let features = dir.path().join("features.json");
        std::fs::write(&features, r#"{"storage": {"data_plane_available": false}}"#).unwrap();
        let features = features.to_string_lossy().to_string();

        let cli = with_env(&[], || {
            Cli::parse_from([
                "azurerm",
                "--subscription-id",
                "sub1",
                "--client-secret",
                "s3cret",
                "--features-file",
                features.as_str(),
                "resources",
            ])
        });
        let config = cli.auth.provider_config().unwrap();

        assert_eq!(config.subscription_id, "sub1");
        assert!(!config.features.storage.data_plane_available);
        assert!(config.features.resource_group.prevent_deletion_if_contains_resources);
        assert!(!format!("{:?}", config).contains("s3cret"));
    }

    #[test]
    #[serial]
    fn test_provider_config_unknown_environment() {
        let cli = with_env(&[], || {
            Cli::parse_from(["azurerm", "--environment", "mars", "--features-file", "/nonexistent", "resources"])
        });
        let err = cli.auth.provider_config().unwrap_err();
        assert!(matches!(err, ConfigError::UnknownEnvironment(e) if e == "mars"));
    }
}
