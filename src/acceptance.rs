//! Acceptance test harness: drives one resource type end to end through
//! the provider, checking state and the remote object along the way.
//!
//! ```ignore
//! let data = TestData::build("azurerm_resource_group", "test");
//! ResourceTest::new(provider)
//!     .step(TestStep::apply(config, vec![check::that(&data.resource_name).exists_in_azure()]))
//!     .step(TestStep::import(&data.resource_name))
//!     .run()
//!     .await?;
//! ```

use std::collections::BTreeMap;

use rand::Rng;
use thiserror::Error;
use tracing::{info, warn};

use crate::definition::{self, Definition, DefinitionError};
use crate::plan::Action;
use crate::provider::Provider;
use crate::state::StateFile;

const DEFAULT_LOCATION: &str = "westeurope";
const DEFAULT_LOCATION_ALT: &str = "northeurope";

#[derive(Debug, Error)]
pub enum AcceptanceError {
    #[error(transparent)]
    Definition(#[from] DefinitionError),

    #[error("check failed: {0}")]
    Check(String),

    #[error("After applying this test step, the plan was not empty: {0}")]
    PlanNotEmpty(String),

    #[error("expected an error containing {expected:?}, but the step succeeded")]
    UnexpectedSuccess { expected: String },

    #[error("expected an error containing {expected:?}, got: {got}")]
    UnexpectedError { expected: String, got: String },

    #[error("ImportStateVerify attributes not equivalent for {address}:\n{}", .differences.join("\n"))]
    ImportMismatch {
        address: String,
        differences: Vec<String>,
    },

    #[error("destroy check failed: {0}")]
    Destroy(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locations {
    pub primary: String,
    pub secondary: String,
}

/// Randomized names and locations for one test.
#[derive(Debug, Clone)]
pub struct TestData {
    pub random_integer: i64,
    /// Five lowercase letters.
    pub random_string: String,
    pub locations: Locations,
    pub resource_type: String,
    pub resource_label: String,
    /// `type.label`, the address checks refer to.
    pub resource_name: String,
}

impl TestData {
    pub fn build(resource_type: &str, label: &str) -> Self {
        let mut rng = rand::thread_rng();
        let random_string = (0..5).map(|_| rng.gen_range(b'a'..=b'z') as char).collect();

        Self {
            random_integer: rng.gen_range(100_000_000..1_000_000_000),
            random_string,
            locations: Locations {
                primary: env_or("ARM_TEST_LOCATION", DEFAULT_LOCATION),
                secondary: env_or("ARM_TEST_LOCATION_ALT", DEFAULT_LOCATION_ALT),
            },
            resource_type: resource_type.to_string(),
            resource_label: label.to_string(),
            resource_name: format!("{}.{}", resource_type, label),
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key)
        .ok()
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

pub mod check {
    //! Assertions against state and the remote API.

    use super::AcceptanceError;
    use crate::provider::Provider;
    use crate::state::StateFile;

    #[derive(Debug, Clone, PartialEq)]
    pub enum Check {
        ExistsInAzure(String),
        DoesNotExistInAzure(String),
        HasValue {
            address: String,
            key: String,
            value: String,
        },
        IsSet {
            address: String,
            key: String,
        },
        IsEmpty {
            address: String,
            key: String,
        },
    }

    pub fn that(address: &str) -> That {
        That {
            address: address.to_string(),
        }
    }

    pub struct That {
        address: String,
    }

    impl That {
        pub fn exists_in_azure(self) -> Check {
            Check::ExistsInAzure(self.address)
        }

        pub fn does_not_exist_in_azure(self) -> Check {
            Check::DoesNotExistInAzure(self.address)
        }

        /// `key` uses flatmap syntax: `tags.env`, `zones.#`, `upgrade_settings.0.max_surge`.
        pub fn key(self, key: &str) -> ThatKey {
            ThatKey {
                address: self.address,
                key: key.to_string(),
            }
        }
    }

    pub struct ThatKey {
        address: String,
        key: String,
    }

    impl ThatKey {
        pub fn has_value(self, value: impl ToString) -> Check {
            Check::HasValue {
                address: self.address,
                key: self.key,
                value: value.to_string(),
            }
        }

        pub fn is_set(self) -> Check {
            Check::IsSet {
                address: self.address,
                key: self.key,
            }
        }

        pub fn is_empty(self) -> Check {
            Check::IsEmpty {
                address: self.address,
                key: self.key,
            }
        }
    }

    fn failed(message: String) -> AcceptanceError {
        AcceptanceError::Check(message)
    }

    fn resource_type(address: &str) -> &str {
        address.split_once('.').map(|(t, _)| t).unwrap_or(address)
    }

    impl Check {
        pub fn address(&self) -> &str {
            match self {
                Check::ExistsInAzure(address) | Check::DoesNotExistInAzure(address) => address,
                Check::HasValue { address, .. }
                | Check::IsSet { address, .. }
                | Check::IsEmpty { address, .. } => address,
            }
        }

        pub async fn run(&self, provider: &Provider, state: &StateFile) -> Result<(), AcceptanceError> {
            let address = self.address();
            let instance = state
                .get_address(address)
                .ok_or_else(|| failed(format!("{}: not found in state", address)))?;

            match self {
                Check::ExistsInAzure(_) | Check::DoesNotExistInAzure(_) => {
                    let exists = provider
                        .exists(resource_type(address), instance.id())
                        .await
                        .map_err(|e| failed(format!("{}: checking existence: {}", address, e)))?;
                    let want = matches!(self, Check::ExistsInAzure(_));
                    if exists != want {
                        let verb = if want { "does not exist" } else { "still exists" };
                        return Err(failed(format!("{} {} in Azure", address, verb)));
                    }
                }
                Check::HasValue { key, value, .. } => {
                    let attributes = instance.flatmap();
                    match attributes.get(key) {
                        Some(got) if got == value => {}
                        Some(got) => {
                            return Err(failed(format!(
                                "{}: Attribute '{}' expected {:?}, got {:?}",
                                address, key, value, got
                            )));
                        }
                        None => {
                            return Err(failed(format!(
                                "{}: Attribute '{}' expected {:?}, got nothing",
                                address, key, value
                            )));
                        }
                    }
                }
                Check::IsSet { key, .. } => {
                    if !instance.flatmap().get(key).is_some_and(|v| !v.is_empty()) {
                        return Err(failed(format!("{}: Attribute '{}' expected to be set", address, key)));
                    }
                }
                Check::IsEmpty { key, .. } => {
                    let attributes = instance.flatmap();
                    let empty = match attributes.get(key) {
                        None => true,
                        Some(v) => v.is_empty() || ((key.ends_with(".#") || key.ends_with(".%")) && v == "0"),
                    };
                    if !empty {
                        return Err(failed(format!(
                            "{}: Attribute '{}' expected to be empty, got {:?}",
                            address, key, attributes[key]
                        )));
                    }
                }
            }
            Ok(())
        }
    }
}

use check::Check;

#[derive(Debug, Clone)]
pub enum TestStep {
    /// Applies the configuration, runs the checks and requires an empty plan afterwards.
    Apply { config: String, checks: Vec<Check> },
    /// Imports the resource at `address` by its ID and compares against state.
    Import { address: String, ignore: Vec<String> },
    /// Applying the configuration must fail with an error containing `contains`.
    ExpectError { config: String, contains: String },
}

impl TestStep {
    pub fn apply(config: impl Into<String>, checks: Vec<Check>) -> Self {
        TestStep::Apply {
            config: config.into(),
            checks,
        }
    }

    pub fn import(address: &str) -> Self {
        TestStep::Import {
            address: address.to_string(),
            ignore: Vec::new(),
        }
    }

    /// Import, skipping attributes with any of the given flatmap prefixes.
    pub fn import_ignoring(address: &str, ignore: &[&str]) -> Self {
        TestStep::Import {
            address: address.to_string(),
            ignore: ignore.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn expect_error(config: impl Into<String>, contains: impl Into<String>) -> Self {
        TestStep::ExpectError {
            config: config.into(),
            contains: contains.into(),
        }
    }
}

pub struct ResourceTest {
    provider: Provider,
    steps: Vec<TestStep>,
}

impl ResourceTest {
    pub fn new(provider: Provider) -> Self {
        Self {
            provider,
            steps: Vec::new(),
        }
    }

    pub fn step(mut self, step: TestStep) -> Self {
        self.steps.push(step);
        self
    }

    /// Runs every step, then destroys whatever was created, even when a
    /// step failed.
    pub async fn run(self) -> Result<StateFile, AcceptanceError> {
        let mut state = StateFile::new();
        let result = self.run_steps(&mut state).await;
        let destroyed = self.destroy(&mut state).await;
        result.and(destroyed).map(|_| state)
    }

    async fn run_steps(&self, state: &mut StateFile) -> Result<(), AcceptanceError> {
        for (i, step) in self.steps.iter().enumerate() {
            info!(step = i + 1, "Running test step");
            match step {
                TestStep::Apply { config, checks } => {
                    let definition = Definition::from_json(config)?;
                    definition::apply(&self.provider, &definition, state).await?;
                    for check in checks {
                        check.run(&self.provider, state).await?;
                    }

                    let planned = definition::plan(&self.provider, &definition, state)?;
                    if !planned.is_empty() {
                        let pending: Vec<String> = planned
                            .changes
                            .iter()
                            .filter(|c| c.plan.action != Action::NoOp)
                            .flat_map(|c| c.plan.changes.iter().map(move |a| format!("{}.{}", c.address, a.key)))
                            .chain(planned.destroy.iter().cloned())
                            .collect();
                        return Err(AcceptanceError::PlanNotEmpty(pending.join(", ")));
                    }
                }
                TestStep::Import { address, ignore } => {
                    self.verify_import(state, address, ignore).await?;
                }
                TestStep::ExpectError { config, contains } => {
                    let result = match Definition::from_json(config) {
                        Ok(definition) => definition::apply(&self.provider, &definition, state).await,
                        Err(e) => Err(e),
                    };
                    match result {
                        Ok(_) => {
                            return Err(AcceptanceError::UnexpectedSuccess {
                                expected: contains.clone(),
                            });
                        }
                        Err(e) if e.to_string().contains(contains.as_str()) => {}
                        Err(e) => {
                            return Err(AcceptanceError::UnexpectedError {
                                expected: contains.clone(),
                                got: e.to_string(),
                            });
                        }
                    }
                }
            }
        }
        Ok(())
    }

    async fn verify_import(&self, state: &StateFile, address: &str, ignore: &[String]) -> Result<(), AcceptanceError> {
        let Some((resource_type, _)) = address.split_once('.') else {
            return Err(AcceptanceError::Check(format!("invalid address {:?}", address)));
        };
        let existing = state
            .get_address(address)
            .ok_or_else(|| AcceptanceError::Check(format!("{}: not found in state", address)))?;

        let imported = self
            .provider
            .import(resource_type, existing.id())
            .await
            .map_err(|source| DefinitionError::Resource {
                address: address.to_string(),
                source,
            })?;

        let keep = |key: &String| !ignore.iter().any(|prefix| key.starts_with(prefix.as_str()));
        let expected: BTreeMap<String, String> = existing.flatmap().into_iter().filter(|(k, _)| keep(k)).collect();
        let actual: BTreeMap<String, String> = imported.flatmap().into_iter().filter(|(k, _)| keep(k)).collect();

        let mut differences = Vec::new();
        for key in expected.keys().chain(actual.keys().filter(|k| !expected.contains_key(*k))) {
            let (want, got) = (expected.get(key), actual.get(key));
            if want != got {
                differences.push(format!("  {}: state {:?}, imported {:?}", key, want, got));
            }
        }
        if !differences.is_empty() {
            return Err(AcceptanceError::ImportMismatch {
                address: address.to_string(),
                differences,
            });
        }
        Ok(())
    }

    async fn destroy(&self, state: &mut StateFile) -> Result<(), AcceptanceError> {
        let created: Vec<(String, String, String)> = state
            .resources
            .iter()
            .filter_map(|r| {
                r.instances
                    .first()
                    .map(|i| (r.address(), r.resource_type.clone(), i.id().to_string()))
            })
            .collect();

        definition::destroy(&self.provider, state).await?;

        for (address, resource_type, id) in created {
            match self.provider.exists(&resource_type, &id).await {
                Ok(false) => {}
                Ok(true) => {
                    return Err(AcceptanceError::Destroy(format!("{} still exists", address)));
                }
                Err(e) if e.is_not_found() => {}
                Err(e) => {
                    warn!(%address, error = %e, "Destroy check failed");
                    return Err(AcceptanceError::Destroy(format!("{}: {}", address, e)));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arm::ArmClient;
    use crate::auth::StaticTokenCredential;
    use crate::config::ProviderConfig;
    use crate::state::InstanceState;
    use serde_json::json;
    use serial_test::serial;
    use std::sync::Arc;

    fn provider() -> Provider {
        let config = ProviderConfig {
            subscription_id: "sub1".to_string(),
            ..ProviderConfig::default()
        };
        let arm = ArmClient::new("http://127.0.0.1:1", Arc::new(StaticTokenCredential::new("t"))).unwrap();
        Provider::new(&config, arm)
    }

    fn state() -> StateFile {
        let mut state = StateFile::new();
        state.set(
            "azurerm_resource_group",
            "test",
            InstanceState::new(
                json!({
                    "id": "/subscriptions/sub1/resourceGroups/acctestRG-1",
                    "name": "acctestRG-1",
                    "location": "westeurope",
                    "managed_by": "",
                    "tags": {"env": "test"},
                })
                .as_object()
                .cloned()
                .unwrap(),
            ),
        );
        state
    }

    #[test]
    #[serial]
    fn test_data_uses_location_overrides() {
        let backup = (
            std::env::var("ARM_TEST_LOCATION").ok(),
            std::env::var("ARM_TEST_LOCATION_ALT").ok(),
        );
        unsafe {
            std::env::set_var("ARM_TEST_LOCATION", "eastus");
            std::env::remove_var("ARM_TEST_LOCATION_ALT");
        }

        let data = TestData::build("azurerm_resource_group", "test");
        assert_eq!(data.locations.primary, "eastus");
        assert_eq!(data.locations.secondary, "northeurope");
        assert_eq!(data.resource_name, "azurerm_resource_group.test");
        assert_eq!(data.random_string.len(), 5);
        assert!(data.random_string.chars().all(|c| c.is_ascii_lowercase()));
        assert!(data.random_integer >= 100_000_000);

        unsafe {
            match backup.0 {
                Some(v) => std::env::set_var("ARM_TEST_LOCATION", v),
                None => std::env::remove_var("ARM_TEST_LOCATION"),
            }
            if let Some(v) = backup.1 {
                std::env::set_var("ARM_TEST_LOCATION_ALT", v);
            }
        }
    }

    #[tokio::test]
    async fn test_key_checks() {
        let provider = provider();
        let state = state();
        let address = "azurerm_resource_group.test";

        check::that(address).key("name").has_value("acctestRG-1").run(&provider, &state).await.unwrap();
        check::that(address).key("tags.%").has_value(1).run(&provider, &state).await.unwrap();
        check::that(address).key("tags.env").is_set().run(&provider, &state).await.unwrap();
        check::that(address).key("managed_by").is_empty().run(&provider, &state).await.unwrap();
        check::that(address).key("zones.#").is_empty().run(&provider, &state).await.unwrap();

        let err = check::that(address)
            .key("location")
            .has_value("northeurope")
            .run(&provider, &state)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("expected \"northeurope\", got \"westeurope\""));

        let err = check::that(address).key("tags.env").is_empty().run(&provider, &state).await.unwrap_err();
        assert!(matches!(err, AcceptanceError::Check(_)));
    }

    #[tokio::test]
    async fn test_check_missing_from_state() {
        let err = check::that("azurerm_storage_account.test")
            .exists_in_azure()
            .run(&provider(), &state())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "check failed: azurerm_storage_account.test: not found in state");
    }

    #[tokio::test]
    async fn test_expect_error_matches_substring() {
        let config = r#"{"resource": {"azurerm_resource_group": {"test": {"name": "", "location": "westeurope"}}}}"#;
        ResourceTest::new(provider())
            .step(TestStep::expect_error(config, "name"))
            .run()
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_expect_error_reports_mismatch() {
        let config = r#"{"resource": {"azurerm_resource_group": {"test": {"location": "westeurope"}}}}"#;
        let err = ResourceTest::new(provider())
            .step(TestStep::expect_error(config, "something else entirely"))
            .run()
            .await
            .unwrap_err();
        assert!(matches!(err, AcceptanceError::UnexpectedError { .. }));
    }
}
