//! Declarative input in Terraform JSON syntax, and applying it as a whole.
//!
//! ```json
//! {"resource": {"azurerm_resource_group": {"example": {"name": "rg1", "location": "westeurope"}}}}
//! ```
//!
//! Resources are applied in file order and destroyed in reverse. String
//! values may reference attributes of earlier resources with
//! `${azurerm_resource_group.example.name}`.

use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{info, warn};

use crate::plan::{Action, AttributeChange, Plan, detect_drift};
use crate::provider::Provider;
use crate::resource::ResourceError;
use crate::state::{StateFile, lookup};

#[derive(Debug, Error)]
pub enum DefinitionError {
    #[error("reading definition {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("parsing definition: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid definition: {0}")]
    Invalid(String),

    #[error("reference to undeclared resource {0:?}")]
    UndeclaredReference(String),

    #[error("reference {0:?} could not be resolved, is the resource declared before it is used?")]
    UnresolvedReference(String),

    #[error("{0}: Resource already managed by Terraform")]
    AlreadyManaged(String),

    #[error("{address}: {source}")]
    Resource {
        address: String,
        #[source]
        source: ResourceError,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResourceBlock {
    pub resource_type: String,
    pub name: String,
    pub config: Map<String, Value>,
}

impl ResourceBlock {
    pub fn address(&self) -> String {
        format!("{}.{}", self.resource_type, self.name)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Definition {
    pub resources: Vec<ResourceBlock>,
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

impl Definition {
    pub fn load(path: &Path) -> Result<Self, DefinitionError> {
        let content = std::fs::read_to_string(path).map_err(|source| DefinitionError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content)
    }

    pub fn from_json(input: &str) -> Result<Self, DefinitionError> {
        let root: Value = serde_json::from_str(input)?;
        let Some(root) = root.as_object() else {
            return Err(DefinitionError::Invalid("expected a JSON object".to_string()));
        };

        for key in root.keys() {
            match key.as_str() {
                "resource" => {}
                "provider" | "terraform" => warn!(block = %key, "Ignoring block"),
                other => {
                    return Err(DefinitionError::Invalid(format!(
                        "unsupported block type {:?}",
                        other
                    )));
                }
            }
        }

        let mut resources = Vec::new();
        let Some(types) = root.get("resource") else {
            return Ok(Self { resources });
        };
        let Some(types) = types.as_object() else {
            return Err(DefinitionError::Invalid(
                "`resource` must be an object keyed by resource type".to_string(),
            ));
        };

        for (resource_type, blocks) in types {
            let Some(blocks) = blocks.as_object() else {
                return Err(DefinitionError::Invalid(format!(
                    "`resource.{}` must be an object keyed by resource name",
                    resource_type
                )));
            };
            for (name, config) in blocks {
                if !is_identifier(name) {
                    return Err(DefinitionError::Invalid(format!(
                        "{:?} is not a valid resource name",
                        name
                    )));
                }
                let Some(config) = config.as_object() else {
                    return Err(DefinitionError::Invalid(format!(
                        "`{}.{}` must be an object",
                        resource_type, name
                    )));
                };
                resources.push(ResourceBlock {
                    resource_type: resource_type.clone(),
                    name: name.clone(),
                    config: config.clone(),
                });
            }
        }

        let definition = Self { resources };
        definition.check_references()?;
        Ok(definition)
    }

    pub fn get(&self, address: &str) -> Option<&ResourceBlock> {
        self.resources.iter().find(|r| r.address() == address)
    }

    pub fn addresses(&self) -> Vec<String> {
        self.resources.iter().map(ResourceBlock::address).collect()
    }

    fn check_references(&self) -> Result<(), DefinitionError> {
        let addresses = self.addresses();
        for block in &self.resources {
            for reference in collect_references(&Value::Object(block.config.clone())) {
                let target = reference.address();
                if !addresses.contains(&target) {
                    return Err(DefinitionError::UndeclaredReference(reference.expression));
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Reference {
    expression: String,
    resource_type: String,
    name: String,
    path: String,
}

impl Reference {
    fn parse(expression: &str) -> Option<Self> {
        let mut parts = expression.splitn(3, '.');
        let resource_type = parts.next()?.trim();
        let name = parts.next()?.trim();
        let path = parts.next()?.trim();
        if resource_type.is_empty() || name.is_empty() || path.is_empty() {
            return None;
        }
        Some(Self {
            expression: expression.to_string(),
            resource_type: resource_type.to_string(),
            name: name.to_string(),
            path: path.to_string(),
        })
    }

    fn address(&self) -> String {
        format!("{}.{}", self.resource_type, self.name)
    }
}

/// `(start, end, expression)` for each `${...}` in `s`.
fn reference_spans(s: &str) -> Vec<(usize, usize, &str)> {
    let mut spans = Vec::new();
    let mut offset = 0;
    while let Some(start) = s[offset..].find("${") {
        let start = offset + start;
        let Some(length) = s[start..].find('}') else {
            break;
        };
        let end = start + length + 1;
        spans.push((start, end, &s[start + 2..end - 1]));
        offset = end;
    }
    spans
}

fn collect_references(value: &Value) -> Vec<Reference> {
    match value {
        Value::String(s) => reference_spans(s)
            .into_iter()
            .filter_map(|(_, _, expression)| Reference::parse(expression))
            .collect(),
        Value::Array(items) => items.iter().flat_map(collect_references).collect(),
        Value::Object(map) => map.values().flat_map(collect_references).collect(),
        _ => Vec::new(),
    }
}

fn resolve_string(s: &str, state: &StateFile, strict: bool) -> Result<Value, DefinitionError> {
    let spans = reference_spans(s);
    if spans.is_empty() {
        return Ok(Value::String(s.to_string()));
    }

    let mut resolved = String::new();
    let mut last = 0;
    for (start, end, expression) in &spans {
        let Some(reference) = Reference::parse(expression) else {
            return Err(DefinitionError::Invalid(format!(
                "invalid reference {:?}, expected ${{<type>.<name>.<attribute>}}",
                expression
            )));
        };

        let value = state
            .get(&reference.resource_type, &reference.name)
            .and_then(|instance| lookup(&instance.attributes, &reference.path))
            .filter(|v| !v.is_null());
        let Some(value) = value else {
            if strict {
                return Err(DefinitionError::UnresolvedReference(reference.expression));
            }
            return Ok(Value::String(s.to_string()));
        };

        // A string that is exactly one reference keeps the referenced type.
        if spans.len() == 1 && *start == 0 && *end == s.len() {
            return Ok(value.clone());
        }

        resolved.push_str(&s[last..*start]);
        match value {
            Value::String(v) => resolved.push_str(v),
            other => resolved.push_str(&other.to_string()),
        }
        last = *end;
    }
    resolved.push_str(&s[last..]);
    Ok(Value::String(resolved))
}

fn resolve_value(value: &Value, state: &StateFile, strict: bool) -> Result<Value, DefinitionError> {
    match value {
        Value::String(s) => resolve_string(s, state, strict),
        Value::Array(items) => items
            .iter()
            .map(|item| resolve_value(item, state, strict))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        Value::Object(map) => resolve(map, state, strict).map(Value::Object),
        other => Ok(other.clone()),
    }
}

/// Substitutes references with values from `state`. Unless `strict`,
/// references to resources not yet in state are left as they are.
pub fn resolve(
    config: &Map<String, Value>,
    state: &StateFile,
    strict: bool,
) -> Result<Map<String, Value>, DefinitionError> {
    config
        .iter()
        .map(|(k, v)| Ok((k.clone(), resolve_value(v, state, strict)?)))
        .collect()
}

#[derive(Debug, Clone, Serialize)]
pub struct PlannedChange {
    pub address: String,
    pub resource_type: String,
    #[serde(flatten)]
    pub plan: Plan,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DefinitionPlan {
    pub changes: Vec<PlannedChange>,
    /// Addresses in state that are no longer declared.
    pub destroy: Vec<String>,
}

impl DefinitionPlan {
    pub fn count(&self, action: Action) -> usize {
        self.changes.iter().filter(|c| c.plan.action == action).count()
    }

    pub fn is_empty(&self) -> bool {
        self.destroy.is_empty() && self.changes.iter().all(|c| c.plan.action == Action::NoOp)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ApplySummary {
    pub added: usize,
    pub changed: usize,
    pub destroyed: usize,
}

impl std::fmt::Display for ApplySummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} added, {} changed, {} destroyed",
            self.added, self.changed, self.destroyed
        )
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Drift {
    pub address: String,
    /// `true` when the remote object no longer exists.
    pub removed: bool,
    pub changes: Vec<AttributeChange>,
}

fn resource_error(address: &str) -> impl FnOnce(ResourceError) -> DefinitionError + '_ {
    move |source| DefinitionError::Resource {
        address: address.to_string(),
        source,
    }
}

/// Orphaned addresses, in state order.
fn orphans(definition: &Definition, state: &StateFile) -> Vec<String> {
    let declared = definition.addresses();
    state
        .addresses()
        .into_iter()
        .filter(|address| !declared.contains(address))
        .collect()
}

pub fn plan(
    provider: &Provider,
    definition: &Definition,
    state: &StateFile,
) -> Result<DefinitionPlan, DefinitionError> {
    let mut planned = DefinitionPlan {
        destroy: orphans(definition, state),
        ..DefinitionPlan::default()
    };

    for block in &definition.resources {
        let address = block.address();
        let config = resolve(&block.config, state, false)?;
        let prior = state.get(&block.resource_type, &block.name);
        let plan = provider
            .plan(&block.resource_type, prior, &config)
            .map_err(resource_error(&address))?;
        planned.changes.push(PlannedChange {
            address,
            resource_type: block.resource_type.clone(),
            plan,
        });
    }
    Ok(planned)
}

/// Applies the whole definition, updating `state` after every resource so a
/// failure part-way leaves it accurate for what was done.
pub async fn apply(
    provider: &Provider,
    definition: &Definition,
    state: &mut StateFile,
) -> Result<ApplySummary, DefinitionError> {
    let mut summary = ApplySummary::default();

    for address in orphans(definition, state).into_iter().rev() {
        let Some((resource_type, name)) = address.split_once('.') else {
            continue;
        };
        if let Some(instance) = state.get(resource_type, name).cloned() {
            provider
                .destroy(resource_type, &instance)
                .await
                .map_err(resource_error(&address))?;
        }
        state.remove(resource_type, name);
        summary.destroyed += 1;
    }

    for block in &definition.resources {
        let address = block.address();
        let config = resolve(&block.config, state, true)?;
        let prior = state.get(&block.resource_type, &block.name).cloned();

        let planned = provider
            .plan(&block.resource_type, prior.as_ref(), &config)
            .map_err(resource_error(&address))?;
        if planned.action == Action::NoOp {
            continue;
        }

        info!(%address, action = %planned.action, "Applying");
        if planned.action == Action::Replace {
            // Dropped from state first so a failed create doesn't leave a stale entry.
            state.remove(&block.resource_type, &block.name);
        }
        let result = provider
            .apply(&block.resource_type, prior.as_ref(), &planned)
            .await
            .map_err(resource_error(&address))?;

        match result {
            Some(instance) => state.set(&block.resource_type, &block.name, instance),
            None => {
                state.remove(&block.resource_type, &block.name);
            }
        }

        match planned.action {
            Action::Create => summary.added += 1,
            Action::Update => summary.changed += 1,
            Action::Replace => {
                summary.added += 1;
                summary.destroyed += 1;
            }
            Action::NoOp => {}
        }
    }

    Ok(summary)
}

/// Re-reads every resource in state, dropping the ones that are gone.
pub async fn refresh(provider: &Provider, state: &mut StateFile) -> Result<Vec<Drift>, DefinitionError> {
    let mut drift = Vec::new();

    for resource in state.resources.clone() {
        let address = resource.address();
        let Some(instance) = resource.instances.first() else {
            continue;
        };

        let refreshed = provider
            .refresh(&resource.resource_type, instance)
            .await
            .map_err(resource_error(&address))?;
        match refreshed {
            Some(refreshed) => {
                let changes = detect_drift(instance, &refreshed);
                if !changes.is_empty() {
                    drift.push(Drift {
                        address,
                        removed: false,
                        changes,
                    });
                }
                state.set(&resource.resource_type, &resource.name, refreshed);
            }
            None => {
                state.remove(&resource.resource_type, &resource.name);
                drift.push(Drift {
                    address,
                    removed: true,
                    changes: Vec::new(),
                });
            }
        }
    }
    Ok(drift)
}

pub async fn import(
    provider: &Provider,
    state: &mut StateFile,
    resource_type: &str,
    name: &str,
    id: &str,
) -> Result<(), DefinitionError> {
    let address = format!("{}.{}", resource_type, name);
    if state.get(resource_type, name).is_some() {
        return Err(DefinitionError::AlreadyManaged(address));
    }

    let instance = provider
        .import(resource_type, id)
        .await
        .map_err(resource_error(&address))?;
    state.set(resource_type, name, instance);
    Ok(())
}

/// Destroys everything in state, newest first.
pub async fn destroy(provider: &Provider, state: &mut StateFile) -> Result<usize, DefinitionError> {
    let mut destroyed = 0;
    while let Some(resource) = state.resources.last().cloned() {
        let address = resource.address();
        if let Some(instance) = resource.instances.first() {
            provider
                .destroy(&resource.resource_type, instance)
                .await
                .map_err(resource_error(&address))?;
        }
        state.remove(&resource.resource_type, &resource.name);
        destroyed += 1;
    }
    Ok(destroyed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::InstanceState;
    use serde_json::json;

    const DEFINITION: &str = r#"{
        "resource": {
            "azurerm_resource_group": {
                "example": {"name": "rg1", "location": "westeurope"}
            },
            "azurerm_storage_account": {
                "example": {
                    "name": "acctestsa1",
                    "resource_group_name": "${azurerm_resource_group.example.name}",
                    "location": "${azurerm_resource_group.example.location}",
                    "account_tier": "Standard",
                    "account_replication_type": "LRS",
                    "tags": {"group": "rg-${azurerm_resource_group.example.name}"}
                }
            }
        }
    }"#;

    fn state_with_group() -> StateFile {
        let mut state = StateFile::new();
        state.set(
            "azurerm_resource_group",
            "example",
            InstanceState::new(
                json!({
                    "id": "/subscriptions/sub1/resourceGroups/rg1",
                    "name": "rg1",
                    "location": "westeurope",
                    "tags": {"a": "b"},
                })
                .as_object()
                .cloned()
                .unwrap(),
            ),
        );
        state
    }

    #[test]
    fn test_from_json_keeps_file_order() {
        let definition = Definition::from_json(DEFINITION).unwrap();
        assert_eq!(
            definition.addresses(),
            vec!["azurerm_resource_group.example", "azurerm_storage_account.example"]
        );
    }

    #[test]
    fn test_from_json_rejects_undeclared_reference() {
        let input = r#"{"resource": {"azurerm_storage_account": {"sa": {"resource_group_name": "${azurerm_resource_group.missing.name}"}}}}"#;
        let err = Definition::from_json(input).unwrap_err();
        assert!(matches!(err, DefinitionError::UndeclaredReference(e) if e == "azurerm_resource_group.missing.name"));
    }

    #[test]
    fn test_from_json_rejects_invalid_shapes() {
        assert!(matches!(
            Definition::from_json("[]").unwrap_err(),
            DefinitionError::Invalid(_)
        ));
        assert!(matches!(
            Definition::from_json(r#"{"variable": {}}"#).unwrap_err(),
            DefinitionError::Invalid(_)
        ));
        assert!(matches!(
            Definition::from_json(r#"{"resource": {"azurerm_resource_group": {"1bad": {}}}}"#).unwrap_err(),
            DefinitionError::Invalid(_)
        ));
        assert!(matches!(
            Definition::from_json("{").unwrap_err(),
            DefinitionError::Parse(_)
        ));
    }

    #[test]
    fn test_resolve_whole_and_interpolated() {
        let definition = Definition::from_json(DEFINITION).unwrap();
        let block = definition.get("azurerm_storage_account.example").unwrap();
        let resolved = resolve(&block.config, &state_with_group(), true).unwrap();
        assert_eq!(resolved["resource_group_name"], "rg1");
        assert_eq!(resolved["location"], "westeurope");
        assert_eq!(resolved["tags"]["group"], "rg-rg1");
    }

    #[test]
    fn test_resolve_keeps_type_of_whole_reference() {
        let config = json!({"tags": "${azurerm_resource_group.example.tags}"});
        let resolved = resolve(config.as_object().unwrap(), &state_with_group(), true).unwrap();
        assert_eq!(resolved["tags"], json!({"a": "b"}));
    }

    #[test]
    fn test_resolve_unresolved() {
        let definition = Definition::from_json(DEFINITION).unwrap();
        let block = definition.get("azurerm_storage_account.example").unwrap();

        let lenient = resolve(&block.config, &StateFile::new(), false).unwrap();
        assert_eq!(lenient["resource_group_name"], "${azurerm_resource_group.example.name}");

        let err = resolve(&block.config, &StateFile::new(), true).unwrap_err();
        assert!(matches!(err, DefinitionError::UnresolvedReference(_)));
    }

    #[test]
    fn test_reference_spans() {
        let spans = reference_spans("a-${x.y.z}-${p.q.r}");
        let expressions: Vec<&str> = spans.iter().map(|(_, _, e)| *e).collect();
        assert_eq!(expressions, vec!["x.y.z", "p.q.r"]);
        assert!(reference_spans("no refs").is_empty());
        assert!(reference_spans("${unterminated").is_empty());
    }

    #[test]
    fn test_orphans() {
        let definition = Definition::from_json(r#"{"resource": {}}"#).unwrap();
        assert_eq!(orphans(&definition, &state_with_group()), vec!["azurerm_resource_group.example"]);
    }

    #[test]
    fn test_apply_summary_display() {
        let summary = ApplySummary {
            added: 2,
            changed: 1,
            destroyed: 0,
        };
        assert_eq!(summary.to_string(), "2 added, 1 changed, 0 destroyed");
    }
}
