//! Resource state: per-instance attributes, the on-disk state file and the
//! `ResourceData` view handed to CRUD functions.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

pub const STATE_VERSION: u32 = 4;
const PROVIDER_ADDRESS: &str = "provider[\"registry.terraform.io/hashicorp/azurerm\"]";

#[derive(Debug, Error)]
pub enum StateError {
    #[error("reading state file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("parsing state file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("unsupported state version {0}, expected {STATE_VERSION}")]
    UnsupportedVersion(u32),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InstanceState {
    #[serde(default)]
    pub schema_version: u32,
    pub attributes: Map<String, Value>,
}

impl InstanceState {
    pub fn new(attributes: Map<String, Value>) -> Self {
        Self {
            schema_version: 0,
            attributes,
        }
    }

    pub fn id(&self) -> &str {
        self.attributes
            .get("id")
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    pub fn flatmap(&self) -> BTreeMap<String, String> {
        flatmap(&self.attributes)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceState {
    pub mode: String,
    #[serde(rename = "type")]
    pub resource_type: String,
    pub name: String,
    pub provider: String,
    pub instances: Vec<InstanceState>,
}

impl ResourceState {
    /// `type.name`, the address used by references and checks.
    pub fn address(&self) -> String {
        format!("{}.{}", self.resource_type, self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateFile {
    pub version: u32,
    pub serial: u64,
    pub lineage: String,
    #[serde(default)]
    pub resources: Vec<ResourceState>,
}

impl Default for StateFile {
    fn default() -> Self {
        Self::new()
    }
}

impl StateFile {
    pub fn new() -> Self {
        Self {
            version: STATE_VERSION,
            serial: 0,
            lineage: uuid::Uuid::new_v4().to_string(),
            resources: Vec::new(),
        }
    }

    /// Loads a state file; a missing file is an empty state.
    pub fn load(path: &Path) -> Result<Self, StateError> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no state file, starting empty");
            return Ok(Self::new());
        }

        let content = std::fs::read_to_string(path).map_err(|source| StateError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let state: StateFile =
            serde_json::from_str(&content).map_err(|source| StateError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        if state.version != STATE_VERSION {
            return Err(StateError::UnsupportedVersion(state.version));
        }
        Ok(state)
    }

    /// Bumps the serial and writes the state, replacing the file atomically.
    pub fn save(&mut self, path: &Path) -> Result<(), StateError> {
        self.serial += 1;
        let io_err = |source| StateError::Io {
            path: path.to_path_buf(),
            source,
        };

        let content = serde_json::to_string_pretty(self).map_err(|source| StateError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, content).map_err(io_err)?;
        std::fs::rename(&tmp, path).map_err(io_err)?;
        Ok(())
    }

    pub fn get(&self, resource_type: &str, name: &str) -> Option<&InstanceState> {
        self.resources
            .iter()
            .find(|r| r.resource_type == resource_type && r.name == name)
            .and_then(|r| r.instances.first())
    }

    pub fn get_address(&self, address: &str) -> Option<&InstanceState> {
        let (resource_type, name) = address.split_once('.')?;
        self.get(resource_type, name)
    }

    pub fn set(&mut self, resource_type: &str, name: &str, instance: InstanceState) {
        match self
            .resources
            .iter_mut()
            .find(|r| r.resource_type == resource_type && r.name == name)
        {
            Some(existing) => existing.instances = vec![instance],
            None => self.resources.push(ResourceState {
                mode: "managed".to_string(),
                resource_type: resource_type.to_string(),
                name: name.to_string(),
                provider: PROVIDER_ADDRESS.to_string(),
                instances: vec![instance],
            }),
        }
    }

    pub fn remove(&mut self, resource_type: &str, name: &str) -> Option<InstanceState> {
        let index = self
            .resources
            .iter()
            .position(|r| r.resource_type == resource_type && r.name == name)?;
        self.resources.remove(index).instances.into_iter().next()
    }

    pub fn addresses(&self) -> Vec<String> {
        self.resources.iter().map(ResourceState::address).collect()
    }
}

/// Flattens nested attributes into dotted keys: lists get a `key.#` count and
/// indexed children, maps get a `key.%` count. Objects inside lists are
/// blocks and are flattened without a count. Nulls are omitted.
pub fn flatmap(attributes: &Map<String, Value>) -> BTreeMap<String, String> {
    let mut out = BTreeMap::new();
    for (key, value) in attributes {
        flatten_into(&mut out, key, value, false);
    }
    out
}

fn flatten_into(out: &mut BTreeMap<String, String>, key: &str, value: &Value, in_list: bool) {
    match value {
        Value::Null => {}
        Value::Bool(b) => {
            out.insert(key.to_string(), b.to_string());
        }
        Value::Number(n) => {
            out.insert(key.to_string(), n.to_string());
        }
        Value::String(s) => {
            out.insert(key.to_string(), s.clone());
        }
        Value::Array(items) => {
            out.insert(format!("{}.#", key), items.len().to_string());
            for (index, item) in items.iter().enumerate() {
                flatten_into(out, &format!("{}.{}", key, index), item, true);
            }
        }
        Value::Object(map) => {
            if !in_list {
                out.insert(format!("{}.%", key), map.len().to_string());
            }
            for (child, item) in map {
                flatten_into(out, &format!("{}.{}", key, child), item, false);
            }
        }
    }
}

/// Looks up a dotted path (`upgrade_settings.0.max_surge`) in nested attributes.
pub fn lookup<'a>(attributes: &'a Map<String, Value>, path: &str) -> Option<&'a Value> {
    let mut parts = path.split('.');
    let mut current = attributes.get(parts.next()?)?;
    for part in parts {
        current = match current {
            Value::Array(items) => items.get(part.parse::<usize>().ok()?)?,
            Value::Object(map) => map.get(part)?,
            _ => return None,
        };
    }
    Some(current)
}

/// The view of one resource a CRUD function works with.
///
/// `get` reads the planned configuration, in which computed attributes the
/// configuration leaves out already carry their prior value; `set` records
/// what the API reported. The resulting state is the configuration overlaid with
/// everything that was set.
#[derive(Debug, Clone, Default)]
pub struct ResourceData {
    id: String,
    config: Map<String, Value>,
    prior: Option<Map<String, Value>>,
    set: Map<String, Value>,
}

impl ResourceData {
    pub fn new(config: Map<String, Value>, prior: Option<&InstanceState>) -> Self {
        Self {
            id: prior.map(|p| p.id().to_string()).unwrap_or_default(),
            config,
            prior: prior.map(|p| p.attributes.clone()),
            set: Map::new(),
        }
    }

    /// Data for reading an existing resource, e.g. during refresh.
    pub fn from_state(state: &InstanceState) -> Self {
        Self::new(state.attributes.clone(), Some(state))
    }

    /// Data for an import: only the ID is known.
    pub fn for_import(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// An empty ID marks the resource as gone.
    pub fn set_id(&mut self, id: impl Into<String>) {
        self.id = id.into();
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        lookup(&self.set, key)
            .or_else(|| lookup(&self.config, key))
            .filter(|v| !v.is_null())
    }

    /// Reads only what the configuration says, ignoring prior state.
    pub fn get_config(&self, key: &str) -> Option<&Value> {
        lookup(&self.config, key).filter(|v| !v.is_null())
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    pub fn get_string(&self, key: &str) -> String {
        self.get_str(key).unwrap_or_default().to_string()
    }

    pub fn get_bool(&self, key: &str) -> bool {
        self.get(key).and_then(Value::as_bool).unwrap_or_default()
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(Value::as_i64)
    }

    pub fn get_list(&self, key: &str) -> Vec<Value> {
        self.get(key)
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default()
    }

    pub fn get_string_map(&self, key: &str) -> BTreeMap<String, String> {
        self.get(key)
            .and_then(Value::as_object)
            .map(|map| {
                map.iter()
                    .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        self.set.insert(key.to_string(), value.into());
    }

    /// Whether the configuration differs from the prior state at `key`.
    /// Without prior state everything counts as changed.
    pub fn has_change(&self, key: &str) -> bool {
        let Some(prior) = &self.prior else {
            return true;
        };
        let before = lookup(prior, key).filter(|v| !v.is_null());
        let after = lookup(&self.config, key).filter(|v| !v.is_null());
        before != after
    }

    pub fn prior_value(&self, key: &str) -> Option<&Value> {
        self.prior.as_ref().and_then(|p| lookup(p, key))
    }

    /// The state to persist, or `None` when the resource is gone.
    pub fn into_state(self) -> Option<InstanceState> {
        if self.id.is_empty() {
            return None;
        }
        let mut attributes = self.config;
        for (key, value) in self.set {
            attributes.insert(key, value);
        }
        attributes.insert("id".to_string(), Value::String(self.id));
        Some(InstanceState::new(attributes))
    }
}
