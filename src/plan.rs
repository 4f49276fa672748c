//! Diffing desired configuration against prior state.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::schema::Schema;
use crate::state::InstanceState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Create,
    Update,
    Replace,
    NoOp,
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Action::Create => "create",
            Action::Update => "update in-place",
            Action::Replace => "destroy and then create replacement",
            Action::NoOp => "no changes",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttributeChange {
    pub key: String,
    pub before: Option<Value>,
    pub after: Option<Value>,
    pub force_new: bool,
    pub sensitive: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Plan {
    pub action: Action,
    pub changes: Vec<AttributeChange>,
    /// The configuration with prior values filled in for computed attributes.
    #[serde(skip)]
    pub proposed: Map<String, Value>,
    #[serde(skip)]
    pub prior: Option<Map<String, Value>>,
}

impl Plan {
    pub fn change(&self, key: &str) -> Option<&AttributeChange> {
        self.changes.iter().find(|c| c.key == key)
    }

    pub fn has_change(&self, key: &str) -> bool {
        self.change(key).is_some()
    }

    /// Forces replacement because of `key`; a no-op if `key` didn't change.
    pub fn force_new(&mut self, key: &str) {
        if let Some(change) = self.changes.iter_mut().find(|c| c.key == key) {
            change.force_new = true;
            if self.action == Action::Update {
                self.action = Action::Replace;
            }
        }
    }

    pub fn requires_replace(&self) -> bool {
        self.action == Action::Replace
    }
}

fn non_null(value: Option<&Value>) -> Option<Value> {
    value.filter(|v| !v.is_null()).cloned()
}

/// Zero values read back from the API are equivalent to leaving the
/// attribute unset.
fn is_zero(value: &Option<Value>) -> bool {
    match value {
        None => true,
        Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(Value::Number(n)) => n.as_f64() == Some(0.0),
        Some(Value::Bool(b)) => !b,
        Some(Value::Array(items)) => items.is_empty(),
        Some(Value::Object(map)) => map.is_empty(),
    }
}

/// Compares nested blocks field by field, so a zero value read back inside
/// a block matches the field being left out of the configuration.
fn equivalent(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Object(a), Value::Object(b)) => a.keys().chain(b.keys()).all(|key| {
            !differs(&non_null(a.get(key)), &non_null(b.get(key)))
        }),
        (Value::Array(a), Value::Array(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| equivalent(x, y))
        }
        (a, b) => a == b,
    }
}

fn differs(before: &Option<Value>, after: &Option<Value>) -> bool {
    if is_zero(before) && is_zero(after) {
        return false;
    }
    match (before, after) {
        (Some(before), Some(after)) => !equivalent(before, after),
        _ => true,
    }
}

/// Plans the change from `prior` to `config`.
///
/// Optional-computed and computed attributes missing from `config` keep their
/// prior value. A change to a force-new attribute turns an update into a
/// replacement.
pub fn plan(schema: &Schema, prior: Option<&InstanceState>, config: &Map<String, Value>) -> Plan {
    let mut proposed = config.clone();

    let Some(prior) = prior else {
        let changes = schema
            .iter()
            .filter_map(|(name, attribute)| {
                non_null(config.get(name)).map(|after| AttributeChange {
                    key: name.to_string(),
                    before: None,
                    after: Some(after),
                    force_new: false,
                    sensitive: attribute.sensitive,
                })
            })
            .collect();
        return Plan {
            action: Action::Create,
            changes,
            proposed,
            prior: None,
        };
    };

    let mut changes = Vec::new();
    for (name, attribute) in schema.iter() {
        let before = non_null(prior.attributes.get(name));
        let mut after = non_null(config.get(name));

        if after.is_none() && attribute.computed {
            after = before.clone();
            if let Some(value) = &after {
                proposed.insert(name.to_string(), value.clone());
            }
        }

        if differs(&before, &after) {
            changes.push(AttributeChange {
                key: name.to_string(),
                before,
                after,
                force_new: attribute.force_new,
                sensitive: attribute.sensitive,
            });
        }
    }

    let action = if changes.is_empty() {
        Action::NoOp
    } else if changes.iter().any(|c| c.force_new) {
        Action::Replace
    } else {
        Action::Update
    };

    Plan {
        action,
        changes,
        proposed,
        prior: Some(prior.attributes.clone()),
    }
}

/// Attributes whose refreshed value differs from what was recorded.
pub fn detect_drift(prior: &InstanceState, refreshed: &InstanceState) -> Vec<AttributeChange> {
    let mut keys: Vec<&String> = prior.attributes.keys().collect();
    for key in refreshed.attributes.keys() {
        if !prior.attributes.contains_key(key) {
            keys.push(key);
        }
    }

    keys.into_iter()
        .filter_map(|key| {
            let before = non_null(prior.attributes.get(key));
            let after = non_null(refreshed.attributes.get(key));
            differs(&before, &after).then(|| AttributeChange {
                key: key.clone(),
                before,
                after,
                force_new: false,
                sensitive: false,
            })
        })
        .collect()
}
