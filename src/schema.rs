//! Resource schemas and config validation.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::{Map, Value};

/// Returns the error messages for `value` found at `key`.
pub type Validator = Arc<dyn Fn(&Value, &str) -> Vec<String> + Send + Sync>;

#[derive(Debug, Clone)]
pub enum AttributeType {
    String,
    Int,
    Bool,
    List(Box<AttributeType>),
    Map(Box<AttributeType>),
    /// A nested block, stored as a list of objects.
    Block(Schema),
}

impl AttributeType {
    pub fn string_list() -> Self {
        AttributeType::List(Box::new(AttributeType::String))
    }

    pub fn string_map() -> Self {
        AttributeType::Map(Box::new(AttributeType::String))
    }

    fn describe(&self) -> &'static str {
        match self {
            AttributeType::String => "string",
            AttributeType::Int => "number",
            AttributeType::Bool => "bool",
            AttributeType::List(_) => "list",
            AttributeType::Map(_) => "map",
            AttributeType::Block(_) => "block",
        }
    }
}

#[derive(Clone)]
pub struct Attribute {
    pub kind: AttributeType,
    pub required: bool,
    pub optional: bool,
    pub computed: bool,
    pub force_new: bool,
    pub sensitive: bool,
    pub default: Option<Value>,
    pub max_items: Option<usize>,
    pub validators: Vec<Validator>,
    /// Canonicalises configured values before they are diffed or stored.
    pub state_func: Option<fn(&Value) -> Value>,
}

impl Attribute {
    fn new(kind: AttributeType) -> Self {
        Self {
            kind,
            required: false,
            optional: false,
            computed: false,
            force_new: false,
            sensitive: false,
            default: None,
            max_items: None,
            validators: Vec::new(),
            state_func: None,
        }
    }

    pub fn required(kind: AttributeType) -> Self {
        Self {
            required: true,
            ..Self::new(kind)
        }
    }

    pub fn optional(kind: AttributeType) -> Self {
        Self {
            optional: true,
            ..Self::new(kind)
        }
    }

    /// Set by the API only; configuring it is an error.
    pub fn computed(kind: AttributeType) -> Self {
        Self {
            computed: true,
            ..Self::new(kind)
        }
    }

    /// Optional, falling back to whatever the API reports when unset.
    pub fn optional_computed(kind: AttributeType) -> Self {
        Self {
            optional: true,
            computed: true,
            ..Self::new(kind)
        }
    }

    pub fn force_new(mut self) -> Self {
        self.force_new = true;
        self
    }

    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn max_items(mut self, max: usize) -> Self {
        self.max_items = Some(max);
        self
    }

    pub fn validate(mut self, validator: Validator) -> Self {
        self.validators.push(validator);
        self
    }

    pub fn state_func(mut self, f: fn(&Value) -> Value) -> Self {
        self.state_func = Some(f);
        self
    }

    pub fn is_computed_only(&self) -> bool {
        self.computed && !self.optional && !self.required
    }
}

impl std::fmt::Debug for Attribute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Attribute")
            .field("kind", &self.kind)
            .field("required", &self.required)
            .field("optional", &self.optional)
            .field("computed", &self.computed)
            .field("force_new", &self.force_new)
            .field("sensitive", &self.sensitive)
            .field("default", &self.default)
            .field("max_items", &self.max_items)
            .field("validators", &self.validators.len())
            .field("state_func", &self.state_func.is_some())
            .finish()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Schema {
    attributes: BTreeMap<&'static str, Attribute>,
}

/// Values holding an unresolved `${...}` reference are checked after apply.
fn is_unresolved(value: &Value) -> bool {
    value.as_str().is_some_and(|s| s.contains("${"))
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attribute(mut self, name: &'static str, attribute: Attribute) -> Self {
        self.attributes.insert(name, attribute);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Attribute> {
        self.attributes.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &Attribute)> {
        self.attributes.iter().map(|(k, v)| (*k, v))
    }

    pub fn is_sensitive(&self, name: &str) -> bool {
        self.get(name).is_some_and(|a| a.sensitive)
    }

    /// Wraps single-object blocks into lists and fills in defaults, recursively.
    pub fn normalize(&self, config: &mut Map<String, Value>) {
        for (name, attribute) in &self.attributes {
            let missing = config.get(*name).is_none_or(Value::is_null);
            if missing {
                if let Some(default) = &attribute.default {
                    config.insert(name.to_string(), default.clone());
                }
                continue;
            }

            let Some(value) = config.get_mut(*name) else {
                continue;
            };

            if let Some(state_func) = attribute.state_func {
                if !is_unresolved(value) {
                    *value = state_func(value);
                }
            }

            if let AttributeType::Block(nested) = &attribute.kind {
                if value.is_object() {
                    *value = Value::Array(vec![value.take()]);
                }
                if let Some(items) = value.as_array_mut() {
                    for item in items.iter_mut() {
                        if let Some(object) = item.as_object_mut() {
                            nested.normalize(object);
                        }
                    }
                }
            }
        }
    }

    /// Checks `config` against the schema, returning every problem found.
    pub fn validate_config(&self, config: &Map<String, Value>) -> Vec<String> {
        let mut errors = Vec::new();
        self.validate_at("", config, &mut errors);
        errors
    }

    fn validate_at(&self, prefix: &str, config: &Map<String, Value>, errors: &mut Vec<String>) {
        for key in config.keys() {
            if !self.attributes.contains_key(key.as_str()) {
                errors.push(format!(
                    "An argument named {:?} is not expected here.",
                    format!("{}{}", prefix, key)
                ));
            }
        }

        for (name, attribute) in &self.attributes {
            let key = format!("{}{}", prefix, name);
            let value = config.get(*name).filter(|v| !v.is_null());

            let Some(value) = value else {
                if attribute.required {
                    errors.push(format!(
                        "The argument {:?} is required, but no definition was found.",
                        key
                    ));
                }
                continue;
            };

            if attribute.is_computed_only() {
                errors.push(format!("{:?}: this field cannot be set", key));
                continue;
            }

            if is_unresolved(value) {
                continue;
            }

            if !type_matches(&attribute.kind, value) {
                errors.push(format!(
                    "{:?}: expected type {}, got {}",
                    key,
                    attribute.kind.describe(),
                    json_type(value)
                ));
                continue;
            }

            if let (Some(max), Some(items)) = (attribute.max_items, value.as_array()) {
                if items.len() > max {
                    errors.push(format!(
                        "{:?}: attribute supports {} item maximum, but config has {} declared",
                        key,
                        max,
                        items.len()
                    ));
                }
            }

            for validator in &attribute.validators {
                errors.extend(validator(value, &key));
            }

            if let AttributeType::Block(nested) = &attribute.kind {
                for (index, item) in value.as_array().into_iter().flatten().enumerate() {
                    if let Some(object) = item.as_object() {
                        nested.validate_at(&format!("{}.{}.", key, index), object, errors);
                    }
                }
            }
        }
    }
}

fn type_matches(kind: &AttributeType, value: &Value) -> bool {
    if is_unresolved(value) {
        return true;
    }
    match kind {
        AttributeType::String => value.is_string(),
        AttributeType::Int => value.is_i64() || value.is_u64(),
        AttributeType::Bool => value.is_boolean(),
        AttributeType::List(inner) => value
            .as_array()
            .is_some_and(|items| items.iter().all(|item| type_matches(inner, item))),
        AttributeType::Map(inner) => value
            .as_object()
            .is_some_and(|map| map.values().all(|item| type_matches(inner, item))),
        AttributeType::Block(_) => value
            .as_array()
            .is_some_and(|items| items.iter().all(Value::is_object)),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}

pub fn string_is_not_empty() -> Validator {
    Arc::new(|value: &Value, key: &str| match value.as_str() {
        Some(s) if s.trim().is_empty() => vec![format!(
            "expected {:?} to not be an empty string, got {:?}",
            key, s
        )],
        _ => Vec::new(),
    })
}

pub fn string_in_slice(values: &'static [&'static str], ignore_case: bool) -> Validator {
    Arc::new(move |value: &Value, key: &str| {
        let Some(s) = value.as_str() else {
            return Vec::new();
        };
        let found = values.iter().any(|candidate| {
            if ignore_case {
                candidate.eq_ignore_ascii_case(s)
            } else {
                *candidate == s
            }
        });
        if found {
            Vec::new()
        } else {
            vec![format!("expected {} to be one of {:?}, got {}", key, values, s)]
        }
    })
}

/// Like [`string_in_slice`], applied to every element of a list.
pub fn string_list_in_slice(values: &'static [&'static str]) -> Validator {
    Arc::new(move |value: &Value, key: &str| {
        value
            .as_array()
            .into_iter()
            .flatten()
            .enumerate()
            .filter_map(|(i, item)| {
                let s = item.as_str()?;
                (!values.contains(&s)).then(|| {
                    format!("expected {}.{} to be one of {:?}, got {}", key, i, values, s)
                })
            })
            .collect()
    })
}

pub fn int_between(min: i64, max: i64) -> Validator {
    Arc::new(move |value: &Value, key: &str| match value.as_i64() {
        Some(v) if v < min || v > max => vec![format!(
            "expected {} to be in the range ({} - {}), got {}",
            key, min, max, v
        )],
        _ => Vec::new(),
    })
}

pub fn int_at_least(min: i64) -> Validator {
    Arc::new(move |value: &Value, key: &str| match value.as_i64() {
        Some(v) if v < min => vec![format!("expected {} to be at least ({}), got {}", key, min, v)],
        _ => Vec::new(),
    })
}

pub fn resource_id<T: crate::resourceids::ResourceId + 'static>() -> Validator {
    Arc::new(|value: &Value, key: &str| crate::resourceids::validate_resource_id::<T>(value, key))
}

pub fn storage_account_name() -> Validator {
    Arc::new(|value: &Value, _key: &str| {
        let Some(name) = value.as_str() else {
            return Vec::new();
        };
        let valid = (3..=24).contains(&name.len())
            && name
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit());
        if valid {
            Vec::new()
        } else {
            vec![format!(
                "name ({:?}) can only consist of lowercase letters and numbers, and must be between 3 and 24 characters long",
                name
            )]
        }
    })
}

pub fn tags() -> Validator {
    Arc::new(|value: &Value, _key: &str| {
        let Some(tags) = value.as_object() else {
            return Vec::new();
        };
        let mut errors = Vec::new();
        if tags.len() > 50 {
            errors.push("a maximum of 50 tags can be applied to each ARM resource".to_string());
        }
        for (k, v) in tags {
            if k.chars().count() > 512 {
                errors.push(format!(
                    "the maximum length for a tag key is 512 characters: {:?} is {} characters",
                    k,
                    k.chars().count()
                ));
            }
            let length = v.as_str().map(|s| s.chars().count()).unwrap_or_default();
            if length > 256 {
                errors.push(format!(
                    "the maximum length for a tag value is 256 characters: the value for {:?} is {} characters",
                    k, length
                ));
            }
        }
        errors
    })
}

/// Azure accepts both `West Europe` and `westeurope`; state keeps the latter.
pub fn normalize_location(value: &Value) -> Value {
    match value.as_str() {
        Some(location) => Value::String(location.replace(' ', "").to_lowercase()),
        None => value.clone(),
    }
}

/// The common required, force-new `location` attribute.
pub fn location_attribute() -> Attribute {
    Attribute::required(AttributeType::String)
        .force_new()
        .validate(string_is_not_empty())
        .state_func(normalize_location)
}

/// The common optional `tags` attribute.
pub fn tags_attribute() -> Attribute {
    Attribute::optional(AttributeType::string_map()).validate(tags())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resourceids::ResourceGroupId;
    use serde_json::json;

    fn schema() -> Schema {
        Schema::new()
            .attribute(
                "name",
                Attribute::required(AttributeType::String)
                    .force_new()
                    .validate(string_is_not_empty()),
            )
            .attribute(
                "mode",
                Attribute::optional(AttributeType::String)
                    .default("User")
                    .validate(string_in_slice(&["System", "User"], false)),
            )
            .attribute("count", Attribute::optional(AttributeType::Int).validate(int_between(0, 10)))
            .attribute("endpoint", Attribute::computed(AttributeType::String))
            .attribute("tags", tags_attribute())
            .attribute(
                "settings",
                Attribute::optional(AttributeType::Block(
                    Schema::new().attribute("max_surge", Attribute::required(AttributeType::String)),
                ))
                .max_items(1),
            )
    }

    fn config(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_valid_config() {
        let errors = schema().validate_config(&config(json!({"name": "pool1", "count": 3})));
        assert!(errors.is_empty(), "{:?}", errors);
    }

    #[test]
    fn test_missing_required() {
        let errors = schema().validate_config(&config(json!({})));
        assert_eq!(
            errors,
            vec!["The argument \"name\" is required, but no definition was found."]
        );
    }

    #[test]
    fn test_unknown_argument() {
        let errors = schema().validate_config(&config(json!({"name": "a", "colour": "red"})));
        assert_eq!(errors, vec!["An argument named \"colour\" is not expected here."]);
    }

    #[test]
    fn test_computed_cannot_be_set() {
        let errors = schema().validate_config(&config(json!({"name": "a", "endpoint": "x"})));
        assert_eq!(errors, vec!["\"endpoint\": this field cannot be set"]);
    }

    #[test]
    fn test_wrong_type() {
        let errors = schema().validate_config(&config(json!({"name": "a", "count": "three"})));
        assert_eq!(errors, vec!["\"count\": expected type number, got string"]);
    }

    #[test]
    fn test_validators_run() {
        let errors = schema().validate_config(&config(
            json!({"name": "", "mode": "system", "count": 11}),
        ));
        assert_eq!(errors.len(), 3, "{:?}", errors);
        assert!(errors.iter().any(|e| e.contains("to not be an empty string")));
        assert!(errors.iter().any(|e| e.contains("to be one of")));
        assert!(errors.iter().any(|e| e.contains("in the range (0 - 10)")));
    }

    #[test]
    fn test_string_in_slice_ignore_case() {
        let validator = string_in_slice(&["Linux", "Windows"], true);
        assert!(validator(&json!("linux"), "os_type").is_empty());
        assert_eq!(validator(&json!("mac"), "os_type").len(), 1);
    }

    #[test]
    fn test_nested_block_errors_use_indexed_keys() {
        let errors = schema().validate_config(&config(json!({"name": "a", "settings": [{}]})));
        assert_eq!(
            errors,
            vec!["The argument \"settings.0.max_surge\" is required, but no definition was found."]
        );
    }

    #[test]
    fn test_max_items() {
        let errors = schema().validate_config(&config(json!({
            "name": "a",
            "settings": [{"max_surge": "1"}, {"max_surge": "2"}]
        })));
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("1 item maximum"));
    }

    #[test]
    fn test_normalize_wraps_blocks_and_applies_defaults() {
        let mut value = config(json!({"name": "a", "settings": {"max_surge": "10%"}}));
        schema().normalize(&mut value);
        assert_eq!(value["mode"], "User");
        assert_eq!(value["settings"], json!([{"max_surge": "10%"}]));
    }

    #[test]
    fn test_string_list_in_slice() {
        let validator = string_list_in_slice(&["GET", "POST"]);
        assert!(validator(&json!(["GET", "POST"]), "match_values").is_empty());
        assert_eq!(
            validator(&json!(["GET", "PATCH"]), "match_values"),
            vec!["expected match_values.1 to be one of [\"GET\", \"POST\"], got PATCH".to_string()]
        );
    }

    #[test]
    fn test_normalize_applies_state_func() {
        let schema = Schema::new().attribute("location", location_attribute());
        let mut value = config(json!({"location": "West Europe"}));
        schema.normalize(&mut value);
        assert_eq!(value["location"], "westeurope");
    }

    #[test]
    fn test_unresolved_references_skip_checks() {
        let errors = schema().validate_config(&config(
            json!({"name": "${azurerm_resource_group.test.name}", "count": "${var.count}"}),
        ));
        assert!(errors.is_empty(), "{:?}", errors);
    }

    #[test]
    fn test_tags_validator() {
        let mut tags = Map::new();
        for i in 0..51 {
            tags.insert(format!("key{}", i), json!("value"));
        }
        tags.insert("long".to_string(), json!("v".repeat(257)));
        let errors = super::tags()(&Value::Object(tags), "tags");
        assert_eq!(errors.len(), 2);
        assert!(errors[0].contains("maximum of 50 tags"));
        assert!(errors[1].contains("257 characters"));
    }

    #[test]
    fn test_storage_account_name_validator() {
        let validator = storage_account_name();
        assert!(validator(&json!("acctest12345"), "name").is_empty());
        assert_eq!(validator(&json!("Has-Dashes"), "name").len(), 1);
        assert_eq!(validator(&json!("ab"), "name").len(), 1);
    }

    #[test]
    fn test_resource_id_validator() {
        let validator = resource_id::<ResourceGroupId>();
        assert!(validator(&json!("/subscriptions/sub1/resourceGroups/rg1"), "resource_group_id").is_empty());
        assert_eq!(validator(&json!("/subscriptions/sub1"), "resource_group_id").len(), 1);
    }
}
