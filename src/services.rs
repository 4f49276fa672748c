mod cdn_frontdoor_rule;
mod kubernetes_cluster_node_pool;
mod resource_group;
mod storage_account;

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::resource::{Resource, ResourceError};
use crate::sdk::Tags;

pub use cdn_frontdoor_rule::CdnFrontDoorRuleResource;
pub use kubernetes_cluster_node_pool::KubernetesClusterNodePoolResource;
pub use resource_group::ResourceGroupResource;
pub use storage_account::StorageAccountResource;

/// Every resource type this provider manages, sorted by name.
pub fn resources() -> Vec<Arc<dyn Resource>> {
    vec![
        Arc::new(CdnFrontDoorRuleResource),
        Arc::new(KubernetesClusterNodePoolResource),
        Arc::new(ResourceGroupResource),
        Arc::new(StorageAccountResource),
    ]
}

pub fn get_resource(name: &str) -> Result<Arc<dyn Resource>, ResourceError> {
    resources()
        .into_iter()
        .find(|r| r.type_name() == name)
        .ok_or_else(|| ResourceError::UnknownResourceType(name.to_string()))
}

pub(crate) fn expand_tags(tags: BTreeMap<String, String>) -> Option<Tags> {
    (!tags.is_empty()).then_some(tags)
}

pub(crate) fn flatten_tags(tags: Option<&Tags>) -> Value {
    let map: Map<String, Value> = tags
        .into_iter()
        .flatten()
        .map(|(k, v)| (k.clone(), Value::String(v.clone())))
        .collect();
    Value::Object(map)
}

pub(crate) fn string_list(values: &[Value]) -> Vec<String> {
    values
        .iter()
        .filter_map(Value::as_str)
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_get_resource() {
        let resource = get_resource("azurerm_resource_group").unwrap();
        assert_eq!(resource.type_name(), "azurerm_resource_group");
    }

    #[test]
    fn test_get_resource_unknown() {
        match get_resource("azurerm_virtual_machine") {
            Err(ResourceError::UnknownResourceType(name)) => assert_eq!(name, "azurerm_virtual_machine"),
            _ => panic!("expected UnknownResourceType error"),
        }
    }

    #[test]
    fn test_resources_are_sorted_and_unique() {
        let names: Vec<&str> = resources().iter().map(|r| r.type_name()).collect();
        let mut sorted = names.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(names, sorted);
        assert_eq!(names.len(), 4);
    }

    #[test]
    fn test_every_schema_has_no_id_attribute() {
        for resource in resources() {
            assert!(resource.schema().get("id").is_none(), "{}", resource.type_name());
        }
    }

    #[test]
    fn test_tags_round_trip() {
        let mut tags = BTreeMap::new();
        assert_eq!(expand_tags(tags.clone()), None);
        tags.insert("env".to_string(), "test".to_string());
        let expanded = expand_tags(tags);
        assert_eq!(flatten_tags(expanded.as_ref()), json!({"env": "test"}));
        assert_eq!(flatten_tags(None), json!({}));
    }
}
