use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::{debug, info};

use super::{expand_tags, flatten_tags, string_list};
use crate::arm::OptionalExt;
use crate::clients::Clients;
use crate::plan::Plan;
use crate::resource::{Resource, ResourceError, ResourceTimeouts};
use crate::resourceids::{AgentPoolId, KubernetesClusterId, ResourceId, ResourceIdError};
use crate::schema::{
    Attribute, AttributeType, Schema, int_between, resource_id, string_in_slice,
    string_is_not_empty, tags_attribute,
};
use crate::sdk::containerservice::{
    AgentPool, AgentPoolMode, AgentPoolProperties, AgentPoolType, AgentPoolUpgradeSettings, OsSku,
    OsType, ScaleSetEvictionPolicy, ScaleSetPriority,
};
use crate::state::{ResourceData, lookup};

pub struct KubernetesClusterNodePoolResource;

const TYPE_NAME: &str = "azurerm_kubernetes_cluster_node_pool";

const DRAIN_TIMEOUT: &str = "upgrade_settings.0.drain_timeout_in_minutes";

#[async_trait]
impl Resource for KubernetesClusterNodePoolResource {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> Schema {
        Schema::new()
            .attribute(
                "name",
                Attribute::required(AttributeType::String)
                    .force_new()
                    .validate(string_is_not_empty()),
            )
            .attribute(
                "kubernetes_cluster_id",
                Attribute::required(AttributeType::String)
                    .force_new()
                    .validate(resource_id::<KubernetesClusterId>()),
            )
            .attribute(
                "vm_size",
                Attribute::required(AttributeType::String)
                    .force_new()
                    .validate(string_is_not_empty()),
            )
            .attribute(
                "node_count",
                Attribute::optional_computed(AttributeType::Int).validate(int_between(0, 1000)),
            )
            .attribute(
                "auto_scaling_enabled",
                Attribute::optional(AttributeType::Bool).default(false),
            )
            .attribute(
                "min_count",
                Attribute::optional(AttributeType::Int).validate(int_between(0, 1000)),
            )
            .attribute(
                "max_count",
                Attribute::optional(AttributeType::Int).validate(int_between(0, 1000)),
            )
            .attribute(
                "mode",
                Attribute::optional(AttributeType::String)
                    .default(AgentPoolMode::User.as_str())
                    .validate(string_in_slice(AgentPoolMode::possible_values(), false)),
            )
            .attribute(
                "os_type",
                Attribute::optional(AttributeType::String)
                    .default(OsType::Linux.as_str())
                    .force_new()
                    .validate(string_in_slice(OsType::possible_values(), false)),
            )
            .attribute(
                "os_sku",
                Attribute::optional_computed(AttributeType::String)
                    .validate(string_in_slice(OsSku::possible_values(), false)),
            )
            .attribute(
                "priority",
                Attribute::optional(AttributeType::String)
                    .default(ScaleSetPriority::Regular.as_str())
                    .force_new()
                    .validate(string_in_slice(ScaleSetPriority::possible_values(), false)),
            )
            .attribute(
                "eviction_policy",
                Attribute::optional(AttributeType::String)
                    .force_new()
                    .validate(string_in_slice(ScaleSetEvictionPolicy::possible_values(), false)),
            )
            .attribute(
                "zones",
                Attribute::optional(AttributeType::string_list()).force_new(),
            )
            .attribute("node_labels", Attribute::optional(AttributeType::string_map()))
            .attribute("tags", tags_attribute())
            .attribute(
                "upgrade_settings",
                Attribute::optional(AttributeType::Block(
                    Schema::new()
                        .attribute(
                            "max_surge",
                            Attribute::required(AttributeType::String)
                                .validate(string_is_not_empty()),
                        )
                        .attribute(
                            "drain_timeout_in_minutes",
                            Attribute::optional(AttributeType::Int),
                        ),
                ))
                .max_items(1),
            )
    }

    fn timeouts(&self) -> ResourceTimeouts {
        ResourceTimeouts::minutes(60, 5, 60, 60)
    }

    fn validate_import_id(&self, id: &str) -> Result<(), ResourceIdError> {
        AgentPoolId::parse(id).map(|_| ())
    }

    fn customize_diff(&self, plan: &mut Plan) -> Result<(), ResourceError> {
        if let Some(change) = plan.change("os_sku").filter(|_| plan.prior.is_some()) {
            let before = change.before.as_ref().and_then(Value::as_str).unwrap_or_default();
            let after = change.after.as_ref().and_then(Value::as_str).unwrap_or_default();
            if os_sku_requires_replacement(before, after) {
                plan.force_new("os_sku");
            }
        }

        // Draining can be switched off only by recreating the pool.
        let before = plan
            .prior
            .as_ref()
            .and_then(|p| lookup(p, DRAIN_TIMEOUT))
            .and_then(Value::as_i64)
            .unwrap_or_default();
        let after = lookup(&plan.proposed, DRAIN_TIMEOUT)
            .and_then(Value::as_i64)
            .unwrap_or_default();
        if before != 0 && after == 0 {
            plan.force_new("upgrade_settings");
        }

        Ok(())
    }

    async fn create(&self, clients: &Clients, data: &mut ResourceData) -> Result<(), ResourceError> {
        let cluster_id = KubernetesClusterId::parse(&data.get_string("kubernetes_cluster_id"))?;

        let cluster = clients
            .managed_clusters
            .get(&cluster_id)
            .await
            .optional()
            .map_err(|e| ResourceError::api(&format!("retrieving {}", cluster_id), e))?
            .ok_or_else(|| ResourceError::NotFound(cluster_id.to_string()))?;

        let default_pool = cluster.default_node_pool().ok_or_else(|| {
            ResourceError::Other(format!(
                "the Default Node Pool for {} was not found",
                cluster_id
            ))
        })?;
        if default_pool.pool_type != Some(AgentPoolType::VirtualMachineScaleSets) {
            return Err(ResourceError::Other(format!(
                "multiple node pools are only supported when the Default Node Pool uses a VMScaleSet (but {} doesn't)",
                cluster_id
            )));
        }

        let id = cluster_id.agent_pool(data.get_string("name"));
        let existing = clients
            .agent_pools
            .get(&id)
            .await
            .optional()
            .map_err(|e| ResourceError::api(&format!("checking for presence of existing {}", id), e))?;
        if existing.is_some() {
            return Err(ResourceError::already_exists(TYPE_NAME, id.id()));
        }

        let priority = ScaleSetPriority::from(data.get_str("priority").unwrap_or("Regular"));
        let eviction_policy = data.get_str("eviction_policy").map(ScaleSetEvictionPolicy::from);
        if eviction_policy.is_some() && priority != ScaleSetPriority::Spot {
            return Err(ResourceError::Other(
                "`eviction_policy` can only be set when `priority` is set to `Spot`".to_string(),
            ));
        }

        let scaling = expand_scaling(
            data.get_bool("auto_scaling_enabled"),
            data.get_config("node_count").and_then(Value::as_i64),
            data.get_i64("min_count"),
            data.get_i64("max_count"),
        )?;

        let zones = string_list(&data.get_list("zones"));
        let node_labels = data.get_string_map("node_labels");

        let properties = AgentPoolProperties {
            count: scaling.count,
            vm_size: Some(data.get_string("vm_size")),
            enable_auto_scaling: Some(scaling.enabled),
            min_count: scaling.min_count,
            max_count: scaling.max_count,
            mode: data.get_str("mode").map(AgentPoolMode::from),
            pool_type: Some(AgentPoolType::VirtualMachineScaleSets),
            os_type: data.get_str("os_type").map(OsType::from),
            os_sku: data.get_str("os_sku").map(OsSku::from),
            scale_set_priority: Some(priority),
            scale_set_eviction_policy: eviction_policy,
            availability_zones: (!zones.is_empty()).then_some(zones),
            node_labels: (!node_labels.is_empty()).then_some(node_labels),
            tags: expand_tags(data.get_string_map("tags")),
            upgrade_settings: expand_upgrade_settings(&data.get_list("upgrade_settings")),
            ..AgentPoolProperties::default()
        };

        info!(id = %id.id(), vm_size = ?properties.vm_size, count = ?properties.count, "Creating node pool");
        let pool = AgentPool {
            name: Some(id.agent_pool_name.clone()),
            properties: Some(properties),
            ..AgentPool::default()
        };
        clients
            .agent_pools
            .create_or_update_then_poll(&id, &pool)
            .await
            .map_err(|e| ResourceError::api(&format!("creating {}", id), e))?;

        data.set_id(id.id());
        Ok(())
    }

    async fn read(&self, clients: &Clients, data: &mut ResourceData) -> Result<(), ResourceError> {
        let id = AgentPoolId::parse_insensitively(data.id())?;

        let Some(pool) = clients
            .agent_pools
            .get(&id)
            .await
            .optional()
            .map_err(|e| ResourceError::api(&format!("retrieving {}", id), e))?
        else {
            debug!(id = %id.id(), "Node pool was not found - removing from state");
            data.set_id("");
            return Ok(());
        };

        data.set("name", id.agent_pool_name.clone());
        data.set("kubernetes_cluster_id", id.cluster().id());

        let Some(props) = pool.properties else {
            return Ok(());
        };

        data.set("zones", props.availability_zones.clone().unwrap_or_default());
        data.set("auto_scaling_enabled", props.enable_auto_scaling.unwrap_or_default());
        data.set("min_count", optional_int(props.min_count));
        data.set("max_count", optional_int(props.max_count));
        data.set(
            "mode",
            props.mode.unwrap_or(AgentPoolMode::User).as_str().to_string(),
        );
        data.set("node_count", optional_int(props.count));
        data.set("node_labels", json!(props.node_labels.clone().unwrap_or_default()));
        data.set("os_type", optional_string(props.os_type.as_ref().map(OsType::as_str)));
        data.set("os_sku", optional_string(props.os_sku.as_ref().map(OsSku::as_str)));
        data.set(
            "priority",
            props
                .scale_set_priority
                .unwrap_or(ScaleSetPriority::Regular)
                .as_str()
                .to_string(),
        );
        data.set(
            "eviction_policy",
            optional_string(
                props
                    .scale_set_eviction_policy
                    .as_ref()
                    .map(ScaleSetEvictionPolicy::as_str),
            ),
        );
        data.set("vm_size", optional_string(props.vm_size.as_deref()));
        data.set("upgrade_settings", flatten_upgrade_settings(props.upgrade_settings.as_ref()));
        data.set("tags", flatten_tags(props.tags.as_ref()));
        Ok(())
    }

    async fn update(&self, clients: &Clients, data: &mut ResourceData) -> Result<(), ResourceError> {
        let id = AgentPoolId::parse_insensitively(data.id())?;

        let existing = clients
            .agent_pools
            .get(&id)
            .await
            .optional()
            .map_err(|e| ResourceError::api(&format!("retrieving {}", id), e))?
            .ok_or_else(|| ResourceError::NotFound(id.to_string()))?;
        let mut props = existing.properties.unwrap_or_default();
        props.provisioning_state = None;

        let scaling = expand_scaling(
            data.get_bool("auto_scaling_enabled"),
            data.get_i64("node_count"),
            data.get_i64("min_count"),
            data.get_i64("max_count"),
        )?;
        props.enable_auto_scaling = Some(scaling.enabled);
        props.min_count = scaling.min_count;
        props.max_count = scaling.max_count;
        if data.has_change("node_count") && !scaling.enabled {
            props.count = scaling.count;
        }

        if data.has_change("mode") {
            props.mode = data.get_str("mode").map(AgentPoolMode::from);
        }
        if data.has_change("os_sku") {
            props.os_sku = data.get_str("os_sku").map(OsSku::from);
        }
        if data.has_change("node_labels") {
            props.node_labels = Some(data.get_string_map("node_labels"));
        }
        if data.has_change("tags") {
            props.tags = Some(data.get_string_map("tags"));
        }
        if data.has_change("upgrade_settings") {
            props.upgrade_settings = expand_upgrade_settings(&data.get_list("upgrade_settings"));
        }

        info!(id = %id.id(), "Updating node pool");
        let pool = AgentPool {
            properties: Some(props),
            ..existing
        };
        clients
            .agent_pools
            .create_or_update_then_poll(&id, &pool)
            .await
            .map_err(|e| ResourceError::api(&format!("updating {}", id), e))?;
        Ok(())
    }

    async fn delete(&self, clients: &Clients, data: &mut ResourceData) -> Result<(), ResourceError> {
        let id = AgentPoolId::parse_insensitively(data.id())?;

        info!(id = %id.id(), "Deleting node pool");
        clients
            .agent_pools
            .delete_then_poll(&id)
            .await
            .map_err(|e| ResourceError::api(&format!("deleting {}", id), e))?;
        Ok(())
    }

    async fn exists(&self, clients: &Clients, id: &str) -> Result<bool, ResourceError> {
        let id = AgentPoolId::parse(id)?;
        let pool = clients
            .agent_pools
            .get(&id)
            .await
            .optional()
            .map_err(|e| ResourceError::api(&format!("retrieving {}", id), e))?;
        Ok(pool.is_some())
    }
}

/// Ubuntu and AzureLinux can be swapped in place; any other change recreates
/// the pool, including setting an SKU on a pool that had none recorded.
fn os_sku_requires_replacement(before: &str, after: &str) -> bool {
    if before == after {
        return false;
    }
    let in_place = [OsSku::Ubuntu, OsSku::AzureLinux];
    !(in_place.contains(&OsSku::from(before)) && in_place.contains(&OsSku::from(after)))
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Scaling {
    enabled: bool,
    count: Option<i64>,
    min_count: Option<i64>,
    max_count: Option<i64>,
}

fn expand_scaling(
    enabled: bool,
    count: Option<i64>,
    min_count: Option<i64>,
    max_count: Option<i64>,
) -> Result<Scaling, ResourceError> {
    if !enabled {
        if min_count.is_some() || max_count.is_some() {
            return Err(ResourceError::Other(format!(
                "`max_count`({}) and `min_count`({}) must be set to `null` when auto_scaling_enabled is set to `false`",
                max_count.unwrap_or_default(),
                min_count.unwrap_or_default()
            )));
        }
        return Ok(Scaling {
            enabled,
            count: Some(count.unwrap_or(1)),
            min_count: None,
            max_count: None,
        });
    }

    let Some(max) = max_count else {
        return Err(ResourceError::Other(
            "`max_count` must be configured when `auto_scaling_enabled` is set to `true`".to_string(),
        ));
    };
    let Some(min) = min_count else {
        return Err(ResourceError::Other(
            "`min_count` must be configured when `auto_scaling_enabled` is set to `true`".to_string(),
        ));
    };
    if min > max {
        return Err(ResourceError::Other("`max_count` must be >= `min_count`".to_string()));
    }

    let count = count.unwrap_or(min);
    if count > max {
        return Err(ResourceError::Other(format!(
            "`node_count`({}) must be equal to or less than `max_count`({}) when `auto_scaling_enabled` is set to `true`",
            count, max
        )));
    }
    if count < min {
        return Err(ResourceError::Other(format!(
            "`node_count`({}) must be equal to or greater than `min_count`({}) when `auto_scaling_enabled` is set to `true`",
            count, min
        )));
    }

    Ok(Scaling {
        enabled,
        count: Some(count),
        min_count: Some(min),
        max_count: Some(max),
    })
}

fn expand_upgrade_settings(input: &[Value]) -> Option<AgentPoolUpgradeSettings> {
    let raw = input.first()?.as_object()?;
    let max_surge = raw.get("max_surge").and_then(Value::as_str).unwrap_or_default();
    Some(AgentPoolUpgradeSettings {
        max_surge: (!max_surge.is_empty()).then(|| max_surge.to_string()),
        drain_timeout_in_minutes: raw.get("drain_timeout_in_minutes").and_then(Value::as_i64),
    })
}

fn flatten_upgrade_settings(input: Option<&AgentPoolUpgradeSettings>) -> Value {
    let Some(settings) = input else {
        return json!([]);
    };
    let Some(max_surge) = settings.max_surge.as_deref().filter(|s| !s.is_empty()) else {
        return json!([]);
    };
    json!([{
        "max_surge": max_surge,
        "drain_timeout_in_minutes": settings.drain_timeout_in_minutes.unwrap_or_default(),
    }])
}

fn optional_int(value: Option<i64>) -> Value {
    value.map(Value::from).unwrap_or(Value::Null)
}

fn optional_string(value: Option<&str>) -> Value {
    value.map(Value::from).unwrap_or(Value::Null)
}
