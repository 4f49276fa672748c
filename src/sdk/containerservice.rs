use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::Tags;
use crate::arm::{ArmClient, ArmError, ArmRequest, json_body};
use crate::resourceids::{AgentPoolId, KubernetesClusterId, ResourceId};

pub const API_VERSION: &str = "2024-05-01";

arm_enum! {
    pub enum AgentPoolMode {
        System => "System",
        User => "User",
    }
}

arm_enum! {
    pub enum AgentPoolType {
        AvailabilitySet => "AvailabilitySet",
        VirtualMachineScaleSets => "VirtualMachineScaleSets",
    }
}

arm_enum! {
    pub enum OsType {
        Linux => "Linux",
        Windows => "Windows",
    }
}

arm_enum! {
    pub enum OsSku {
        AzureLinux => "AzureLinux",
        CblMariner => "CBLMariner",
        Mariner => "Mariner",
        Ubuntu => "Ubuntu",
        Windows2019 => "Windows2019",
        Windows2022 => "Windows2022",
    }
}

arm_enum! {
    pub enum ScaleSetPriority {
        Regular => "Regular",
        Spot => "Spot",
    }
}

arm_enum! {
    pub enum ScaleSetEvictionPolicy {
        Deallocate => "Deallocate",
        Delete => "Delete",
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagedCluster {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub location: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<ManagedClusterProperties>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagedClusterProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kubernetes_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_pool_profiles: Option<Vec<ManagedClusterAgentPoolProfile>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provisioning_state: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagedClusterAgentPoolProfile {
    pub name: String,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub pool_type: Option<AgentPoolType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<AgentPoolMode>,
}

impl ManagedCluster {
    /// The first System-mode pool, which the API treats as the default pool.
    pub fn default_node_pool(&self) -> Option<&ManagedClusterAgentPoolProfile> {
        let profiles = self.properties.as_ref()?.agent_pool_profiles.as_ref()?;
        profiles
            .iter()
            .find(|p| p.mode == Some(AgentPoolMode::System))
            .or_else(|| profiles.first())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentPool {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<AgentPoolProperties>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentPoolProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vm_size: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_auto_scaling: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_count: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_count: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<AgentPoolMode>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub pool_type: Option<AgentPoolType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os_type: Option<OsType>,
    #[serde(default, rename = "osSKU", skip_serializing_if = "Option::is_none")]
    pub os_sku: Option<OsSku>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale_set_priority: Option<ScaleSetPriority>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale_set_eviction_policy: Option<ScaleSetEvictionPolicy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub availability_zones: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_labels: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Tags>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orchestrator_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upgrade_settings: Option<AgentPoolUpgradeSettings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provisioning_state: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentPoolUpgradeSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_surge: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drain_timeout_in_minutes: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct ManagedClustersClient {
    client: ArmClient,
}

impl ManagedClustersClient {
    pub fn new(client: ArmClient) -> Self {
        Self { client }
    }

    pub async fn get(&self, id: &KubernetesClusterId) -> Result<ManagedCluster, ArmError> {
        self.client.get_model(&id.id(), API_VERSION).await
    }
}

#[derive(Debug, Clone)]
pub struct AgentPoolsClient {
    client: ArmClient,
}

impl AgentPoolsClient {
    pub fn new(client: ArmClient) -> Self {
        Self { client }
    }

    pub async fn get(&self, id: &AgentPoolId) -> Result<AgentPool, ArmError> {
        self.client.get_model(&id.id(), API_VERSION).await
    }

    pub async fn create_or_update_then_poll(
        &self,
        id: &AgentPoolId,
        pool: &AgentPool,
    ) -> Result<(), ArmError> {
        let request = ArmRequest::put(id.id(), API_VERSION, json_body(pool)?);
        self.client.send_and_poll(request).await?;
        Ok(())
    }

    pub async fn delete_then_poll(&self, id: &AgentPoolId) -> Result<(), ArmError> {
        self.client
            .send_and_poll(ArmRequest::delete(id.id(), API_VERSION))
            .await?;
        Ok(())
    }

    pub async fn list(&self, id: &KubernetesClusterId) -> Result<Vec<AgentPool>, ArmError> {
        let path = format!("{}/agentPools", id.id());
        self.client.list_all(&path, API_VERSION).await
    }
}
