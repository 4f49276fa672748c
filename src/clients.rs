use crate::arm::ArmClient;
use crate::config::{Features, ProviderConfig};
use crate::sdk::cdn::RulesClient;
use crate::sdk::containerservice::{AgentPoolsClient, ManagedClustersClient};
use crate::sdk::resources::ResourceGroupsClient;
use crate::sdk::storage::StorageAccountsClient;

/// Everything a resource's CRUD functions need: the API clients plus the
/// provider settings that change their behaviour.
#[derive(Debug, Clone)]
pub struct Clients {
    pub subscription_id: String,
    pub features: Features,
    pub arm: ArmClient,
    pub resource_groups: ResourceGroupsClient,
    pub managed_clusters: ManagedClustersClient,
    pub agent_pools: AgentPoolsClient,
    pub storage_accounts: StorageAccountsClient,
    pub frontdoor_rules: RulesClient,
}

impl Clients {
    pub fn new(config: &ProviderConfig, arm: ArmClient) -> Self {
        Self {
            subscription_id: config.subscription_id.clone(),
            features: config.features.clone(),
            resource_groups: ResourceGroupsClient::new(arm.clone()),
            managed_clusters: ManagedClustersClient::new(arm.clone()),
            agent_pools: AgentPoolsClient::new(arm.clone()),
            storage_accounts: StorageAccountsClient::new(arm.clone()),
            frontdoor_rules: RulesClient::new(arm.clone()),
            arm,
        }
    }
}
