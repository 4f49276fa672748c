use super::Segment;

const SUBSCRIPTIONS: Segment = Segment::fixed("staticSubscriptions", "subscriptions");
const SUBSCRIPTION_ID: Segment = Segment::subscription("subscription_id");
const RESOURCE_GROUPS: Segment = Segment::fixed("staticResourceGroups", "resourceGroups");
const RESOURCE_GROUP_NAME: Segment = Segment::resource_group("resource_group_name");
const PROVIDERS: Segment = Segment::fixed("staticProviders", "providers");

resource_id! {
    pub struct SubscriptionId("Subscription") {
        subscription_id,
    }
    segments = [SUBSCRIPTIONS, SUBSCRIPTION_ID];
}

resource_id! {
    pub struct ResourceGroupId("Resource Group") {
        subscription_id,
        resource_group_name,
    }
    segments = [SUBSCRIPTIONS, SUBSCRIPTION_ID, RESOURCE_GROUPS, RESOURCE_GROUP_NAME];
}

resource_id! {
    pub struct KubernetesClusterId("Kubernetes Cluster") {
        subscription_id,
        resource_group_name,
        managed_cluster_name,
    }
    segments = [
        SUBSCRIPTIONS,
        SUBSCRIPTION_ID,
        RESOURCE_GROUPS,
        RESOURCE_GROUP_NAME,
        PROVIDERS,
        Segment::provider("staticMicrosoftContainerService", "Microsoft.ContainerService"),
        Segment::fixed("staticManagedClusters", "managedClusters"),
        Segment::user("managed_cluster_name", "managedClusterValue"),
    ];
}

resource_id! {
    pub struct AgentPoolId("Agent Pool") {
        subscription_id,
        resource_group_name,
        managed_cluster_name,
        agent_pool_name,
    }
    segments = [
        SUBSCRIPTIONS,
        SUBSCRIPTION_ID,
        RESOURCE_GROUPS,
        RESOURCE_GROUP_NAME,
        PROVIDERS,
        Segment::provider("staticMicrosoftContainerService", "Microsoft.ContainerService"),
        Segment::fixed("staticManagedClusters", "managedClusters"),
        Segment::user("managed_cluster_name", "managedClusterValue"),
        Segment::fixed("staticAgentPools", "agentPools"),
        Segment::user("agent_pool_name", "agentPoolValue"),
    ];
}

resource_id! {
    pub struct StorageAccountId("Storage Account") {
        subscription_id,
        resource_group_name,
        storage_account_name,
    }
    segments = [
        SUBSCRIPTIONS,
        SUBSCRIPTION_ID,
        RESOURCE_GROUPS,
        RESOURCE_GROUP_NAME,
        PROVIDERS,
        Segment::provider("staticMicrosoftStorage", "Microsoft.Storage"),
        Segment::fixed("staticStorageAccounts", "storageAccounts"),
        Segment::user("storage_account_name", "storageAccountValue"),
    ];
}

resource_id! {
    pub struct VirtualNetworkId("Virtual Network") {
        subscription_id,
        resource_group_name,
        virtual_network_name,
    }
    segments = [
        SUBSCRIPTIONS,
        SUBSCRIPTION_ID,
        RESOURCE_GROUPS,
        RESOURCE_GROUP_NAME,
        PROVIDERS,
        Segment::provider("staticMicrosoftNetwork", "Microsoft.Network"),
        Segment::fixed("staticVirtualNetworks", "virtualNetworks"),
        Segment::user("virtual_network_name", "virtualNetworkValue"),
    ];
}

resource_id! {
    pub struct SubnetId("Subnet") {
        subscription_id,
        resource_group_name,
        virtual_network_name,
        subnet_name,
    }
    segments = [
        SUBSCRIPTIONS,
        SUBSCRIPTION_ID,
        RESOURCE_GROUPS,
        RESOURCE_GROUP_NAME,
        PROVIDERS,
        Segment::provider("staticMicrosoftNetwork", "Microsoft.Network"),
        Segment::fixed("staticVirtualNetworks", "virtualNetworks"),
        Segment::user("virtual_network_name", "virtualNetworkValue"),
        Segment::fixed("staticSubnets", "subnets"),
        Segment::user("subnet_name", "subnetValue"),
    ];
}

resource_id! {
    pub struct FrontDoorProfileId("Front Door Profile") {
        subscription_id,
        resource_group_name,
        profile_name,
    }
    segments = [
        SUBSCRIPTIONS,
        SUBSCRIPTION_ID,
        RESOURCE_GROUPS,
        RESOURCE_GROUP_NAME,
        PROVIDERS,
        Segment::provider("staticMicrosoftCdn", "Microsoft.Cdn"),
        Segment::fixed("staticProfiles", "profiles"),
        Segment::user("profile_name", "profileValue"),
    ];
}

resource_id! {
    pub struct FrontDoorRuleSetId("Front Door Rule Set") {
        subscription_id,
        resource_group_name,
        profile_name,
        rule_set_name,
    }
    segments = [
        SUBSCRIPTIONS,
        SUBSCRIPTION_ID,
        RESOURCE_GROUPS,
        RESOURCE_GROUP_NAME,
        PROVIDERS,
        Segment::provider("staticMicrosoftCdn", "Microsoft.Cdn"),
        Segment::fixed("staticProfiles", "profiles"),
        Segment::user("profile_name", "profileValue"),
        Segment::fixed("staticRuleSets", "ruleSets"),
        Segment::user("rule_set_name", "ruleSetValue"),
    ];
}

resource_id! {
    pub struct FrontDoorRuleId("Front Door Rule") {
        subscription_id,
        resource_group_name,
        profile_name,
        rule_set_name,
        rule_name,
    }
    segments = [
        SUBSCRIPTIONS,
        SUBSCRIPTION_ID,
        RESOURCE_GROUPS,
        RESOURCE_GROUP_NAME,
        PROVIDERS,
        Segment::provider("staticMicrosoftCdn", "Microsoft.Cdn"),
        Segment::fixed("staticProfiles", "profiles"),
        Segment::user("profile_name", "profileValue"),
        Segment::fixed("staticRuleSets", "ruleSets"),
        Segment::user("rule_set_name", "ruleSetValue"),
        Segment::fixed("staticRules", "rules"),
        Segment::user("rule_name", "ruleValue"),
    ];
}

impl ResourceGroupId {
    pub fn subscription(&self) -> SubscriptionId {
        SubscriptionId::new(&self.subscription_id)
    }
}

impl KubernetesClusterId {
    pub fn agent_pool(&self, agent_pool_name: impl Into<String>) -> AgentPoolId {
        AgentPoolId::new(
            &self.subscription_id,
            &self.resource_group_name,
            &self.managed_cluster_name,
            agent_pool_name,
        )
    }
}

impl AgentPoolId {
    pub fn cluster(&self) -> KubernetesClusterId {
        KubernetesClusterId::new(
            &self.subscription_id,
            &self.resource_group_name,
            &self.managed_cluster_name,
        )
    }
}

impl StorageAccountId {
    pub fn resource_group(&self) -> ResourceGroupId {
        ResourceGroupId::new(&self.subscription_id, &self.resource_group_name)
    }
}

impl FrontDoorRuleSetId {
    pub fn rule(&self, rule_name: impl Into<String>) -> FrontDoorRuleId {
        FrontDoorRuleId::new(
            &self.subscription_id,
            &self.resource_group_name,
            &self.profile_name,
            &self.rule_set_name,
            rule_name,
        )
    }
}

impl FrontDoorRuleId {
    pub fn rule_set(&self) -> FrontDoorRuleSetId {
        FrontDoorRuleSetId::new(
            &self.subscription_id,
            &self.resource_group_name,
            &self.profile_name,
            &self.rule_set_name,
        )
    }
}
