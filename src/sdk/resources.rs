use serde::{Deserialize, Serialize};

use super::Tags;
use crate::arm::{ArmClient, ArmError, ArmRequest, json_body};
use crate::resourceids::{ResourceGroupId, ResourceId, SubscriptionId};

pub const API_VERSION: &str = "2022-09-01";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceGroup {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub location: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub managed_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Tags>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<ResourceGroupProperties>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceGroupProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provisioning_state: Option<String>,
}

/// A resource nested in a resource group, as returned by ListResources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenericResource {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "type")]
    pub resource_type: String,
}

#[derive(Debug, Clone)]
pub struct ResourceGroupsClient {
    client: ArmClient,
}

impl ResourceGroupsClient {
    pub fn new(client: ArmClient) -> Self {
        Self { client }
    }

    pub async fn get(&self, id: &ResourceGroupId) -> Result<ResourceGroup, ArmError> {
        self.client.get_model(&id.id(), API_VERSION).await
    }

    pub async fn create_or_update(
        &self,
        id: &ResourceGroupId,
        group: &ResourceGroup,
    ) -> Result<ResourceGroup, ArmError> {
        let body = json_body(group)?;
        self.client
            .send(ArmRequest::put(id.id(), API_VERSION, body))
            .await?
            .into_model()
    }

    /// Deletes the group and everything in it, waiting for completion.
    pub async fn delete_then_poll(&self, id: &ResourceGroupId) -> Result<(), ArmError> {
        self.client
            .send_and_poll(ArmRequest::delete(id.id(), API_VERSION))
            .await?;
        Ok(())
    }

    pub async fn list(&self, id: &SubscriptionId) -> Result<Vec<ResourceGroup>, ArmError> {
        let path = format!("{}/resourceGroups", id.id());
        self.client.list_all(&path, API_VERSION).await
    }

    pub async fn list_resources(
        &self,
        id: &ResourceGroupId,
    ) -> Result<Vec<GenericResource>, ArmError> {
        let path = format!("{}/resources", id.id());
        self.client.list_all(&path, API_VERSION).await
    }
}
