use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info};

use super::{expand_tags, flatten_tags};
use crate::arm::OptionalExt;
use crate::clients::Clients;
use crate::resource::{Resource, ResourceError, ResourceTimeouts};
use crate::resourceids::{ResourceGroupId, ResourceId, ResourceIdError};
use crate::schema::{
    Attribute, AttributeType, Schema, location_attribute, normalize_location, string_is_not_empty,
    tags_attribute,
};
use crate::sdk::resources::ResourceGroup;
use crate::state::ResourceData;

pub struct ResourceGroupResource;

const TYPE_NAME: &str = "azurerm_resource_group";

#[async_trait]
impl Resource for ResourceGroupResource {
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
            .attribute("location", location_attribute())
            .attribute(
                "managed_by",
                Attribute::optional(AttributeType::String).validate(string_is_not_empty()),
            )
            .attribute("tags", tags_attribute())
    }

    fn timeouts(&self) -> ResourceTimeouts {
        ResourceTimeouts::minutes(90, 5, 90, 90)
    }

    fn validate_import_id(&self, id: &str) -> Result<(), ResourceIdError> {
        ResourceGroupId::parse(id).map(|_| ())
    }

    async fn create(&self, clients: &Clients, data: &mut ResourceData) -> Result<(), ResourceError> {
        let id = ResourceGroupId::new(&clients.subscription_id, data.get_string("name"));

        let existing = clients.resource_groups.get(&id).await.optional().map_err(|e| {
            ResourceError::api(&format!("checking for presence of existing {}", id), e)
        })?;
        if existing.is_some() {
            return Err(ResourceError::already_exists(TYPE_NAME, id.id()));
        }

        let group = expand_group(data);
        info!(id = %id.id(), location = %group.location, "Creating resource group");
        clients
            .resource_groups
            .create_or_update(&id, &group)
            .await
            .map_err(|e| ResourceError::api(&format!("creating {}", id), e))?;

        data.set_id(id.id());
        Ok(())
    }

    async fn read(&self, clients: &Clients, data: &mut ResourceData) -> Result<(), ResourceError> {
        let id = ResourceGroupId::parse_insensitively(data.id())?;

        let Some(group) = clients
            .resource_groups
            .get(&id)
            .await
            .optional()
            .map_err(|e| ResourceError::api(&format!("retrieving {}", id), e))?
        else {
            debug!(id = %id.id(), "Resource group was not found - removing from state");
            data.set_id("");
            return Ok(());
        };

        data.set("name", id.resource_group_name.clone());
        data.set("location", normalize_location(&Value::String(group.location.clone())));
        data.set("managed_by", group.managed_by.clone().map(Value::String).unwrap_or(Value::Null));
        data.set("tags", flatten_tags(group.tags.as_ref()));
        Ok(())
    }

    async fn update(&self, clients: &Clients, data: &mut ResourceData) -> Result<(), ResourceError> {
        let id = ResourceGroupId::parse_insensitively(data.id())?;

        if data.has_change("tags") || data.has_change("managed_by") {
            let group = expand_group(data);
            clients
                .resource_groups
                .create_or_update(&id, &group)
                .await
                .map_err(|e| ResourceError::api(&format!("updating {}", id), e))?;
        }
        Ok(())
    }

    async fn delete(&self, clients: &Clients, data: &mut ResourceData) -> Result<(), ResourceError> {
        let id = ResourceGroupId::parse_insensitively(data.id())?;

        if clients.features.resource_group.prevent_deletion_if_contains_resources {
            let nested = clients
                .resource_groups
                .list_resources(&id)
                .await
                .map_err(|e| ResourceError::api(&format!("listing resources in {}", id), e))?;
            if !nested.is_empty() {
                let ids: Vec<String> = nested.into_iter().map(|r| r.id).collect();
                return Err(ResourceError::Other(contains_resources_message(
                    &id.resource_group_name,
                    &ids,
                )));
            }
        }

        info!(id = %id.id(), "Deleting resource group");
        clients
            .resource_groups
            .delete_then_poll(&id)
            .await
            .map_err(|e| ResourceError::api(&format!("deleting {}", id), e))?;
        Ok(())
    }

    async fn exists(&self, clients: &Clients, id: &str) -> Result<bool, ResourceError> {
        let id = ResourceGroupId::parse(id)?;
        let group = clients
            .resource_groups
            .get(&id)
            .await
            .optional()
            .map_err(|e| ResourceError::api(&format!("retrieving {}", id), e))?;
        Ok(group.is_some())
    }
}

fn expand_group(data: &ResourceData) -> ResourceGroup {
    ResourceGroup {
        location: data.get_string("location"),
        managed_by: data.get_str("managed_by").map(str::to_string),
        tags: expand_tags(data.get_string_map("tags")),
        ..ResourceGroup::default()
    }
}

fn contains_resources_message(name: &str, ids: &[String]) -> String {
    format!(
        "deleting Resource Group {:?}: the Resource Group still contains Resources.\n\n\
         Terraform is configured to check for Resources within the Resource Group when deleting the Resource Group - and\n\
         raise an error if nested Resources still exist to avoid unintentionally deleting these Resources.\n\n\
         Terraform has detected that the following Resources still exist within the Resource Group:\n\n\
         {}\n\n\
         This feature is intended to avoid the unintentional destruction of nested Resources provisioned through some\n\
         other means (for example, an ARM Template Deployment) - as such you must either remove these Resources, or\n\
         disable this behaviour using the feature flag `prevent_deletion_if_contains_resources` within the `features`\n\
         block when configuring the Provider.",
        name,
        ids.iter().map(|id| format!("* `{}`", id)).collect::<Vec<_>>().join("\n")
    )
}
