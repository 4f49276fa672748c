use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info};

use super::{expand_tags, flatten_tags};
use crate::arm::OptionalExt;
use crate::clients::Clients;
use crate::plan::Plan;
use crate::resource::{Resource, ResourceError, ResourceTimeouts};
use crate::resourceids::{ResourceId, ResourceIdError, StorageAccountId};
use crate::schema::{
    Attribute, AttributeType, Schema, location_attribute, normalize_location,
    storage_account_name, string_in_slice, string_is_not_empty, tags_attribute,
};
use crate::sdk::storage::{
    AccessTier, Kind, MinimumTlsVersion, Sku, SkuName, SkuTier, StorageAccountCreateParameters,
    StorageAccountMutableProperties, StorageAccountUpdateParameters,
};
use crate::state::ResourceData;

pub struct StorageAccountResource;

const TYPE_NAME: &str = "azurerm_storage_account";

const REPLICATION_TYPES: &[&str] = &["LRS", "ZRS", "GRS", "RAGRS", "GZRS", "RAGZRS"];

/// Account kinds that accept an `access_tier`.
const KINDS_SUPPORTING_ACCESS_TIER: &[&str] = &["BlobStorage", "FileStorage", "StorageV2"];

#[async_trait]
impl Resource for StorageAccountResource {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> Schema {
        Schema::new()
            .attribute(
                "name",
                Attribute::required(AttributeType::String)
                    .force_new()
                    .validate(storage_account_name()),
            )
            .attribute(
                "resource_group_name",
                Attribute::required(AttributeType::String)
                    .force_new()
                    .validate(string_is_not_empty()),
            )
            .attribute("location", location_attribute())
            .attribute(
                "account_kind",
                Attribute::optional(AttributeType::String)
                    .default(Kind::StorageV2.as_str())
                    .validate(string_in_slice(Kind::possible_values(), false)),
            )
            .attribute(
                "account_tier",
                Attribute::required(AttributeType::String)
                    .force_new()
                    .validate(string_in_slice(SkuTier::possible_values(), false)),
            )
            .attribute(
                "account_replication_type",
                Attribute::required(AttributeType::String)
                    .validate(string_in_slice(REPLICATION_TYPES, false)),
            )
            .attribute(
                "access_tier",
                Attribute::optional_computed(AttributeType::String)
                    .validate(string_in_slice(AccessTier::possible_values(), false)),
            )
            .attribute(
                "https_traffic_only_enabled",
                Attribute::optional(AttributeType::Bool).default(true),
            )
            .attribute(
                "min_tls_version",
                Attribute::optional(AttributeType::String)
                    .default(MinimumTlsVersion::Tls1_2.as_str())
                    .validate(string_in_slice(MinimumTlsVersion::possible_values(), false)),
            )
            .attribute("tags", tags_attribute())
            .attribute("primary_blob_endpoint", Attribute::computed(AttributeType::String))
            .attribute(
                "primary_access_key",
                Attribute::computed(AttributeType::String).sensitive(),
            )
    }

    fn timeouts(&self) -> ResourceTimeouts {
        ResourceTimeouts::minutes(60, 5, 60, 60)
    }

    fn validate_import_id(&self, id: &str) -> Result<(), ResourceIdError> {
        StorageAccountId::parse(id).map(|_| ())
    }

    fn customize_diff(&self, plan: &mut Plan) -> Result<(), ResourceError> {
        if let Some(change) = plan.change("account_kind") {
            let before = change.before.as_ref().and_then(Value::as_str).unwrap_or_default();
            let after = change.after.as_ref().and_then(Value::as_str).unwrap_or_default();
            if before != Kind::Storage.as_str() && after != Kind::StorageV2.as_str() {
                debug!(from = before, to = after, "Storage account kind can't be migrated in place");
                plan.force_new("account_kind");
            }
        }

        if let Some(change) = plan.change("account_replication_type") {
            let before = change.before.as_ref().and_then(Value::as_str).unwrap_or_default();
            let after = change.after.as_ref().and_then(Value::as_str).unwrap_or_default();
            if replication_change_requires_replacement(before, after) {
                plan.force_new("account_replication_type");
            }
        }

        let access_tier_set = plan
            .proposed
            .get("access_tier")
            .and_then(Value::as_str)
            .is_some_and(|s| !s.is_empty());
        let kind = plan
            .proposed
            .get("account_kind")
            .and_then(Value::as_str)
            .unwrap_or_default();
        if access_tier_set && !KINDS_SUPPORTING_ACCESS_TIER.contains(&kind) {
            return Err(ResourceError::Other(access_tier_unsupported()));
        }

        Ok(())
    }

    async fn create(&self, clients: &Clients, data: &mut ResourceData) -> Result<(), ResourceError> {
        let id = StorageAccountId::new(
            &clients.subscription_id,
            data.get_string("resource_group_name"),
            data.get_string("name"),
        );

        let existing = clients
            .storage_accounts
            .get_properties(&id)
            .await
            .optional()
            .map_err(|e| ResourceError::api(&format!("checking for existing {}", id), e))?;
        if existing.is_some() {
            return Err(ResourceError::already_exists(TYPE_NAME, id.id()));
        }

        let kind = Kind::from(data.get_str("account_kind").unwrap_or("StorageV2"));
        let tier = data.get_string("account_tier");
        let sku = expand_sku(&tier, &data.get_string("account_replication_type"), &kind)?;

        if kind == Kind::FileStorage && tier != SkuTier::Premium.as_str() {
            return Err(ResourceError::Other(
                "`account_tier` must be `Premium` for File Storage accounts".to_string(),
            ));
        }

        let supports_access_tier = KINDS_SUPPORTING_ACCESS_TIER.contains(&kind.as_str());
        let access_tier = data.get_config("access_tier").and_then(Value::as_str);
        if access_tier.is_some() && !supports_access_tier {
            return Err(ResourceError::Other(access_tier_unsupported()));
        }
        let access_tier = supports_access_tier
            .then(|| AccessTier::from(access_tier.unwrap_or(AccessTier::Hot.as_str())));

        let parameters = StorageAccountCreateParameters {
            kind,
            sku,
            location: data.get_string("location"),
            tags: expand_tags(data.get_string_map("tags")),
            properties: StorageAccountMutableProperties {
                access_tier,
                supports_https_traffic_only: Some(data.get_bool("https_traffic_only_enabled")),
                minimum_tls_version: data.get_str("min_tls_version").map(MinimumTlsVersion::from),
            },
        };

        info!(id = %id.id(), sku = %parameters.sku.name, "Creating storage account");
        clients
            .storage_accounts
            .create_then_poll(&id, &parameters)
            .await
            .map_err(|e| ResourceError::api(&format!("creating {}", id), e))?;

        data.set_id(id.id());
        Ok(())
    }

    async fn read(&self, clients: &Clients, data: &mut ResourceData) -> Result<(), ResourceError> {
        let id = StorageAccountId::parse_insensitively(data.id())?;

        let Some(account) = clients
            .storage_accounts
            .get_properties(&id)
            .await
            .optional()
            .map_err(|e| ResourceError::api(&format!("retrieving {}", id), e))?
        else {
            debug!(id = %id.id(), "Storage account was not found - removing from state");
            data.set_id("");
            return Ok(());
        };

        data.set("name", id.storage_account_name.clone());
        data.set("resource_group_name", id.resource_group_name.clone());
        data.set("location", normalize_location(&Value::String(account.location.clone())));
        if let Some(kind) = &account.kind {
            data.set("account_kind", kind.as_str().to_string());
        }
        if let Some((tier, replication)) = account.sku.as_ref().and_then(|s| s.name.parts()) {
            data.set("account_tier", tier.to_string());
            data.set("account_replication_type", replication.to_string());
        }

        let props = account.properties.unwrap_or_default();
        data.set(
            "access_tier",
            props
                .access_tier
                .as_ref()
                .map(|t| Value::from(t.as_str()))
                .unwrap_or(Value::Null),
        );
        data.set(
            "https_traffic_only_enabled",
            props.supports_https_traffic_only.unwrap_or(true),
        );
        data.set(
            "min_tls_version",
            props
                .minimum_tls_version
                .unwrap_or(MinimumTlsVersion::Tls1_0)
                .as_str()
                .to_string(),
        );
        data.set(
            "primary_blob_endpoint",
            props
                .primary_endpoints
                .and_then(|e| e.blob)
                .map(Value::String)
                .unwrap_or(Value::Null),
        );
        data.set("tags", flatten_tags(account.tags.as_ref()));

        if clients.features.storage.data_plane_available {
            let keys = clients
                .storage_accounts
                .list_keys(&id)
                .await
                .map_err(|e| ResourceError::api(&format!("listing keys for {}", id), e))?;
            let primary = keys.into_iter().next().map(|k| k.value).unwrap_or_default();
            data.set("primary_access_key", primary);
        }
        Ok(())
    }

    async fn update(&self, clients: &Clients, data: &mut ResourceData) -> Result<(), ResourceError> {
        let id = StorageAccountId::parse_insensitively(data.id())?;

        let kind = Kind::from(data.get_str("account_kind").unwrap_or("StorageV2"));
        let mut parameters = StorageAccountUpdateParameters::default();

        if data.has_change("account_kind") {
            parameters.kind = Some(kind.clone());
        }
        if data.has_change("account_replication_type") {
            parameters.sku = Some(expand_sku(
                &data.get_string("account_tier"),
                &data.get_string("account_replication_type"),
                &kind,
            )?);
        }

        let mut properties = StorageAccountMutableProperties::default();
        let mut properties_changed = false;
        if data.has_change("access_tier") {
            properties.access_tier = data.get_str("access_tier").map(AccessTier::from);
            properties_changed = true;
        }
        if data.has_change("https_traffic_only_enabled") {
            properties.supports_https_traffic_only = Some(data.get_bool("https_traffic_only_enabled"));
            properties_changed = true;
        }
        if data.has_change("min_tls_version") {
            properties.minimum_tls_version =
                data.get_str("min_tls_version").map(MinimumTlsVersion::from);
            properties_changed = true;
        }
        if properties_changed {
            parameters.properties = Some(properties);
        }
        if data.has_change("tags") {
            parameters.tags = Some(data.get_string_map("tags"));
        }

        if parameters == StorageAccountUpdateParameters::default() {
            return Ok(());
        }

        info!(id = %id.id(), "Updating storage account");
        clients
            .storage_accounts
            .update(&id, &parameters)
            .await
            .map_err(|e| ResourceError::api(&format!("updating {}", id), e))?;
        Ok(())
    }

    async fn delete(&self, clients: &Clients, data: &mut ResourceData) -> Result<(), ResourceError> {
        let id = StorageAccountId::parse_insensitively(data.id())?;

        info!(id = %id.id(), "Deleting storage account");
        clients
            .storage_accounts
            .delete(&id)
            .await
            .map_err(|e| ResourceError::api(&format!("deleting {}", id), e))?;
        Ok(())
    }

    async fn exists(&self, clients: &Clients, id: &str) -> Result<bool, ResourceError> {
        let id = StorageAccountId::parse(id)?;
        let account = clients
            .storage_accounts
            .get_properties(&id)
            .await
            .optional()
            .map_err(|e| ResourceError::api(&format!("retrieving {}", id), e))?;
        Ok(account.is_some())
    }
}

fn expand_sku(tier: &str, replication: &str, kind: &Kind) -> Result<Sku, ResourceError> {
    let name = SkuName::from_parts(tier, replication);
    if matches!(kind, Kind::BlobStorage | Kind::Storage) && name == SkuName::StandardZrs {
        return Err(ResourceError::Other(
            "an `account_replication_type` of `ZRS` isn't supported for Blob Storage accounts"
                .to_string(),
        ));
    }
    Ok(Sku {
        name,
        tier: Some(SkuTier::from(tier)),
    })
}

/// Moving between zone-redundant and non-zone-redundant replication needs a new account.
fn replication_change_requires_replacement(before: &str, after: &str) -> bool {
    let zonal = |r: &str| matches!(r.to_uppercase().as_str(), "ZRS" | "GZRS" | "RAGZRS");
    let regional = |r: &str| matches!(r.to_uppercase().as_str(), "LRS" | "GRS" | "RAGRS");
    (regional(before) && zonal(after)) || (zonal(before) && regional(after))
}

fn access_tier_unsupported() -> String {
    format!(
        "`access_tier` is only available for accounts where `kind` is set to one of: {}",
        KINDS_SUPPORTING_ACCESS_TIER.join(" / ")
    )
}
