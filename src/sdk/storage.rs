use serde::{Deserialize, Serialize};

use super::Tags;
use crate::arm::{ArmClient, ArmError, ArmRequest, json_body};
use crate::resourceids::{ResourceGroupId, ResourceId, StorageAccountId};

pub const API_VERSION: &str = "2023-01-01";

arm_enum! {
    pub enum Kind {
        BlobStorage => "BlobStorage",
        BlockBlobStorage => "BlockBlobStorage",
        FileStorage => "FileStorage",
        Storage => "Storage",
        StorageV2 => "StorageV2",
    }
}

arm_enum! {
    pub enum SkuName {
        PremiumLrs => "Premium_LRS",
        PremiumZrs => "Premium_ZRS",
        StandardGrs => "Standard_GRS",
        StandardGzrs => "Standard_GZRS",
        StandardLrs => "Standard_LRS",
        StandardRagrs => "Standard_RAGRS",
        StandardRagzrs => "Standard_RAGZRS",
        StandardZrs => "Standard_ZRS",
    }
}

arm_enum! {
    pub enum SkuTier {
        Premium => "Premium",
        Standard => "Standard",
    }
}

arm_enum! {
    pub enum AccessTier {
        Cool => "Cool",
        Hot => "Hot",
        Premium => "Premium",
    }
}

arm_enum! {
    pub enum MinimumTlsVersion {
        Tls1_0 => "TLS1_0",
        Tls1_1 => "TLS1_1",
        Tls1_2 => "TLS1_2",
    }
}

arm_enum! {
    pub enum ProvisioningState {
        Creating => "Creating",
        ResolvingDns => "ResolvingDNS",
        Succeeded => "Succeeded",
    }
}

impl SkuName {
    /// Builds the SKU from its `<tier>_<replication>` halves.
    pub fn from_parts(tier: &str, replication: &str) -> Self {
        SkuName::from(format!("{}_{}", tier, replication).as_str())
    }

    /// Splits the SKU back into `(tier, replication)`.
    pub fn parts(&self) -> Option<(&str, &str)> {
        self.as_str().split_once('_')
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sku {
    pub name: SkuName,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tier: Option<SkuTier>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageAccount {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub location: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<Kind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sku: Option<Sku>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Tags>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<StorageAccountProperties>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageAccountProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_tier: Option<AccessTier>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supports_https_traffic_only: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum_tls_version: Option<MinimumTlsVersion>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_endpoints: Option<PrimaryEndpoints>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provisioning_state: Option<ProvisioningState>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PrimaryEndpoints {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blob: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub queue: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dfs: Option<String>,
}

/// Body of a create (PUT) call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageAccountCreateParameters {
    pub kind: Kind,
    pub sku: Sku,
    pub location: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Tags>,
    pub properties: StorageAccountMutableProperties,
}

/// Body of an update (PATCH) call; only set fields change.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageAccountUpdateParameters {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<Kind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sku: Option<Sku>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Tags>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<StorageAccountMutableProperties>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageAccountMutableProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_tier: Option<AccessTier>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supports_https_traffic_only: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum_tls_version: Option<MinimumTlsVersion>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageAccountKey {
    pub key_name: String,
    pub value: String,
    #[serde(default)]
    pub permissions: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ListKeysResult {
    #[serde(default)]
    keys: Vec<StorageAccountKey>,
}

#[derive(Debug, Clone)]
pub struct StorageAccountsClient {
    client: ArmClient,
}

impl StorageAccountsClient {
    pub fn new(client: ArmClient) -> Self {
        Self { client }
    }

    pub async fn get_properties(&self, id: &StorageAccountId) -> Result<StorageAccount, ArmError> {
        self.client.get_model(&id.id(), API_VERSION).await
    }

    /// Creation answers 202 with a `Location` header to poll, or 200 when the
    /// account already exists with the same settings.
    pub async fn create_then_poll(
        &self,
        id: &StorageAccountId,
        parameters: &StorageAccountCreateParameters,
    ) -> Result<(), ArmError> {
        let request =
            ArmRequest::put(id.id(), API_VERSION, json_body(parameters)?).expect(&[200, 202]);
        self.client.send_and_poll(request).await?;
        Ok(())
    }

    pub async fn update(
        &self,
        id: &StorageAccountId,
        parameters: &StorageAccountUpdateParameters,
    ) -> Result<StorageAccount, ArmError> {
        let request = ArmRequest::patch(id.id(), API_VERSION, json_body(parameters)?).expect(&[200]);
        self.client.send(request).await?.into_model()
    }

    pub async fn delete(&self, id: &StorageAccountId) -> Result<(), ArmError> {
        self.client
            .send(ArmRequest::delete(id.id(), API_VERSION).expect(&[200, 204]))
            .await?;
        Ok(())
    }

    pub async fn list_keys(&self, id: &StorageAccountId) -> Result<Vec<StorageAccountKey>, ArmError> {
        let path = format!("{}/listKeys", id.id());
        let result: ListKeysResult = self
            .client
            .send(ArmRequest::post(path, API_VERSION, None).expect(&[200]))
            .await?
            .into_model()?;
        Ok(result.keys)
    }

    pub async fn list_by_resource_group(
        &self,
        id: &ResourceGroupId,
    ) -> Result<Vec<StorageAccount>, ArmError> {
        let path = format!("{}/providers/Microsoft.Storage/storageAccounts", id.id());
        self.client.list_all(&path, API_VERSION).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sku_name_parts() {
        let sku = SkuName::from_parts("Standard", "RAGRS");
        assert_eq!(sku, SkuName::StandardRagrs);
        assert_eq!(sku.parts(), Some(("Standard", "RAGRS")));
        assert_eq!(SkuName::from("premium_lrs"), SkuName::PremiumLrs);
    }

    #[test]
    fn test_storage_account_deserialization() {
        let json = r#"{
            "id": "/subscriptions/sub1/resourceGroups/rg1/providers/Microsoft.Storage/storageAccounts/acc1",
            "name": "acc1",
            "location": "westeurope",
            "kind": "StorageV2",
            "sku": {"name": "Standard_LRS", "tier": "Standard"},
            "properties": {
                "accessTier": "Hot",
                "supportsHttpsTrafficOnly": true,
                "minimumTlsVersion": "TLS1_2",
                "primaryEndpoints": {"blob": "https://acc1.blob.core.windows.net/"},
                "provisioningState": "Succeeded"
            }
        }"#;
        let account: StorageAccount = serde_json::from_str(json).unwrap();
        assert_eq!(account.kind, Some(Kind::StorageV2));
        assert_eq!(account.sku.unwrap().name, SkuName::StandardLrs);
        let properties = account.properties.unwrap();
        assert_eq!(properties.minimum_tls_version, Some(MinimumTlsVersion::Tls1_2));
        assert_eq!(
            properties.primary_endpoints.unwrap().blob.as_deref(),
            Some("https://acc1.blob.core.windows.net/")
        );
    }

    #[test]
    fn test_update_parameters_only_send_set_fields() {
        let parameters = StorageAccountUpdateParameters {
            properties: Some(StorageAccountMutableProperties {
                access_tier: Some(AccessTier::Cool),
                ..Default::default()
            }),
            ..Default::default()
        };
        let value = serde_json::to_value(&parameters).unwrap();
        assert_eq!(value, serde_json::json!({"properties": {"accessTier": "Cool"}}));
    }
}
