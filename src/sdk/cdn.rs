//! Front Door (Standard/Premium) rules.
//!
//! Rule conditions and actions are polymorphic on the wire: each element
//! carries a `name` discriminator and a `parameters` object whose shape
//! depends on it. Kinds this crate doesn't model are kept as raw JSON so a
//! read-modify-write cycle never drops them.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::arm::{ArmClient, ArmError, ArmRequest, json_body};
use crate::resourceids::{FrontDoorRuleId, FrontDoorRuleSetId, ResourceId};

pub const API_VERSION: &str = "2024-02-01";

arm_enum! {
    pub enum MatchProcessingBehavior {
        Continue => "Continue",
        Stop => "Stop",
    }
}

arm_enum! {
    pub enum RedirectType {
        Found => "Found",
        Moved => "Moved",
        PermanentRedirect => "PermanentRedirect",
        TemporaryRedirect => "TemporaryRedirect",
    }
}

arm_enum! {
    pub enum DestinationProtocol {
        Http => "Http",
        Https => "Https",
        MatchRequest => "MatchRequest",
    }
}

arm_enum! {
    pub enum HeaderAction {
        Append => "Append",
        Delete => "Delete",
        Overwrite => "Overwrite",
    }
}

arm_enum! {
    pub enum ForwardingProtocol {
        HttpOnly => "HttpOnly",
        HttpsOnly => "HttpsOnly",
        MatchRequest => "MatchRequest",
    }
}

arm_enum! {
    pub enum Transform {
        Lowercase => "Lowercase",
        RemoveNulls => "RemoveNulls",
        Trim => "Trim",
        Uppercase => "Uppercase",
        UrlDecode => "UrlDecode",
        UrlEncode => "UrlEncode",
    }
}

pub const REQUEST_METHOD_CONDITION: &str = "DeliveryRuleRequestMethodConditionParameters";
pub const URL_PATH_CONDITION: &str = "DeliveryRuleUrlPathMatchConditionParameters";
pub const REQUEST_HEADER_CONDITION: &str = "DeliveryRuleRequestHeaderConditionParameters";
pub const URL_REDIRECT_ACTION: &str = "DeliveryRuleUrlRedirectActionParameters";
pub const HEADER_ACTION: &str = "DeliveryRuleHeaderActionParameters";
pub const ROUTE_CONFIGURATION_OVERRIDE_ACTION: &str =
    "DeliveryRuleRouteConfigurationOverrideActionParameters";

/// Parameters shared by the match conditions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchConditionParameters {
    pub type_name: String,
    pub operator: String,
    #[serde(default)]
    pub negate_condition: bool,
    #[serde(default)]
    pub match_values: Vec<String>,
    #[serde(default)]
    pub transforms: Vec<Transform>,
    /// Header name for `RequestHeader` conditions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DeliveryRuleCondition {
    RequestMethod(MatchConditionParameters),
    UrlPath(MatchConditionParameters),
    RequestHeader(MatchConditionParameters),
    Raw(Value),
}

impl DeliveryRuleCondition {
    pub fn name(&self) -> &str {
        match self {
            DeliveryRuleCondition::RequestMethod(_) => "RequestMethod",
            DeliveryRuleCondition::UrlPath(_) => "UrlPath",
            DeliveryRuleCondition::RequestHeader(_) => "RequestHeader",
            DeliveryRuleCondition::Raw(value) => {
                value.get("name").and_then(Value::as_str).unwrap_or_default()
            }
        }
    }
}

impl Serialize for DeliveryRuleCondition {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let parameters = match self {
            DeliveryRuleCondition::RequestMethod(p)
            | DeliveryRuleCondition::UrlPath(p)
            | DeliveryRuleCondition::RequestHeader(p) => p,
            DeliveryRuleCondition::Raw(value) => return value.serialize(serializer),
        };
        tagged(self.name(), parameters)
            .map_err(serde::ser::Error::custom)?
            .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for DeliveryRuleCondition {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        let Some((name, parameters)) = discriminator(&value) else {
            return Ok(DeliveryRuleCondition::Raw(value));
        };

        let decode = |p: Value| serde_json::from_value(p).map_err(D::Error::custom);
        match name.as_str() {
            "RequestMethod" => Ok(DeliveryRuleCondition::RequestMethod(decode(parameters)?)),
            "UrlPath" => Ok(DeliveryRuleCondition::UrlPath(decode(parameters)?)),
            "RequestHeader" => Ok(DeliveryRuleCondition::RequestHeader(decode(parameters)?)),
            _ => Ok(DeliveryRuleCondition::Raw(value)),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UrlRedirectActionParameters {
    pub type_name: String,
    pub redirect_type: Option<RedirectType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination_protocol: Option<DestinationProtocol>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_hostname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_query_string: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_fragment: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeaderActionParameters {
    pub type_name: String,
    pub header_action: Option<HeaderAction>,
    pub header_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceReference {
    pub id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OriginGroupOverride {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin_group: Option<ResourceReference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forwarding_protocol: Option<ForwardingProtocol>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheConfiguration {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_string_caching_behavior: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_parameters: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_compression_enabled: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_behavior: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_duration: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteConfigurationOverrideActionParameters {
    pub type_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin_group_override: Option<OriginGroupOverride>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_configuration: Option<CacheConfiguration>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DeliveryRuleAction {
    UrlRedirect(UrlRedirectActionParameters),
    ModifyResponseHeader(HeaderActionParameters),
    RouteConfigurationOverride(RouteConfigurationOverrideActionParameters),
    Raw(Value),
}

impl DeliveryRuleAction {
    pub fn name(&self) -> &str {
        match self {
            DeliveryRuleAction::UrlRedirect(_) => "UrlRedirect",
            DeliveryRuleAction::ModifyResponseHeader(_) => "ModifyResponseHeader",
            DeliveryRuleAction::RouteConfigurationOverride(_) => "RouteConfigurationOverride",
            DeliveryRuleAction::Raw(value) => {
                value.get("name").and_then(Value::as_str).unwrap_or_default()
            }
        }
    }
}

impl Serialize for DeliveryRuleAction {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let tagged_value = match self {
            DeliveryRuleAction::UrlRedirect(p) => tagged(self.name(), p),
            DeliveryRuleAction::ModifyResponseHeader(p) => tagged(self.name(), p),
            DeliveryRuleAction::RouteConfigurationOverride(p) => tagged(self.name(), p),
            DeliveryRuleAction::Raw(value) => return value.serialize(serializer),
        };
        tagged_value
            .map_err(serde::ser::Error::custom)?
            .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for DeliveryRuleAction {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        let Some((name, parameters)) = discriminator(&value) else {
            return Ok(DeliveryRuleAction::Raw(value));
        };

        match name.as_str() {
            "UrlRedirect" => serde_json::from_value(parameters)
                .map(DeliveryRuleAction::UrlRedirect)
                .map_err(D::Error::custom),
            "ModifyResponseHeader" => serde_json::from_value(parameters)
                .map(DeliveryRuleAction::ModifyResponseHeader)
                .map_err(D::Error::custom),
            "RouteConfigurationOverride" => serde_json::from_value(parameters)
                .map(DeliveryRuleAction::RouteConfigurationOverride)
                .map_err(D::Error::custom),
            _ => Ok(DeliveryRuleAction::Raw(value)),
        }
    }
}

/// `{"name": ..., "parameters": ...}` for a typed variant.
fn tagged<T: Serialize>(name: &str, parameters: &T) -> Result<Value, serde_json::Error> {
    let mut object = Map::new();
    object.insert("name".to_string(), Value::String(name.to_string()));
    object.insert("parameters".to_string(), serde_json::to_value(parameters)?);
    Ok(Value::Object(object))
}

fn discriminator(value: &Value) -> Option<(String, Value)> {
    let name = value.get("name")?.as_str()?.to_string();
    let parameters = value.get("parameters").cloned().unwrap_or(Value::Null);
    Some((name, parameters))
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<RuleProperties>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule_set_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditions: Option<Vec<DeliveryRuleCondition>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actions: Option<Vec<DeliveryRuleAction>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_processing_behavior: Option<MatchProcessingBehavior>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provisioning_state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployment_status: Option<String>,
}

/// PATCH body; only the fields that changed are set.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RuleUpdateParameters {
    pub properties: RuleUpdateProperties,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleUpdateProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conditions: Option<Vec<DeliveryRuleCondition>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actions: Option<Vec<DeliveryRuleAction>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_processing_behavior: Option<MatchProcessingBehavior>,
}

#[derive(Debug, Clone)]
pub struct RulesClient {
    client: ArmClient,
}

impl RulesClient {
    pub fn new(client: ArmClient) -> Self {
        Self { client }
    }

    pub async fn get(&self, id: &FrontDoorRuleId) -> Result<Rule, ArmError> {
        self.client.get_model(&id.id(), API_VERSION).await
    }

    pub async fn create_then_poll(&self, id: &FrontDoorRuleId, rule: &Rule) -> Result<(), ArmError> {
        let request = ArmRequest::put(id.id(), API_VERSION, json_body(rule)?).expect(&[200, 201]);
        self.client.send_and_poll(request).await?;
        Ok(())
    }

    pub async fn update_then_poll(
        &self,
        id: &FrontDoorRuleId,
        parameters: &RuleUpdateParameters,
    ) -> Result<(), ArmError> {
        let request = ArmRequest::patch(id.id(), API_VERSION, json_body(parameters)?);
        self.client.send_and_poll(request).await?;
        Ok(())
    }

    pub async fn delete_then_poll(&self, id: &FrontDoorRuleId) -> Result<(), ArmError> {
        self.client
            .send_and_poll(ArmRequest::delete(id.id(), API_VERSION))
            .await?;
        Ok(())
    }

    pub async fn list_by_rule_set(&self, id: &FrontDoorRuleSetId) -> Result<Vec<Rule>, ArmError> {
        let path = format!("{}/rules", id.id());
        self.client.list_all(&path, API_VERSION).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_condition_decodes_by_discriminator() {
        let value = json!({
            "name": "RequestHeader",
            "parameters": {
                "typeName": REQUEST_HEADER_CONDITION,
                "operator": "Equal",
                "selector": "X-Forwarded-Host",
                "matchValues": ["contoso.com"],
                "transforms": ["Lowercase"]
            }
        });
        let condition: DeliveryRuleCondition = serde_json::from_value(value).unwrap();
        match condition {
            DeliveryRuleCondition::RequestHeader(p) => {
                assert_eq!(p.selector.as_deref(), Some("X-Forwarded-Host"));
                assert_eq!(p.transforms, vec![Transform::Lowercase]);
                assert!(!p.negate_condition);
            }
            other => panic!("unexpected condition: {:?}", other),
        }
    }

    #[test]
    fn test_unknown_condition_is_kept_verbatim() {
        let value = json!({
            "name": "SslProtocol",
            "parameters": {"typeName": "DeliveryRuleSslProtocolConditionParameters", "operator": "Equal", "matchValues": ["TLSv1.2"]}
        });
        let condition: DeliveryRuleCondition = serde_json::from_value(value.clone()).unwrap();
        assert_eq!(condition.name(), "SslProtocol");
        assert_eq!(serde_json::to_value(&condition).unwrap(), value);
    }

    #[test]
    fn test_action_serializes_with_name_and_parameters() {
        let action = DeliveryRuleAction::ModifyResponseHeader(HeaderActionParameters {
            type_name: HEADER_ACTION.to_string(),
            header_action: Some(HeaderAction::Overwrite),
            header_name: "Cache-Control".to_string(),
            value: Some("no-store".to_string()),
        });
        let value = serde_json::to_value(&action).unwrap();
        assert_eq!(value["name"], "ModifyResponseHeader");
        assert_eq!(value["parameters"]["headerAction"], "Overwrite");
        assert_eq!(value["parameters"]["typeName"], HEADER_ACTION);
    }

    #[test]
    fn test_known_action_with_bad_parameters_fails() {
        let value = json!({"name": "UrlRedirect", "parameters": {"typeName": 7}});
        let result: Result<DeliveryRuleAction, _> = serde_json::from_value(value);
        assert!(result.is_err());
    }

    #[test]
    fn test_element_without_discriminator_is_raw() {
        let value = json!({"parameters": {}});
        let action: DeliveryRuleAction = serde_json::from_value(value.clone()).unwrap();
        assert_eq!(action, DeliveryRuleAction::Raw(value));
    }

    #[test]
    fn test_rule_properties_round_trip_preserves_mixed_actions() {
        let json = json!({
            "properties": {
                "order": 1,
                "matchProcessingBehavior": "Continue",
                "actions": [
                    {"name": "UrlRewrite", "parameters": {"typeName": "DeliveryRuleUrlRewriteActionParameters", "sourcePattern": "/", "destination": "/index.html"}},
                    {"name": "UrlRedirect", "parameters": {"typeName": URL_REDIRECT_ACTION, "redirectType": "Found", "destinationProtocol": "Https"}}
                ]
            }
        });
        let rule: Rule = serde_json::from_value(json.clone()).unwrap();
        let actions = rule.properties.as_ref().unwrap().actions.as_ref().unwrap();
        assert!(matches!(actions[0], DeliveryRuleAction::Raw(_)));
        assert!(matches!(actions[1], DeliveryRuleAction::UrlRedirect(_)));
        assert_eq!(serde_json::to_value(&rule).unwrap(), json);
    }
}
