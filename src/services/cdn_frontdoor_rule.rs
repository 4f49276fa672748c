use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value, json};
use tracing::{debug, info};

use super::string_list;
use crate::arm::OptionalExt;
use crate::clients::Clients;
use crate::resource::{Resource, ResourceError};
use crate::resourceids::{FrontDoorRuleId, FrontDoorRuleSetId, ResourceId, ResourceIdError};
use crate::schema::{
    Attribute, AttributeType, Schema, Validator, int_at_least, resource_id, string_in_slice,
    string_is_not_empty, string_list_in_slice,
};
use crate::sdk::cdn::{
    CacheConfiguration, DeliveryRuleAction, DeliveryRuleCondition, DestinationProtocol,
    ForwardingProtocol, HEADER_ACTION, HeaderAction, HeaderActionParameters,
    MatchConditionParameters, MatchProcessingBehavior, OriginGroupOverride, REQUEST_HEADER_CONDITION,
    REQUEST_METHOD_CONDITION, ROUTE_CONFIGURATION_OVERRIDE_ACTION, RedirectType, ResourceReference,
    RouteConfigurationOverrideActionParameters, Rule, RuleProperties, RuleUpdateParameters,
    RuleUpdateProperties, Transform, URL_PATH_CONDITION, URL_REDIRECT_ACTION,
    UrlRedirectActionParameters,
};
use crate::state::ResourceData;

pub struct CdnFrontDoorRuleResource;

const TYPE_NAME: &str = "azurerm_cdn_frontdoor_rule";

const MAX_CONDITIONS: usize = 10;
const MAX_ACTIONS: usize = 5;

const OPERATOR_ANY: &str = "Any";

const REQUEST_METHODS: &[&str] = &["GET", "POST", "PUT", "DELETE", "HEAD", "OPTIONS", "TRACE"];

const HEADER_OPERATORS: &[&str] = &[
    "Any",
    "Equal",
    "Contains",
    "BeginsWith",
    "EndsWith",
    "LessThan",
    "LessThanOrEqual",
    "GreaterThan",
    "GreaterThanOrEqual",
    "RegEx",
];

const URL_PATH_OPERATORS: &[&str] = &[
    "Any",
    "Equal",
    "Contains",
    "BeginsWith",
    "EndsWith",
    "LessThan",
    "LessThanOrEqual",
    "GreaterThan",
    "GreaterThanOrEqual",
    "RegEx",
    "Wildcard",
];

const QUERY_STRING_CACHING_BEHAVIORS: &[&str] = &[
    "IgnoreQueryString",
    "UseQueryString",
    "IgnoreSpecifiedQueryStrings",
    "IncludeSpecifiedQueryStrings",
];

const CACHE_BEHAVIORS: &[&str] = &["HonorOrigin", "OverrideAlways", "OverrideIfOriginMissing", "Disabled"];

/// `Disabled` is sent as "no cache configuration", so it is stored as unset.
fn cache_behavior_state(value: &Value) -> Value {
    match value.as_str() {
        Some("Disabled") => Value::Null,
        _ => value.clone(),
    }
}

fn rule_name() -> Validator {
    Arc::new(|value: &Value, key: &str| {
        let Some(name) = value.as_str() else {
            return Vec::new();
        };
        let mut chars = name.chars();
        let valid = name.len() <= 260
            && chars.next().is_some_and(|c| c.is_ascii_alphabetic())
            && chars.all(|c| c.is_ascii_alphanumeric());
        if valid {
            Vec::new()
        } else {
            vec![format!(
                "{:?} must be between 1 and 260 characters in length, begin with a letter and may contain only letters and numbers, got {:?}",
                key, name
            )]
        }
    })
}

fn negate_condition() -> Attribute {
    Attribute::optional(AttributeType::Bool).default(false)
}

fn transforms() -> Attribute {
    Attribute::optional(AttributeType::string_list())
        .validate(string_list_in_slice(Transform::possible_values()))
}

fn conditions_schema() -> Schema {
    Schema::new()
        .attribute(
            "request_method_condition",
            Attribute::optional(AttributeType::Block(
                Schema::new()
                    .attribute(
                        "operator",
                        Attribute::optional(AttributeType::String)
                            .default("Equal")
                            .validate(string_in_slice(&["Equal"], false)),
                    )
                    .attribute("negate_condition", negate_condition())
                    .attribute(
                        "match_values",
                        Attribute::required(AttributeType::string_list())
                            .validate(string_list_in_slice(REQUEST_METHODS)),
                    ),
            )),
        )
        .attribute(
            "url_path_condition",
            Attribute::optional(AttributeType::Block(
                Schema::new()
                    .attribute(
                        "operator",
                        Attribute::required(AttributeType::String)
                            .validate(string_in_slice(URL_PATH_OPERATORS, false)),
                    )
                    .attribute("negate_condition", negate_condition())
                    .attribute("match_values", Attribute::optional(AttributeType::string_list()))
                    .attribute("transforms", transforms()),
            )),
        )
        .attribute(
            "request_header_condition",
            Attribute::optional(AttributeType::Block(
                Schema::new()
                    .attribute(
                        "header_name",
                        Attribute::required(AttributeType::String).validate(string_is_not_empty()),
                    )
                    .attribute(
                        "operator",
                        Attribute::required(AttributeType::String)
                            .validate(string_in_slice(HEADER_OPERATORS, false)),
                    )
                    .attribute("negate_condition", negate_condition())
                    .attribute("match_values", Attribute::optional(AttributeType::string_list()))
                    .attribute("transforms", transforms()),
            )),
        )
}

fn actions_schema() -> Schema {
    Schema::new()
        .attribute(
            "url_redirect_action",
            Attribute::optional(AttributeType::Block(
                Schema::new()
                    .attribute(
                        "redirect_type",
                        Attribute::required(AttributeType::String)
                            .validate(string_in_slice(RedirectType::possible_values(), false)),
                    )
                    .attribute(
                        "redirect_protocol",
                        Attribute::optional(AttributeType::String)
                            .default(DestinationProtocol::MatchRequest.as_str())
                            .validate(string_in_slice(
                                DestinationProtocol::possible_values(),
                                false,
                            )),
                    )
                    .attribute(
                        "destination_path",
                        Attribute::optional(AttributeType::String).default(""),
                    )
                    .attribute(
                        "destination_hostname",
                        Attribute::required(AttributeType::String),
                    )
                    .attribute("query_string", Attribute::optional(AttributeType::String).default(""))
                    .attribute(
                        "destination_fragment",
                        Attribute::optional(AttributeType::String).default(""),
                    ),
            ))
            .max_items(1),
        )
        .attribute(
            "response_header_action",
            Attribute::optional(AttributeType::Block(
                Schema::new()
                    .attribute(
                        "header_action",
                        Attribute::required(AttributeType::String)
                            .validate(string_in_slice(HeaderAction::possible_values(), false)),
                    )
                    .attribute(
                        "header_name",
                        Attribute::required(AttributeType::String).validate(string_is_not_empty()),
                    )
                    .attribute("value", Attribute::optional(AttributeType::String)),
            )),
        )
        .attribute(
            "route_configuration_override_action",
            Attribute::optional(AttributeType::Block(
                Schema::new()
                    .attribute(
                        "cdn_frontdoor_origin_group_id",
                        Attribute::optional(AttributeType::String).validate(string_is_not_empty()),
                    )
                    .attribute(
                        "forwarding_protocol",
                        Attribute::optional(AttributeType::String).validate(string_in_slice(
                            ForwardingProtocol::possible_values(),
                            false,
                        )),
                    )
                    .attribute(
                        "query_string_caching_behavior",
                        Attribute::optional(AttributeType::String)
                            .validate(string_in_slice(QUERY_STRING_CACHING_BEHAVIORS, false)),
                    )
                    .attribute(
                        "query_string_parameters",
                        Attribute::optional(AttributeType::string_list()),
                    )
                    .attribute("compression_enabled", Attribute::optional(AttributeType::Bool))
                    .attribute(
                        "cache_behavior",
                        Attribute::optional(AttributeType::String)
                            .validate(string_in_slice(CACHE_BEHAVIORS, false))
                            .state_func(cache_behavior_state),
                    )
                    .attribute("cache_duration", Attribute::optional(AttributeType::String)),
            ))
            .max_items(1),
        )
}

#[async_trait]
impl Resource for CdnFrontDoorRuleResource {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> Schema {
        Schema::new()
            .attribute(
                "name",
                Attribute::required(AttributeType::String)
                    .force_new()
                    .validate(rule_name()),
            )
            .attribute(
                "cdn_frontdoor_rule_set_id",
                Attribute::required(AttributeType::String)
                    .force_new()
                    .validate(resource_id::<FrontDoorRuleSetId>()),
            )
            .attribute(
                "behavior_on_match",
                Attribute::optional(AttributeType::String)
                    .default(MatchProcessingBehavior::Continue.as_str())
                    .validate(string_in_slice(MatchProcessingBehavior::possible_values(), false)),
            )
            .attribute(
                "order",
                Attribute::required(AttributeType::Int).validate(int_at_least(0)),
            )
            .attribute(
                "actions",
                Attribute::required(AttributeType::Block(actions_schema())).max_items(1),
            )
            .attribute(
                "conditions",
                Attribute::optional(AttributeType::Block(conditions_schema())).max_items(1),
            )
            .attribute(
                "cdn_frontdoor_rule_set_name",
                Attribute::computed(AttributeType::String),
            )
    }

    fn validate_import_id(&self, id: &str) -> Result<(), ResourceIdError> {
        FrontDoorRuleId::parse(id).map(|_| ())
    }

    async fn create(&self, clients: &Clients, data: &mut ResourceData) -> Result<(), ResourceError> {
        let rule_set_id = FrontDoorRuleSetId::parse(&data.get_string("cdn_frontdoor_rule_set_id"))?;
        let id = rule_set_id.rule(data.get_string("name"));

        let existing = clients
            .frontdoor_rules
            .get(&id)
            .await
            .optional()
            .map_err(|e| ResourceError::api(&format!("checking for existing {}", id), e))?;
        if existing.is_some() {
            return Err(ResourceError::already_exists(TYPE_NAME, id.id()));
        }

        let actions = expand_actions(&data.get_list("actions"))
            .map_err(|e| ResourceError::context("expanding 'actions'", e))?;
        let conditions = expand_conditions(&data.get_list("conditions"))
            .map_err(|e| ResourceError::context("expanding 'conditions'", e))?;

        let rule = Rule {
            properties: Some(RuleProperties {
                rule_set_name: Some(rule_set_id.rule_set_name.clone()),
                order: data.get_i64("order"),
                conditions: Some(conditions),
                actions: Some(actions),
                match_processing_behavior: data
                    .get_str("behavior_on_match")
                    .map(MatchProcessingBehavior::from),
                ..RuleProperties::default()
            }),
            ..Rule::default()
        };

        info!(id = %id.id(), "Creating Front Door rule");
        clients
            .frontdoor_rules
            .create_then_poll(&id, &rule)
            .await
            .map_err(|e| ResourceError::api(&format!("creating {}", id), e))?;

        data.set_id(id.id());
        Ok(())
    }

    async fn read(&self, clients: &Clients, data: &mut ResourceData) -> Result<(), ResourceError> {
        let id = FrontDoorRuleId::parse_insensitively(data.id())?;
        let rule_set = id.rule_set();

        let Some(rule) = clients
            .frontdoor_rules
            .get(&id)
            .await
            .optional()
            .map_err(|e| ResourceError::api(&format!("retrieving {}", id), e))?
        else {
            debug!(id = %id.id(), "Front Door rule was not found - removing from state");
            data.set_id("");
            return Ok(());
        };

        data.set("name", id.rule_name.clone());
        data.set("cdn_frontdoor_rule_set_id", rule_set.id());
        // The API doesn't return the rule set name.
        data.set("cdn_frontdoor_rule_set_name", rule_set.rule_set_name.clone());

        if let Some(props) = rule.properties {
            data.set(
                "behavior_on_match",
                props
                    .match_processing_behavior
                    .unwrap_or(MatchProcessingBehavior::Continue)
                    .as_str()
                    .to_string(),
            );
            data.set("order", props.order.unwrap_or_default());

            let actions = flatten_actions(props.actions.as_deref().unwrap_or_default())
                .map_err(|e| ResourceError::context("setting 'actions'", e))?;
            data.set("actions", actions);

            let conditions = flatten_conditions(props.conditions.as_deref().unwrap_or_default())
                .map_err(|e| ResourceError::context("setting 'conditions'", e))?;
            data.set("conditions", conditions);
        }
        Ok(())
    }

    async fn update(&self, clients: &Clients, data: &mut ResourceData) -> Result<(), ResourceError> {
        let id = FrontDoorRuleId::parse_insensitively(data.id())?;

        let mut properties = RuleUpdateProperties::default();
        if data.has_change("behavior_on_match") {
            properties.match_processing_behavior = data
                .get_str("behavior_on_match")
                .map(MatchProcessingBehavior::from);
        }
        if data.has_change("order") {
            properties.order = data.get_i64("order");
        }
        if data.has_change("actions") {
            let actions = expand_actions(&data.get_list("actions"))
                .map_err(|e| ResourceError::context("expanding 'actions'", e))?;
            properties.actions = Some(actions);
        }
        if data.has_change("conditions") {
            let conditions = expand_conditions(&data.get_list("conditions"))
                .map_err(|e| ResourceError::context("expanding 'conditions'", e))?;
            properties.conditions = Some(conditions);
        }

        info!(id = %id.id(), "Updating Front Door rule");
        clients
            .frontdoor_rules
            .update_then_poll(&id, &RuleUpdateParameters { properties })
            .await
            .map_err(|e| ResourceError::api(&format!("updating {}", id), e))?;
        Ok(())
    }

    async fn delete(&self, clients: &Clients, data: &mut ResourceData) -> Result<(), ResourceError> {
        let id = FrontDoorRuleId::parse_insensitively(data.id())?;

        info!(id = %id.id(), "Deleting Front Door rule");
        clients
            .frontdoor_rules
            .delete_then_poll(&id)
            .await
            .map_err(|e| ResourceError::api(&format!("deleting {}", id), e))?;
        Ok(())
    }

    async fn exists(&self, clients: &Clients, id: &str) -> Result<bool, ResourceError> {
        let id = FrontDoorRuleId::parse(id)?;
        let rule = clients
            .frontdoor_rules
            .get(&id)
            .await
            .optional()
            .map_err(|e| ResourceError::api(&format!("retrieving {}", id), e))?;
        Ok(rule.is_some())
    }
}

/// The nested blocks named `key` inside the first item of a `MaxItems: 1` block.
fn nested_blocks<'a>(outer: &'a [Value], key: &str) -> Vec<&'a Map<String, Value>> {
    outer
        .first()
        .and_then(|v| v.get(key))
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_object)
        .collect()
}

fn str_field<'a>(block: &'a Map<String, Value>, key: &str) -> &'a str {
    block.get(key).and_then(Value::as_str).unwrap_or_default()
}

fn bool_field(block: &Map<String, Value>, key: &str) -> bool {
    block.get(key).and_then(Value::as_bool).unwrap_or_default()
}

fn list_field(block: &Map<String, Value>, key: &str) -> Vec<String> {
    block
        .get(key)
        .and_then(Value::as_array)
        .map(|items| string_list(items))
        .unwrap_or_default()
}

fn optional_string(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

fn validate_operator(config_name: &str, operator: &str, match_values: &[String]) -> Result<(), String> {
    if operator.is_empty() {
        return Err(format!(
            "{:?} is invalid: no 'operator' value has been set, got {:?}",
            config_name, operator
        ));
    }
    if operator == OPERATOR_ANY && !match_values.is_empty() {
        return Err(format!(
            "{:?} is invalid: the 'match_values' field must not be set if the conditions 'operator' is set to 'Any'",
            config_name
        ));
    }
    if operator != OPERATOR_ANY && match_values.is_empty() {
        return Err(format!(
            "{:?} is invalid: the 'match_values' field must be set if the conditions 'operator' is not set to 'Any'",
            config_name
        ));
    }
    Ok(())
}

fn expand_match_condition(
    config_name: &str,
    type_name: &str,
    block: &Map<String, Value>,
    selector: Option<String>,
) -> Result<MatchConditionParameters, String> {
    let operator = str_field(block, "operator");
    let match_values = list_field(block, "match_values");
    validate_operator(config_name, operator, &match_values)?;

    Ok(MatchConditionParameters {
        type_name: type_name.to_string(),
        operator: operator.to_string(),
        negate_condition: bool_field(block, "negate_condition"),
        match_values,
        transforms: list_field(block, "transforms")
            .iter()
            .map(|t| Transform::from(t.as_str()))
            .collect(),
        selector,
    })
}

fn expand_conditions(input: &[Value]) -> Result<Vec<DeliveryRuleCondition>, String> {
    let mut conditions = Vec::new();

    for block in nested_blocks(input, "request_method_condition") {
        let params =
            expand_match_condition("request_method_condition", REQUEST_METHOD_CONDITION, block, None)?;
        conditions.push(DeliveryRuleCondition::RequestMethod(params));
    }
    for block in nested_blocks(input, "url_path_condition") {
        let params = expand_match_condition("url_path_condition", URL_PATH_CONDITION, block, None)?;
        conditions.push(DeliveryRuleCondition::UrlPath(params));
    }
    for block in nested_blocks(input, "request_header_condition") {
        let selector = optional_string(str_field(block, "header_name"));
        let params = expand_match_condition(
            "request_header_condition",
            REQUEST_HEADER_CONDITION,
            block,
            selector,
        )?;
        conditions.push(DeliveryRuleCondition::RequestHeader(params));
    }

    if conditions.len() > MAX_CONDITIONS {
        return Err(format!(
            "the 'conditions' match block may only contain up to {} match conditions, got {}",
            MAX_CONDITIONS,
            conditions.len()
        ));
    }
    Ok(conditions)
}

fn expand_route_configuration_override(
    block: &Map<String, Value>,
) -> Result<RouteConfigurationOverrideActionParameters, String> {
    let origin_group_id = str_field(block, "cdn_frontdoor_origin_group_id");
    let forwarding_protocol = str_field(block, "forwarding_protocol");

    let origin_group_override = match (origin_group_id.is_empty(), forwarding_protocol.is_empty()) {
        (true, true) => None,
        (true, false) => {
            return Err(
                "the 'route_configuration_override_action' block is not valid, if the 'forwarding_protocol' is set you must also set the 'cdn_frontdoor_origin_group_id'"
                    .to_string(),
            );
        }
        (false, _) => Some(OriginGroupOverride {
            origin_group: Some(ResourceReference {
                id: origin_group_id.to_string(),
            }),
            forwarding_protocol: Some(if forwarding_protocol.is_empty() {
                ForwardingProtocol::MatchRequest
            } else {
                ForwardingProtocol::from(forwarding_protocol)
            }),
        }),
    };

    let cache_behavior = str_field(block, "cache_behavior");
    let caching_behavior = str_field(block, "query_string_caching_behavior");
    let query_parameters = list_field(block, "query_string_parameters");

    let specified = matches!(
        caching_behavior,
        "IncludeSpecifiedQueryStrings" | "IgnoreSpecifiedQueryStrings"
    );
    if specified && query_parameters.is_empty() {
        return Err(format!(
            "the 'route_configuration_override_action' block is not valid, if the 'query_string_caching_behavior' is set to {:?} the 'query_string_parameters' must not be empty",
            caching_behavior
        ));
    }
    if !specified && !query_parameters.is_empty() {
        return Err(format!(
            "the 'route_configuration_override_action' block is not valid, if the 'query_string_caching_behavior' is set to {:?} the 'query_string_parameters' must be empty",
            caching_behavior
        ));
    }

    let cache_configuration = if cache_behavior.is_empty() || cache_behavior == "Disabled" {
        None
    } else {
        Some(CacheConfiguration {
            query_string_caching_behavior: optional_string(caching_behavior),
            query_parameters: (!query_parameters.is_empty()).then(|| query_parameters.join(",")),
            is_compression_enabled: Some(
                if bool_field(block, "compression_enabled") {
                    "Enabled"
                } else {
                    "Disabled"
                }
                .to_string(),
            ),
            cache_behavior: Some(cache_behavior.to_string()),
            cache_duration: optional_string(str_field(block, "cache_duration")),
        })
    };

    if origin_group_override.is_none() && cache_configuration.is_none() {
        return Err(
            "the 'route_configuration_override_action' block is not valid, it must configure an origin group override, caching or both"
                .to_string(),
        );
    }

    Ok(RouteConfigurationOverrideActionParameters {
        type_name: ROUTE_CONFIGURATION_OVERRIDE_ACTION.to_string(),
        origin_group_override,
        cache_configuration,
    })
}

fn expand_actions(input: &[Value]) -> Result<Vec<DeliveryRuleAction>, String> {
    let mut actions = Vec::new();

    for block in nested_blocks(input, "url_redirect_action") {
        actions.push(DeliveryRuleAction::UrlRedirect(UrlRedirectActionParameters {
            type_name: URL_REDIRECT_ACTION.to_string(),
            redirect_type: Some(RedirectType::from(str_field(block, "redirect_type"))),
            destination_protocol: Some(DestinationProtocol::from(str_field(
                block,
                "redirect_protocol",
            ))),
            custom_path: Some(str_field(block, "destination_path").to_string()),
            custom_hostname: Some(str_field(block, "destination_hostname").to_string()),
            custom_query_string: Some(str_field(block, "query_string").to_string()),
            custom_fragment: Some(str_field(block, "destination_fragment").to_string()),
        }));
    }
    for block in nested_blocks(input, "response_header_action") {
        actions.push(DeliveryRuleAction::ModifyResponseHeader(HeaderActionParameters {
            type_name: HEADER_ACTION.to_string(),
            header_action: Some(HeaderAction::from(str_field(block, "header_action"))),
            header_name: str_field(block, "header_name").to_string(),
            value: optional_string(str_field(block, "value")),
        }));
    }
    for block in nested_blocks(input, "route_configuration_override_action") {
        actions.push(DeliveryRuleAction::RouteConfigurationOverride(
            expand_route_configuration_override(block)?,
        ));
    }

    if actions.is_empty() {
        return Err("the 'actions' match block must contain at least one match action".to_string());
    }
    if actions.len() > MAX_ACTIONS {
        return Err(format!(
            "the 'actions' match block may only contain up to {} match actions, got {}",
            MAX_ACTIONS,
            actions.len()
        ));
    }
    Ok(actions)
}

fn flatten_match_condition(params: &MatchConditionParameters) -> Map<String, Value> {
    let mut block = Map::new();
    block.insert("operator".to_string(), json!(params.operator));
    block.insert("negate_condition".to_string(), json!(params.negate_condition));
    block.insert("match_values".to_string(), json!(params.match_values));
    block
}

fn flatten_conditions(input: &[DeliveryRuleCondition]) -> Result<Value, String> {
    if input.is_empty() {
        return Ok(json!([]));
    }

    let mut request_method = Vec::new();
    let mut url_path = Vec::new();
    let mut request_header = Vec::new();

    for condition in input {
        match condition {
            DeliveryRuleCondition::RequestMethod(params) => {
                request_method.push(Value::Object(flatten_match_condition(params)));
            }
            DeliveryRuleCondition::UrlPath(params) => {
                let mut block = flatten_match_condition(params);
                block.insert("transforms".to_string(), json!(params.transforms));
                url_path.push(Value::Object(block));
            }
            DeliveryRuleCondition::RequestHeader(params) => {
                let mut block = flatten_match_condition(params);
                block.insert("header_name".to_string(), json!(params.selector.clone().unwrap_or_default()));
                block.insert("transforms".to_string(), json!(params.transforms));
                request_header.push(Value::Object(block));
            }
            DeliveryRuleCondition::Raw(_) => {
                return Err(format!(
                    "unknown DeliveryRuleCondition {:?} encountered",
                    condition.name()
                ));
            }
        }
    }

    let mut conditions = Map::new();
    for (key, blocks) in [
        ("request_method_condition", request_method),
        ("url_path_condition", url_path),
        ("request_header_condition", request_header),
    ] {
        if !blocks.is_empty() {
            conditions.insert(key.to_string(), Value::Array(blocks));
        }
    }
    Ok(json!([conditions]))
}

fn flatten_actions(input: &[DeliveryRuleAction]) -> Result<Value, String> {
    let mut url_redirect = Vec::new();
    let mut response_header = Vec::new();
    let mut route_override = Vec::new();

    for action in input {
        match action {
            DeliveryRuleAction::UrlRedirect(params) => url_redirect.push(json!({
                "redirect_type": params.redirect_type.as_ref().map(RedirectType::as_str).unwrap_or_default(),
                "redirect_protocol": params
                    .destination_protocol
                    .as_ref()
                    .map(DestinationProtocol::as_str)
                    .unwrap_or(DestinationProtocol::MatchRequest.as_str()),
                "destination_path": params.custom_path.clone().unwrap_or_default(),
                "destination_hostname": params.custom_hostname.clone().unwrap_or_default(),
                "query_string": params.custom_query_string.clone().unwrap_or_default(),
                "destination_fragment": params.custom_fragment.clone().unwrap_or_default(),
            })),
            DeliveryRuleAction::ModifyResponseHeader(params) => {
                let mut block = Map::new();
                block.insert(
                    "header_action".to_string(),
                    json!(params.header_action.as_ref().map(HeaderAction::as_str).unwrap_or_default()),
                );
                block.insert("header_name".to_string(), json!(params.header_name));
                if let Some(value) = &params.value {
                    block.insert("value".to_string(), json!(value));
                }
                response_header.push(Value::Object(block));
            }
            DeliveryRuleAction::RouteConfigurationOverride(params) => {
                let mut block = Map::new();
                if let Some(origin) = &params.origin_group_override {
                    if let Some(group) = &origin.origin_group {
                        block.insert("cdn_frontdoor_origin_group_id".to_string(), json!(group.id));
                    }
                    if let Some(protocol) = &origin.forwarding_protocol {
                        block.insert("forwarding_protocol".to_string(), json!(protocol.as_str()));
                    }
                }
                // No cache configuration reads back as caching left unset.
                if let Some(cache) = &params.cache_configuration {
                    let parameters: Vec<&str> = cache
                        .query_parameters
                        .as_deref()
                        .map(|p| p.split(',').filter(|s| !s.is_empty()).collect())
                        .unwrap_or_default();
                    block.insert("query_string_parameters".to_string(), json!(parameters));
                    if let Some(behavior) = &cache.query_string_caching_behavior {
                        block.insert("query_string_caching_behavior".to_string(), json!(behavior));
                    }
                    block.insert(
                        "compression_enabled".to_string(),
                        json!(cache.is_compression_enabled.as_deref() == Some("Enabled")),
                    );
                    if let Some(behavior) = &cache.cache_behavior {
                        block.insert("cache_behavior".to_string(), json!(behavior));
                    }
                    if let Some(duration) = &cache.cache_duration {
                        block.insert("cache_duration".to_string(), json!(duration));
                    }
                }
                route_override.push(Value::Object(block));
            }
            DeliveryRuleAction::Raw(_) => {
                return Err(format!("unknown DeliveryRuleAction {:?} encountered", action.name()));
            }
        }
    }

    let mut actions = Map::new();
    for (key, blocks) in [
        ("url_redirect_action", url_redirect),
        ("response_header_action", response_header),
        ("route_configuration_override_action", route_override),
    ] {
        if !blocks.is_empty() {
            actions.insert(key.to_string(), Value::Array(blocks));
        }
    }
    Ok(json!([actions]))
}
