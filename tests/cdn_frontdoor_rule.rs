mod common;

use azurerm::acceptance::{ResourceTest, TestStep, check};
use azurerm::definition::{self, Definition};
use azurerm::state::StateFile;
use common::{FakeArm, resource_group_id};
use serde_json::{Value, json};

fn rule_set_id() -> String {
    format!(
        "{}/providers/Microsoft.Cdn/profiles/acctestprofile/ruleSets/acctestruleset",
        resource_group_id("acctestRG-cdn")
    )
}

fn config(rule: Value) -> String {
    let mut rule = rule;
    if let Some(rule) = rule.as_object_mut() {
        rule.entry("name").or_insert(json!("redirectrule"));
        rule.entry("cdn_frontdoor_rule_set_id").or_insert(json!(rule_set_id()));
        rule.entry("order").or_insert(json!(1));
    }
    json!({"resource": {"azurerm_cdn_frontdoor_rule": {"test": rule}}}).to_string()
}

fn redirect_actions() -> Value {
    json!({
        "url_redirect_action": {
            "redirect_type": "PermanentRedirect",
            "destination_hostname": "contoso.com",
        }
    })
}

const ADDRESS: &str = "azurerm_cdn_frontdoor_rule.test";

#[tokio::test]
async fn test_frontdoor_rule_lifecycle() {
    let arm = FakeArm::start().await;
    let provider = arm.provider();
    let mut state = StateFile::new();

    let definition = Definition::from_json(&config(json!({
        "actions": redirect_actions(),
        "conditions": {
            "request_method_condition": {"match_values": ["GET", "POST"]}
        }
    })))
    .unwrap();
    definition::apply(&provider, &definition, &mut state).await.unwrap();

    let rule_id = format!("{}/rules/redirectrule", rule_set_id());
    let stored = arm.get(&rule_id).unwrap();
    assert_eq!(stored["properties"]["order"], 1);
    assert_eq!(stored["properties"]["matchProcessingBehavior"], "Continue");
    assert_eq!(stored["properties"]["actions"][0]["name"], "UrlRedirect");
    assert_eq!(stored["properties"]["conditions"][0]["name"], "RequestMethod");

    let attributes = state.get_address(ADDRESS).unwrap().flatmap();
    assert_eq!(attributes["cdn_frontdoor_rule_set_name"], "acctestruleset");
    assert_eq!(attributes["behavior_on_match"], "Continue");
    assert_eq!(attributes["actions.0.url_redirect_action.0.destination_hostname"], "contoso.com");
    assert_eq!(attributes["actions.0.url_redirect_action.0.redirect_protocol"], "MatchRequest");
    assert_eq!(attributes["conditions.0.request_method_condition.0.match_values.#"], "2");

    let definition = Definition::from_json(&config(json!({
        "order": 2,
        "behavior_on_match": "Stop",
        "actions": redirect_actions(),
        "conditions": {
            "request_method_condition": {"match_values": ["GET", "POST"]}
        }
    })))
    .unwrap();
    let summary = definition::apply(&provider, &definition, &mut state).await.unwrap();
    assert_eq!(summary.changed, 1);

    let stored = arm.get(&rule_id).unwrap();
    assert_eq!(stored["properties"]["order"], 2);
    assert_eq!(stored["properties"]["matchProcessingBehavior"], "Stop");
    assert!(arm.requests().await.iter().any(|r| r.starts_with("PATCH ")));

    definition::destroy(&provider, &mut state).await.unwrap();
    assert!(!arm.contains(&rule_id));
}

fn origin_group_id() -> String {
    format!(
        "{}/providers/Microsoft.Cdn/profiles/acctestprofile/originGroups/acctestgroup",
        resource_group_id("acctestRG-cdn")
    )
}

#[tokio::test]
async fn test_frontdoor_rule_route_override_without_caching() {
    let arm = FakeArm::start().await;
    const OVERRIDE: &str = "actions.0.route_configuration_override_action.0";

    ResourceTest::new(arm.provider())
        .step(TestStep::apply(
            config(json!({
                "actions": {
                    "route_configuration_override_action": {
                        "cdn_frontdoor_origin_group_id": origin_group_id(),
                        "forwarding_protocol": "HttpsOnly",
                    }
                }
            })),
            vec![
                check::that(ADDRESS).exists_in_azure(),
                check::that(ADDRESS)
                    .key(&format!("{}.forwarding_protocol", OVERRIDE))
                    .has_value("HttpsOnly"),
                check::that(ADDRESS)
                    .key(&format!("{}.cdn_frontdoor_origin_group_id", OVERRIDE))
                    .has_value(origin_group_id()),
                check::that(ADDRESS).key(&format!("{}.cache_behavior", OVERRIDE)).is_empty(),
            ],
        ))
        .step(TestStep::apply(
            config(json!({
                "actions": {
                    "route_configuration_override_action": {
                        "cdn_frontdoor_origin_group_id": origin_group_id(),
                        "forwarding_protocol": "HttpsOnly",
                        "cache_behavior": "Disabled",
                    }
                }
            })),
            vec![check::that(ADDRESS).key(&format!("{}.cache_behavior", OVERRIDE)).is_empty()],
        ))
        .step(TestStep::import(ADDRESS))
        .run()
        .await
        .unwrap();

    let rule_id = format!("{}/rules/redirectrule", rule_set_id());
    assert!(!arm.contains(&rule_id));
}

#[tokio::test]
async fn test_frontdoor_rule_requires_an_action() {
    let arm = FakeArm::start().await;

    ResourceTest::new(arm.provider())
        .step(TestStep::expect_error(
            config(json!({"actions": {}})),
            "the 'actions' match block must contain at least one match action",
        ))
        .run()
        .await
        .unwrap();
}

#[tokio::test]
async fn test_frontdoor_rule_invalid_request_method() {
    let arm = FakeArm::start().await;

    ResourceTest::new(arm.provider())
        .step(TestStep::expect_error(
            config(json!({
                "actions": redirect_actions(),
                "conditions": {"request_method_condition": {"match_values": ["FETCH"]}}
            })),
            "FETCH",
        ))
        .run()
        .await
        .unwrap();

    assert!(arm.requests().await.is_empty());
}
