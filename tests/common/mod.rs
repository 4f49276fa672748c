//! An in-memory Azure Resource Manager backed by wiremock.
//!
//! PUT stores the body under the request path, GET returns it (or lists the
//! children of a collection path), PATCH merges, DELETE removes the object
//! and everything nested under it.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use azurerm::Provider;
use azurerm::arm::ArmClient;
use azurerm::auth::StaticTokenCredential;
use azurerm::config::{Features, ProviderConfig};
use serde_json::{Map, Value, json};
use wiremock::matchers::any;
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

pub const SUBSCRIPTION_ID: &str = "00000000-0000-0000-0000-000000000000";

type Objects = Arc<Mutex<BTreeMap<String, Value>>>;

pub struct FakeArm {
    pub server: MockServer,
    objects: Objects,
}

impl FakeArm {
    pub async fn start() -> Self {
        let server = MockServer::start().await;
        let objects: Objects = Arc::default();

        let handler_objects = objects.clone();
        Mock::given(any())
            .respond_with(move |request: &Request| handle(&handler_objects, request))
            .mount(&server)
            .await;

        Self { server, objects }
    }

    pub fn seed(&self, id: &str, mut body: Value) {
        stamp(&mut body, id);
        self.objects.lock().unwrap().insert(id.to_string(), body);
    }

    pub fn get(&self, id: &str) -> Option<Value> {
        self.objects.lock().unwrap().get(id).cloned()
    }

    /// Deletes an object behind the provider's back.
    pub fn remove(&self, id: &str) {
        let prefix = format!("{}/", id);
        let mut objects = self.objects.lock().unwrap();
        objects.remove(id);
        objects.retain(|key, _| !key.starts_with(&prefix));
    }

    pub fn contains(&self, id: &str) -> bool {
        self.objects.lock().unwrap().contains_key(id)
    }

    pub fn provider(&self) -> Provider {
        self.provider_with(Features::default())
    }

    pub fn provider_with(&self, features: Features) -> Provider {
        let config = ProviderConfig {
            subscription_id: SUBSCRIPTION_ID.to_string(),
            features,
            ..ProviderConfig::default()
        };
        let arm = ArmClient::new(self.server.uri(), Arc::new(StaticTokenCredential::new("test_token")))
            .unwrap()
            .with_poll_interval(Duration::from_millis(10));
        Provider::new(&config, arm)
    }

    /// Requests received so far, as `METHOD path`.
    pub async fn requests(&self) -> Vec<String> {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .map(|r| format!("{} {}", r.method, r.url.path()))
            .collect()
    }
}

pub fn resource_group_id(name: &str) -> String {
    format!("/subscriptions/{}/resourceGroups/{}", SUBSCRIPTION_ID, name)
}

fn segments(path: &str) -> usize {
    path.split('/').filter(|s| !s.is_empty()).count()
}

fn stamp(body: &mut Value, path: &str) {
    let Some(object) = body.as_object_mut() else {
        return;
    };
    object.insert("id".to_string(), json!(path));
    object.insert(
        "name".to_string(),
        json!(path.rsplit('/').next().unwrap_or_default()),
    );
    let properties = object
        .entry("properties")
        .or_insert_with(|| Value::Object(Map::new()));
    if let Some(properties) = properties.as_object_mut() {
        properties.insert("provisioningState".to_string(), json!("Succeeded"));
    }
}

fn merge(target: &mut Value, patch: &Value) {
    match (target, patch) {
        (Value::Object(target), Value::Object(patch)) => {
            for (key, value) in patch {
                match target.get_mut(key) {
                    Some(existing) if value.is_object() && key != "tags" => merge(existing, value),
                    _ => {
                        target.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (target, patch) => *target = patch.clone(),
    }
}

fn not_found(path: &str) -> ResponseTemplate {
    ResponseTemplate::new(404).set_body_json(json!({
        "error": {"code": "ResourceNotFound", "message": format!("The Resource '{}' was not found.", path)}
    }))
}

fn list(objects: &BTreeMap<String, Value>, path: &str) -> Value {
    let items: Vec<Value> = match path.strip_suffix("/resources") {
        // Every top-level resource inside a resource group.
        Some(group) => {
            let prefix = format!("{}/providers/", group);
            objects
                .iter()
                .filter(|(id, _)| id.starts_with(&prefix) && segments(id) == segments(group) + 4)
                .map(|(id, body)| {
                    let parts: Vec<&str> = id.split('/').collect();
                    let resource_type = format!("{}/{}", parts[parts.len() - 3], parts[parts.len() - 2]);
                    json!({"id": id, "name": body["name"], "type": resource_type})
                })
                .collect()
        }
        None => {
            let prefix = format!("{}/", path);
            objects
                .iter()
                .filter(|(id, _)| id.starts_with(&prefix) && segments(id) == segments(path) + 1)
                .map(|(_, body)| body.clone())
                .collect()
        }
    };
    json!({ "value": items })
}

fn handle(objects: &Objects, request: &Request) -> ResponseTemplate {
    let path = request.url.path().trim_end_matches('/').to_string();
    let mut objects = objects.lock().unwrap();

    match request.method.as_str() {
        "GET" if path.ends_with("/resources") && !objects.contains_key(path.trim_end_matches("/resources")) => {
            ResponseTemplate::new(404).set_body_json(json!({
                "error": {"code": "ResourceGroupNotFound", "message": "Resource group could not be found."}
            }))
        }
        "GET" if segments(&path) % 2 == 1 => ResponseTemplate::new(200).set_body_json(list(&objects, &path)),
        "GET" => match objects.get(&path) {
            Some(body) => ResponseTemplate::new(200).set_body_json(body.clone()),
            None => not_found(&path),
        },
        "PUT" => {
            let mut body: Value = serde_json::from_slice(&request.body).unwrap_or_else(|_| json!({}));
            stamp(&mut body, &path);
            objects.insert(path, body.clone());
            ResponseTemplate::new(200).set_body_json(body)
        }
        "PATCH" => {
            let patch: Value = serde_json::from_slice(&request.body).unwrap_or_else(|_| json!({}));
            match objects.get_mut(&path) {
                Some(existing) => {
                    merge(existing, &patch);
                    ResponseTemplate::new(200).set_body_json(existing.clone())
                }
                None => not_found(&path),
            }
        }
        "DELETE" => {
            let prefix = format!("{}/", path);
            let existed = objects.remove(&path).is_some();
            objects.retain(|id, _| !id.starts_with(&prefix));
            ResponseTemplate::new(if existed { 200 } else { 204 })
        }
        "POST" if path.ends_with("/listKeys") => ResponseTemplate::new(200).set_body_json(json!({
            "keys": [
                {"keyName": "key1", "value": "primary-key-value", "permissions": "FULL"},
                {"keyName": "key2", "value": "secondary-key-value", "permissions": "FULL"}
            ]
        })),
        _ => ResponseTemplate::new(405),
    }
}
