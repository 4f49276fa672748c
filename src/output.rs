use std::time::Duration;

use azurerm::definition::{DefinitionPlan, Drift};
use azurerm::plan::Action;
use azurerm::resource::Resource;
use tabled::{Table, Tabled};
use termtree::Tree;

#[derive(Tabled)]
struct ResourceRow {
    #[tabled(rename = "Resource Type")]
    resource_type: &'static str,
    #[tabled(rename = "Required")]
    required: String,
    #[tabled(rename = "Timeouts (c/r/u/d)")]
    timeouts: String,
}

#[derive(Tabled)]
struct ChangeRow {
    #[tabled(rename = "Address")]
    address: String,
    #[tabled(rename = "Action")]
    action: String,
    #[tabled(rename = "Attributes")]
    attributes: String,
}

fn minutes(d: Duration) -> String {
    format!("{}m", d.as_secs() / 60)
}

pub fn resources_table(resources: &[std::sync::Arc<dyn Resource>]) -> String {
    let rows: Vec<ResourceRow> = resources
        .iter()
        .map(|r| {
            let schema = r.schema();
            let required: Vec<&str> = schema
                .iter()
                .filter(|(_, a)| a.required)
                .map(|(name, _)| name)
                .collect();
            let t = r.timeouts();
            ResourceRow {
                resource_type: r.type_name(),
                required: required.join(", "),
                timeouts: format!(
                    "{}/{}/{}/{}",
                    minutes(t.create),
                    minutes(t.read),
                    minutes(t.update),
                    minutes(t.delete)
                ),
            }
        })
        .collect();
    Table::new(rows).to_string()
}

/// Table of pending changes, skipping resources that are up to date.
pub fn plan_table(plan: &DefinitionPlan) -> String {
    let mut rows: Vec<ChangeRow> = plan
        .changes
        .iter()
        .filter(|c| c.plan.action != Action::NoOp)
        .map(|c| {
            let attributes: Vec<String> = c
                .plan
                .changes
                .iter()
                .map(|a| {
                    if a.force_new {
                        format!("{} (forces replacement)", a.key)
                    } else {
                        a.key.clone()
                    }
                })
                .collect();
            ChangeRow {
                address: c.address.clone(),
                action: c.plan.action.to_string(),
                attributes: attributes.join("\n"),
            }
        })
        .collect();

    rows.extend(plan.destroy.iter().map(|address| ChangeRow {
        address: address.clone(),
        action: "destroy".to_string(),
        attributes: String::new(),
    }));
    Table::new(rows).to_string()
}

pub fn drift_table(drift: &[Drift]) -> String {
    let rows: Vec<ChangeRow> = drift
        .iter()
        .map(|d| ChangeRow {
            address: d.address.clone(),
            action: if d.removed { "removed".to_string() } else { "changed".to_string() },
            attributes: d
                .changes
                .iter()
                .map(|a| a.key.clone())
                .collect::<Vec<_>>()
                .join("\n"),
        })
        .collect();
    Table::new(rows).to_string()
}

pub fn id_tree(root: &str, segments: &[(String, String)]) -> Tree<String> {
    let mut tree = Tree::new(root.to_string());
    for (key, value) in segments {
        tree.push(Tree::new(format!("{}: {}", key, value)));
    }
    tree
}

#[cfg(test)]
mod tests {
    use super::*;
    use azurerm::definition::PlannedChange;
    use azurerm::plan::{AttributeChange, Plan};
    use serde_json::{Map, json};

    fn change(address: &str, action: Action, keys: &[(&str, bool)]) -> PlannedChange {
        PlannedChange {
            address: address.to_string(),
            resource_type: "azurerm_resource_group".to_string(),
            plan: Plan {
                action,
                changes: keys
                    .iter()
                    .map(|(key, force_new)| AttributeChange {
                        key: key.to_string(),
                        before: None,
                        after: Some(json!("x")),
                        force_new: *force_new,
                        sensitive: false,
                    })
                    .collect(),
                proposed: Map::new(),
                prior: None,
            },
        }
    }

    #[test]
    fn test_plan_table_skips_no_op() {
        let plan = DefinitionPlan {
            changes: vec![
                change("azurerm_resource_group.a", Action::Replace, &[("location", true)]),
                change("azurerm_resource_group.b", Action::NoOp, &[]),
            ],
            destroy: vec!["azurerm_storage_account.old".to_string()],
        };
        let table = plan_table(&plan);
        assert!(table.contains("azurerm_resource_group.a"));
        assert!(table.contains("location (forces replacement)"));
        assert!(!table.contains("azurerm_resource_group.b"));
        assert!(table.contains("azurerm_storage_account.old"));
    }

    #[test]
    fn test_resources_table_lists_every_type() {
        let table = resources_table(&azurerm::services::resources());
        assert!(table.contains("azurerm_resource_group"));
        assert!(table.contains("azurerm_kubernetes_cluster_node_pool"));
        assert!(table.contains("90m/5m/90m/90m"));
    }

    #[test]
    fn test_id_tree() {
        let tree = id_tree(
            "Resource Group",
            &[
                ("subscription_id".to_string(), "sub1".to_string()),
                ("resource_group_name".to_string(), "rg1".to_string()),
            ],
        );
        let rendered = tree.to_string();
        assert!(rendered.starts_with("Resource Group\n"));
        assert!(rendered.contains("resource_group_name: rg1"));
    }
}
