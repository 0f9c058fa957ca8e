//! Conversion of a Kubernetes document into its OpenShift flavour.
//!
//! Deployments become DeploymentConfigs and ReplicaSets become
//! ReplicationControllers. Everything else is copied unchanged.

use rigging_schema::{string_map, Resource, ResourceKind, ResourceList};
use serde_json::{json, Map, Value};

/// Translate every item of `list`. The input is left untouched.
pub fn translate(list: &ResourceList) -> ResourceList {
    ResourceList {
        api_version: list.api_version.clone(),
        kind: list.kind.clone(),
        metadata: list.metadata.clone(),
        items: list.items.iter().map(translate_item).collect(),
    }
}

pub fn translate_item(item: &Resource) -> Resource {
    match item.kind {
        ResourceKind::Deployment => convert_workload(item, ResourceKind::DeploymentConfig, true),
        ResourceKind::ReplicaSet => {
            convert_workload(item, ResourceKind::ReplicationController, false)
        }
        _ => item.clone(),
    }
}

/// Keep `replicas`, the flattened selector and the pod template. Any other
/// spec field has no counterpart in the target kind and is dropped.
fn convert_workload(item: &Resource, target: ResourceKind, config_change_trigger: bool) -> Resource {
    let mut converted = Resource {
        api_version: target.default_api_version().to_owned(),
        kind: target,
        metadata: item.metadata.clone(),
        body: Map::new(),
    };

    let Some(source) = item.spec() else {
        return converted;
    };

    let mut spec = Map::new();
    if let Some(replicas) = source.get("replicas") {
        spec.insert("replicas".to_owned(), replicas.clone());
    }
    let selector = source
        .get("selector")
        .and_then(|s| s.get("matchLabels"))
        .map(string_map)
        .unwrap_or_default();
    if !selector.is_empty() {
        spec.insert(
            "selector".to_owned(),
            Value::Object(
                selector
                    .into_iter()
                    .map(|(k, v)| (k, Value::String(v)))
                    .collect(),
            ),
        );
    }
    if let Some(template) = source.get("template") {
        spec.insert("template".to_owned(), template.clone());
    }
    if config_change_trigger {
        spec.insert("triggers".to_owned(), json!([{"type": "ConfigChange"}]));
    }
    converted.body.insert("spec".to_owned(), Value::Object(spec));
    converted
}
