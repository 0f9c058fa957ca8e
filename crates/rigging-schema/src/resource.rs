use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// Kind tag of a resource item.
///
/// Only the kinds the enrichers and the translator reason about get their own
/// variant; everything else is carried verbatim in [`ResourceKind::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ResourceKind {
    Service,
    Deployment,
    ReplicaSet,
    ReplicationController,
    DeploymentConfig,
    ConfigMap,
    Other(String),
}

impl ResourceKind {
    pub fn as_str(&self) -> &str {
        match self {
            ResourceKind::Service => "Service",
            ResourceKind::Deployment => "Deployment",
            ResourceKind::ReplicaSet => "ReplicaSet",
            ResourceKind::ReplicationController => "ReplicationController",
            ResourceKind::DeploymentConfig => "DeploymentConfig",
            ResourceKind::ConfigMap => "ConfigMap",
            ResourceKind::Other(kind) => kind,
        }
    }

    pub fn default_api_version(&self) -> &'static str {
        match self {
            ResourceKind::Deployment | ResourceKind::ReplicaSet => "apps/v1",
            ResourceKind::DeploymentConfig => "apps.openshift.io/v1",
            _ => "v1",
        }
    }

    /// Workload-like items own a pod template and must end up selectable.
    pub fn is_workload(&self) -> bool {
        matches!(
            self,
            ResourceKind::Deployment
                | ResourceKind::ReplicaSet
                | ResourceKind::ReplicationController
                | ResourceKind::DeploymentConfig
        )
    }

    pub fn is_service(&self) -> bool {
        matches!(self, ResourceKind::Service)
    }

    /// Whether the selector is a `LabelSelector` (`selector.matchLabels`)
    /// rather than a plain label map.
    pub fn uses_match_labels(&self) -> bool {
        matches!(self, ResourceKind::Deployment | ResourceKind::ReplicaSet)
    }

    /// Short suffix used in per-item file names and recognized in fragment
    /// file names.
    pub fn file_suffix(&self) -> String {
        match self {
            ResourceKind::Service => "svc".to_owned(),
            ResourceKind::Deployment => "deployment".to_owned(),
            ResourceKind::ReplicaSet => "rs".to_owned(),
            ResourceKind::ReplicationController => "rc".to_owned(),
            ResourceKind::DeploymentConfig => "dc".to_owned(),
            ResourceKind::ConfigMap => "cm".to_owned(),
            ResourceKind::Other(kind) => kind.to_lowercase(),
        }
    }

    /// Map a fragment file-name suffix back to a kind.
    pub fn from_file_suffix(suffix: &str) -> Option<Self> {
        match suffix.to_lowercase().as_str() {
            "svc" | "service" => Some(ResourceKind::Service),
            "deployment" => Some(ResourceKind::Deployment),
            "rs" | "replicaset" => Some(ResourceKind::ReplicaSet),
            "rc" | "replicationcontroller" => Some(ResourceKind::ReplicationController),
            "dc" | "deploymentconfig" => Some(ResourceKind::DeploymentConfig),
            "cm" | "configmap" => Some(ResourceKind::ConfigMap),
            _ => None,
        }
    }
}

impl From<String> for ResourceKind {
    fn from(kind: String) -> Self {
        match kind.as_str() {
            "Service" => ResourceKind::Service,
            "Deployment" => ResourceKind::Deployment,
            "ReplicaSet" => ResourceKind::ReplicaSet,
            "ReplicationController" => ResourceKind::ReplicationController,
            "DeploymentConfig" => ResourceKind::DeploymentConfig,
            "ConfigMap" => ResourceKind::ConfigMap,
            _ => ResourceKind::Other(kind),
        }
    }
}

impl From<ResourceKind> for String {
    fn from(kind: ResourceKind) -> Self {
        match kind {
            ResourceKind::Other(kind) => kind,
            known => known.as_str().to_owned(),
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity and descriptive tags of an item.
///
/// Metadata fields other than name, namespace, labels and annotations are
/// preserved untouched in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ObjectMeta {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Add a label unless the key is already present. Returns whether the
    /// label was inserted.
    pub fn add_label_if_absent(&mut self, key: &str, value: &str) -> bool {
        if self.labels.contains_key(key) {
            return false;
        }
        self.labels.insert(key.to_owned(), value.to_owned());
        true
    }
}

/// A single kind-tagged item of the output document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    pub api_version: String,
    pub kind: ResourceKind,
    #[serde(default)]
    pub metadata: ObjectMeta,
    /// Everything besides the header and metadata (`spec`, `data`, ...).
    #[serde(flatten)]
    pub body: Map<String, Value>,
}

impl Resource {
    pub fn new(kind: ResourceKind, name: impl Into<String>) -> Self {
        Self {
            api_version: kind.default_api_version().to_owned(),
            kind,
            metadata: ObjectMeta::named(name),
            body: Map::new(),
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.metadata.name.as_deref()
    }

    pub fn spec(&self) -> Option<&Map<String, Value>> {
        self.body.get("spec").and_then(Value::as_object)
    }

    /// Mutable access to `spec`, creating an empty object if missing or not
    /// an object.
    pub fn spec_mut(&mut self) -> &mut Map<String, Value> {
        object_entry(&mut self.body, "spec")
    }

    /// Labels of the pod template (`spec.template.metadata.labels`).
    pub fn template_labels(&self) -> BTreeMap<String, String> {
        self.spec()
            .and_then(|spec| spec.get("template"))
            .and_then(|t| t.get("metadata"))
            .and_then(|m| m.get("labels"))
            .map(string_map)
            .unwrap_or_default()
    }

    /// Mutable pod template labels, creating the path if missing.
    pub fn template_labels_mut(&mut self) -> &mut Map<String, Value> {
        let template = object_entry(self.spec_mut(), "template");
        let metadata = object_entry(template, "metadata");
        object_entry(metadata, "labels")
    }

    /// The selector of a service-like or workload-like item, if one is set
    /// and non-empty. Returns `None` for kinds without a selector.
    pub fn selector(&self) -> Option<BTreeMap<String, String>> {
        let spec = self.spec()?;
        let raw = if self.kind.uses_match_labels() {
            spec.get("selector")?.get("matchLabels")?
        } else if self.kind.is_workload() || self.kind.is_service() {
            spec.get("selector")?
        } else {
            return None;
        };
        let labels = string_map(raw);
        if labels.is_empty() {
            None
        } else {
            Some(labels)
        }
    }

    /// Whether a selector has been authored, including label selectors that
    /// only use `matchExpressions`.
    pub fn has_selector(&self) -> bool {
        let Some(selector) = self.spec().and_then(|spec| spec.get("selector")) else {
            return false;
        };
        match selector.as_object() {
            Some(obj) if self.kind.uses_match_labels() => {
                non_empty(obj.get("matchLabels")) || non_empty(obj.get("matchExpressions"))
            }
            Some(obj) => !obj.is_empty(),
            None => false,
        }
    }

    /// Set the selector in the shape the kind expects.
    pub fn set_selector(&mut self, labels: &BTreeMap<String, String>) {
        let value = Value::Object(
            labels
                .iter()
                .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                .collect(),
        );
        let uses_match_labels = self.kind.uses_match_labels();
        let spec = self.spec_mut();
        if uses_match_labels {
            object_entry(spec, "selector").insert("matchLabels".to_owned(), value);
        } else {
            spec.insert("selector".to_owned(), value);
        }
    }

    /// Container objects of the pod template (`spec.template.spec.containers`).
    pub fn containers_mut(&mut self) -> Vec<&mut Map<String, Value>> {
        self.body
            .get_mut("spec")
            .and_then(|s| s.get_mut("template"))
            .and_then(|t| t.get_mut("spec"))
            .and_then(|s| s.get_mut("containers"))
            .and_then(Value::as_array_mut)
            .map(|containers| {
                containers
                    .iter_mut()
                    .filter_map(Value::as_object_mut)
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// The output document: an ordered list of items plus optional list metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceList {
    #[serde(default = "default_list_api_version")]
    pub api_version: String,
    #[serde(default = "default_list_kind")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
    #[serde(default)]
    pub items: Vec<Resource>,
}

impl Default for ResourceList {
    fn default() -> Self {
        Self {
            api_version: default_list_api_version(),
            kind: default_list_kind(),
            metadata: None,
            items: Vec::new(),
        }
    }
}

impl ResourceList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, item: Resource) {
        self.items.push(item);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn has_kind(&self, predicate: impl Fn(&ResourceKind) -> bool) -> bool {
        self.items.iter().any(|item| predicate(&item.kind))
    }

    pub fn find(&self, kind: &ResourceKind, name: &str) -> Option<&Resource> {
        self.items
            .iter()
            .find(|item| item.kind == *kind && item.name() == Some(name))
    }
}

fn default_list_api_version() -> String {
    "v1".to_owned()
}

fn default_list_kind() -> String {
    "List".to_owned()
}

/// Get `map[key]` as an object, replacing a missing or non-object value with
/// an empty object.
pub fn object_entry<'a>(map: &'a mut Map<String, Value>, key: &str) -> &'a mut Map<String, Value> {
    let slot = map
        .entry(key.to_owned())
        .or_insert_with(|| Value::Object(Map::new()));
    if !slot.is_object() {
        *slot = Value::Object(Map::new());
    }
    match slot {
        Value::Object(obj) => obj,
        _ => unreachable!("slot was just set to an object"),
    }
}

/// Collect the string-valued entries of a JSON object.
pub fn string_map(value: &Value) -> BTreeMap<String, String> {
    value
        .as_object()
        .map(|obj| {
            obj.iter()
                .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_owned())))
                .collect()
        })
        .unwrap_or_default()
}

fn non_empty(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Object(obj)) => !obj.is_empty(),
        Some(Value::Array(arr)) => !arr.is_empty(),
        _ => false,
    }
}
