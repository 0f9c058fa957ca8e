use crate::context::{EnricherContext, UnitConfig};
use crate::enricher::{Enricher, EnricherError};
use rigging_schema::{ImageName, ResourceList};
use serde_json::Value;
use tracing::debug;

pub const ID: &str = "rigging.container-defaults";
const CONFIG_PREFIX: &str = "container-defaults";
const DEFAULT_PULL_POLICY: &str = "IfNotPresent";

/// Fills in container fields left out of hand-written workloads: the image
/// pull policy and a container name.
pub struct ContainerDefaultsEnricher {
    pull_policy: String,
}

impl ContainerDefaultsEnricher {
    pub fn new(config: &UnitConfig) -> Self {
        Self {
            pull_policy: config
                .get_for(CONFIG_PREFIX, "pull-policy")
                .unwrap_or(DEFAULT_PULL_POLICY)
                .to_owned(),
        }
    }

    pub fn create(
        config: &UnitConfig,
        _ctx: &EnricherContext,
    ) -> Result<Box<dyn Enricher>, EnricherError> {
        Ok(Box::new(Self::new(config)))
    }
}

impl Enricher for ContainerDefaultsEnricher {
    fn name(&self) -> &str {
        ID
    }

    fn adapt(&self, _ctx: &EnricherContext, list: &mut ResourceList) -> Result<(), EnricherError> {
        for item in &mut list.items {
            if !item.kind.is_workload() {
                continue;
            }
            let item_name = item.name().unwrap_or_default().to_owned();
            for (idx, container) in item.containers_mut().into_iter().enumerate() {
                if !container.contains_key("imagePullPolicy") {
                    container.insert(
                        "imagePullPolicy".to_owned(),
                        Value::String(self.pull_policy.clone()),
                    );
                }
                if !container.contains_key("name") {
                    let name = container
                        .get("image")
                        .and_then(Value::as_str)
                        .map(|image| ImageName::new(image).simple_name().to_owned())
                        .filter(|name| !name.is_empty())
                        .unwrap_or_else(|| format!("{item_name}-{idx}"));
                    debug!("naming container {idx} of '{item_name}' '{name}'");
                    container.insert("name".to_owned(), Value::String(name));
                }
            }
        }
        Ok(())
    }
}
