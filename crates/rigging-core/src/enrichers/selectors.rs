use crate::context::{EnricherContext, UnitConfig};
use crate::enricher::{Enricher, EnricherError};
use rigging_schema::{Resource, ResourceList};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, warn};

pub const ID: &str = "rigging.selectors";

/// Label keys that change between releases and so never go into a selector.
const VOLATILE_LABELS: &[&str] = &["version"];

/// Fills in selectors on services and workloads that lack one, derived from
/// their labels. A selector that is already present is never changed.
pub struct SelectorEnricher;

impl SelectorEnricher {
    pub fn create(
        _config: &UnitConfig,
        _ctx: &EnricherContext,
    ) -> Result<Box<dyn Enricher>, EnricherError> {
        Ok(Box::new(SelectorEnricher))
    }
}

impl Enricher for SelectorEnricher {
    fn name(&self) -> &str {
        ID
    }

    fn add_missing_selectors(
        &self,
        _ctx: &EnricherContext,
        list: &mut ResourceList,
    ) -> Result<(), EnricherError> {
        for item in &mut list.items {
            if !(item.kind.is_workload() || item.kind.is_service()) || item.has_selector() {
                continue;
            }
            let selector = derive_selector(item);
            if selector.is_empty() {
                warn!(
                    "{} '{}' has no labels to derive a selector from",
                    item.kind,
                    item.name().unwrap_or_default()
                );
                continue;
            }
            if item.kind.is_workload() {
                // Pods must carry the labels the selector matches on.
                let template_labels = item.template_labels_mut();
                for (key, value) in &selector {
                    template_labels
                        .entry(key.clone())
                        .or_insert_with(|| Value::String(value.clone()));
                }
            }
            debug!(
                "adding selector to {} '{}'",
                item.kind,
                item.name().unwrap_or_default()
            );
            item.set_selector(&selector);
        }
        Ok(())
    }
}

/// Workloads select on their pod template labels, falling back to their own
/// labels; services select on their own labels.
fn derive_selector(item: &Resource) -> BTreeMap<String, String> {
    let mut labels = if item.kind.is_workload() {
        let template = item.template_labels();
        if template.is_empty() {
            item.metadata.labels.clone()
        } else {
            template
        }
    } else {
        item.metadata.labels.clone()
    };
    labels.retain(|key, _| !VOLATILE_LABELS.contains(&key.as_str()));
    labels
}
