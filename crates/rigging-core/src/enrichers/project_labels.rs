use crate::context::{EnricherContext, UnitConfig};
use crate::enricher::{Enricher, EnricherError};
use rigging_schema::ResourceList;
use serde_json::Value;
use std::collections::BTreeMap;

pub const ID: &str = "rigging.project-labels";

/// Adds the project identity labels to every item and to the pod template
/// of workloads. Labels already present are kept.
pub struct ProjectLabelEnricher {
    labels: BTreeMap<String, String>,
}

impl ProjectLabelEnricher {
    pub fn new(ctx: &EnricherContext) -> Self {
        Self {
            labels: ctx.project_labels(),
        }
    }

    pub fn create(
        _config: &UnitConfig,
        ctx: &EnricherContext,
    ) -> Result<Box<dyn Enricher>, EnricherError> {
        Ok(Box::new(Self::new(ctx)))
    }
}

impl Enricher for ProjectLabelEnricher {
    fn name(&self) -> &str {
        ID
    }

    fn enrich_labels(
        &self,
        _ctx: &EnricherContext,
        list: &mut ResourceList,
    ) -> Result<(), EnricherError> {
        for item in &mut list.items {
            for (key, value) in &self.labels {
                item.metadata.add_label_if_absent(key, value);
            }
            if item.kind.is_workload() {
                let template_labels = item.template_labels_mut();
                for (key, value) in &self.labels {
                    template_labels
                        .entry(key.clone())
                        .or_insert_with(|| Value::String(value.clone()));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rigging_schema::{parse_project_str, Resource, ResourceKind};

    fn ctx() -> EnricherContext {
        EnricherContext::from_project(
            &parse_project_str(
                "[project]\nname = \"demo\"\ngroup = \"com.example\"\nversion = \"1.0\"\n",
            )
            .unwrap(),
        )
    }

    #[test]
    fn labels_items_and_pod_templates() {
        let ctx = ctx();
        let enricher = ProjectLabelEnricher::new(&ctx);
        let mut list = ResourceList::new();
        list.push(Resource::new(ResourceKind::Service, "web"));
        list.push(Resource::new(ResourceKind::Deployment, "web"));
        enricher.enrich_labels(&ctx, &mut list).unwrap();

        let svc = &list.items[0];
        assert_eq!(svc.metadata.labels["project"], "demo");
        assert_eq!(svc.metadata.labels["group"], "com.example");
        assert_eq!(svc.metadata.labels["version"], "1.0");
        assert!(svc.template_labels().is_empty());

        let deployment = &list.items[1];
        assert_eq!(deployment.metadata.labels["provider"], "rigging");
        assert_eq!(deployment.template_labels()["project"], "demo");
    }

    #[test]
    fn existing_labels_are_not_overwritten() {
        let ctx = ctx();
        let enricher = ProjectLabelEnricher::new(&ctx);
        let mut item = Resource::new(ResourceKind::Deployment, "web");
        item.metadata
            .labels
            .insert("project".to_owned(), "hand-written".to_owned());
        item.template_labels_mut()
            .insert("version".to_owned(), Value::String("pinned".to_owned()));
        let mut list = ResourceList::new();
        list.push(item);

        enricher.enrich_labels(&ctx, &mut list).unwrap();
        assert_eq!(list.items[0].metadata.labels["project"], "hand-written");
        assert_eq!(list.items[0].template_labels()["version"], "pinned");
    }

    #[test]
    fn enriching_twice_is_idempotent() {
        let ctx = ctx();
        let enricher = ProjectLabelEnricher::new(&ctx);
        let mut list = ResourceList::new();
        list.push(Resource::new(ResourceKind::ReplicaSet, "web"));
        enricher.enrich_labels(&ctx, &mut list).unwrap();
        let once = list.clone();
        enricher.enrich_labels(&ctx, &mut list).unwrap();
        assert_eq!(list, once);
    }
}
