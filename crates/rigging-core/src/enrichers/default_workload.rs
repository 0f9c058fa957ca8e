use crate::context::{EnricherContext, UnitConfig};
use crate::enricher::{Enricher, EnricherError};
use rigging_schema::{Resource, ResourceKind, ResourceList};
use serde_json::{json, Value};
use tracing::debug;

pub const ID: &str = "rigging.default-workload";
const CONFIG_PREFIX: &str = "default-workload";

/// Seeds a workload running every declared image when the document has no
/// workload yet.
///
/// Options: `default-workload.kind` (`Deployment` or `ReplicaSet`),
/// `default-workload.replicas` (falls back to `resources.replicas`, then 1)
/// and `default-workload.name` (falls back to the project name).
pub struct DefaultWorkloadEnricher {
    name: String,
    kind: ResourceKind,
    replicas: u32,
}

impl DefaultWorkloadEnricher {
    pub fn new(config: &UnitConfig, ctx: &EnricherContext) -> Result<Self, EnricherError> {
        let kind = match config.get_for(CONFIG_PREFIX, "kind") {
            None | Some("Deployment") => ResourceKind::Deployment,
            Some("ReplicaSet") => ResourceKind::ReplicaSet,
            Some(other) => {
                return Err(EnricherError::InvalidConfig {
                    key: format!("{CONFIG_PREFIX}.kind"),
                    value: other.to_owned(),
                    reason: "expected Deployment or ReplicaSet".to_owned(),
                })
            }
        };
        let replicas = match config.parse_for::<u32>(CONFIG_PREFIX, "replicas")? {
            Some(replicas) => replicas,
            None => ctx
                .resources
                .as_ref()
                .and_then(|r| r.replicas)
                .unwrap_or(1),
        };
        Ok(Self {
            name: config
                .get_for(CONFIG_PREFIX, "name")
                .map_or_else(|| ctx.project.name.clone(), str::to_owned),
            kind,
            replicas,
        })
    }

    pub fn create(
        config: &UnitConfig,
        ctx: &EnricherContext,
    ) -> Result<Box<dyn Enricher>, EnricherError> {
        Ok(Box::new(Self::new(config, ctx)?))
    }
}

impl Enricher for DefaultWorkloadEnricher {
    fn name(&self) -> &str {
        ID
    }

    fn add_default_resources(
        &self,
        ctx: &EnricherContext,
        list: &mut ResourceList,
    ) -> Result<(), EnricherError> {
        if ctx.images.is_empty() {
            debug!("no images declared, not adding a default workload");
            return Ok(());
        }
        if list.has_kind(ResourceKind::is_workload) {
            debug!("workload already present, not adding a default one");
            return Ok(());
        }

        let containers: Vec<Value> = ctx
            .images
            .iter()
            .map(|image| {
                let ports: Vec<Value> = image
                    .ports
                    .iter()
                    .map(|port| json!({"containerPort": port, "protocol": "TCP"}))
                    .collect();
                let mut container = json!({
                    "name": image.container_name(),
                    "image": image.name.as_str(),
                });
                if !ports.is_empty() {
                    container["ports"] = Value::Array(ports);
                }
                container
            })
            .collect();

        let mut workload = Resource::new(self.kind.clone(), self.name.clone());
        let spec = workload.spec_mut();
        spec.insert("replicas".to_owned(), json!(self.replicas));
        spec.insert(
            "template".to_owned(),
            json!({
                "metadata": {},
                "spec": {"containers": containers},
            }),
        );
        debug!("adding default {} '{}'", self.kind, self.name);
        list.push(workload);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rigging_schema::parse_project_str;

    const PROJECT: &str = r#"
[project]
name = "demo"

[[images]]
name = "example/demo:1"
ports = [8080]

[[images]]
name = "example/log-shipper:2"
alias = "logs"
"#;

    fn ctx(extra: &str) -> EnricherContext {
        EnricherContext::from_project(&parse_project_str(&format!("{PROJECT}{extra}")).unwrap())
    }

    #[test]
    fn adds_deployment_with_one_container_per_image() {
        let ctx = ctx("");
        let enricher = DefaultWorkloadEnricher::new(&ctx.config, &ctx).unwrap();
        let mut list = ResourceList::new();
        enricher.add_default_resources(&ctx, &mut list).unwrap();

        let item = &list.items[0];
        assert_eq!(item.kind, ResourceKind::Deployment);
        assert_eq!(item.api_version, "apps/v1");
        assert_eq!(item.body["spec"]["replicas"], 1);
        let containers = item.body["spec"]["template"]["spec"]["containers"]
            .as_array()
            .unwrap();
        assert_eq!(containers.len(), 2);
        assert_eq!(containers[0]["name"], "demo");
        assert_eq!(containers[0]["image"], "example/demo:1");
        assert_eq!(containers[0]["ports"][0]["containerPort"], 8080);
        assert_eq!(containers[1]["name"], "logs");
        assert!(containers[1].get("ports").is_none());
    }

    #[test]
    fn replica_set_kind_and_configured_replicas() {
        let ctx = ctx(
            "\n[enricher]\n\"default-workload.kind\" = \"ReplicaSet\"\n\"default-workload.replicas\" = \"4\"\n",
        );
        let enricher = DefaultWorkloadEnricher::new(&ctx.config, &ctx).unwrap();
        let mut list = ResourceList::new();
        enricher.add_default_resources(&ctx, &mut list).unwrap();
        assert_eq!(list.items[0].kind, ResourceKind::ReplicaSet);
        assert_eq!(list.items[0].body["spec"]["replicas"], 4);
    }

    #[test]
    fn replicas_fall_back_to_resource_config() {
        let ctx = ctx("\n[resources]\nreplicas = 3\n");
        let enricher = DefaultWorkloadEnricher::new(&ctx.config, &ctx).unwrap();
        let mut list = ResourceList::new();
        enricher.add_default_resources(&ctx, &mut list).unwrap();
        assert_eq!(list.items[0].body["spec"]["replicas"], 3);
    }

    #[test]
    fn rejects_unknown_kind() {
        let ctx = ctx("\n[enricher]\n\"default-workload.kind\" = \"CronJob\"\n");
        let err = DefaultWorkloadEnricher::new(&ctx.config, &ctx)
            .err()
            .unwrap();
        assert!(err.to_string().contains("CronJob"));
    }

    #[test]
    fn rejects_unparseable_replicas() {
        let ctx = ctx("\n[enricher]\n\"default-workload.replicas\" = \"lots\"\n");
        assert!(DefaultWorkloadEnricher::new(&ctx.config, &ctx).is_err());
    }

    #[test]
    fn existing_workload_suppresses_default() {
        let ctx = ctx("");
        let enricher = DefaultWorkloadEnricher::new(&ctx.config, &ctx).unwrap();
        let mut list = ResourceList::new();
        list.push(Resource::new(ResourceKind::ReplicationController, "legacy"));
        enricher.add_default_resources(&ctx, &mut list).unwrap();
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn seeding_twice_is_idempotent() {
        let ctx = ctx("");
        let enricher = DefaultWorkloadEnricher::new(&ctx.config, &ctx).unwrap();
        let mut list = ResourceList::new();
        enricher.add_default_resources(&ctx, &mut list).unwrap();
        let once = list.clone();
        enricher.add_default_resources(&ctx, &mut list).unwrap();
        assert_eq!(list, once);
    }
}
