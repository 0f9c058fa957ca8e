use crate::context::{EnricherContext, UnitConfig};
use crate::enricher::{Enricher, EnricherError};
use rigging_schema::{Resource, ResourceKind, ResourceList};
use serde_json::{json, Value};
use tracing::debug;

pub const ID: &str = "rigging.default-service";
const CONFIG_PREFIX: &str = "default-service";

/// Seeds a Service exposing every image port when the document has none.
pub struct DefaultServiceEnricher {
    name: String,
    service_type: Option<String>,
}

impl DefaultServiceEnricher {
    pub fn new(config: &UnitConfig, ctx: &EnricherContext) -> Self {
        Self {
            name: config
                .get_for(CONFIG_PREFIX, "name")
                .map_or_else(|| ctx.project.name.clone(), str::to_owned),
            service_type: config.get_for(CONFIG_PREFIX, "type").map(str::to_owned),
        }
    }

    pub fn create(
        config: &UnitConfig,
        ctx: &EnricherContext,
    ) -> Result<Box<dyn Enricher>, EnricherError> {
        Ok(Box::new(Self::new(config, ctx)))
    }
}

impl Enricher for DefaultServiceEnricher {
    fn name(&self) -> &str {
        ID
    }

    fn add_default_resources(
        &self,
        ctx: &EnricherContext,
        list: &mut ResourceList,
    ) -> Result<(), EnricherError> {
        if list.has_kind(ResourceKind::is_service) {
            debug!("service already present, not adding a default one");
            return Ok(());
        }

        let mut ports: Vec<u16> = ctx
            .images
            .iter()
            .flat_map(|image| image.ports.iter().copied())
            .collect();
        ports.sort_unstable();
        ports.dedup();
        if ports.is_empty() {
            debug!("no image exposes a port, not adding a default service");
            return Ok(());
        }

        let port_specs: Vec<Value> = ports
            .iter()
            .map(|port| {
                json!({
                    "name": format!("port-{port}"),
                    "port": port,
                    "targetPort": port,
                    "protocol": "TCP",
                })
            })
            .collect();

        let mut service = Resource::new(ResourceKind::Service, self.name.clone());
        let spec = service.spec_mut();
        spec.insert("ports".to_owned(), Value::Array(port_specs));
        if let Some(service_type) = &self.service_type {
            spec.insert("type".to_owned(), Value::String(service_type.clone()));
        }
        debug!("adding default service '{}'", self.name);
        list.push(service);
        Ok(())
    }
}
