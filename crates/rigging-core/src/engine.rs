use crate::context::EnricherContext;
use crate::enricher::{Enricher, EnricherManager};
use crate::enrichers::{
    builtin_bundle, builtin_scope, EnricherScope, DEFAULT_DESCRIPTOR_PATH, USER_DESCRIPTOR_PATH,
};
use crate::registry::{DescriptorLoader, DirectoryBundle, ServiceRegistry, UnitResolver};
use crate::translate::translate;
use crate::writer::{write_resources, Classifier, WrittenResources};
use crate::CoreError;
use rigging_schema::{
    read_fragments, DescriptorEntry, ProjectConfig, Resource, ResourceKind, ResourceList,
    ServiceConfig,
};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Descriptor paths read for every build, defaults first so that user
/// descriptors can remove or reorder built-in enrichers.
const DESCRIPTOR_PATHS: [&str; 2] = [DEFAULT_DESCRIPTOR_PATH, USER_DESCRIPTOR_PATH];

/// Orchestrates resource generation for a project.
///
/// Relative paths in the project configuration are resolved against the
/// engine's base directory, normally the directory holding `rigging.toml`.
/// An engine holds no per-run state and can be shared between threads.
pub struct Engine {
    base_dir: PathBuf,
    scopes: Vec<Arc<EnricherScope>>,
}

/// Result of a successful generation.
#[derive(Debug)]
pub struct GenerateResult {
    pub kubernetes: ResourceList,
    pub openshift: ResourceList,
    pub written: Vec<WrittenResources>,
    pub enrichers: Vec<String>,
}

#[derive(Debug)]
pub enum GenerateOutcome {
    Skipped(String),
    Generated(GenerateResult),
}

impl Engine {
    /// Create an engine resolving project paths against `base_dir`, with the
    /// built-in enrichers registered.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            scopes: vec![Arc::new(builtin_scope())],
        }
    }

    /// Register an additional provider scope. Scopes are searched in
    /// registration order after the built-in one.
    #[must_use]
    pub fn with_scope(mut self, scope: Arc<EnricherScope>) -> Self {
        self.scopes.push(scope);
        self
    }

    fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    /// Loader over the built-in descriptors and every configured descriptor
    /// root.
    pub fn descriptor_loader(&self, project: &ProjectConfig) -> DescriptorLoader {
        for root in self.missing_descriptor_roots(project) {
            warn!("descriptor root {} does not exist", root.display());
        }
        let mut loader = DescriptorLoader::new().with_bundle(builtin_bundle());
        for root in &project.generator.descriptor_roots {
            let root = self.resolve_path(root);
            debug!("descriptor root {}", root.display());
            loader.add_bundle(Box::new(DirectoryBundle::new(root)));
        }
        loader
    }

    /// Configured descriptor roots that are not directories, each listed once.
    pub fn missing_descriptor_roots(&self, project: &ProjectConfig) -> Vec<PathBuf> {
        let mut missing: Vec<PathBuf> = Vec::new();
        for root in &project.generator.descriptor_roots {
            let root = self.resolve_path(root);
            if !root.is_dir() && !missing.contains(&root) {
                missing.push(root);
            }
        }
        missing
    }

    /// Instantiate the enrichers active for `project`, in execution order,
    /// together with the descriptor entry that activated each.
    pub fn registered_enrichers(
        &self,
        project: &ProjectConfig,
        ctx: &EnricherContext,
    ) -> Result<Vec<(DescriptorEntry, Box<dyn Enricher>)>, CoreError> {
        let loader = self.descriptor_loader(project);
        let resolver = UnitResolver::new(self.scopes.clone());
        let registry = ServiceRegistry::new(&loader, &resolver, &ctx.config, ctx);
        Ok(registry.build_entries(&DESCRIPTOR_PATHS)?)
    }

    pub fn enrichers(
        &self,
        project: &ProjectConfig,
        ctx: &EnricherContext,
    ) -> Result<EnricherManager, CoreError> {
        let enrichers = self
            .registered_enrichers(project, ctx)?
            .into_iter()
            .map(|(_, enricher)| enricher)
            .collect();
        Ok(EnricherManager::new(enrichers))
    }

    /// Reason generation should not run for `project`, if any.
    pub fn should_skip(&self, project: &ProjectConfig) -> Option<String> {
        if project.generator.skip {
            return Some("generator.skip is set".to_owned());
        }
        if project.is_pom_project()
            && !self.resolve_path(&project.generator.fragments_dir).is_dir()
        {
            return Some("pom project without a fragments directory".to_owned());
        }
        None
    }

    /// Build the enriched Kubernetes document without writing anything.
    pub fn generate_resources(&self, project: &ProjectConfig) -> Result<ResourceList, CoreError> {
        Ok(self.build_document(project)?.0)
    }

    fn build_document(
        &self,
        project: &ProjectConfig,
    ) -> Result<(ResourceList, Vec<String>), CoreError> {
        let ctx = EnricherContext::from_project(project);
        let manager = self.enrichers(project, &ctx)?;

        let fragments_dir = self.resolve_path(&project.generator.fragments_dir);
        let mut list = read_fragments(&fragments_dir, &project.project.name)?;
        debug!(
            "read {} fragments from {}",
            list.len(),
            fragments_dir.display()
        );
        add_configured_services(project, &mut list);

        manager.enrich(&ctx, &mut list)?;
        let names = manager.names().into_iter().map(str::to_owned).collect();
        Ok((list, names))
    }

    /// Generate, translate and write the Kubernetes and OpenShift documents.
    pub fn generate(&self, project: &ProjectConfig) -> Result<GenerateOutcome, CoreError> {
        if let Some(reason) = self.should_skip(project) {
            info!("skipping resource generation: {reason}");
            return Ok(GenerateOutcome::Skipped(reason));
        }

        info!("generating resources for '{}'", project.project.name);
        let (kubernetes, enrichers) = self.build_document(project)?;
        let openshift = translate(&kubernetes);

        let out_dir = self.resolve_path(&project.generator.output_dir);
        let format = project.generator.format;
        let written = vec![
            write_resources(&kubernetes, &out_dir, Classifier::Kubernetes, format)?,
            write_resources(&openshift, &out_dir, Classifier::OpenShift, format)?,
        ];
        info!(
            "wrote {} resources to {}",
            kubernetes.len(),
            out_dir.display()
        );

        Ok(GenerateOutcome::Generated(GenerateResult {
            kubernetes,
            openshift,
            written,
            enrichers,
        }))
    }
}

/// Add the services declared in the project configuration. A service already
/// supplied by a fragment wins over the configured one.
fn add_configured_services(project: &ProjectConfig, list: &mut ResourceList) {
    let Some(resources) = &project.resources else {
        return;
    };
    for service in &resources.services {
        if list.find(&ResourceKind::Service, &service.name).is_some() {
            warn!(
                "service '{}' is defined by a fragment, ignoring its configuration",
                service.name
            );
            continue;
        }
        let mut item = configured_service(service);
        item.metadata.annotations = resources.annotations.service.clone();
        list.push(item);
    }
}

fn configured_service(config: &ServiceConfig) -> Resource {
    let mut item = Resource::new(ResourceKind::Service, config.name.clone());
    let spec = item.spec_mut();
    if !config.ports.is_empty() {
        let ports: Vec<Value> = config
            .ports
            .iter()
            .map(|p| {
                let mut port = json!({
                    "port": p.port,
                    "targetPort": p.target_port.unwrap_or(p.port),
                    "protocol": p.protocol,
                });
                if let Some(name) = &p.name {
                    port["name"] = Value::String(name.clone());
                }
                port
            })
            .collect();
        spec.insert("ports".to_owned(), Value::Array(ports));
    }
    if let Some(service_type) = &config.service_type {
        spec.insert("type".to_owned(), Value::String(service_type.clone()));
    }
    if config.headless {
        spec.insert("clusterIP".to_owned(), Value::String("None".to_owned()));
    }
    item
}
