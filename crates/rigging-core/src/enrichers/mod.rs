//! Built-in enrichers and the default descriptor that activates them.

pub mod container_defaults;
pub mod default_service;
pub mod default_workload;
pub mod project_labels;
pub mod selectors;

pub use container_defaults::ContainerDefaultsEnricher;
pub use default_service::DefaultServiceEnricher;
pub use default_workload::DefaultWorkloadEnricher;
pub use project_labels::ProjectLabelEnricher;
pub use selectors::SelectorEnricher;

use crate::context::EnricherContext;
use crate::enricher::Enricher;
use crate::registry::{EmbeddedBundle, ProviderScope};

/// Scope type holding enricher constructors.
pub type EnricherScope = ProviderScope<EnricherContext, Box<dyn Enricher>>;

/// Logical path of the descriptor listing the built-in enrichers.
pub const DEFAULT_DESCRIPTOR_PATH: &str = "META-INF/rigging/enricher-default";

/// Logical path of project or plugin supplied descriptors.
pub const USER_DESCRIPTOR_PATH: &str = "META-INF/rigging/enricher";

pub const DEFAULT_DESCRIPTOR: &str = "\
rigging.default-service
rigging.default-workload
rigging.project-labels
rigging.selectors
rigging.container-defaults
";

/// Scope registering every built-in enricher.
pub fn builtin_scope() -> EnricherScope {
    EnricherScope::new("builtin")
        .register(default_service::ID, DefaultServiceEnricher::create)
        .register(default_workload::ID, DefaultWorkloadEnricher::create)
        .register(project_labels::ID, ProjectLabelEnricher::create)
        .register(selectors::ID, SelectorEnricher::create)
        .register(container_defaults::ID, ContainerDefaultsEnricher::create)
}

/// Bundle carrying [`DEFAULT_DESCRIPTOR`].
pub fn builtin_bundle() -> EmbeddedBundle {
    EmbeddedBundle::new("builtin").with_file(DEFAULT_DESCRIPTOR_PATH, DEFAULT_DESCRIPTOR)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::UnitResolver;
    use rigging_schema::{parse_descriptor, OrderCounter};
    use std::sync::Arc;

    #[test]
    fn default_descriptor_only_names_builtin_enrichers() {
        let resolver = UnitResolver::new(vec![Arc::new(builtin_scope())]);
        let mut counter = OrderCounter::new();
        for (_, entry) in parse_descriptor(DEFAULT_DESCRIPTOR, &mut counter) {
            assert!(
                resolver.resolve(&entry.identifier).is_some(),
                "'{}' is not registered",
                entry.identifier
            );
        }
    }

    #[test]
    fn builtin_scope_has_no_parent() {
        assert!(builtin_scope().parent().is_none());
        assert_eq!(builtin_scope().name(), "builtin");
    }
}
