//! Enricher registry, enrichment pipeline and resource generation engine for Rigging.
//!
//! This crate discovers enrichers from descriptor files (`ServiceRegistry`),
//! instantiates them through static provider scopes (`UnitResolver`), drives
//! them through the four pipeline phases (`EnricherManager`), translates the
//! result into its OpenShift flavour and writes both documents. `Engine` ties
//! these steps together for one project.

pub mod context;
pub mod engine;
pub mod enricher;
pub mod enrichers;
pub mod registry;
pub mod translate;
pub mod writer;

pub use context::{EnricherContext, UnitConfig};
pub use engine::{Engine, GenerateOutcome, GenerateResult};
pub use enricher::{Enricher, EnricherError, EnricherManager, Phase, PipelineError};
pub use enrichers::EnricherScope;
pub use registry::{
    DescriptorBundle, DescriptorLoader, DescriptorResource, DirectoryBundle, EmbeddedBundle,
    ProviderScope, RegistryError, ServiceRegistry, UnitResolver,
};
pub use translate::{translate, translate_item};
pub use writer::{write_resources, Classifier, WriteError, WrittenResources};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("configuration error: {0}")]
    Project(#[from] rigging_schema::ProjectError),
    #[error("fragment error: {0}")]
    Fragment(#[from] rigging_schema::FragmentError),
    #[error("configuration error: {0}")]
    Registry(#[from] RegistryError),
    #[error("enricher error: {0}")]
    Pipeline(#[from] PipelineError),
    #[error("write error: {0}")]
    Write(#[from] WriteError),
}
