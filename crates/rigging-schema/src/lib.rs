//! Descriptor parsing, project configuration, and the resource document model for Rigging.
//!
//! This crate defines the schema layer: enricher descriptor lines
//! (`DescriptorEntry`) with their per-build `OrderCounter`, TOML project
//! configuration (`ProjectConfig`), the kind-tagged output document
//! (`ResourceList`), and reading of on-disk resource fragments.

pub mod descriptor;
pub mod fragment;
pub mod project;
pub mod resource;
pub mod types;

pub use descriptor::{parse_descriptor, DescriptorEntry, OrderCounter, DEFAULT_ORDER_BASE};
pub use fragment::{list_fragments, read_fragment, read_fragments, FragmentError};
pub use project::{
    parse_project_file, parse_project_str, AnnotationsSection, GeneratorSection, ImageConfig,
    OutputFormat, ProjectConfig, ProjectError, ProjectSection, ResourceConfig, ServiceConfig,
    ServicePortConfig,
};
pub use resource::{object_entry, string_map, ObjectMeta, Resource, ResourceKind, ResourceList};
pub use types::{ImageName, UnitId};
