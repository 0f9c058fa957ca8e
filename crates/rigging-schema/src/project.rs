use crate::types::ImageName;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("failed to read project file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse project file: {0}")]
    ParseToml(#[from] toml::de::Error),
    #[error("project.name must not be empty")]
    EmptyProjectName,
    #[error("image name must not be empty")]
    EmptyImageName,
    #[error("service name must not be empty")]
    EmptyServiceName,
    #[error("service '{0}' is declared more than once")]
    DuplicateService(String),
}

/// Build-tool side configuration of one project, read from `rigging.toml`.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    pub project: ProjectSection,
    /// Free-form settings handed to every enricher, keyed `<enricher>.<option>`.
    #[serde(default)]
    pub enricher: BTreeMap<String, String>,
    #[serde(default)]
    pub images: Vec<ImageConfig>,
    #[serde(default)]
    pub resources: Option<ResourceConfig>,
    #[serde(default)]
    pub generator: GeneratorSection,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ProjectSection {
    pub name: String,
    #[serde(default)]
    pub group: String,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default = "default_packaging")]
    pub packaging: String,
    #[serde(default = "default_provider")]
    pub provider: String,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ImageConfig {
    pub name: ImageName,
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default)]
    pub ports: Vec<u16>,
}

impl ImageConfig {
    /// Alias if configured, otherwise the image's simple name.
    pub fn container_name(&self) -> String {
        self.alias
            .clone()
            .unwrap_or_else(|| self.name.simple_name().to_owned())
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ResourceConfig {
    #[serde(default)]
    pub replicas: Option<u32>,
    #[serde(default)]
    pub services: Vec<ServiceConfig>,
    #[serde(default)]
    pub annotations: AnnotationsSection,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct AnnotationsSection {
    #[serde(default)]
    pub service: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    pub name: String,
    #[serde(default, rename = "type")]
    pub service_type: Option<String>,
    #[serde(default)]
    pub headless: bool,
    #[serde(default)]
    pub ports: Vec<ServicePortConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ServicePortConfig {
    pub port: u16,
    #[serde(default)]
    pub target_port: Option<u16>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default = "default_protocol")]
    pub protocol: String,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Yaml,
    Json,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Yaml => "yml",
            OutputFormat::Json => "json",
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct GeneratorSection {
    #[serde(default = "default_fragments_dir")]
    pub fragments_dir: PathBuf,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default)]
    pub format: OutputFormat,
    /// Directories searched for user descriptors, in addition to the
    /// built-in defaults.
    #[serde(default)]
    pub descriptor_roots: Vec<PathBuf>,
    #[serde(default)]
    pub skip: bool,
}

impl Default for GeneratorSection {
    fn default() -> Self {
        Self {
            fragments_dir: default_fragments_dir(),
            output_dir: default_output_dir(),
            format: OutputFormat::default(),
            descriptor_roots: Vec::new(),
            skip: false,
        }
    }
}

impl ProjectConfig {
    /// Check the fields serde cannot: non-empty names and unique services.
    pub fn validate(&self) -> Result<(), ProjectError> {
        if self.project.name.trim().is_empty() {
            return Err(ProjectError::EmptyProjectName);
        }
        if self.images.iter().any(|image| image.name.trim().is_empty()) {
            return Err(ProjectError::EmptyImageName);
        }
        if let Some(resources) = &self.resources {
            let mut seen = BTreeSet::new();
            for service in &resources.services {
                let name = service.name.trim();
                if name.is_empty() {
                    return Err(ProjectError::EmptyServiceName);
                }
                if !seen.insert(name) {
                    return Err(ProjectError::DuplicateService(name.to_owned()));
                }
            }
        }
        Ok(())
    }

    pub fn is_pom_project(&self) -> bool {
        self.project.packaging == "pom"
    }
}

fn default_version() -> String {
    "latest".to_owned()
}

fn default_packaging() -> String {
    "jar".to_owned()
}

fn default_provider() -> String {
    "rigging".to_owned()
}

fn default_protocol() -> String {
    "TCP".to_owned()
}

fn default_fragments_dir() -> PathBuf {
    PathBuf::from("src/main/rigging")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("target/rigging")
}

pub fn parse_project_str(input: &str) -> Result<ProjectConfig, ProjectError> {
    let config: ProjectConfig = toml::from_str(input)?;
    config.validate()?;
    Ok(config)
}

pub fn parse_project_file(path: impl AsRef<Path>) -> Result<ProjectConfig, ProjectError> {
    let content = fs::read_to_string(path)?;
    parse_project_str(&content)
}
