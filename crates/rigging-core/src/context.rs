use crate::enricher::EnricherError;
use rigging_schema::{ImageConfig, ProjectConfig, ProjectSection, ResourceConfig};
use std::collections::BTreeMap;
use std::str::FromStr;

/// Enricher settings, a flat string map keyed `<enricher>.<option>`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnitConfig {
    values: BTreeMap<String, String>,
}

impl UnitConfig {
    pub fn new(values: BTreeMap<String, String>) -> Self {
        Self { values }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Look up `<unit>.<option>`.
    pub fn get_for(&self, unit: &str, option: &str) -> Option<&str> {
        self.get(&format!("{unit}.{option}"))
    }

    /// Parse `<unit>.<option>` if set.
    pub fn parse_for<T>(&self, unit: &str, option: &str) -> Result<Option<T>, EnricherError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        let key = format!("{unit}.{option}");
        match self.get(&key) {
            None => Ok(None),
            Some(raw) => raw
                .trim()
                .parse()
                .map(Some)
                .map_err(|e: T::Err| EnricherError::InvalidConfig {
                    key,
                    value: raw.to_owned(),
                    reason: e.to_string(),
                }),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl From<BTreeMap<String, String>> for UnitConfig {
    fn from(values: BTreeMap<String, String>) -> Self {
        Self::new(values)
    }
}

impl<const N: usize> From<[(&str, &str); N]> for UnitConfig {
    fn from(pairs: [(&str, &str); N]) -> Self {
        Self::new(
            pairs
                .into_iter()
                .map(|(k, v)| (k.to_owned(), v.to_owned()))
                .collect(),
        )
    }
}

/// Read-only state shared by every enricher and the translator for one run.
///
/// Diagnostics are emitted through `tracing` rather than a sink held here.
#[derive(Debug, Clone)]
pub struct EnricherContext {
    pub project: ProjectSection,
    pub config: UnitConfig,
    pub images: Vec<ImageConfig>,
    pub resources: Option<ResourceConfig>,
}

impl EnricherContext {
    pub fn from_project(project: &ProjectConfig) -> Self {
        Self {
            project: project.project.clone(),
            config: UnitConfig::new(project.enricher.clone()),
            images: project.images.clone(),
            resources: project.resources.clone(),
        }
    }

    /// Labels identifying the project: `project`, `provider`, `version` and
    /// `group` when set.
    pub fn project_labels(&self) -> BTreeMap<String, String> {
        let mut labels = BTreeMap::new();
        labels.insert("project".to_owned(), self.project.name.clone());
        labels.insert("provider".to_owned(), self.project.provider.clone());
        labels.insert("version".to_owned(), self.project.version.clone());
        if !self.project.group.is_empty() {
            labels.insert("group".to_owned(), self.project.group.clone());
        }
        labels
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rigging_schema::parse_project_str;

    #[test]
    fn get_for_joins_unit_and_option() {
        let config = UnitConfig::from([("default-workload.replicas", "3")]);
        assert_eq!(config.get_for("default-workload", "replicas"), Some("3"));
        assert_eq!(config.get_for("default-workload", "kind"), None);
    }

    #[test]
    fn parse_for_reports_invalid_values() {
        let config = UnitConfig::from([("default-workload.replicas", "many")]);
        let err = config
            .parse_for::<u32>("default-workload", "replicas")
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("default-workload.replicas"));
        assert!(msg.contains("many"));
    }

    #[test]
    fn parse_for_missing_is_none() {
        let config = UnitConfig::default();
        assert_eq!(config.parse_for::<u32>("x", "y").unwrap(), None);
    }

    #[test]
    fn project_labels_skip_empty_group() {
        let project = parse_project_str("[project]\nname = \"demo\"\n").unwrap();
        let ctx = EnricherContext::from_project(&project);
        let labels = ctx.project_labels();
        assert_eq!(labels["project"], "demo");
        assert_eq!(labels["provider"], "rigging");
        assert_eq!(labels["version"], "latest");
        assert!(!labels.contains_key("group"));
    }
}
