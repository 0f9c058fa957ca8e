//! Serialization of resource documents to disk.
//!
//! Every file is written to a temporary sibling first and then renamed into
//! place, so readers never observe a partially written document.

use rigging_schema::{OutputFormat, ResourceList};
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, error, warn};

#[derive(Debug, Error)]
pub enum WriteError {
    #[error("cannot write {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("serialization error: {0}")]
    Serialize(String),
}

/// Target platform flavour of a generated document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classifier {
    Kubernetes,
    OpenShift,
}

impl Classifier {
    pub fn value(self) -> &'static str {
        match self {
            Classifier::Kubernetes => "kubernetes",
            Classifier::OpenShift => "openshift",
        }
    }
}

impl fmt::Display for Classifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.value())
    }
}

/// Files produced for one classifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WrittenResources {
    pub document: PathBuf,
    pub items: Vec<PathBuf>,
}

pub fn render<T: Serialize>(value: &T, format: OutputFormat) -> Result<String, WriteError> {
    match format {
        OutputFormat::Yaml => {
            serde_yaml::to_string(value).map_err(|e| WriteError::Serialize(e.to_string()))
        }
        OutputFormat::Json => serde_json::to_string_pretty(value)
            .map(|mut out| {
                out.push('\n');
                out
            })
            .map_err(|e| WriteError::Serialize(e.to_string())),
    }
}

/// Write `<out_dir>/<classifier>.<ext>` holding the whole document and one
/// `<out_dir>/<classifier>/<name>-<suffix>.<ext>` file per named item.
pub fn write_resources(
    list: &ResourceList,
    out_dir: &Path,
    classifier: Classifier,
    format: OutputFormat,
) -> Result<WrittenResources, WriteError> {
    let ext = format.extension();
    let document = out_dir.join(format!("{classifier}.{ext}"));
    write_atomic(&document, &render(list, format)?)?;

    let item_dir = out_dir.join(classifier.value());
    let mut items = Vec::with_capacity(list.len());
    let mut seen = HashSet::new();
    for item in &list.items {
        let Some(name) = item.name() else {
            error!(
                "{} without metadata.name cannot be written to its own file",
                item.kind
            );
            continue;
        };
        if !is_file_safe_name(name) {
            error!(
                "{} name '{name}' is not usable as a file name, skipping its own file",
                item.kind
            );
            continue;
        }
        let path = item_dir.join(format!("{name}-{}.{ext}", item.kind.file_suffix()));
        if !seen.insert(path.clone()) {
            warn!(
                "duplicate {} '{name}', keeping the first in {}",
                item.kind,
                path.display()
            );
            continue;
        }
        write_atomic(&path, &render(item, format)?)?;
        items.push(path);
    }

    debug!(
        "wrote {} and {} item files",
        document.display(),
        items.len()
    );
    Ok(WrittenResources { document, items })
}

/// Object names in the DNS subdomain style: ASCII alphanumerics, `-`, `.`
/// and `_`, never starting with `.` and never containing `..`.
fn is_file_safe_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= 253
        && !name.starts_with('.')
        && !name.contains("..")
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_'))
}

fn write_atomic(dest: &Path, content: &str) -> Result<(), WriteError> {
    let io_err = |source| WriteError::Io {
        path: dest.to_path_buf(),
        source,
    };
    let dir = dest.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir).map_err(io_err)?;
    let mut tmp = NamedTempFile::new_in(dir).map_err(io_err)?;
    tmp.write_all(content.as_bytes()).map_err(io_err)?;
    tmp.as_file().sync_all().map_err(io_err)?;
    tmp.persist(dest).map_err(|e| io_err(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rigging_schema::{Resource, ResourceKind};

    fn sample() -> ResourceList {
        let mut list = ResourceList::new();
        list.push(Resource::new(ResourceKind::Service, "web"));
        list.push(Resource::new(ResourceKind::Deployment, "web"));
        list
    }

    #[test]
    fn writes_document_and_item_files() {
        let dir = tempfile::tempdir().unwrap();
        let written = write_resources(
            &sample(),
            dir.path(),
            Classifier::Kubernetes,
            OutputFormat::Yaml,
        )
        .unwrap();

        assert_eq!(written.document, dir.path().join("kubernetes.yml"));
        let doc: ResourceList =
            serde_yaml::from_str(&std::fs::read_to_string(&written.document).unwrap()).unwrap();
        assert_eq!(doc, sample());
        assert_eq!(
            written.items,
            vec![
                dir.path().join("kubernetes/web-svc.yml"),
                dir.path().join("kubernetes/web-deployment.yml"),
            ]
        );
        assert!(written.items.iter().all(|p| p.is_file()));
    }

    #[test]
    fn json_output_uses_json_extension() {
        let dir = tempfile::tempdir().unwrap();
        let written =
            write_resources(&sample(), dir.path(), Classifier::OpenShift, OutputFormat::Json)
                .unwrap();
        assert_eq!(written.document, dir.path().join("openshift.json"));
        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&written.document).unwrap()).unwrap();
        assert_eq!(value["kind"], "List");
        assert_eq!(value["items"][0]["kind"], "Service");
    }

    #[test]
    fn unnamed_items_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let mut list = sample();
        let mut unnamed = Resource::new(ResourceKind::ConfigMap, "x");
        unnamed.metadata.name = None;
        list.push(unnamed);
        let written =
            write_resources(&list, dir.path(), Classifier::Kubernetes, OutputFormat::Yaml)
                .unwrap();
        assert_eq!(written.items.len(), 2);
    }

    #[test]
    fn path_like_names_stay_inside_output_dir() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        let mut list = sample();
        list.push(Resource::new(ResourceKind::ConfigMap, "../../escaped"));
        list.push(Resource::new(ResourceKind::ConfigMap, "a/b"));
        list.push(Resource::new(ResourceKind::ConfigMap, "a\\b"));
        let written =
            write_resources(&list, &out, Classifier::Kubernetes, OutputFormat::Yaml).unwrap();

        assert_eq!(written.items.len(), 2);
        assert!(!dir.path().join("escaped-cm.yml").exists());
        assert!(!out.join("a").exists());
        let doc: ResourceList =
            serde_yaml::from_str(&std::fs::read_to_string(&written.document).unwrap()).unwrap();
        assert_eq!(doc.len(), 5);
    }

    #[test]
    fn file_safe_names() {
        assert!(is_file_safe_name("web"));
        assert!(is_file_safe_name("web.v1_x-2"));
        assert!(!is_file_safe_name(""));
        assert!(!is_file_safe_name(".hidden"));
        assert!(!is_file_safe_name("a..b"));
        assert!(!is_file_safe_name("a/b"));
        assert!(!is_file_safe_name("a\\b"));
    }

    #[test]
    fn duplicate_items_are_listed_once() {
        let dir = tempfile::tempdir().unwrap();
        let mut list = ResourceList::new();
        let mut first = Resource::new(ResourceKind::Service, "web");
        first.metadata.labels.insert("copy".to_owned(), "first".to_owned());
        let mut second = Resource::new(ResourceKind::Service, "web");
        second.metadata.labels.insert("copy".to_owned(), "second".to_owned());
        list.push(first);
        list.push(second);
        let written =
            write_resources(&list, dir.path(), Classifier::Kubernetes, OutputFormat::Yaml)
                .unwrap();

        assert_eq!(written.items, vec![dir.path().join("kubernetes/web-svc.yml")]);
        let item: Resource =
            serde_yaml::from_str(&std::fs::read_to_string(&written.items[0]).unwrap()).unwrap();
        assert_eq!(item.metadata.labels["copy"], "first");
    }

    #[test]
    fn rewriting_replaces_previous_output() {
        let dir = tempfile::tempdir().unwrap();
        write_resources(&sample(), dir.path(), Classifier::Kubernetes, OutputFormat::Yaml).unwrap();
        let written = write_resources(
            &ResourceList::new(),
            dir.path(),
            Classifier::Kubernetes,
            OutputFormat::Yaml,
        )
        .unwrap();
        let doc: ResourceList =
            serde_yaml::from_str(&std::fs::read_to_string(written.document).unwrap()).unwrap();
        assert!(doc.is_empty());
    }
}
