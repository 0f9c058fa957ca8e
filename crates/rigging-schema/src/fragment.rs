//! Reading of on-disk resource fragments.
//!
//! A fragment is a partial resource in YAML or JSON. Fields missing from the
//! fragment are derived from its file name: `demo-svc.yml` describes a
//! `Service` named `demo`, a bare `deployment.yml` a `Deployment` named after
//! the project.

use crate::resource::{object_entry, Resource, ResourceKind, ResourceList};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

const FRAGMENT_EXTENSIONS: &[&str] = &["yml", "yaml", "json"];

#[derive(Debug, Error)]
pub enum FragmentError {
    #[error("cannot read fragment {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("cannot parse fragment {path}: {message}")]
    Parse { path: PathBuf, message: String },
    #[error("fragment {0} has no kind and none can be derived from its file name")]
    MissingKind(PathBuf),
}

/// List fragment files in `dir`, sorted by file name. A missing directory
/// yields an empty list.
pub fn list_fragments(dir: &Path) -> Result<Vec<PathBuf>, FragmentError> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let entries = fs::read_dir(dir).map_err(|source| FragmentError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut files: Vec<PathBuf> = entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| FRAGMENT_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        })
        .collect();
    files.sort();
    Ok(files)
}

/// Read all fragments of `dir` into a document, in file-name order.
pub fn read_fragments(dir: &Path, default_name: &str) -> Result<ResourceList, FragmentError> {
    let mut list = ResourceList::new();
    for path in list_fragments(dir)? {
        list.push(read_fragment(&path, default_name)?);
    }
    Ok(list)
}

/// Read one fragment, filling `kind`, `metadata.name` and `apiVersion` when
/// absent. Values present in the file are never changed.
pub fn read_fragment(path: &Path, default_name: &str) -> Result<Resource, FragmentError> {
    let content = fs::read_to_string(path).map_err(|source| FragmentError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    let parsed: Value = if is_json {
        serde_json::from_str(&content).map_err(|e| parse_error(path, &e))?
    } else {
        serde_yaml::from_str(&content).map_err(|e| parse_error(path, &e))?
    };
    let Value::Object(mut fields) = parsed else {
        return Err(FragmentError::Parse {
            path: path.to_path_buf(),
            message: "fragment must be a mapping".to_owned(),
        });
    };

    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default();
    let (file_name, file_kind) = split_file_stem(stem);

    let kind = match fields.get("kind").and_then(Value::as_str) {
        Some(kind) => ResourceKind::from(kind.to_owned()),
        None => file_kind.ok_or_else(|| FragmentError::MissingKind(path.to_path_buf()))?,
    };
    fields.insert("kind".to_owned(), Value::String(kind.as_str().to_owned()));
    fields
        .entry("apiVersion".to_owned())
        .or_insert_with(|| Value::String(kind.default_api_version().to_owned()));

    let metadata = object_entry(&mut fields, "metadata");
    if !metadata.get("name").is_some_and(Value::is_string) {
        let name = file_name.unwrap_or(default_name);
        metadata.insert("name".to_owned(), Value::String(name.to_owned()));
    }
    for key in ["labels", "annotations"] {
        if let Some(Value::Object(tags)) = metadata.get_mut(key) {
            stringify_scalars(tags);
        }
    }

    serde_json::from_value(Value::Object(fields)).map_err(|e| parse_error(path, &e))
}

/// Unquoted YAML scalars such as `version: 2` become their string form.
fn stringify_scalars(tags: &mut serde_json::Map<String, Value>) {
    for value in tags.values_mut() {
        match value {
            Value::Number(n) => *value = Value::String(n.to_string()),
            Value::Bool(b) => *value = Value::String(b.to_string()),
            _ => {}
        }
    }
}

/// Split `name-suffix` into its name and kind parts. A stem that is only a
/// kind suffix has no name; a stem without a known suffix has no kind.
fn split_file_stem(stem: &str) -> (Option<&str>, Option<ResourceKind>) {
    if let Some(kind) = ResourceKind::from_file_suffix(stem) {
        return (None, Some(kind));
    }
    if let Some((name, suffix)) = stem.rsplit_once('-') {
        if let Some(kind) = ResourceKind::from_file_suffix(suffix) {
            return (Some(name).filter(|n| !n.is_empty()), Some(kind));
        }
    }
    (Some(stem).filter(|s| !s.is_empty()), None)
}

fn parse_error(path: &Path, err: &dyn std::fmt::Display) -> FragmentError {
    FragmentError::Parse {
        path: path.to_path_buf(),
        message: err.to_string(),
    }
}
