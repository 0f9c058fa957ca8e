//! Discovery and instantiation of enrichers from descriptors.
//!
//! Descriptors are looked up by logical path in every registered
//! [`DescriptorBundle`]; several bundles may contribute a descriptor at the
//! same path. Identifiers are resolved against an ordered list of
//! [`ProviderScope`]s, each searched together with its ancestor chain.

use crate::context::UnitConfig;
use crate::enricher::EnricherError;
use rigging_schema::{DescriptorEntry, OrderCounter};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("cannot read descriptor {location}: {source}")]
    Io {
        location: String,
        source: std::io::Error,
    },
    #[error("cannot load enricher '{identifier}' defined in {location}:{line}: no provider scope knows this identifier")]
    UnknownUnit {
        identifier: String,
        location: String,
        line: usize,
    },
    #[error("cannot load enricher '{identifier}' defined in {location}:{line}: {source}")]
    Instantiation {
        identifier: String,
        location: String,
        line: usize,
        source: EnricherError,
    },
}

/// One physical descriptor found for a logical path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptorResource {
    pub location: String,
    pub content: String,
}

/// A source of descriptor files, such as the built-in defaults or a plugin
/// directory.
pub trait DescriptorBundle: Send + Sync {
    /// Human-readable location of `path` within this bundle.
    fn location(&self, path: &str) -> String;

    /// Read the descriptor at `path`. `Ok(None)` if this bundle has none.
    fn read(&self, path: &str) -> Result<Option<String>, std::io::Error>;
}

/// Descriptors held in memory, used for the built-in defaults.
#[derive(Debug, Clone, Default)]
pub struct EmbeddedBundle {
    name: String,
    files: BTreeMap<String, String>,
}

impl EmbeddedBundle {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            files: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_file(mut self, path: &str, content: &str) -> Self {
        self.files.insert(path.to_owned(), content.to_owned());
        self
    }
}

impl DescriptorBundle for EmbeddedBundle {
    fn location(&self, path: &str) -> String {
        format!("{}:{path}", self.name)
    }

    fn read(&self, path: &str) -> Result<Option<String>, std::io::Error> {
        Ok(self.files.get(path).cloned())
    }
}

/// Descriptors stored below a root directory.
#[derive(Debug, Clone)]
pub struct DirectoryBundle {
    root: PathBuf,
}

impl DirectoryBundle {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl DescriptorBundle for DirectoryBundle {
    fn location(&self, path: &str) -> String {
        self.root.join(path).display().to_string()
    }

    fn read(&self, path: &str) -> Result<Option<String>, std::io::Error> {
        match std::fs::read_to_string(self.root.join(path)) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// Resolves logical descriptor paths across all registered bundles.
#[derive(Default)]
pub struct DescriptorLoader {
    bundles: Vec<Box<dyn DescriptorBundle>>,
}

impl DescriptorLoader {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_bundle(mut self, bundle: impl DescriptorBundle + 'static) -> Self {
        self.bundles.push(Box::new(bundle));
        self
    }

    pub fn add_bundle(&mut self, bundle: Box<dyn DescriptorBundle>) {
        self.bundles.push(bundle);
    }

    /// Every descriptor available at `path`. Callers must not depend on the
    /// relative order of resources sharing one path.
    pub fn resolve(&self, path: &str) -> Result<Vec<DescriptorResource>, RegistryError> {
        let mut found = Vec::new();
        for bundle in &self.bundles {
            let location = bundle.location(path);
            match bundle.read(path) {
                Ok(Some(content)) => found.push(DescriptorResource { location, content }),
                Ok(None) => {}
                Err(source) => return Err(RegistryError::Io { location, source }),
            }
        }
        Ok(found)
    }
}

/// Builds a unit from the shared configuration and context.
pub type Constructor<C, T> = fn(&UnitConfig, &C) -> Result<T, EnricherError>;

/// A static registration table of constructors keyed by identifier.
///
/// A scope may have a parent. Lookups through a [`UnitResolver`] try the
/// scope first and then its ancestors, so a child can shadow an identifier
/// its parent also provides.
pub struct ProviderScope<C, T> {
    name: String,
    constructors: BTreeMap<String, Constructor<C, T>>,
    parent: Option<Arc<ProviderScope<C, T>>>,
}

impl<C, T> ProviderScope<C, T> {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            constructors: BTreeMap::new(),
            parent: None,
        }
    }

    pub fn with_parent(name: &str, parent: Arc<ProviderScope<C, T>>) -> Self {
        Self {
            parent: Some(parent),
            ..Self::new(name)
        }
    }

    #[must_use]
    pub fn register(mut self, identifier: &str, constructor: Constructor<C, T>) -> Self {
        self.insert(identifier, constructor);
        self
    }

    pub fn insert(&mut self, identifier: &str, constructor: Constructor<C, T>) {
        self.constructors.insert(identifier.to_owned(), constructor);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<&ProviderScope<C, T>> {
        self.parent.as_deref()
    }

    fn lookup_local(&self, identifier: &str) -> Option<Constructor<C, T>> {
        self.constructors.get(identifier).copied()
    }
}

impl<C, T> fmt::Debug for ProviderScope<C, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderScope")
            .field("name", &self.name)
            .field("identifiers", &self.constructors.keys().collect::<Vec<_>>())
            .field("parent", &self.parent.as_ref().map(|p| p.name.as_str()))
            .finish()
    }
}

/// Failure to produce a unit from an identifier.
#[derive(Debug)]
pub enum ResolveError {
    Unknown,
    Failed(EnricherError),
}

/// Searches an ordered list of provider scopes, walking each scope's
/// ancestor chain and skipping scopes already tried.
pub struct UnitResolver<C, T> {
    scopes: Vec<Arc<ProviderScope<C, T>>>,
}

impl<C, T> UnitResolver<C, T> {
    pub fn new(scopes: Vec<Arc<ProviderScope<C, T>>>) -> Self {
        Self { scopes }
    }

    pub fn resolve(&self, identifier: &str) -> Option<Constructor<C, T>> {
        let mut tried: Vec<&ProviderScope<C, T>> = Vec::new();
        for scope in &self.scopes {
            let mut current = Some(scope.as_ref());
            while let Some(candidate) = current {
                if !tried.iter().any(|seen| std::ptr::eq(*seen, candidate)) {
                    if let Some(constructor) = candidate.lookup_local(identifier) {
                        debug!("resolved '{identifier}' in scope '{}'", candidate.name);
                        return Some(constructor);
                    }
                    tried.push(candidate);
                }
                current = candidate.parent();
            }
        }
        None
    }

    pub fn instantiate(
        &self,
        identifier: &str,
        config: &UnitConfig,
        context: &C,
    ) -> Result<T, ResolveError> {
        let constructor = self.resolve(identifier).ok_or(ResolveError::Unknown)?;
        constructor(config, context).map_err(ResolveError::Failed)
    }

    /// All identifiers visible through any scope or ancestor.
    pub fn known_identifiers(&self) -> BTreeSet<String> {
        let mut ids = BTreeSet::new();
        for scope in &self.scopes {
            let mut current = Some(scope.as_ref());
            while let Some(candidate) = current {
                ids.extend(candidate.constructors.keys().cloned());
                current = candidate.parent();
            }
        }
        ids
    }
}

/// Builds the ordered, deduplicated unit list for one run.
pub struct ServiceRegistry<'a, C, T> {
    loader: &'a DescriptorLoader,
    resolver: &'a UnitResolver<C, T>,
    config: &'a UnitConfig,
    context: &'a C,
}

impl<'a, C, T> ServiceRegistry<'a, C, T> {
    pub fn new(
        loader: &'a DescriptorLoader,
        resolver: &'a UnitResolver<C, T>,
        config: &'a UnitConfig,
        context: &'a C,
    ) -> Self {
        Self {
            loader,
            resolver,
            config,
            context,
        }
    }

    /// Create the units listed by the descriptors at `paths`, ordered by
    /// their sort order. Paths are processed in the given order, so default
    /// descriptors should come first to let later ones remove or replace
    /// their entries.
    pub fn build(&self, paths: &[&str]) -> Result<Vec<T>, RegistryError> {
        Ok(self
            .build_entries(paths)?
            .into_iter()
            .map(|(_, unit)| unit)
            .collect())
    }

    /// Like [`build`](Self::build), keeping each unit's descriptor entry.
    pub fn build_entries(&self, paths: &[&str]) -> Result<Vec<(DescriptorEntry, T)>, RegistryError> {
        let mut counter = OrderCounter::new();
        let mut working: Vec<(DescriptorEntry, T)> = Vec::new();

        for path in paths {
            for resource in self.loader.resolve(path)? {
                debug!("reading enricher descriptor {}", resource.location);
                self.apply_resource(&resource, &mut counter, &mut working)?;
            }
        }

        working.sort_by(|(a, _), (b, _)| a.cmp_order(b));
        info!("registered {} enrichers", working.len());
        Ok(working)
    }

    fn apply_resource(
        &self,
        resource: &DescriptorResource,
        counter: &mut OrderCounter,
        working: &mut Vec<(DescriptorEntry, T)>,
    ) -> Result<(), RegistryError> {
        for (idx, line) in resource.content.lines().enumerate() {
            let Some(entry) = DescriptorEntry::parse(line, counter) else {
                continue;
            };

            if entry.is_removal {
                let before = working.len();
                working.retain(|(existing, _)| *existing != entry);
                if working.len() != before {
                    debug!("removed enricher '{}'", entry.identifier);
                }
                continue;
            }

            let unit = self
                .resolver
                .instantiate(&entry.identifier, self.config, self.context)
                .map_err(|e| match e {
                    ResolveError::Unknown => RegistryError::UnknownUnit {
                        identifier: entry.identifier.to_string(),
                        location: resource.location.clone(),
                        line: idx + 1,
                    },
                    ResolveError::Failed(source) => RegistryError::Instantiation {
                        identifier: entry.identifier.to_string(),
                        location: resource.location.clone(),
                        line: idx + 1,
                        source,
                    },
                })?;

            match working.iter().position(|(existing, _)| *existing == entry) {
                Some(pos) => {
                    debug!("replacing enricher '{}' (order {})", entry.identifier, entry.order);
                    working[pos] = (entry, unit);
                }
                None => {
                    debug!("adding enricher '{}' (order {})", entry.identifier, entry.order);
                    working.push((entry, unit));
                }
            }
        }
        Ok(())
    }
}
