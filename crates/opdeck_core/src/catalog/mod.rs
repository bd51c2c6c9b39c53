//! Operation Catalog: discovers operation modules and owns their instances.
//!
//! # Responsibility
//! - Scan one directory for candidate module files in case-insensitive
//!   file-name order.
//! - Load, bind, instantiate and name one operation per module.
//! - Issue a process-unique handle per instance.
//!
//! # Invariants
//! - The catalog is immutable once built; handles stay valid for its lifetime.
//! - The contract module is never cataloged.
//! - Entry order equals discovery order.

use crate::contract::{CompatibilityError, ContractDescriptor};
use crate::loader::{LoadError, LookupError, ModuleLoader};
use log::{debug, info, warn};
use regex::Regex;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::time::Instant;

mod handle;
mod instance;

pub use handle::OperationHandle;
pub use instance::OperationInstance;

use handle::HandleBlock;

/// What discovery does with a module that cannot be cataloged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModuleFailurePolicy {
    /// Skip without an operator-visible diagnostic.
    Skip,
    /// Skip and log a warning.
    #[default]
    Report,
    /// Fail the whole discovery.
    Abort,
}

/// How repeated display names are presented.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateNamePolicy {
    #[default]
    Keep,
    /// Later duplicates become `Name (2)`, `Name (3)`, ..., skipping any
    /// label already issued.
    Annotate,
}

/// Resolved discovery settings.
#[derive(Debug, Clone)]
pub struct DiscoveryOptions {
    pub module_pattern: Regex,
    pub namespace: String,
    pub implementation_type: String,
    pub name_property: String,
    pub failure_policy: ModuleFailurePolicy,
    pub duplicate_names: DuplicateNamePolicy,
}

/// `(display name, handle)` pair exposed to the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub name: String,
    pub handle: OperationHandle,
}

/// A candidate module that did not make it into the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedModule {
    pub path: PathBuf,
    pub fault: DiscoveryFault,
}

/// Ordered, immutable set of discovered operations.
#[derive(Debug)]
pub struct OperationCatalog {
    entries: Vec<CatalogEntry>,
    instances: Vec<OperationInstance>,
    handles: HandleBlock,
    skipped: Vec<SkippedModule>,
}

impl OperationCatalog {
    /// Catalogs every module in `directory` matching the candidate pattern,
    /// excluding files named like `exclude`.
    ///
    /// # Errors
    /// - `ReadDir` when the directory cannot be listed.
    /// - `ModuleRejected` for the first faulty module under
    ///   [`ModuleFailurePolicy::Abort`].
    pub fn discover(
        loader: &dyn ModuleLoader,
        contract: &ContractDescriptor,
        directory: &Path,
        exclude: &Path,
        options: &DiscoveryOptions,
    ) -> Result<Self, CatalogError> {
        let started_at = Instant::now();
        info!(
            "event=catalog_discover module=catalog status=start dir={}",
            directory.display()
        );

        let candidates = list_candidates(directory, exclude, &options.module_pattern)?;
        let mut instances = Vec::with_capacity(candidates.len());
        let mut skipped = Vec::new();
        for path in candidates {
            match instantiate(loader, contract, &path, options) {
                Ok(instance) => {
                    debug!(
                        "event=module_load module=catalog status=ok path={} type={} name={}",
                        path.display(),
                        instance.type_name(),
                        instance.name()
                    );
                    instances.push(instance);
                }
                Err(fault) => {
                    let rejected = SkippedModule { path, fault };
                    match options.failure_policy {
                        ModuleFailurePolicy::Skip => debug!(
                            "event=module_skip module=catalog status=skipped path={} reason={}",
                            rejected.path.display(),
                            rejected.fault
                        ),
                        ModuleFailurePolicy::Report => warn!(
                            "event=module_skip module=catalog status=skipped path={} reason={}",
                            rejected.path.display(),
                            rejected.fault
                        ),
                        ModuleFailurePolicy::Abort => {
                            warn!(
                                "event=catalog_discover module=catalog status=error path={} reason={}",
                                rejected.path.display(),
                                rejected.fault
                            );
                            return Err(CatalogError::ModuleRejected(rejected));
                        }
                    }
                    skipped.push(rejected);
                }
            }
        }

        let handles = HandleBlock::reserve(instances.len());
        let names = display_names(&instances, options.duplicate_names);
        let entries = names
            .into_iter()
            .enumerate()
            .map(|(index, name)| CatalogEntry {
                name,
                handle: handles.issue(index),
            })
            .collect::<Vec<_>>();

        info!(
            "event=catalog_discover module=catalog status=ok duration_ms={} entries={} skipped={}",
            started_at.elapsed().as_millis(),
            entries.len(),
            skipped.len()
        );
        Ok(Self {
            entries,
            instances,
            handles,
            skipped,
        })
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|entry| entry.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resolves a handle issued by this catalog.
    pub fn resolve(&self, handle: OperationHandle) -> Option<&OperationInstance> {
        self.handles
            .index_of(handle)
            .and_then(|index| self.instances.get(index))
    }

    /// Finds the first entry with display name `name`.
    pub fn find(&self, name: &str) -> Option<&CatalogEntry> {
        self.entries.iter().find(|entry| entry.name == name)
    }

    pub fn skipped(&self) -> &[SkippedModule] {
        &self.skipped
    }
}

fn list_candidates(
    directory: &Path,
    exclude: &Path,
    pattern: &Regex,
) -> Result<Vec<PathBuf>, CatalogError> {
    let read_error = |source| CatalogError::ReadDir {
        dir: directory.to_path_buf(),
        source,
    };
    let excluded_name = exclude.file_name();

    let mut candidates = Vec::new();
    for entry in std::fs::read_dir(directory).map_err(read_error)? {
        let entry = entry.map_err(read_error)?;
        let file_name = entry.file_name();
        if excluded_name == Some(file_name.as_os_str()) {
            continue;
        }
        let Some(name) = file_name.to_str() else {
            continue;
        };
        if !pattern.is_match(name) {
            continue;
        }
        let path = entry.path();
        if path.is_file() {
            candidates.push((name.to_string(), path));
        }
    }
    // Case-insensitive name order; byte order breaks ties.
    candidates.sort_by_cached_key(|(name, _)| (name.to_lowercase(), name.clone()));
    Ok(candidates.into_iter().map(|(_, path)| path).collect())
}

fn instantiate(
    loader: &dyn ModuleLoader,
    contract: &ContractDescriptor,
    path: &Path,
    options: &DiscoveryOptions,
) -> Result<OperationInstance, DiscoveryFault> {
    let module = loader.load(path)?;
    let ty = module.find_type(&options.namespace, &options.implementation_type)?;
    let interface_table = contract.bind(&ty)?;
    let name_property = ty.find_property(&options.name_property)?;
    OperationInstance::create(&ty, &name_property, interface_table)
}

fn display_names(instances: &[OperationInstance], policy: DuplicateNamePolicy) -> Vec<String> {
    if policy == DuplicateNamePolicy::Keep {
        return instances
            .iter()
            .map(|instance| instance.name().to_string())
            .collect();
    }

    // Annotated labels never collide with any label issued before them.
    let mut issued = HashSet::<String>::new();
    let mut next_suffix = HashMap::<&str, usize>::new();
    instances
        .iter()
        .map(|instance| {
            let name = instance.name();
            let mut label = name.to_string();
            if issued.contains(&label) {
                let suffix = next_suffix.entry(name).or_insert(2);
                label = format!("{name} ({suffix})");
                while issued.contains(&label) {
                    *suffix += 1;
                    label = format!("{name} ({suffix})");
                }
                *suffix += 1;
            }
            issued.insert(label.clone());
            label
        })
        .collect()
}

/// Why one candidate module was not cataloged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryFault {
    Load(LoadError),
    Lookup(LookupError),
    Incompatible(CompatibilityError),
    NotConstructible,
    ConstructionFailed,
    NameUnreadable,
}

impl Display for DiscoveryFault {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Load(err) => write!(f, "{err}"),
            Self::Lookup(err) => write!(f, "{err}"),
            Self::Incompatible(err) => write!(f, "{err}"),
            Self::NotConstructible => write!(f, "operation type has no default constructor"),
            Self::ConstructionFailed => write!(f, "operation constructor returned no object"),
            Self::NameUnreadable => write!(f, "operation name is missing or unreadable"),
        }
    }
}

impl Error for DiscoveryFault {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Load(err) => Some(err),
            Self::Lookup(err) => Some(err),
            Self::Incompatible(err) => Some(err),
            Self::NotConstructible | Self::ConstructionFailed | Self::NameUnreadable => None,
        }
    }
}

impl From<LoadError> for DiscoveryFault {
    fn from(value: LoadError) -> Self {
        Self::Load(value)
    }
}

impl From<LookupError> for DiscoveryFault {
    fn from(value: LookupError) -> Self {
        Self::Lookup(value)
    }
}

impl From<CompatibilityError> for DiscoveryFault {
    fn from(value: CompatibilityError) -> Self {
        Self::Incompatible(value)
    }
}

/// Discovery-level failures.
#[derive(Debug)]
pub enum CatalogError {
    ReadDir {
        dir: PathBuf,
        source: std::io::Error,
    },
    ModuleRejected(SkippedModule),
}

impl Display for CatalogError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ReadDir { dir, source } => {
                write!(f, "cannot list module directory {}: {source}", dir.display())
            }
            Self::ModuleRejected(skipped) => write!(
                f,
                "module {} rejected: {}",
                skipped.path.display(),
                skipped.fault
            ),
        }
    }
}

impl Error for CatalogError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::ReadDir { source, .. } => Some(source),
            Self::ModuleRejected(skipped) => Some(&skipped.fault),
        }
    }
}
