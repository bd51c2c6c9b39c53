//! Module Loader: opens extension modules and exposes their type metadata.
//!
//! # Responsibility
//! - Open one module from a filesystem path and decode its exported table.
//! - Resolve types, methods and properties by name (the only place string
//!   lookups happen; callers keep the returned handles).
//!
//! # Invariants
//! - A returned [`ExtensionModule`] has passed full table validation.
//! - Handles keep their module alive through a shared `Rc`.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::rc::Rc;

mod in_process;
mod library;
mod module;

pub use in_process::InProcessLoader;
pub use library::LibraryLoader;
pub use module::{ExtensionModule, MethodHandle, PropertyHandle, TypeHandle};

/// Source of extension modules.
pub trait ModuleLoader {
    /// Opens the module at `path`. Static initializers run as part of this.
    fn load(&self, path: &Path) -> Result<Rc<ExtensionModule>, LoadError>;
}

/// A module file is missing, cannot be opened, or exports an unusable table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    NotFound(PathBuf),
    Open {
        path: PathBuf,
        message: String,
    },
    MissingEntryPoint {
        path: PathBuf,
        symbol: &'static str,
        message: String,
    },
    AbiMismatch {
        path: PathBuf,
        found: u32,
        expected: u32,
    },
    Malformed {
        path: PathBuf,
        reason: String,
    },
    Unregistered(PathBuf),
}

impl LoadError {
    pub fn path(&self) -> &Path {
        match self {
            Self::NotFound(path) | Self::Unregistered(path) => path,
            Self::Open { path, .. }
            | Self::MissingEntryPoint { path, .. }
            | Self::AbiMismatch { path, .. }
            | Self::Malformed { path, .. } => path,
        }
    }
}

impl Display for LoadError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(path) => write!(f, "module not found: {}", path.display()),
            Self::Open { path, message } => {
                write!(f, "module could not be opened: {}: {message}", path.display())
            }
            Self::MissingEntryPoint {
                path,
                symbol,
                message,
            } => write!(
                f,
                "module {} does not export `{symbol}`: {message}",
                path.display()
            ),
            Self::AbiMismatch {
                path,
                found,
                expected,
            } => write!(
                f,
                "module {} uses table version {found}, host expects {expected}",
                path.display()
            ),
            Self::Malformed { path, reason } => {
                write!(f, "module {} exports a malformed table: {reason}", path.display())
            }
            Self::Unregistered(path) => write!(
                f,
                "no in-process module registered for {}",
                path.display()
            ),
        }
    }
}

impl Error for LoadError {}

/// A named type, method or property is absent from a loaded module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    TypeNotFound {
        module: PathBuf,
        namespace: String,
        type_name: String,
    },
    MethodNotFound {
        type_name: String,
        method: String,
        arity: u32,
    },
    PropertyNotFound {
        type_name: String,
        property: String,
    },
}

impl Display for LookupError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TypeNotFound {
                module,
                namespace,
                type_name,
            } => write!(
                f,
                "type not found: {namespace}.{type_name} in {}",
                module.display()
            ),
            Self::MethodNotFound {
                type_name,
                method,
                arity,
            } => write!(f, "method not found: {type_name}::{method}/{arity}"),
            Self::PropertyNotFound {
                type_name,
                property,
            } => write!(f, "property not found: {type_name}::{property}"),
        }
    }
}

impl Error for LookupError {}
