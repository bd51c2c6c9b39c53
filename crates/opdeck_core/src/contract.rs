//! Core Registry: loads the contract module and caches its dispatch metadata.
//!
//! # Responsibility
//! - Load the distinguished contract module before any operation module.
//! - Resolve the contract interface and its execute method once.
//! - Bind operation types to the contract's slot layout.
//!
//! # Invariants
//! - A host context holds exactly one [`ContractDescriptor`], immutable
//!   after `initialize`.
//! - Every bound interface table has one callable entry per contract slot.

use crate::loader::{LoadError, LookupError, MethodHandle, ModuleLoader, TypeHandle};
use log::{error, info};
use opdeck_abi::{BinaryMethodFn, TypeKind};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;
use std::time::Instant;

/// Names identifying the contract inside the contract module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractNames {
    pub namespace: String,
    pub interface_type: String,
    pub execute_method: String,
}

impl Default for ContractNames {
    fn default() -> Self {
        Self {
            namespace: opdeck_abi::CONTRACT_NAMESPACE.to_string(),
            interface_type: opdeck_abi::CONTRACT_INTERFACE.to_string(),
            execute_method: opdeck_abi::EXECUTE_METHOD.to_string(),
        }
    }
}

/// One method slot of the contract interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractSlot {
    pub method: String,
    pub arity: u32,
}

/// Cached contract metadata shared read-only by discovery and invocation.
#[derive(Debug)]
pub struct ContractDescriptor {
    interface: TypeHandle,
    execute: MethodHandle,
    qualified_name: String,
    slots: Vec<ContractSlot>,
}

impl ContractDescriptor {
    /// Loads the contract module at `core_module_path` and resolves the
    /// interface type plus its two-argument execute method.
    ///
    /// Every error is fatal for the host.
    pub fn initialize(
        loader: &dyn ModuleLoader,
        core_module_path: &Path,
        names: &ContractNames,
    ) -> Result<Self, ContractError> {
        let started_at = Instant::now();
        info!(
            "event=contract_init module=contract status=start path={}",
            core_module_path.display()
        );

        match Self::resolve(loader, core_module_path, names) {
            Ok(contract) => {
                info!(
                    "event=contract_init module=contract status=ok duration_ms={} interface={} slots={}",
                    started_at.elapsed().as_millis(),
                    contract.qualified_name,
                    contract.slots.len()
                );
                Ok(contract)
            }
            Err(err) => {
                error!(
                    "event=contract_init module=contract status=error duration_ms={} error={}",
                    started_at.elapsed().as_millis(),
                    err
                );
                Err(err)
            }
        }
    }

    fn resolve(
        loader: &dyn ModuleLoader,
        core_module_path: &Path,
        names: &ContractNames,
    ) -> Result<Self, ContractError> {
        let module = loader.load(core_module_path)?;
        let interface = module
            .find_type(&names.namespace, &names.interface_type)
            .map_err(ContractError::TypeNotFound)?;
        if interface.kind() != TypeKind::Interface {
            return Err(ContractError::NotAnInterface(interface.qualified_name()));
        }
        let execute = interface
            .find_method(&names.execute_method, opdeck_abi::EXECUTE_ARITY)
            .map_err(ContractError::MethodNotFound)?;

        let slots = interface
            .method_signatures()
            .into_iter()
            .map(|(method, arity)| ContractSlot { method, arity })
            .collect();

        Ok(Self {
            qualified_name: interface.qualified_name(),
            interface,
            execute,
            slots,
        })
    }

    /// `namespace.type` of the contract interface.
    pub fn qualified_name(&self) -> &str {
        &self.qualified_name
    }

    pub fn interface(&self) -> &TypeHandle {
        &self.interface
    }

    pub fn execute_method(&self) -> &MethodHandle {
        &self.execute
    }

    /// Interface-table index of the execute method.
    pub fn execute_slot(&self) -> usize {
        self.execute.slot()
    }

    pub fn slots(&self) -> &[ContractSlot] {
        &self.slots
    }

    /// Checks that `ty` implements the contract and resolves the overriding
    /// body for every slot.
    pub fn bind(&self, ty: &TypeHandle) -> Result<InterfaceTable, CompatibilityError> {
        if !ty.implements(&self.qualified_name) {
            return Err(CompatibilityError::NotImplemented {
                type_name: ty.qualified_name(),
                interface: self.qualified_name.clone(),
            });
        }

        let mut entries = Vec::with_capacity(self.slots.len());
        for slot in &self.slots {
            let entry = ty
                .find_override(&self.qualified_name, &slot.method, slot.arity)
                .ok()
                .and_then(|method| method.entry())
                .ok_or_else(|| CompatibilityError::MissingOverride {
                    type_name: ty.qualified_name(),
                    method: slot.method.clone(),
                    arity: slot.arity,
                })?;
            entries.push(entry);
        }
        Ok(InterfaceTable { entries })
    }
}

/// Per-type dispatch table indexed by contract slot.
#[derive(Debug, Clone)]
pub struct InterfaceTable {
    entries: Vec<BinaryMethodFn>,
}

impl InterfaceTable {
    pub fn entry(&self, slot: usize) -> Option<BinaryMethodFn> {
        self.entries.get(slot).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Startup failures while establishing the contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContractError {
    Load(LoadError),
    TypeNotFound(LookupError),
    MethodNotFound(LookupError),
    NotAnInterface(String),
}

impl Display for ContractError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Load(err) => write!(f, "contract module failed to load: {err}"),
            Self::TypeNotFound(err) | Self::MethodNotFound(err) => {
                write!(f, "contract module is incomplete: {err}")
            }
            Self::NotAnInterface(name) => {
                write!(f, "contract type {name} is not an interface")
            }
        }
    }
}

impl Error for ContractError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Load(err) => Some(err),
            Self::TypeNotFound(err) | Self::MethodNotFound(err) => Some(err),
            Self::NotAnInterface(_) => None,
        }
    }
}

impl From<LoadError> for ContractError {
    fn from(value: LoadError) -> Self {
        Self::Load(value)
    }
}

/// An operation type does not structurally satisfy the contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompatibilityError {
    NotImplemented {
        type_name: String,
        interface: String,
    },
    MissingOverride {
        type_name: String,
        method: String,
        arity: u32,
    },
}

impl Display for CompatibilityError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotImplemented {
                type_name,
                interface,
            } => write!(f, "type {type_name} does not implement {interface}"),
            Self::MissingOverride {
                type_name,
                method,
                arity,
            } => write!(
                f,
                "type {type_name} has no callable override for {method}/{arity}"
            ),
        }
    }
}

impl Error for CompatibilityError {}
