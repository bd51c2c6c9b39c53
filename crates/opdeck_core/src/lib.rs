//! Core plugin-discovery and invocation engine for OpDeck.
//! This crate owns every invariant about loaded modules, handles and dispatch.

pub mod catalog;
pub mod config;
pub mod contract;
pub mod host;
pub mod invoke;
pub mod loader;
pub mod logging;

pub use catalog::{
    CatalogEntry, CatalogError, DiscoveryFault, DiscoveryOptions, DuplicateNamePolicy,
    ModuleFailurePolicy, OperationCatalog, OperationHandle, OperationInstance, SkippedModule,
};
pub use config::{ConfigError, HostConfig, MODULE_DIR_ENV};
pub use contract::{
    CompatibilityError, ContractDescriptor, ContractError, ContractNames, ContractSlot,
    InterfaceTable,
};
pub use host::{HostError, OperationHost};
pub use invoke::{InvocationEngine, InvokeError};
pub use loader::{
    ExtensionModule, InProcessLoader, LibraryLoader, LoadError, LookupError, MethodHandle,
    ModuleLoader, PropertyHandle, TypeHandle,
};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
