//! Host context: one contract, one catalog, built once at startup.
//!
//! # Responsibility
//! - Run the startup sequence (contract first, then discovery).
//! - Serve the presentation-facing queries: list operations, execute one.
//!
//! # Invariants
//! - A started host never re-reads the module directory on its own.
//! - Contract failures are fatal; per-module failures follow the policy in
//!   [`HostConfig::failure_policy`].

use crate::catalog::{CatalogEntry, CatalogError, OperationCatalog, OperationHandle, SkippedModule};
use crate::config::{ConfigError, HostConfig};
use crate::contract::{ContractDescriptor, ContractError};
use crate::invoke::{InvocationEngine, InvokeError};
use crate::loader::{LibraryLoader, ModuleLoader};
use log::{error, info};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

#[derive(Debug)]
pub struct OperationHost {
    config: HostConfig,
    contract: ContractDescriptor,
    catalog: OperationCatalog,
}

impl OperationHost {
    /// Starts a host whose modules are platform shared libraries.
    pub fn start(config: HostConfig) -> Result<Self, HostError> {
        Self::start_with_loader(config, &LibraryLoader::new())
    }

    /// Starts a host using `loader` for the contract and every candidate.
    pub fn start_with_loader(
        config: HostConfig,
        loader: &dyn ModuleLoader,
    ) -> Result<Self, HostError> {
        let started_at = Instant::now();
        info!(
            "event=host_start module=host status=start module_dir={}",
            config.module_dir.display()
        );

        let result = Self::boot(config, loader);
        match &result {
            Ok(host) => info!(
                "event=host_start module=host status=ok duration_ms={} operations={} skipped={}",
                started_at.elapsed().as_millis(),
                host.catalog.len(),
                host.catalog.skipped().len()
            ),
            Err(err) => error!(
                "event=host_start module=host status=error duration_ms={} error={}",
                started_at.elapsed().as_millis(),
                err
            ),
        }
        result
    }

    fn boot(config: HostConfig, loader: &dyn ModuleLoader) -> Result<Self, HostError> {
        let options = config.validated_options()?;
        let contract_path = config.contract_path();
        let contract =
            ContractDescriptor::initialize(loader, &contract_path, &config.contract_names())?;
        let catalog = OperationCatalog::discover(
            loader,
            &contract,
            &config.module_dir,
            &contract_path,
            &options,
        )?;
        Ok(Self {
            config,
            contract,
            catalog,
        })
    }

    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    pub fn contract(&self) -> &ContractDescriptor {
        &self.contract
    }

    pub fn catalog(&self) -> &OperationCatalog {
        &self.catalog
    }

    /// `(display name, handle)` pairs in discovery order.
    pub fn operations(&self) -> &[CatalogEntry] {
        self.catalog.entries()
    }

    pub fn execute_operation(
        &self,
        handle: OperationHandle,
        a: f64,
        b: f64,
    ) -> Result<f64, InvokeError> {
        InvocationEngine::new(&self.contract, &self.catalog).execute(handle, a, b)
    }

    /// Runs discovery again against the same directory and contract.
    ///
    /// The returned catalog is independent of the host's own; its handles
    /// are fresh and not resolvable through this host.
    pub fn rediscover(&self, loader: &dyn ModuleLoader) -> Result<OperationCatalog, HostError> {
        let options = self.config.discovery_options()?;
        let catalog = OperationCatalog::discover(
            loader,
            &self.contract,
            &self.config.module_dir,
            &self.config.contract_path(),
            &options,
        )?;
        Ok(catalog)
    }

    pub fn skipped_modules(&self) -> &[SkippedModule] {
        self.catalog.skipped()
    }
}

/// Startup failures; each one leaves no host behind.
#[derive(Debug)]
pub enum HostError {
    Config(ConfigError),
    Contract(ContractError),
    Catalog(CatalogError),
}

impl Display for HostError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(err) => write!(f, "invalid host config: {err}"),
            Self::Contract(err) => write!(f, "{err}"),
            Self::Catalog(err) => write!(f, "operation discovery failed: {err}"),
        }
    }
}

impl Error for HostError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(err) => Some(err),
            Self::Contract(err) => Some(err),
            Self::Catalog(err) => Some(err),
        }
    }
}

impl From<ConfigError> for HostError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<ContractError> for HostError {
    fn from(value: ContractError) -> Self {
        Self::Contract(value)
    }
}

impl From<CatalogError> for HostError {
    fn from(value: CatalogError) -> Self {
        Self::Catalog(value)
    }
}
