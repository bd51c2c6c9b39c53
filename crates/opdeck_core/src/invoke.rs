//! Invocation Engine: executes cataloged operations by handle.
//!
//! # Invariants
//! - Dispatch always goes through the instance's interface table at the
//!   contract's execute slot, never through a statically known body.
//! - The engine keeps no per-call state.

use crate::catalog::{OperationCatalog, OperationHandle};
use crate::contract::ContractDescriptor;
use log::{debug, warn};
use opdeck_abi::CALL_OK;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Borrowing view over the startup-built contract and catalog.
#[derive(Debug, Clone, Copy)]
pub struct InvocationEngine<'a> {
    contract: &'a ContractDescriptor,
    catalog: &'a OperationCatalog,
}

impl<'a> InvocationEngine<'a> {
    pub fn new(contract: &'a ContractDescriptor, catalog: &'a OperationCatalog) -> Self {
        Self { contract, catalog }
    }

    /// Executes the operation behind `handle` with operands `a` and `b`.
    ///
    /// # Errors
    /// - `InvalidHandle` when this catalog never issued `handle`.
    /// - `Dispatch` when the foreign body reports a failure.
    pub fn execute(&self, handle: OperationHandle, a: f64, b: f64) -> Result<f64, InvokeError> {
        let Some(instance) = self.catalog.resolve(handle) else {
            warn!(
                "event=operation_execute module=invoke status=error error_code=invalid_handle handle={}",
                handle
            );
            return Err(InvokeError::InvalidHandle(handle));
        };

        let dispatch_error = || InvokeError::Dispatch {
            handle,
            operation: instance.name().to_string(),
        };
        let method = instance
            .interface_table()
            .entry(self.contract.execute_slot())
            .ok_or_else(dispatch_error)?;

        let mut result = f64::NAN;
        // SAFETY: the entry was bound to this instance's runtime type at
        // discovery and the object stays alive for the catalog's lifetime.
        let status = unsafe { method(instance.object_ptr(), a, b, &mut result) };
        if status != CALL_OK {
            warn!(
                "event=operation_execute module=invoke status=error error_code=dispatch_failed handle={} operation={} foreign_status={}",
                handle,
                instance.name(),
                status
            );
            return Err(dispatch_error());
        }

        debug!(
            "event=operation_execute module=invoke status=ok handle={} operation={}",
            handle,
            instance.name()
        );
        Ok(result)
    }
}

/// Per-call invocation failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvokeError {
    InvalidHandle(OperationHandle),
    Dispatch {
        handle: OperationHandle,
        operation: String,
    },
}

impl Display for InvokeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidHandle(handle) => write!(f, "operation handle {handle} is not valid"),
            Self::Dispatch { handle, operation } => {
                write!(f, "operation `{operation}` (handle {handle}) failed")
            }
        }
    }
}

impl Error for InvokeError {}
