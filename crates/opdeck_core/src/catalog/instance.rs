//! Live operation objects owned by a catalog.

use super::DiscoveryFault;
use crate::contract::InterfaceTable;
use crate::loader::{ExtensionModule, PropertyHandle, TypeHandle};
use opdeck_abi::DestroyFn;
use std::ffi::c_void;
use std::fmt::{Debug, Formatter};
use std::ptr::NonNull;
use std::rc::Rc;

/// One instantiated operation object.
///
/// The foreign object is destroyed before the owning module is released.
pub struct OperationInstance {
    object: NonNull<c_void>,
    destroy: Option<DestroyFn>,
    interface_table: InterfaceTable,
    name: String,
    type_name: String,
    module: Rc<ExtensionModule>,
}

impl OperationInstance {
    /// Default-constructs `ty` and reads its display name through
    /// `name_property`.
    pub(crate) fn create(
        ty: &TypeHandle,
        name_property: &PropertyHandle,
        interface_table: InterfaceTable,
    ) -> Result<Self, DiscoveryFault> {
        let construct = ty.constructor().ok_or(DiscoveryFault::NotConstructible)?;
        let getter = name_property
            .getter()
            .ok_or(DiscoveryFault::NameUnreadable)?;

        // SAFETY: `construct` comes from a validated table of a module kept
        // alive by `ty`.
        let object = NonNull::new(unsafe { construct() })
            .ok_or(DiscoveryFault::ConstructionFailed)?;
        let mut instance = Self {
            object,
            destroy: ty.destructor(),
            interface_table,
            name: String::new(),
            type_name: ty.qualified_name(),
            module: Rc::clone(ty.module()),
        };

        // SAFETY: the object is live; the borrowed string is copied before
        // any further foreign call.
        let name = unsafe {
            getter(instance.object.as_ptr() as *const c_void)
                .to_str()
                .map(str::to_string)
        }
        .map_err(|_| DiscoveryFault::NameUnreadable)?;
        if name.trim().is_empty() {
            return Err(DiscoveryFault::NameUnreadable);
        }
        instance.name = name;
        Ok(instance)
    }

    /// Display label read once at construction.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// `namespace.type` of the runtime type.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn module(&self) -> &ExtensionModule {
        &self.module
    }

    pub(crate) fn interface_table(&self) -> &InterfaceTable {
        &self.interface_table
    }

    pub(crate) fn object_ptr(&self) -> *mut c_void {
        self.object.as_ptr()
    }
}

impl Debug for OperationInstance {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperationInstance")
            .field("name", &self.name)
            .field("type_name", &self.type_name)
            .field("module", &self.module.path())
            .finish()
    }
}

impl Drop for OperationInstance {
    fn drop(&mut self) {
        if let Some(destroy) = self.destroy {
            // SAFETY: the object came from this type's constructor and is
            // released exactly once, while its module is still mapped.
            unsafe { destroy(self.object.as_ptr()) };
        }
    }
}
