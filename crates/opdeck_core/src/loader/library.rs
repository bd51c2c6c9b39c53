//! Shared-library backed module loading.

use super::module::{ExtensionModule, ModuleBacking};
use super::{LoadError, ModuleLoader};
use libloading::{Library, Symbol};
use log::debug;
use opdeck_abi::{ModuleTypesFn, MODULE_TYPES_SYMBOL};
use std::path::Path;
use std::rc::Rc;

const MODULE_TYPES_SYMBOL_NAME: &str = "opdeck_module_types";

/// Opens modules as platform shared libraries (`.so`, `.dylib`, `.dll`).
///
/// Opened libraries are never unloaded.
#[derive(Debug, Default, Clone, Copy)]
pub struct LibraryLoader;

impl LibraryLoader {
    pub fn new() -> Self {
        Self
    }
}

impl ModuleLoader for LibraryLoader {
    fn load(&self, path: &Path) -> Result<Rc<ExtensionModule>, LoadError> {
        if !path.is_file() {
            return Err(LoadError::NotFound(path.to_path_buf()));
        }

        // SAFETY: opening a library runs its initializers; extension code is
        // trusted by the hosting contract.
        let library = unsafe { Library::new(path) }.map_err(|err| LoadError::Open {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;

        // SAFETY: the symbol type matches `export_module!`; the returned table
        // lives inside `library`, which moves into the module backing.
        let table = unsafe {
            let entry: Symbol<ModuleTypesFn> =
                library
                    .get(MODULE_TYPES_SYMBOL)
                    .map_err(|err| LoadError::MissingEntryPoint {
                        path: path.to_path_buf(),
                        symbol: MODULE_TYPES_SYMBOL_NAME,
                        message: err.to_string(),
                    })?;
            entry()
        };
        debug!(
            "event=module_open module=loader status=ok backing=library path={}",
            path.display()
        );

        // SAFETY: see above; the backing keeps the table mapped.
        unsafe { ExtensionModule::from_table(path, table, ModuleBacking::resident(library)) }
    }
}
