//! Module loading from tables compiled into the host binary.

use super::module::{ExtensionModule, ModuleBacking};
use super::{LoadError, ModuleLoader};
use opdeck_abi::ModuleTypeTable;
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::Path;
use std::rc::Rc;

/// Resolves module files to `'static` tables linked into the host.
///
/// The file must still exist on disk; only its name is used to pick the
/// table. Files without a registered table fail like an unloadable library.
#[derive(Default)]
pub struct InProcessLoader {
    modules: BTreeMap<OsString, &'static ModuleTypeTable>,
}

impl InProcessLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `table` for files named `file_name`.
    pub fn register(&mut self, file_name: impl Into<OsString>, table: &'static ModuleTypeTable) {
        self.modules.insert(file_name.into(), table);
    }

    pub fn with_module(
        mut self,
        file_name: impl Into<OsString>,
        table: &'static ModuleTypeTable,
    ) -> Self {
        self.register(file_name, table);
        self
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

impl ModuleLoader for InProcessLoader {
    fn load(&self, path: &Path) -> Result<Rc<ExtensionModule>, LoadError> {
        if !path.is_file() {
            return Err(LoadError::NotFound(path.to_path_buf()));
        }
        let table = path
            .file_name()
            .and_then(|name| self.modules.get(name))
            .ok_or_else(|| LoadError::Unregistered(path.to_path_buf()))?;

        // SAFETY: registered tables are `'static` and never unmapped.
        unsafe { ExtensionModule::from_table(path, *table, ModuleBacking::InProcess) }
    }
}
