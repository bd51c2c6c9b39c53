//! Decoded module metadata and the typed handles resolved from it.

use super::{LoadError, LookupError};
use opdeck_abi::{
    AbiStr, BinaryMethodFn, ConstructFn, DestroyFn, ModuleTypeTable, PropertyGetterFn, TypeKind,
    ABI_VERSION, EXECUTE_ARITY,
};
use std::fmt::{Debug, Formatter};
use std::mem::ManuallyDrop;
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// Keeps the code behind a module's function pointers mapped.
///
/// A shared library is never closed, even after the last handle to its
/// module is dropped; foreign code stays resident until process exit.
pub(crate) enum ModuleBacking {
    Library(ManuallyDrop<libloading::Library>),
    InProcess,
}

impl ModuleBacking {
    pub(crate) fn resident(library: libloading::Library) -> Self {
        Self::Library(ManuallyDrop::new(library))
    }
}

/// A loaded unit of foreign code.
///
/// Holds an owned snapshot of the exported type table; the raw table is not
/// consulted again after load.
pub struct ExtensionModule {
    path: PathBuf,
    types: Vec<TypeMeta>,
    _backing: ModuleBacking,
}

struct TypeMeta {
    namespace: String,
    name: String,
    kind: TypeKind,
    interfaces: Vec<String>,
    methods: Vec<MethodMeta>,
    properties: Vec<PropertyMeta>,
    construct: Option<ConstructFn>,
    destroy: Option<DestroyFn>,
}

struct MethodMeta {
    name: String,
    arity: u32,
    implements: String,
    entry: Option<BinaryMethodFn>,
}

struct PropertyMeta {
    name: String,
    getter: Option<PropertyGetterFn>,
}

impl ExtensionModule {
    /// Decodes and validates `table`, then wraps it with its backing.
    ///
    /// # Safety
    /// `table` must be null or point at a table whose pointers stay valid
    /// for as long as `backing` is alive.
    pub(crate) unsafe fn from_table(
        path: &Path,
        table: *const ModuleTypeTable,
        backing: ModuleBacking,
    ) -> Result<Rc<Self>, LoadError> {
        let types = decode_table(path, table)?;
        Ok(Rc::new(Self {
            path: path.to_path_buf(),
            types,
            _backing: backing,
        }))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn type_count(&self) -> usize {
        self.types.len()
    }

    /// Qualified names of every type the module exports, in table order.
    pub fn type_names(&self) -> Vec<String> {
        self.types
            .iter()
            .map(|meta| qualified(&meta.namespace, &meta.name))
            .collect()
    }

    /// Resolves a type by its two-part name.
    pub fn find_type(
        self: &Rc<Self>,
        namespace: &str,
        type_name: &str,
    ) -> Result<TypeHandle, LookupError> {
        self.types
            .iter()
            .position(|meta| meta.namespace == namespace && meta.name == type_name)
            .map(|index| TypeHandle {
                module: Rc::clone(self),
                index,
            })
            .ok_or_else(|| LookupError::TypeNotFound {
                module: self.path.clone(),
                namespace: namespace.to_string(),
                type_name: type_name.to_string(),
            })
    }
}

impl Debug for ExtensionModule {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtensionModule")
            .field("path", &self.path)
            .field("types", &self.type_names())
            .finish()
    }
}

/// A type resolved inside a loaded module.
#[derive(Clone)]
pub struct TypeHandle {
    module: Rc<ExtensionModule>,
    index: usize,
}

impl TypeHandle {
    fn meta(&self) -> &TypeMeta {
        &self.module.types[self.index]
    }

    pub fn module(&self) -> &Rc<ExtensionModule> {
        &self.module
    }

    pub fn namespace(&self) -> &str {
        &self.meta().namespace
    }

    pub fn name(&self) -> &str {
        &self.meta().name
    }

    pub fn qualified_name(&self) -> String {
        qualified(self.namespace(), self.name())
    }

    pub fn kind(&self) -> TypeKind {
        self.meta().kind
    }

    /// Whether the type declares the qualified interface `interface`.
    pub fn implements(&self, interface: &str) -> bool {
        self.meta().interfaces.iter().any(|value| value == interface)
    }

    /// Method names and arities in declaration order.
    pub fn method_signatures(&self) -> Vec<(String, u32)> {
        self.meta()
            .methods
            .iter()
            .map(|method| (method.name.clone(), method.arity))
            .collect()
    }

    /// Resolves a method by name and parameter count.
    pub fn find_method(&self, method: &str, arity: u32) -> Result<MethodHandle, LookupError> {
        self.meta()
            .methods
            .iter()
            .position(|meta| meta.name == method && meta.arity == arity)
            .map(|index| self.method_at(index))
            .ok_or_else(|| self.method_not_found(method, arity))
    }

    /// Resolves the most-derived callable method filling `interface`'s
    /// `method/arity` slot. Later declarations override earlier ones.
    pub fn find_override(
        &self,
        interface: &str,
        method: &str,
        arity: u32,
    ) -> Result<MethodHandle, LookupError> {
        self.meta()
            .methods
            .iter()
            .rposition(|meta| {
                meta.name == method
                    && meta.arity == arity
                    && meta.implements == interface
                    && meta.entry.is_some()
            })
            .map(|index| self.method_at(index))
            .ok_or_else(|| self.method_not_found(method, arity))
    }

    pub fn find_property(&self, property: &str) -> Result<PropertyHandle, LookupError> {
        self.meta()
            .properties
            .iter()
            .position(|meta| meta.name == property)
            .map(|index| PropertyHandle {
                owner: self.clone(),
                index,
            })
            .ok_or_else(|| LookupError::PropertyNotFound {
                type_name: self.qualified_name(),
                property: property.to_string(),
            })
    }

    pub fn constructor(&self) -> Option<ConstructFn> {
        self.meta().construct
    }

    pub fn destructor(&self) -> Option<DestroyFn> {
        self.meta().destroy
    }

    fn method_at(&self, index: usize) -> MethodHandle {
        MethodHandle {
            owner: self.clone(),
            index,
        }
    }

    fn method_not_found(&self, method: &str, arity: u32) -> LookupError {
        LookupError::MethodNotFound {
            type_name: self.qualified_name(),
            method: method.to_string(),
            arity,
        }
    }
}

impl Debug for TypeHandle {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeHandle")
            .field("module", &self.module.path)
            .field("type", &self.qualified_name())
            .field("kind", &self.kind())
            .finish()
    }
}

/// A method resolved on a type.
#[derive(Clone)]
pub struct MethodHandle {
    owner: TypeHandle,
    index: usize,
}

impl MethodHandle {
    fn meta(&self) -> &MethodMeta {
        &self.owner.meta().methods[self.index]
    }

    pub fn declaring_type(&self) -> &TypeHandle {
        &self.owner
    }

    /// Position of the method in its type's method list.
    pub fn slot(&self) -> usize {
        self.index
    }

    pub fn name(&self) -> &str {
        &self.meta().name
    }

    pub fn arity(&self) -> u32 {
        self.meta().arity
    }

    pub fn implements(&self) -> &str {
        &self.meta().implements
    }

    /// Callable body, `None` for abstract interface methods.
    pub fn entry(&self) -> Option<BinaryMethodFn> {
        self.meta().entry
    }
}

impl Debug for MethodHandle {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "MethodHandle({}::{}/{})",
            self.owner.qualified_name(),
            self.name(),
            self.arity()
        )
    }
}

/// A readable property resolved on a type.
#[derive(Clone)]
pub struct PropertyHandle {
    owner: TypeHandle,
    index: usize,
}

impl PropertyHandle {
    pub fn name(&self) -> &str {
        &self.owner.meta().properties[self.index].name
    }

    pub fn getter(&self) -> Option<PropertyGetterFn> {
        self.owner.meta().properties[self.index].getter
    }
}

impl Debug for PropertyHandle {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "PropertyHandle({}::{})",
            self.owner.qualified_name(),
            self.name()
        )
    }
}

fn qualified(namespace: &str, name: &str) -> String {
    format!("{namespace}.{name}")
}

unsafe fn decode_table(
    path: &Path,
    table: *const ModuleTypeTable,
) -> Result<Vec<TypeMeta>, LoadError> {
    let malformed = |reason: String| LoadError::Malformed {
        path: path.to_path_buf(),
        reason,
    };

    let Some(table) = table.as_ref() else {
        return Err(malformed("type table pointer is null".to_string()));
    };
    if table.abi_version != ABI_VERSION {
        return Err(LoadError::AbiMismatch {
            path: path.to_path_buf(),
            found: table.abi_version,
            expected: ABI_VERSION,
        });
    }

    let descriptors = raw_slice(table.types, table.type_count)
        .ok_or_else(|| malformed("type array is null".to_string()))?;
    let mut types = Vec::with_capacity(descriptors.len());
    for (position, descriptor) in descriptors.iter().enumerate() {
        let context = |field: &str| format!("type #{position} {field}");

        let namespace = read_name(descriptor.namespace).map_err(|err| malformed(context(&err)))?;
        let name = read_name(descriptor.name).map_err(|err| malformed(context(&err)))?;
        if name.is_empty() {
            return Err(malformed(context("has an empty name")));
        }
        let kind = TypeKind::from_raw(descriptor.kind)
            .ok_or_else(|| malformed(context(&format!("has unknown kind {}", descriptor.kind))))?;

        let interfaces = raw_slice(descriptor.interfaces, descriptor.interface_count)
            .ok_or_else(|| malformed(context("interface array is null")))?
            .iter()
            .map(|value| read_name(*value))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| malformed(context(&format!("interface {err}"))))?;

        let mut methods = Vec::with_capacity(descriptor.method_count);
        for method in raw_slice(descriptor.methods, descriptor.method_count)
            .ok_or_else(|| malformed(context("method array is null")))?
        {
            let method_name =
                read_name(method.name).map_err(|err| malformed(context(&format!("method {err}"))))?;
            if method.entry.is_some() && method.arity != EXECUTE_ARITY {
                return Err(malformed(context(&format!(
                    "method `{method_name}` is callable with arity {} (only {EXECUTE_ARITY} is supported)",
                    method.arity
                ))));
            }
            let implements = read_name(method.implements)
                .map_err(|err| malformed(context(&format!("method `{method_name}` {err}"))))?;
            methods.push(MethodMeta {
                name: method_name,
                arity: method.arity,
                implements,
                entry: method.entry,
            });
        }

        let mut properties = Vec::with_capacity(descriptor.property_count);
        for property in raw_slice(descriptor.properties, descriptor.property_count)
            .ok_or_else(|| malformed(context("property array is null")))?
        {
            let property_name = read_name(property.name)
                .map_err(|err| malformed(context(&format!("property {err}"))))?;
            properties.push(PropertyMeta {
                name: property_name,
                getter: property.getter,
            });
        }

        if kind == TypeKind::Interface && descriptor.construct.is_some() {
            return Err(malformed(context("is an interface with a constructor")));
        }

        types.push(TypeMeta {
            namespace,
            name,
            kind,
            interfaces,
            methods,
            properties,
            construct: descriptor.construct,
            destroy: descriptor.destroy,
        });
    }
    Ok(types)
}

unsafe fn raw_slice<'a, T>(ptr: *const T, len: usize) -> Option<&'a [T]> {
    if len == 0 {
        return Some(&[]);
    }
    if ptr.is_null() {
        return None;
    }
    Some(std::slice::from_raw_parts(ptr, len))
}

unsafe fn read_name(value: AbiStr) -> Result<String, String> {
    value
        .to_str()
        .map(str::to_string)
        .map_err(|err| format!("name is unreadable: {err}"))
}
