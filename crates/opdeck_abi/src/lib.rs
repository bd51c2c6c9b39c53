//! C-ABI contract shared by the OpDeck host and its extension modules.
//!
//! # Responsibility
//! - Define the `#[repr(C)]` type tables every extension module exports.
//! - Provide authoring macros so operation crates never hand-write thunks.
//!
//! # Invariants
//! - Every array pointer in an exported table is either null with a zero
//!   count, or points at `'static` data owned by the module.
//! - Unwinding never crosses the ABI: generated thunks report `CALL_FAILED`.
//!
//! # See also
//! - `opdeck_core::loader` for the host-side decoder.

use std::ffi::c_void;
use std::fmt::{Display, Formatter};

mod macros;
pub mod thunk;

/// Table layout version. Hosts reject modules exporting any other value.
pub const ABI_VERSION: u32 = 1;

/// Exported symbol every module provides, NUL-terminated for symbol lookup.
pub const MODULE_TYPES_SYMBOL: &[u8] = b"opdeck_module_types\0";

/// Status returned by a method entry on success.
pub const CALL_OK: i32 = 0;
/// Status returned by a method entry when the foreign body failed.
pub const CALL_FAILED: i32 = 1;

/// Namespace holding the operation contract.
pub const CONTRACT_NAMESPACE: &str = "OpDeck";
/// Contract interface type name.
pub const CONTRACT_INTERFACE: &str = "IOperation";
/// `namespace.type` form used in `interfaces` and `implements` fields.
pub const CONTRACT_INTERFACE_QUALIFIED: &str = "OpDeck.IOperation";
/// Concrete type each operation module exposes.
pub const IMPLEMENTATION_TYPE: &str = "Operation";
/// Contract method dispatched by the host.
pub const EXECUTE_METHOD: &str = "Execute";
/// Operand count of every callable method entry.
pub const EXECUTE_ARITY: u32 = 2;
/// Display label property read once per instance.
pub const NAME_PROPERTY: &str = "Name";

/// Type kind tag for interfaces (no constructor, abstract methods only).
pub const TYPE_KIND_INTERFACE: u32 = 0;
/// Type kind tag for concrete, constructible classes.
pub const TYPE_KIND_CLASS: u32 = 1;

pub type BinaryMethodFn =
    unsafe extern "C" fn(this: *mut c_void, a: f64, b: f64, out: *mut f64) -> i32;
pub type ConstructFn = unsafe extern "C" fn() -> *mut c_void;
pub type DestroyFn = unsafe extern "C" fn(this: *mut c_void);
pub type PropertyGetterFn = unsafe extern "C" fn(this: *const c_void) -> AbiStr;
pub type ModuleTypesFn = unsafe extern "C" fn() -> *const ModuleTypeTable;

/// Decoded form of a descriptor's `kind` tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    Interface,
    Class,
}

impl TypeKind {
    pub fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            TYPE_KIND_INTERFACE => Some(Self::Interface),
            TYPE_KIND_CLASS => Some(Self::Class),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Interface => "interface",
            Self::Class => "class",
        }
    }
}

/// Borrowed UTF-8 string crossing the module boundary.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct AbiStr {
    ptr: *const u8,
    len: usize,
}

impl AbiStr {
    pub const EMPTY: AbiStr = AbiStr {
        ptr: std::ptr::null(),
        len: 0,
    };

    pub const fn from_static(value: &'static str) -> Self {
        Self {
            ptr: value.as_ptr(),
            len: value.len(),
        }
    }

    /// Borrows `value` for the duration of one foreign call.
    pub fn borrowed(value: &str) -> Self {
        Self {
            ptr: value.as_ptr(),
            len: value.len(),
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Views the bytes as `&str`.
    ///
    /// # Safety
    /// A non-null `ptr` must address `len` readable bytes that stay alive
    /// for `'a`.
    pub unsafe fn to_str<'a>(self) -> Result<&'a str, AbiStrError> {
        if self.len == 0 {
            return Ok("");
        }
        if self.ptr.is_null() {
            return Err(AbiStrError::Null);
        }
        let bytes = std::slice::from_raw_parts(self.ptr, self.len);
        std::str::from_utf8(bytes).map_err(|_| AbiStrError::InvalidUtf8)
    }
}

// SAFETY: an `AbiStr` placed in a table only ever points at immutable
// `'static` bytes.
unsafe impl Sync for AbiStr {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbiStrError {
    Null,
    InvalidUtf8,
}

impl Display for AbiStrError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Null => write!(f, "string pointer is null with non-zero length"),
            Self::InvalidUtf8 => write!(f, "string bytes are not valid UTF-8"),
        }
    }
}

impl std::error::Error for AbiStrError {}

/// One method slot of a type.
///
/// `implements` names the qualified interface whose slot this method fills;
/// `entry` is `None` for abstract interface methods.
#[repr(C)]
pub struct MethodDescriptor {
    pub name: AbiStr,
    pub arity: u32,
    pub implements: AbiStr,
    pub entry: Option<BinaryMethodFn>,
}

impl MethodDescriptor {
    pub const fn abstract_method(name: &'static str, arity: u32) -> Self {
        Self {
            name: AbiStr::from_static(name),
            arity,
            implements: AbiStr::EMPTY,
            entry: None,
        }
    }

    pub const fn implementation(
        name: &'static str,
        arity: u32,
        implements: &'static str,
        entry: BinaryMethodFn,
    ) -> Self {
        Self {
            name: AbiStr::from_static(name),
            arity,
            implements: AbiStr::from_static(implements),
            entry: Some(entry),
        }
    }
}

// SAFETY: descriptors are immutable `'static` data.
unsafe impl Sync for MethodDescriptor {}

/// Readable string property of a class.
#[repr(C)]
pub struct PropertyDescriptor {
    pub name: AbiStr,
    pub getter: Option<PropertyGetterFn>,
}

impl PropertyDescriptor {
    pub const fn new(name: &'static str, getter: PropertyGetterFn) -> Self {
        Self {
            name: AbiStr::from_static(name),
            getter: Some(getter),
        }
    }
}

// SAFETY: descriptors are immutable `'static` data.
unsafe impl Sync for PropertyDescriptor {}

/// Metadata for one named type inside a module.
#[repr(C)]
pub struct TypeDescriptor {
    pub namespace: AbiStr,
    pub name: AbiStr,
    pub kind: u32,
    pub interfaces: *const AbiStr,
    pub interface_count: usize,
    pub methods: *const MethodDescriptor,
    pub method_count: usize,
    pub properties: *const PropertyDescriptor,
    pub property_count: usize,
    pub construct: Option<ConstructFn>,
    pub destroy: Option<DestroyFn>,
}

impl TypeDescriptor {
    pub const fn interface(
        namespace: &'static str,
        name: &'static str,
        methods: &'static [MethodDescriptor],
    ) -> Self {
        Self {
            namespace: AbiStr::from_static(namespace),
            name: AbiStr::from_static(name),
            kind: TYPE_KIND_INTERFACE,
            interfaces: std::ptr::null(),
            interface_count: 0,
            methods: methods.as_ptr(),
            method_count: methods.len(),
            properties: std::ptr::null(),
            property_count: 0,
            construct: None,
            destroy: None,
        }
    }

    pub const fn class(
        namespace: &'static str,
        name: &'static str,
        interfaces: &'static [AbiStr],
        methods: &'static [MethodDescriptor],
        properties: &'static [PropertyDescriptor],
        construct: ConstructFn,
        destroy: DestroyFn,
    ) -> Self {
        Self {
            namespace: AbiStr::from_static(namespace),
            name: AbiStr::from_static(name),
            kind: TYPE_KIND_CLASS,
            interfaces: interfaces.as_ptr(),
            interface_count: interfaces.len(),
            methods: methods.as_ptr(),
            method_count: methods.len(),
            properties: properties.as_ptr(),
            property_count: properties.len(),
            construct: Some(construct),
            destroy: Some(destroy),
        }
    }
}

// SAFETY: descriptors are immutable `'static` data.
unsafe impl Sync for TypeDescriptor {}

/// Root table returned by a module's `opdeck_module_types` export.
#[repr(C)]
pub struct ModuleTypeTable {
    pub abi_version: u32,
    pub types: *const TypeDescriptor,
    pub type_count: usize,
}

impl ModuleTypeTable {
    pub const fn new(types: &'static [TypeDescriptor]) -> Self {
        Self {
            abi_version: ABI_VERSION,
            types: types.as_ptr(),
            type_count: types.len(),
        }
    }
}

// SAFETY: the table is immutable `'static` data.
unsafe impl Sync for ModuleTypeTable {}

/// Authoring trait for one operation implementation.
///
/// The generated `Operation` class default-constructs the implementor, reads
/// [`Operation::name`] once through the `Name` property and dispatches
/// `Execute` to [`Operation::execute`]. A panic inside either body is
/// reported to the host as a failed call.
pub trait Operation: Default + 'static {
    fn name(&self) -> &str;
    fn execute(&self, a: f64, b: f64) -> f64;
}

#[cfg(test)]
mod tests {
    use super::{
        AbiStr, AbiStrError, Operation, TypeKind, CALL_FAILED, CALL_OK, CONTRACT_INTERFACE,
        TYPE_KIND_CLASS,
    };
    use std::ffi::c_void;

    #[derive(Default)]
    struct Halve;

    impl Operation for Halve {
        fn name(&self) -> &str {
            "Halve"
        }

        fn execute(&self, a: f64, b: f64) -> f64 {
            if b == 0.0 {
                panic!("cannot halve by zero");
            }
            a / b / 2.0
        }
    }

    crate::declare_contract_module!(CONTRACT_TABLE);
    crate::declare_operation_module!(HALVE_TABLE, Halve);

    #[test]
    fn abi_str_reads_back_static_text() {
        let value = AbiStr::from_static("Add");
        assert_eq!(unsafe { value.to_str() }, Ok("Add"));
        assert_eq!(unsafe { AbiStr::EMPTY.to_str() }, Ok(""));
    }

    #[test]
    fn abi_str_rejects_invalid_utf8() {
        let bytes: &'static [u8] = &[0xff, 0xfe];
        let value = AbiStr {
            ptr: bytes.as_ptr(),
            len: bytes.len(),
        };
        assert_eq!(unsafe { value.to_str() }, Err(AbiStrError::InvalidUtf8));
    }

    #[test]
    fn contract_table_declares_one_interface() {
        assert_eq!(CONTRACT_TABLE.type_count, 1);
        let ty = unsafe { &*CONTRACT_TABLE.types };
        assert_eq!(TypeKind::from_raw(ty.kind), Some(TypeKind::Interface));
        assert_eq!(unsafe { ty.name.to_str() }, Ok(CONTRACT_INTERFACE));
        assert!(ty.construct.is_none());
    }

    #[test]
    fn operation_table_round_trips_through_thunks() {
        let ty = unsafe { &*HALVE_TABLE.types };
        assert_eq!(ty.kind, TYPE_KIND_CLASS);
        let construct = ty.construct.expect("class has constructor");
        let destroy = ty.destroy.expect("class has destructor");
        let method = unsafe { &*ty.methods };
        let execute = method.entry.expect("execute entry");
        let property = unsafe { &*ty.properties };
        let getter = property.getter.expect("name getter");

        unsafe {
            let object = construct();
            assert!(!object.is_null());
            assert_eq!(getter(object as *const c_void).to_str(), Ok("Halve"));

            let mut out = 0.0;
            assert_eq!(execute(object, 12.0, 3.0, &mut out), CALL_OK);
            assert_eq!(out, 2.0);

            assert_eq!(execute(object, 1.0, 0.0, &mut out), CALL_FAILED);
            destroy(object);
        }
    }

    #[test]
    fn thunks_reject_null_objects() {
        let ty = unsafe { &*HALVE_TABLE.types };
        let execute = unsafe { &*ty.methods }.entry.expect("execute entry");
        let mut out = 0.0;
        let status = unsafe { execute(std::ptr::null_mut(), 1.0, 2.0, &mut out) };
        assert_eq!(status, CALL_FAILED);
    }
}
