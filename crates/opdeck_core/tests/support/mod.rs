#![allow(dead_code)]

use opdeck_abi::{
    thunk, MethodDescriptor, ModuleTypeTable, Operation, PropertyDescriptor, TypeDescriptor,
    CALL_FAILED, CALL_OK, CONTRACT_INTERFACE, CONTRACT_INTERFACE_QUALIFIED, CONTRACT_NAMESPACE,
    EXECUTE_ARITY, EXECUTE_METHOD, IMPLEMENTATION_TYPE, NAME_PROPERTY, TYPE_KIND_CLASS,
};
use opdeck_core::{
    ContractDescriptor, ContractNames, DiscoveryOptions, HostConfig, InProcessLoader,
};
use std::ffi::c_void;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const CONTRACT_FILE: &str = "opdeck_contract.mod";
pub const ADD_FILE: &str = "op_add.mod";
pub const ADD_COPY_FILE: &str = "op_add_copy.mod";
pub const SUBTRACT_FILE: &str = "op_subtract.mod";
pub const MULTIPLY_FILE: &str = "op_multiply.mod";
pub const FAULTY_FILE: &str = "op_faulty.mod";
pub const ROGUE_FILE: &str = "op_rogue.mod";
pub const NAMELESS_FILE: &str = "op_nameless.mod";
pub const STRAY_FILE: &str = "op_stray.mod";
pub const CORRUPT_FILE: &str = "op_corrupt.mod";
pub const ADD_LABELED_FILE: &str = "op_add_labeled.mod";
pub const LAYERED_FILE: &str = "op_layered.mod";
pub const LOWER_ALPHA_FILE: &str = "alpha.mod";
pub const UPPER_BETA_FILE: &str = "Beta.mod";
pub const UPPER_ZETA_FILE: &str = "Zeta.mod";

pub const NO_INTERFACE_CONTRACT_FILE: &str = "contract_no_interface.mod";
pub const TERNARY_CONTRACT_FILE: &str = "contract_ternary.mod";
pub const CLASS_CONTRACT_FILE: &str = "contract_class.mod";

#[derive(Default)]
pub struct Add;

impl Operation for Add {
    fn name(&self) -> &str {
        "Add"
    }

    fn execute(&self, a: f64, b: f64) -> f64 {
        a + b
    }
}

#[derive(Default)]
pub struct Subtract;

impl Operation for Subtract {
    fn name(&self) -> &str {
        "Subtract"
    }

    fn execute(&self, a: f64, b: f64) -> f64 {
        a - b
    }
}

#[derive(Default)]
pub struct Multiply;

impl Operation for Multiply {
    fn name(&self) -> &str {
        "Multiply"
    }

    fn execute(&self, a: f64, b: f64) -> f64 {
        a * b
    }
}

#[derive(Default)]
pub struct Faulty;

impl Operation for Faulty {
    fn name(&self) -> &str {
        "Faulty"
    }

    fn execute(&self, _a: f64, _b: f64) -> f64 {
        panic!("faulty operation always fails");
    }
}

#[derive(Default)]
pub struct Nameless;

impl Operation for Nameless {
    fn name(&self) -> &str {
        ""
    }

    fn execute(&self, a: f64, _b: f64) -> f64 {
        a
    }
}

#[derive(Default)]
pub struct Rogue;

impl Operation for Rogue {
    fn name(&self) -> &str {
        "Rogue"
    }

    fn execute(&self, a: f64, b: f64) -> f64 {
        a.max(b)
    }
}

/// Reports the same label the annotate policy gives a second `Add`.
#[derive(Default)]
pub struct AddLabeled;

impl Operation for AddLabeled {
    fn name(&self) -> &str {
        "Add (2)"
    }

    fn execute(&self, a: f64, b: f64) -> f64 {
        a + b
    }
}

/// Declares a base `Execute` (sum) and a later override (difference).
#[derive(Default)]
pub struct Layered;

impl Operation for Layered {
    fn name(&self) -> &str {
        "Layered"
    }

    fn execute(&self, a: f64, b: f64) -> f64 {
        a - b
    }
}

unsafe extern "C" fn layered_base_execute(
    this: *mut c_void,
    a: f64,
    b: f64,
    out: *mut f64,
) -> i32 {
    if this.is_null() || out.is_null() {
        return CALL_FAILED;
    }
    *out = a + b;
    CALL_OK
}

opdeck_abi::declare_contract_module!(pub CONTRACT_TABLE);
opdeck_abi::declare_operation_module!(pub ADD_TABLE, Add);
opdeck_abi::declare_operation_module!(pub SUBTRACT_TABLE, Subtract);
opdeck_abi::declare_operation_module!(pub MULTIPLY_TABLE, Multiply);
opdeck_abi::declare_operation_module!(pub FAULTY_TABLE, Faulty);
opdeck_abi::declare_operation_module!(pub NAMELESS_TABLE, Nameless);
opdeck_abi::declare_operation_module!(pub ADD_LABELED_TABLE, AddLabeled);

pub static LAYERED_TABLE: ModuleTypeTable = {
    static INTERFACES: [opdeck_abi::AbiStr; 1] =
        [opdeck_abi::AbiStr::from_static(CONTRACT_INTERFACE_QUALIFIED)];
    static METHODS: [MethodDescriptor; 2] = [
        MethodDescriptor::implementation(
            EXECUTE_METHOD,
            EXECUTE_ARITY,
            CONTRACT_INTERFACE_QUALIFIED,
            layered_base_execute,
        ),
        MethodDescriptor::implementation(
            EXECUTE_METHOD,
            EXECUTE_ARITY,
            CONTRACT_INTERFACE_QUALIFIED,
            thunk::execute::<Layered>,
        ),
    ];
    static PROPERTIES: [PropertyDescriptor; 1] =
        [PropertyDescriptor::new(NAME_PROPERTY, thunk::name::<Layered>)];
    static TYPES: [TypeDescriptor; 1] = [TypeDescriptor::class(
        CONTRACT_NAMESPACE,
        IMPLEMENTATION_TYPE,
        &INTERFACES,
        &METHODS,
        &PROPERTIES,
        thunk::construct::<Layered>,
        thunk::destroy::<Layered>,
    )];
    ModuleTypeTable::new(&TYPES)
};

/// `Operation` class that never declares the contract interface.
pub static ROGUE_TABLE: ModuleTypeTable = {
    static METHODS: [MethodDescriptor; 1] = [MethodDescriptor::implementation(
        EXECUTE_METHOD,
        EXECUTE_ARITY,
        CONTRACT_INTERFACE_QUALIFIED,
        thunk::execute::<Rogue>,
    )];
    static PROPERTIES: [PropertyDescriptor; 1] =
        [PropertyDescriptor::new(NAME_PROPERTY, thunk::name::<Rogue>)];
    static TYPES: [TypeDescriptor; 1] = [TypeDescriptor::class(
        CONTRACT_NAMESPACE,
        IMPLEMENTATION_TYPE,
        &[],
        &METHODS,
        &PROPERTIES,
        thunk::construct::<Rogue>,
        thunk::destroy::<Rogue>,
    )];
    ModuleTypeTable::new(&TYPES)
};

pub static NO_INTERFACE_CONTRACT_TABLE: ModuleTypeTable = {
    static METHODS: [MethodDescriptor; 1] =
        [MethodDescriptor::abstract_method(EXECUTE_METHOD, EXECUTE_ARITY)];
    static TYPES: [TypeDescriptor; 1] = [TypeDescriptor::interface(
        CONTRACT_NAMESPACE,
        "ICalculator",
        &METHODS,
    )];
    ModuleTypeTable::new(&TYPES)
};

pub static TERNARY_CONTRACT_TABLE: ModuleTypeTable = {
    static METHODS: [MethodDescriptor; 1] = [MethodDescriptor::abstract_method(EXECUTE_METHOD, 3)];
    static TYPES: [TypeDescriptor; 1] = [TypeDescriptor::interface(
        CONTRACT_NAMESPACE,
        CONTRACT_INTERFACE,
        &METHODS,
    )];
    ModuleTypeTable::new(&TYPES)
};

pub static CLASS_CONTRACT_TABLE: ModuleTypeTable = {
    static METHODS: [MethodDescriptor; 1] =
        [MethodDescriptor::abstract_method(EXECUTE_METHOD, EXECUTE_ARITY)];
    static TYPES: [TypeDescriptor; 1] = [TypeDescriptor {
        kind: TYPE_KIND_CLASS,
        ..TypeDescriptor::interface(CONTRACT_NAMESPACE, CONTRACT_INTERFACE, &METHODS)
    }];
    ModuleTypeTable::new(&TYPES)
};

/// Loader that knows every fixture module above by file name.
pub fn standard_loader() -> InProcessLoader {
    InProcessLoader::new()
        .with_module(CONTRACT_FILE, &CONTRACT_TABLE)
        .with_module(ADD_FILE, &ADD_TABLE)
        .with_module(ADD_COPY_FILE, &ADD_TABLE)
        .with_module(SUBTRACT_FILE, &SUBTRACT_TABLE)
        .with_module(MULTIPLY_FILE, &MULTIPLY_TABLE)
        .with_module(FAULTY_FILE, &FAULTY_TABLE)
        .with_module(ROGUE_FILE, &ROGUE_TABLE)
        .with_module(NAMELESS_FILE, &NAMELESS_TABLE)
        .with_module(STRAY_FILE, &CONTRACT_TABLE)
        .with_module(ADD_LABELED_FILE, &ADD_LABELED_TABLE)
        .with_module(LAYERED_FILE, &LAYERED_TABLE)
        .with_module(LOWER_ALPHA_FILE, &ADD_TABLE)
        .with_module(UPPER_BETA_FILE, &SUBTRACT_TABLE)
        .with_module(UPPER_ZETA_FILE, &MULTIPLY_TABLE)
        .with_module(NO_INTERFACE_CONTRACT_FILE, &NO_INTERFACE_CONTRACT_TABLE)
        .with_module(TERNARY_CONTRACT_FILE, &TERNARY_CONTRACT_TABLE)
        .with_module(CLASS_CONTRACT_FILE, &CLASS_CONTRACT_TABLE)
}

/// Scratch module directory; files are placeholders resolved by name.
pub struct ModuleDir {
    dir: TempDir,
}

impl ModuleDir {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("create module dir"),
        }
    }

    pub fn with_files(names: &[&str]) -> Self {
        let dir = Self::new();
        for name in names {
            dir.touch(name);
        }
        dir
    }

    pub fn touch(&self, name: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        std::fs::write(&path, name.as_bytes()).expect("write module placeholder");
        path
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn join(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    pub fn config(&self) -> HostConfig {
        test_config(self.path())
    }
}

pub fn test_config(dir: &Path) -> HostConfig {
    HostConfig {
        module_dir: dir.to_path_buf(),
        contract_file: CONTRACT_FILE.to_string(),
        module_pattern: r"\.mod$".to_string(),
        ..HostConfig::default()
    }
}

pub fn test_options() -> DiscoveryOptions {
    test_config(Path::new("."))
        .discovery_options()
        .expect("fixture pattern compiles")
}

pub fn initialize_contract(loader: &InProcessLoader, dir: &ModuleDir) -> ContractDescriptor {
    ContractDescriptor::initialize(loader, &dir.join(CONTRACT_FILE), &ContractNames::default())
        .expect("fixture contract initializes")
}
