//! Table-building macros for module authors.

/// Declares a `static` [`ModuleTypeTable`](crate::ModuleTypeTable) holding
/// the contract interface `OpDeck.IOperation` with its abstract
/// `Execute(f64, f64)` method.
#[macro_export]
macro_rules! declare_contract_module {
    ($vis:vis $table:ident) => {
        $vis static $table: $crate::ModuleTypeTable = {
            static METHODS: [$crate::MethodDescriptor; 1] = [$crate::MethodDescriptor::abstract_method(
                $crate::EXECUTE_METHOD,
                $crate::EXECUTE_ARITY,
            )];
            static TYPES: [$crate::TypeDescriptor; 1] = [$crate::TypeDescriptor::interface(
                $crate::CONTRACT_NAMESPACE,
                $crate::CONTRACT_INTERFACE,
                &METHODS,
            )];
            $crate::ModuleTypeTable::new(&TYPES)
        };
    };
}

/// Declares a `static` [`ModuleTypeTable`](crate::ModuleTypeTable) exposing
/// `OpDeck.Operation`, a class backed by the given [`Operation`](crate::Operation)
/// implementor.
#[macro_export]
macro_rules! declare_operation_module {
    ($vis:vis $table:ident, $operation:ty) => {
        $vis static $table: $crate::ModuleTypeTable = {
            static INTERFACES: [$crate::AbiStr; 1] =
                [$crate::AbiStr::from_static($crate::CONTRACT_INTERFACE_QUALIFIED)];
            static METHODS: [$crate::MethodDescriptor; 1] = [$crate::MethodDescriptor::implementation(
                $crate::EXECUTE_METHOD,
                $crate::EXECUTE_ARITY,
                $crate::CONTRACT_INTERFACE_QUALIFIED,
                $crate::thunk::execute::<$operation>,
            )];
            static PROPERTIES: [$crate::PropertyDescriptor; 1] = [$crate::PropertyDescriptor::new(
                $crate::NAME_PROPERTY,
                $crate::thunk::name::<$operation>,
            )];
            static TYPES: [$crate::TypeDescriptor; 1] = [$crate::TypeDescriptor::class(
                $crate::CONTRACT_NAMESPACE,
                $crate::IMPLEMENTATION_TYPE,
                &INTERFACES,
                &METHODS,
                &PROPERTIES,
                $crate::thunk::construct::<$operation>,
                $crate::thunk::destroy::<$operation>,
            )];
            $crate::ModuleTypeTable::new(&TYPES)
        };
    };
}

/// Exports `table` under the well-known `opdeck_module_types` symbol.
///
/// Use once per shared library.
#[macro_export]
macro_rules! export_module {
    ($table:ident) => {
        #[no_mangle]
        pub extern "C" fn opdeck_module_types() -> *const $crate::ModuleTypeTable {
            &$table
        }
    };
}
