//! `Add` operation module.

use opdeck_abi::Operation;

#[derive(Debug, Default)]
pub struct Add;

impl Operation for Add {
    fn name(&self) -> &str {
        "Add"
    }

    fn execute(&self, a: f64, b: f64) -> f64 {
        a + b
    }
}

opdeck_abi::declare_operation_module!(OPERATION, Add);
opdeck_abi::export_module!(OPERATION);
