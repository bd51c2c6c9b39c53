//! `Multiply` operation module.
//!
//! Follows IEEE-754 semantics; `inf * 0` yields NaN rather than an error.

use opdeck_abi::Operation;

#[derive(Debug, Default)]
pub struct Multiply;

impl Operation for Multiply {
    fn name(&self) -> &str {
        "Multiply"
    }

    fn execute(&self, a: f64, b: f64) -> f64 {
        a * b
    }
}

opdeck_abi::declare_operation_module!(OPERATION, Multiply);
opdeck_abi::export_module!(OPERATION);
