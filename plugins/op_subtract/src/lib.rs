//! `Subtract` operation module.

use opdeck_abi::Operation;

#[derive(Debug, Default)]
pub struct Subtract;

impl Operation for Subtract {
    fn name(&self) -> &str {
        "Subtract"
    }

    fn execute(&self, a: f64, b: f64) -> f64 {
        a - b
    }
}

opdeck_abi::declare_operation_module!(OPERATION, Subtract);
opdeck_abi::export_module!(OPERATION);

#[cfg(test)]
mod tests {
    use super::Subtract;
    use opdeck_abi::Operation;

    #[test]
    fn computes_difference() {
        let op = Subtract;
        assert_eq!(op.name(), "Subtract");
        assert_eq!(op.execute(10.0, 4.0), 6.0);
    }
}
