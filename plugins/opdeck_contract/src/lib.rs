//! Contract module: declares `OpDeck.IOperation` with abstract `Execute(a, b)`.
//!
//! The host loads this library first and excludes it from discovery.

opdeck_abi::declare_contract_module!(CONTRACT);
opdeck_abi::export_module!(CONTRACT);
