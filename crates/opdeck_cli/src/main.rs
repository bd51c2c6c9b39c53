//! CLI smoke entry point.
//!
//! # Responsibility
//! - Start the host against a module directory and list what it found.
//! - Optionally execute one operation by label.
//!
//! Usage: `opdeck_cli [module_dir] [label a b]`

use opdeck_core::{core_version, HostConfig, OperationHost};
use std::process::ExitCode;

fn main() -> ExitCode {
    println!("opdeck_core version={}", core_version());

    let args: Vec<String> = std::env::args().skip(1).collect();
    let (module_dir, call) = match args.as_slice() {
        [] => (None, None),
        [dir] => (Some(dir.as_str()), None),
        [dir, label, a, b] => (Some(dir.as_str()), Some((label.as_str(), a, b))),
        _ => {
            eprintln!("usage: opdeck_cli [module_dir] [label a b]");
            return ExitCode::from(2);
        }
    };

    let config = match module_dir {
        Some(dir) => HostConfig::with_module_dir(dir),
        None => match HostConfig::for_executable() {
            Ok(config) => config,
            Err(err) => {
                eprintln!("error: {err}");
                return ExitCode::FAILURE;
            }
        },
    };

    let host = match OperationHost::start(config) {
        Ok(host) => host,
        Err(err) => {
            eprintln!("error: {err}");
            return ExitCode::FAILURE;
        }
    };

    for (index, entry) in host.operations().iter().enumerate() {
        println!("{index} {} {}", entry.name, entry.handle);
    }
    for skipped in host.skipped_modules() {
        eprintln!("skipped {}: {}", skipped.path.display(), skipped.fault);
    }

    let Some((label, a, b)) = call else {
        return ExitCode::SUCCESS;
    };
    let (Ok(a), Ok(b)) = (a.parse::<f64>(), b.parse::<f64>()) else {
        eprintln!("error: operands must be numbers, got `{a}` and `{b}`");
        return ExitCode::from(2);
    };
    let Some(entry) = host.catalog().find(label) else {
        eprintln!("error: no operation labeled `{label}`");
        return ExitCode::FAILURE;
    };
    match host.execute_operation(entry.handle, a, b) {
        Ok(value) => {
            println!("{label}({a}, {b}) = {value}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
