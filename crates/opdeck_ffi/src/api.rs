//! FFI use-case API for the operation picker UI.
//!
//! # Responsibility
//! - Start the host once and expose its operation list to Dart via FRB.
//! - Execute the selected operation and flatten failures into envelopes.
//!
//! # Invariants
//! - Exported functions must not panic across FFI boundary.
//! - The host lives on the thread that started it; every call is sync.

use log::warn;
use opdeck_core::{
    core_version as core_version_inner, init_logging as init_logging_inner, HostConfig,
    OperationHandle, OperationHost,
};
use std::cell::OnceCell;
use std::path::PathBuf;

thread_local! {
    static HOST: OnceCell<OperationHost> = const { OnceCell::new() };
}

/// Expose core crate version through FFI.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes host logging once per process.
///
/// Input semantics:
/// - `level`: one of `trace|debug|info|warn|error` (case-insensitive).
/// - `log_dir`: absolute directory path where rolling logs are written.
///
/// # FFI contract
/// - Safe to call repeatedly with the same `level + log_dir` (idempotent).
/// - Never panics; returns empty string on success and error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err.to_string(),
    }
}

/// One selectable entry of the operation picker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationItem {
    /// Display label read from the operation's `Name`.
    pub label: String,
    /// Opaque handle passed back to `execute_operation`.
    pub handle: i64,
}

/// Result envelope for `start_host`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostStartResponse {
    pub ok: bool,
    /// Number of cataloged operations.
    pub operation_count: u32,
    /// Modules that were found but not cataloged, as `path: reason`.
    pub skipped: Vec<String>,
    pub message: String,
}

impl HostStartResponse {
    fn from_host(host: &OperationHost, message: impl Into<String>) -> Self {
        Self {
            ok: true,
            operation_count: u32::try_from(host.operations().len()).unwrap_or(u32::MAX),
            skipped: host
                .skipped_modules()
                .iter()
                .map(|skipped| format!("{}: {}", skipped.path.display(), skipped.fault))
                .collect(),
            message: message.into(),
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            operation_count: 0,
            skipped: Vec::new(),
            message: message.into(),
        }
    }
}

/// Result envelope for `execute_operation`.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecuteResponse {
    pub ok: bool,
    pub value: Option<f64>,
    pub message: String,
}

impl ExecuteResponse {
    fn success(value: f64) -> Self {
        Self {
            ok: true,
            value: Some(value),
            message: String::new(),
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            value: None,
            message: message.into(),
        }
    }
}

/// Loads the contract and discovers operations.
///
/// Input semantics:
/// - `module_dir`: directory holding the contract and operation modules;
///   `None` uses the executable's directory (or `OPDECK_MODULE_DIR`).
///
/// # FFI contract
/// - Sync call; loads shared libraries on first success.
/// - Repeated calls after success return the running host's summary; asking
///   for a different directory is rejected.
/// - Never panics.
#[flutter_rust_bridge::frb(sync)]
pub fn start_host(module_dir: Option<String>) -> HostStartResponse {
    let requested = module_dir
        .map(|raw| raw.trim().to_string())
        .filter(|raw| !raw.is_empty())
        .map(PathBuf::from);

    HOST.with(|cell| {
        if let Some(host) = cell.get() {
            return match requested {
                Some(dir) if dir != host.config().module_dir => HostStartResponse::failure(format!(
                    "host already started at `{}`; refusing to switch to `{}`",
                    host.config().module_dir.display(),
                    dir.display()
                )),
                _ => HostStartResponse::from_host(host, "Host already running."),
            };
        }

        let config = match requested {
            Some(dir) => HostConfig::with_module_dir(dir),
            None => match HostConfig::for_executable() {
                Ok(config) => config,
                Err(err) => return HostStartResponse::failure(format!("start_host failed: {err}")),
            },
        };
        match OperationHost::start(config) {
            Ok(host) => {
                let response = HostStartResponse::from_host(
                    &host,
                    format!("Loaded {} operation(s).", host.operations().len()),
                );
                let _ = cell.set(host);
                response
            }
            Err(err) => HostStartResponse::failure(format!("start_host failed: {err}")),
        }
    })
}

/// Lists operations in discovery order.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Returns an empty list before `start_host` succeeded.
#[flutter_rust_bridge::frb(sync)]
pub fn get_operations() -> Vec<OperationItem> {
    HOST.with(|cell| {
        cell.get()
            .map(|host| {
                host.operations()
                    .iter()
                    .filter_map(|entry| {
                        let handle = i64::try_from(entry.handle.as_raw()).ok()?;
                        Some(OperationItem {
                            label: entry.name.clone(),
                            handle,
                        })
                    })
                    .collect()
            })
            .unwrap_or_default()
    })
}

/// Executes the operation behind `handle` with operands `a` and `b`.
///
/// # FFI contract
/// - Sync call; runs the operation body on the calling thread.
/// - Never panics; unknown handles and foreign failures return `ok=false`.
#[flutter_rust_bridge::frb(sync)]
pub fn execute_operation(handle: i64, a: f64, b: f64) -> ExecuteResponse {
    HOST.with(|cell| {
        let Some(host) = cell.get() else {
            return ExecuteResponse::failure("execute_operation failed: host is not started");
        };
        let Ok(raw) = u64::try_from(handle) else {
            warn!(
                "event=operation_execute module=ffi status=error error_code=invalid_handle handle={}",
                handle
            );
            return ExecuteResponse::failure(format!(
                "execute_operation failed: operation handle {handle} is not valid"
            ));
        };
        match host.execute_operation(OperationHandle::from_raw(raw), a, b) {
            Ok(value) => ExecuteResponse::success(value),
            Err(err) => ExecuteResponse::failure(format!("execute_operation failed: {err}")),
        }
    })
}
