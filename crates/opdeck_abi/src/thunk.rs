//! `extern "C"` entry points generated for an [`Operation`] implementor.
//!
//! These are referenced by `declare_operation_module!`; plugin code never
//! calls them directly.

use crate::{AbiStr, Operation, CALL_FAILED, CALL_OK};
use std::ffi::c_void;
use std::panic::{catch_unwind, AssertUnwindSafe};

/// Default-constructs `T` on the heap. Returns null if construction panicked.
pub unsafe extern "C" fn construct<T: Operation>() -> *mut c_void {
    match catch_unwind(T::default) {
        Ok(value) => Box::into_raw(Box::new(value)).cast(),
        Err(_) => std::ptr::null_mut(),
    }
}

/// Releases an object produced by [`construct`].
///
/// # Safety
/// `this` must come from `construct::<T>` and must not be used afterwards.
pub unsafe extern "C" fn destroy<T: Operation>(this: *mut c_void) {
    if this.is_null() {
        return;
    }
    let _ = catch_unwind(AssertUnwindSafe(|| drop(Box::from_raw(this.cast::<T>()))));
}

/// `Name` property getter. The returned string borrows from the object.
///
/// # Safety
/// `this` must be a live object produced by `construct::<T>`.
pub unsafe extern "C" fn name<T: Operation>(this: *const c_void) -> AbiStr {
    if this.is_null() {
        return AbiStr::EMPTY;
    }
    let operation = &*this.cast::<T>();
    catch_unwind(AssertUnwindSafe(|| AbiStr::borrowed(operation.name()))).unwrap_or(AbiStr::EMPTY)
}

/// `Execute` entry. Writes the result to `out` and returns `CALL_OK`.
///
/// # Safety
/// `this` must be a live object produced by `construct::<T>`; `out` must be
/// writable.
pub unsafe extern "C" fn execute<T: Operation>(
    this: *mut c_void,
    a: f64,
    b: f64,
    out: *mut f64,
) -> i32 {
    if this.is_null() || out.is_null() {
        return CALL_FAILED;
    }
    let operation = &*this.cast::<T>();
    match catch_unwind(AssertUnwindSafe(|| operation.execute(a, b))) {
        Ok(value) => {
            *out = value;
            CALL_OK
        }
        Err(_) => CALL_FAILED,
    }
}
