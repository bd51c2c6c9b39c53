//! Process-unique operation handles.

use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicU64, Ordering};

// 0 is never issued.
static NEXT_HANDLE: AtomicU64 = AtomicU64::new(1);

/// Opaque token naming one cataloged operation instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OperationHandle(u64);

impl OperationHandle {
    /// Wraps a raw value received from the presentation layer. The value is
    /// only meaningful if a catalog issued it.
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn as_raw(self) -> u64 {
        self.0
    }
}

impl Display for OperationHandle {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Contiguous handle range reserved by one catalog.
#[derive(Debug, Clone, Copy)]
pub(crate) struct HandleBlock {
    base: u64,
    len: u64,
}

impl HandleBlock {
    pub(crate) fn reserve(len: usize) -> Self {
        let len = len as u64;
        let base = NEXT_HANDLE.fetch_add(len, Ordering::Relaxed);
        Self { base, len }
    }

    pub(crate) fn issue(&self, index: usize) -> OperationHandle {
        debug_assert!((index as u64) < self.len);
        OperationHandle(self.base + index as u64)
    }

    pub(crate) fn index_of(&self, handle: OperationHandle) -> Option<usize> {
        let offset = handle.0.checked_sub(self.base)?;
        (offset < self.len).then_some(offset as usize)
    }
}
