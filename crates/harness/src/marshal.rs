//! RAII marshaling of buffers into engine linear memory.

use std::fmt;

use psi_engine_api::{EngineModule, Ptr};

use crate::error::HarnessError;

/// A buffer owned by the current run inside the engine's linear memory.
///
/// Allocation and release are paired by construction: the region is
/// released exactly once when the guard drops, on every exit path. A
/// zero-length buffer is represented by the null pointer and never touches
/// the allocator.
pub struct ForeignBuf<'m, M: EngineModule> {
    module: &'m M,
    ptr: Ptr,
    len: usize,
}

impl<'m, M: EngineModule> ForeignBuf<'m, M> {
    /// Allocates a region and copies `bytes` into it.
    pub fn copy_in(module: &'m M, bytes: &[u8]) -> Result<Self, HarnessError> {
        if bytes.is_empty() {
            return Ok(ForeignBuf {
                module,
                ptr: Ptr::NULL,
                len: 0,
            });
        }
        let buf = ForeignBuf {
            module,
            ptr: module.alloc(bytes.len())?,
            len: bytes.len(),
        };
        // A store failure drops `buf`, releasing the fresh allocation.
        buf.module.store(buf.ptr, bytes)?;
        Ok(buf)
    }

    /// Allocates a region of `len` bytes and explicitly zero-fills it.
    ///
    /// Output regions are zeroed here rather than trusting the engine to
    /// initialize them before reading back.
    pub fn zeroed(module: &'m M, len: usize) -> Result<Self, HarnessError> {
        ForeignBuf::copy_in(module, &vec![0u8; len])
    }

    /// The region's pointer; null for a zero-length buffer.
    pub fn ptr(&self) -> Ptr {
        self.ptr
    }

    /// The region's length in bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` for a zero-length buffer.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Copies the region's contents into caller-owned storage.
    pub fn read(&self) -> Result<Vec<u8>, HarnessError> {
        let mut out = vec![0u8; self.len];
        self.read_into(&mut out)?;
        Ok(out)
    }

    /// Copies the first `out.len()` bytes of the region into `out`.
    pub fn read_into(&self, out: &mut [u8]) -> Result<(), HarnessError> {
        if out.is_empty() {
            return Ok(());
        }
        self.module.load(self.ptr, out)?;
        Ok(())
    }
}

impl<M: EngineModule> fmt::Debug for ForeignBuf<'_, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ForeignBuf")
            .field("ptr", &self.ptr)
            .field("len", &self.len)
            .finish()
    }
}

impl<M: EngineModule> Drop for ForeignBuf<'_, M> {
    fn drop(&mut self) {
        // Drop cannot propagate; a failed release means the module already
        // lost track of the region.
        if !self.ptr.is_null() {
            let _ = self.module.free(self.ptr);
        }
    }
}
