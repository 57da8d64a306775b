//! Linear-memory arena with live-allocation bookkeeping.

use std::collections::BTreeMap;

use psi_engine_api::{MemoryError, Ptr};

/// First usable offset. Offset 0 stays reserved as the null pointer.
const BASE_OFFSET: u32 = 16;

/// Allocation alignment in bytes.
const ALIGN: u32 = 16;

/// Byte arena addressed by [`Ptr`] offsets.
///
/// Allocations bump forward and freed space is not reused; what matters
/// here is that every pointer's liveness is tracked, so a double release
/// or a use-after-release surfaces as [`MemoryError::BadPointer`] instead
/// of silently reading stale bytes.
#[derive(Debug)]
pub(crate) struct LinearMemory {
    bytes: Vec<u8>,
    /// Live allocations: start offset to allocation length.
    live: BTreeMap<u32, usize>,
    next: u32,
}

impl LinearMemory {
    pub(crate) fn new() -> Self {
        LinearMemory {
            bytes: Vec::new(),
            live: BTreeMap::new(),
            next: BASE_OFFSET,
        }
    }

    /// Allocates `len` zero-initialized bytes.
    pub(crate) fn alloc(&mut self, len: usize) -> Result<Ptr, MemoryError> {
        if len == 0 {
            return Err(MemoryError::ZeroSized);
        }
        let offset = self.next;
        let end = u32::try_from(offset as usize + len)
            .ok()
            .and_then(|end| end.checked_next_multiple_of(ALIGN))
            .ok_or(MemoryError::OutOfMemory { requested: len })?;

        self.bytes.resize(end as usize, 0);
        self.live.insert(offset, len);
        self.next = end;
        Ok(Ptr::from_offset(offset))
    }

    /// Releases the allocation starting at `ptr`.
    pub(crate) fn free(&mut self, ptr: Ptr) -> Result<(), MemoryError> {
        self.live
            .remove(&ptr.offset())
            .map(|_| ())
            .ok_or(MemoryError::BadPointer(ptr))
    }

    /// Copies `bytes` to the start of the allocation at `ptr`.
    pub(crate) fn store(&mut self, ptr: Ptr, bytes: &[u8]) -> Result<(), MemoryError> {
        let start = self.checked_range(ptr, bytes.len())?;
        self.bytes[start..start + bytes.len()].copy_from_slice(bytes);
        Ok(())
    }

    /// Copies `out.len()` bytes from the start of the allocation at `ptr`.
    pub(crate) fn load(&self, ptr: Ptr, out: &mut [u8]) -> Result<(), MemoryError> {
        let start = self.checked_range(ptr, out.len())?;
        out.copy_from_slice(&self.bytes[start..start + out.len()]);
        Ok(())
    }

    /// Number of allocations not yet released.
    pub(crate) fn live_count(&self) -> usize {
        self.live.len()
    }

    fn checked_range(&self, ptr: Ptr, len: usize) -> Result<usize, MemoryError> {
        let alloc_len = *self
            .live
            .get(&ptr.offset())
            .ok_or(MemoryError::BadPointer(ptr))?;
        if len > alloc_len {
            return Err(MemoryError::OutOfBounds {
                ptr,
                len,
                alloc_len,
            });
        }
        Ok(ptr.offset() as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_store_load() {
        let mut mem = LinearMemory::new();
        let ptr = mem.alloc(4).unwrap();
        mem.store(ptr, &[1, 2, 3, 4]).unwrap();

        let mut out = [0u8; 4];
        mem.load(ptr, &mut out).unwrap();
        assert_eq!(out, [1, 2, 3, 4]);

        mem.free(ptr).unwrap();
        assert_eq!(mem.live_count(), 0);
    }

    #[test]
    fn fresh_allocations_are_zeroed() {
        let mut mem = LinearMemory::new();
        let ptr = mem.alloc(32).unwrap();
        let mut out = [0xffu8; 32];
        mem.load(ptr, &mut out).unwrap();
        assert_eq!(out, [0u8; 32]);
    }

    #[test]
    fn double_free_is_an_error() {
        let mut mem = LinearMemory::new();
        let ptr = mem.alloc(8).unwrap();
        mem.free(ptr).unwrap();
        assert_eq!(mem.free(ptr), Err(MemoryError::BadPointer(ptr)));
    }

    #[test]
    fn use_after_free_is_an_error() {
        let mut mem = LinearMemory::new();
        let ptr = mem.alloc(8).unwrap();
        mem.free(ptr).unwrap();
        let mut out = [0u8; 8];
        assert_eq!(mem.load(ptr, &mut out), Err(MemoryError::BadPointer(ptr)));
    }

    #[test]
    fn oversized_access_is_rejected() {
        let mut mem = LinearMemory::new();
        let ptr = mem.alloc(8).unwrap();
        assert_eq!(
            mem.store(ptr, &[0u8; 9]),
            Err(MemoryError::OutOfBounds {
                ptr,
                len: 9,
                alloc_len: 8,
            })
        );
    }

    #[test]
    fn zero_sized_alloc_is_rejected() {
        let mut mem = LinearMemory::new();
        assert_eq!(mem.alloc(0), Err(MemoryError::ZeroSized));
    }
}
