//! Engine module trait and the typed export surface.

use std::fmt;
use std::rc::Rc;

use crate::mem::{MemoryError, Ptr};

/// Entry-point names of the comparison-engine export surface.
pub mod symbols {
    /// Keyed digest: `(data, len, out)`, writes 16 bytes to `out`.
    pub const DIGEST: &str = "psi_blake3_hash_bytes";
    /// Context creation: `(count, elem_bits) -> handle`, null on failure.
    pub const CREATE: &str = "psi_gc_create";
    /// Context destruction: `(handle)`.
    pub const DESTROY: &str = "psi_gc_destroy";
    /// Circuit preparation: `(handle) -> status`, 0 on success.
    pub const PREPARE: &str = "psi_gc_prepare_circuit";
    /// Baseline pairwise comparison: `(handle, a, b, count, out_mask) -> status`.
    pub const COMPUTE_BASELINE: &str = "psi_hash_only_compute";
    /// Oblivious equality: `(handle, a, b, count, out_mask) -> status`.
    pub const COMPUTE_OBLIVIOUS: &str = "psi_gc_compute";
}

/// Opaque handle to an engine comparison context.
///
/// The zero handle is the engine's failure value for `create`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CtxHandle(u32);

impl CtxHandle {
    /// The null handle, returned by `create` on failure.
    pub const NULL: CtxHandle = CtxHandle(0);

    /// Creates a handle from its raw value.
    pub const fn from_raw(raw: u32) -> Self {
        CtxHandle(raw)
    }

    /// Returns the raw handle value.
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Returns `true` for the null (failed) handle.
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }
}

/// Keyed digest entry point: `(data, len, out)`.
///
/// `data` may be null when `len` is zero. Writes exactly 16 bytes at `out`.
pub type DigestFn = Rc<dyn Fn(Ptr, usize, Ptr)>;

/// Context creation entry point: `(count, elem_bits) -> handle`.
pub type CreateFn = Rc<dyn Fn(usize, usize) -> CtxHandle>;

/// Context destruction entry point. Call exactly once per live handle.
pub type DestroyFn = Rc<dyn Fn(CtxHandle)>;

/// Circuit preparation entry point: `(handle) -> status`, 0 on success.
pub type PrepareFn = Rc<dyn Fn(CtxHandle) -> i32>;

/// Comparison entry point: `(handle, buf_a, buf_b, count, out_mask) -> status`.
///
/// Reads `count` fixed-width records from each input buffer and writes a
/// `count`-byte 0/1 membership mask. Status 0 on success.
pub type ComputeFn = Rc<dyn Fn(CtxHandle, Ptr, Ptr, usize, Ptr) -> i32>;

/// A resolved entry point, typed by its call signature.
pub enum Export {
    /// Keyed digest.
    Digest(DigestFn),
    /// Context creation.
    Create(CreateFn),
    /// Context destruction.
    Destroy(DestroyFn),
    /// Circuit preparation.
    Prepare(PrepareFn),
    /// Either comparison variant.
    Compute(ComputeFn),
}

impl fmt::Debug for Export {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            Export::Digest(_) => "Digest",
            Export::Create(_) => "Create",
            Export::Destroy(_) => "Destroy",
            Export::Prepare(_) => "Prepare",
            Export::Compute(_) => "Compute",
        };
        f.debug_tuple(kind).finish()
    }
}

/// Lookup tier for resolving a named entry point.
///
/// The raw export table is not stable across engine builds, so callers try
/// `RawExport` first and fall back to the generic `CallWrapper` surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    /// Direct lookup in the module's raw export table.
    RawExport,
    /// Lookup through the module's generic call-wrapper surface.
    CallWrapper,
}

impl fmt::Display for Lookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lookup::RawExport => write!(f, "raw export"),
            Lookup::CallWrapper => write!(f, "call wrapper"),
        }
    }
}

/// A loaded comparison-engine module.
///
/// The module owns a linear memory and a named export surface. Buffers are
/// marshaled through `alloc`/`store`/`load`/`free`; every successful
/// `alloc` must be paired with exactly one `free`. Implementations are not
/// required to be `Sync`; the harness drives one run at a time, though a
/// module must stay reusable across sequential runs.
pub trait EngineModule {
    /// Looks up `name` in the raw export table.
    fn raw_export(&self, name: &str) -> Option<Export>;

    /// Looks up `name` through the generic call-wrapper surface.
    ///
    /// Returns `None` when the module has no wrapper support or the symbol
    /// is unknown to it.
    fn wrap_export(&self, name: &str) -> Option<Export>;

    /// Allocates `len` bytes of linear memory.
    fn alloc(&self, len: usize) -> Result<Ptr, MemoryError>;

    /// Releases an allocation previously returned by [`alloc`](Self::alloc).
    fn free(&self, ptr: Ptr) -> Result<(), MemoryError>;

    /// Copies `bytes` into the allocation starting at `ptr`.
    fn store(&self, ptr: Ptr, bytes: &[u8]) -> Result<(), MemoryError>;

    /// Copies `out.len()` bytes out of the allocation starting at `ptr`.
    fn load(&self, ptr: Ptr, out: &mut [u8]) -> Result<(), MemoryError>;

    /// Looks up `name` via the given tier.
    fn export(&self, name: &str, via: Lookup) -> Option<Export> {
        match via {
            Lookup::RawExport => self.raw_export(name),
            Lookup::CallWrapper => self.wrap_export(name),
        }
    }
}
