//! Linear-memory pointers and access errors.

use std::error::Error;
use std::fmt;

/// Offset into an engine module's linear memory.
///
/// The engine call convention passes buffers as offsets into the module's
/// own arena rather than as native references. Offset 0 is the null
/// pointer; engines accept it only where a length of zero makes the buffer
/// irrelevant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Ptr(u32);

impl Ptr {
    /// The null pointer.
    pub const NULL: Ptr = Ptr(0);

    /// Creates a pointer from a raw offset.
    pub const fn from_offset(offset: u32) -> Self {
        Ptr(offset)
    }

    /// Returns the raw offset.
    pub const fn offset(self) -> u32 {
        self.0
    }

    /// Returns `true` for the null pointer.
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Ptr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08x}", self.0)
    }
}

/// Error raised by a linear-memory operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemoryError {
    /// A zero-sized allocation was requested.
    ZeroSized,
    /// The arena refused to grow by `requested` bytes.
    OutOfMemory {
        /// Size of the failed allocation.
        requested: usize,
    },
    /// The pointer does not name a live allocation.
    ///
    /// Covers both never-allocated and already-released pointers, so a
    /// double release is surfaced rather than silently absorbed.
    BadPointer(Ptr),
    /// An access runs past the end of the allocation it names.
    OutOfBounds {
        /// Start of the accessed allocation.
        ptr: Ptr,
        /// Length of the attempted access.
        len: usize,
        /// Length of the live allocation at `ptr`.
        alloc_len: usize,
    },
}

impl fmt::Display for MemoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemoryError::ZeroSized => write!(f, "zero-sized allocation"),
            MemoryError::OutOfMemory { requested } => {
                write!(f, "engine memory exhausted allocating {requested} bytes")
            }
            MemoryError::BadPointer(ptr) => {
                write!(f, "pointer {ptr} does not name a live allocation")
            }
            MemoryError::OutOfBounds {
                ptr,
                len,
                alloc_len,
            } => write!(
                f,
                "access of {len} bytes at {ptr} exceeds the {alloc_len}-byte allocation"
            ),
        }
    }
}

impl Error for MemoryError {}
