//! Capability contract for PSI comparison-engine modules.
//!
//! A comparison engine is consumed, never implemented, by the harness: it
//! exposes a linear memory (buffers cross the boundary as offsets, not
//! references) and a named export surface with two lookup tiers. This crate
//! holds the vocabulary shared by engine implementations and the harness.

mod mem;
mod module;

pub use mem::{MemoryError, Ptr};
pub use module::{
    ComputeFn, CreateFn, CtxHandle, DestroyFn, DigestFn, EngineModule, Export, Lookup, PrepareFn,
    symbols,
};
