//! Two-tier resolution of the engine's entry points.

use std::fmt;

use psi_engine_api::{
    ComputeFn, CreateFn, DestroyFn, EngineModule, Export, Lookup, PrepareFn, symbols,
};

use crate::error::{CapabilityError, HarnessError};

/// Lookup tiers in the order they are attempted. The raw export table is
/// not stable across engine builds, so the generic call wrapper backs it
/// up.
const LOOKUP_ORDER: [Lookup; 2] = [Lookup::RawExport, Lookup::CallWrapper];

/// Resolves `name` against the module, trying each tier in order.
///
/// On total failure the error names the symbol and every attempted tier.
pub fn resolve<M: EngineModule>(module: &M, name: &'static str) -> Result<Export, CapabilityError> {
    for via in LOOKUP_ORDER {
        if let Some(export) = module.export(name, via) {
            return Ok(export);
        }
    }
    Err(CapabilityError {
        symbol: name,
        attempted: LOOKUP_ORDER.to_vec(),
    })
}

/// The five comparison entry points, resolved and signature-checked.
pub struct EngineBindings {
    pub(crate) create: CreateFn,
    pub(crate) destroy: DestroyFn,
    pub(crate) prepare: PrepareFn,
    pub(crate) baseline: ComputeFn,
    pub(crate) oblivious: ComputeFn,
}

impl EngineBindings {
    /// Resolves all comparison entry points up front, so a missing
    /// capability is reported before any computation begins.
    pub fn resolve<M: EngineModule>(module: &M) -> Result<Self, HarnessError> {
        let create = match resolve(module, symbols::CREATE)? {
            Export::Create(f) => f,
            _ => {
                return Err(HarnessError::WrongSignature {
                    symbol: symbols::CREATE,
                });
            }
        };
        let destroy = match resolve(module, symbols::DESTROY)? {
            Export::Destroy(f) => f,
            _ => {
                return Err(HarnessError::WrongSignature {
                    symbol: symbols::DESTROY,
                });
            }
        };
        let prepare = match resolve(module, symbols::PREPARE)? {
            Export::Prepare(f) => f,
            _ => {
                return Err(HarnessError::WrongSignature {
                    symbol: symbols::PREPARE,
                });
            }
        };
        let baseline = match resolve(module, symbols::COMPUTE_BASELINE)? {
            Export::Compute(f) => f,
            _ => {
                return Err(HarnessError::WrongSignature {
                    symbol: symbols::COMPUTE_BASELINE,
                });
            }
        };
        let oblivious = match resolve(module, symbols::COMPUTE_OBLIVIOUS)? {
            Export::Compute(f) => f,
            _ => {
                return Err(HarnessError::WrongSignature {
                    symbol: symbols::COMPUTE_OBLIVIOUS,
                });
            }
        };

        Ok(EngineBindings {
            create,
            destroy,
            prepare,
            baseline,
            oblivious,
        })
    }
}

impl fmt::Debug for EngineBindings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // The bound entry points are closures; only presence is printable.
        f.debug_struct("EngineBindings").finish_non_exhaustive()
    }
}
