//! Dual-backend PSI verification and benchmarking harness.
//!
//! Takes both parties' item lists, derives fixed-width keyed digests
//! through the engine's digest export, marshals them into the engine's
//! linear memory, drives the baseline and oblivious comparison backends
//! over the identical input, cross-validates their membership masks
//! bit-for-bit, and reports the visible intersection with comparative
//! timings.
//!
//! The comparison engine itself is consumed through the
//! [`EngineModule`] capability contract; see `psi-engine-native` for the
//! in-process implementation.

pub mod bind;
pub mod digest;
pub mod error;
pub mod exec;
pub mod marshal;
pub mod report;
pub mod validate;

use psi_engine_api::EngineModule;

pub use bind::EngineBindings;
pub use digest::{DIGEST_LEN, Digest, DigestAdapter};
pub use error::{Backend, CapabilityError, HarnessError, Party};
pub use exec::{BASELINE_REPS, ExecOutput};
pub use marshal::ForeignBuf;
pub use validate::{MaskMismatch, RunOutcome, RunReport};

/// Runs one dual-backend comparison with the default baseline repetition
/// count ([`BASELINE_REPS`]).
///
/// See [`run_with_reps`].
pub fn run<M: EngineModule>(
    module: &M,
    items_a: &[String],
    items_b: &[String],
) -> Result<RunOutcome, HarnessError> {
    run_with_reps(module, items_a, items_b, BASELINE_REPS)
}

/// Runs one dual-backend comparison.
///
/// Items are compared *by index position*: the comparison window is
/// `min(len(A), len(B))` and items beyond it are never digested or
/// compared. This positional truncation is a known limitation of the
/// demo's semantics, not a set operation.
///
/// Returns an error for an empty party list (before any engine
/// interaction) or for any engine-level failure; backend disagreement is
/// reported through [`RunOutcome::Inconsistent`], not as an error. The
/// module is left ready for an independent subsequent run on every path.
pub fn run_with_reps<M: EngineModule>(
    module: &M,
    items_a: &[String],
    items_b: &[String],
    reps: u32,
) -> Result<RunOutcome, HarnessError> {
    if items_a.is_empty() {
        return Err(HarnessError::EmptyInput(Party::Alice));
    }
    if items_b.is_empty() {
        return Err(HarnessError::EmptyInput(Party::Bob));
    }

    let count = items_a.len().min(items_b.len());

    // Bind every capability up front; a missing export is reported before
    // any digesting starts.
    let adapter = DigestAdapter::bind(module)?;
    let bindings = EngineBindings::resolve(module)?;

    let batch_a = adapter.digest_batch(items_a, count)?;
    let batch_b = adapter.digest_batch(items_b, count)?;

    let output = exec::execute(module, &bindings, &batch_a, &batch_b, count, reps)?;
    Ok(validate::cross_validate(items_a, count, output))
}
