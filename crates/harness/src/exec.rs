//! Dual-backend executor.
//!
//! Drives both comparison backends over identical marshaled input through
//! a linear sequence: create context, prepare circuit, time the baseline
//! over repeated calls, time the oblivious engine once, copy both masks
//! out. Failure at any step still destroys the context and releases every
//! buffer; the RAII guards make that unconditional.

use std::fmt;
use std::time::{Duration, Instant};

use psi_engine_api::{CtxHandle, DestroyFn, EngineModule};

use crate::bind::EngineBindings;
use crate::digest::DIGEST_LEN;
use crate::error::{Backend, HarnessError};
use crate::marshal::ForeignBuf;

/// Default number of baseline repetitions per run. A single baseline call
/// is too fast to measure reliably, so the executor averages over this
/// many.
pub const BASELINE_REPS: u32 = 50;

/// Raw output of one dual-backend execution, before cross-validation.
#[derive(Debug, Clone)]
pub struct ExecOutput {
    /// Membership mask produced by the baseline engine.
    pub mask_baseline: Vec<u8>,
    /// Membership mask produced by the oblivious engine.
    pub mask_oblivious: Vec<u8>,
    /// Per-call baseline duration (total elapsed divided by repetitions).
    pub baseline_time: Duration,
    /// Single-call oblivious duration.
    pub oblivious_time: Duration,
}

/// Destroys the context exactly once, on every exit path.
struct ContextGuard {
    destroy: DestroyFn,
    handle: CtxHandle,
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        (self.destroy)(self.handle);
    }
}

impl fmt::Debug for ContextGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextGuard")
            .field("handle", &self.handle)
            .finish_non_exhaustive()
    }
}

/// Runs both backends over the packed digest batches.
///
/// `reps` below 1 is treated as 1.
pub fn execute<M: EngineModule>(
    module: &M,
    bindings: &EngineBindings,
    batch_a: &[u8],
    batch_b: &[u8],
    count: usize,
    reps: u32,
) -> Result<ExecOutput, HarnessError> {
    let elem_bits = DIGEST_LEN * 8;
    let reps = reps.max(1);

    let buf_a = ForeignBuf::copy_in(module, batch_a)?;
    let buf_b = ForeignBuf::copy_in(module, batch_b)?;
    let out_baseline = ForeignBuf::zeroed(module, count)?;
    let out_oblivious = ForeignBuf::zeroed(module, count)?;

    let handle = (bindings.create)(count, elem_bits);
    if handle.is_null() {
        return Err(HarnessError::ContextCreate { count, elem_bits });
    }
    let ctx = ContextGuard {
        destroy: bindings.destroy.clone(),
        handle,
    };

    let status = (bindings.prepare)(ctx.handle);
    if status != 0 {
        return Err(HarnessError::Prepare { status });
    }

    let started = Instant::now();
    for _ in 0..reps {
        let status = (bindings.baseline)(ctx.handle, buf_a.ptr(), buf_b.ptr(), count, out_baseline.ptr());
        if status != 0 {
            return Err(HarnessError::Compute {
                backend: Backend::Baseline,
                status,
            });
        }
    }
    let baseline_time = started.elapsed() / reps;

    let started = Instant::now();
    let status = (bindings.oblivious)(ctx.handle, buf_a.ptr(), buf_b.ptr(), count, out_oblivious.ptr());
    let oblivious_time = started.elapsed();
    if status != 0 {
        return Err(HarnessError::Compute {
            backend: Backend::Oblivious,
            status,
        });
    }

    // Copy both masks into caller-owned storage before teardown; the
    // guards release the context and buffers whatever happens next.
    let mask_baseline = out_baseline.read()?;
    let mask_oblivious = out_oblivious.read()?;

    Ok(ExecOutput {
        mask_baseline,
        mask_oblivious,
        baseline_time,
        oblivious_time,
    })
}
