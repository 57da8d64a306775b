//! Cross-validation of the two backends and intersection projection.

use std::time::Duration;

use crate::exec::ExecOutput;
use crate::report::slowdown_ratio;

/// Success record of a run whose backends agreed.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Alice's items at mask-1 positions, original order preserved. May be
    /// empty; that is a valid result, not a failure.
    pub intersection: Vec<String>,
    /// Number of index positions compared: `min(len(A), len(B))`.
    pub comparison_count: usize,
    /// Per-call average baseline duration.
    pub baseline_time: Duration,
    /// Single-call oblivious duration.
    pub oblivious_time: Duration,
    /// Oblivious-over-baseline slowdown factor, always finite.
    pub ratio: f64,
}

/// The two backends disagreed on at least one mask position.
///
/// This indicates an implementation bug in one of the engines, not a data
/// condition; both masks are retained for inspection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaskMismatch {
    /// Mask produced by the baseline engine.
    pub baseline: Vec<u8>,
    /// Mask produced by the oblivious engine.
    pub oblivious: Vec<u8>,
}

impl MaskMismatch {
    /// First index at which the masks differ (or differ in length).
    pub fn first_divergence(&self) -> Option<usize> {
        if self.baseline.len() != self.oblivious.len() {
            return Some(self.baseline.len().min(self.oblivious.len()));
        }
        self.baseline
            .iter()
            .zip(&self.oblivious)
            .position(|(a, b)| a != b)
    }
}

/// Outcome of one run that reached both backends.
#[derive(Debug, Clone)]
pub enum RunOutcome {
    /// Both backends produced identical masks; the intersection and
    /// timings are trustworthy.
    Agreed(RunReport),
    /// The backends disagreed; no intersection is derived.
    Inconsistent(MaskMismatch),
}

/// Compares the two masks positionally and, on agreement, projects the
/// mask back onto Alice's original items.
pub fn cross_validate(items_a: &[String], count: usize, output: ExecOutput) -> RunOutcome {
    let ExecOutput {
        mask_baseline,
        mask_oblivious,
        baseline_time,
        oblivious_time,
    } = output;

    if mask_baseline != mask_oblivious {
        return RunOutcome::Inconsistent(MaskMismatch {
            baseline: mask_baseline,
            oblivious: mask_oblivious,
        });
    }

    let intersection = items_a[..count]
        .iter()
        .zip(&mask_baseline)
        .filter(|&(_, &flag)| flag == 1)
        .map(|(item, _)| item.clone())
        .collect();

    RunOutcome::Agreed(RunReport {
        intersection,
        comparison_count: count,
        baseline_time,
        oblivious_time,
        ratio: slowdown_ratio(oblivious_time, baseline_time),
    })
}
