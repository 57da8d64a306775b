//! Duration formatting and the comparative timing ratio.

use std::time::Duration;

/// Floor for the ratio denominator, in milliseconds. Keeps a zero or
/// sub-microsecond baseline from producing a non-finite ratio.
const MIN_BASELINE_MS: f64 = 1e-6;

/// A duration in fractional milliseconds.
pub fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1e3
}

/// Formats a millisecond value with precision scaled to magnitude:
/// sub-millisecond durations get six decimals, sub-second ones three,
/// anything slower one.
pub fn format_ms(ms: f64) -> String {
    if !ms.is_finite() {
        return "-".to_string();
    }
    if ms < 1.0 {
        format!("{ms:.6}")
    } else if ms < 1000.0 {
        format!("{ms:.3}")
    } else {
        format!("{ms:.1}")
    }
}

/// Formats a duration per [`format_ms`].
pub fn format_duration(d: Duration) -> String {
    format_ms(duration_ms(d))
}

/// Oblivious-over-baseline slowdown factor.
///
/// The denominator is clamped to [`MIN_BASELINE_MS`]; the result is finite
/// for every input, including a zero baseline.
pub fn slowdown_ratio(oblivious: Duration, baseline: Duration) -> f64 {
    duration_ms(oblivious) / duration_ms(baseline).max(MIN_BASELINE_MS)
}
