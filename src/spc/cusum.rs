//! Cumulative-sum trace of a chart statistic.
//!
//! Shifts each value by a center line, accumulates, and shifts back:
//!
//! ```text
//! cᵢ = Σ_{j≤i} (q_j - center) + center
//! ```
//!
//! A persistent drift of the statistic away from the center shows up as a
//! steady slope in the trace, long before single points cross a limit.
//!
//! The trace is computed once from the raw statistics. It is not
//! idempotent: feeding a trace back in accumulates again.
//!
//! # Reference
//!
//! Page, E.S. (1954). "Continuous Inspection Schemes", *Biometrika* 41(1/2),
//! pp. 100-115.

/// Running CUSUM of `values` around `center`.
///
/// A non-finite value yields NaN at its own position and is skipped by the
/// running sum.
///
/// # Examples
///
/// ```
/// use hotelling::spc::cusum_trace;
///
/// let trace = cusum_trace(&[1.0, 3.0, 2.0], 2.0);
/// assert_eq!(trace, vec![1.0, 2.0, 2.0]);
/// ```
pub fn cusum_trace(values: &[f64], center: f64) -> Vec<f64> {
    let mut sum = 0.0;
    values
        .iter()
        .map(|&q| {
            if !q.is_finite() {
                return f64::NAN;
            }
            sum += q - center;
            sum + center
        })
        .collect()
}
