//! Distribution functions used by the T² engine and the control limits.
//!
//! Thin wrappers over `statrs` that never panic: invalid parameters
//! (non-positive degrees of freedom, probabilities outside `[0, 1]`, NaN
//! arguments) evaluate to `NaN`. This is how degenerate sample sizes
//! (n <= p) surface as a controlled numeric result instead of an error.
//!
//! # Examples
//!
//! ```
//! use hotelling::distribution::{f_sf, f_quantile};
//!
//! let x = f_quantile(0.95, 3.0, 17.0);
//! assert!((f_sf(x, 3.0, 17.0) - 0.05).abs() < 1e-6);
//!
//! // Second degree of freedom is zero when n == p.
//! assert!(f_sf(2.0, 3.0, 0.0).is_nan());
//! ```

use statrs::distribution::{Beta, ContinuousCDF, FisherSnedecor};

fn fisher(d1: f64, d2: f64) -> Option<FisherSnedecor> {
    if !(d1.is_finite() && d2.is_finite()) || d1 <= 0.0 || d2 <= 0.0 {
        return None;
    }
    FisherSnedecor::new(d1, d2).ok()
}

fn valid_probability(p: f64) -> bool {
    p.is_finite() && (0.0..=1.0).contains(&p)
}

/// Survival function of the F distribution, `1 - CDF(x; d1, d2)`.
///
/// Returns `NaN` when either degree of freedom is not strictly positive or
/// `x` is NaN. Negative `x` has survival probability 1.
pub fn f_sf(x: f64, d1: f64, d2: f64) -> f64 {
    let Some(dist) = fisher(d1, d2) else {
        return f64::NAN;
    };
    if x.is_nan() {
        return f64::NAN;
    }
    if x == f64::INFINITY {
        return 0.0;
    }
    if x <= 0.0 {
        return 1.0;
    }
    dist.sf(x).clamp(0.0, 1.0)
}

/// Quantile (percent point function) of the F distribution.
pub fn f_quantile(p: f64, d1: f64, d2: f64) -> f64 {
    match fisher(d1, d2) {
        Some(dist) if valid_probability(p) => dist.inverse_cdf(p),
        _ => f64::NAN,
    }
}

/// Quantile of the Beta(a, b) distribution.
///
/// Both shape parameters must be strictly positive and finite.
pub fn beta_quantile(p: f64, a: f64, b: f64) -> f64 {
    if !(a.is_finite() && b.is_finite()) || a <= 0.0 || b <= 0.0 || !valid_probability(p) {
        return f64::NAN;
    }
    match Beta::new(a, b) {
        Ok(dist) => dist.inverse_cdf(p),
        Err(_) => f64::NAN,
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn f_sf_bounded(x in 0.0_f64..100.0, d1 in 1.0_f64..20.0, d2 in 1.0_f64..200.0) {
            let p = f_sf(x, d1, d2);
            prop_assert!((0.0..=1.0).contains(&p), "sf = {p}");
        }

        #[test]
        fn f_quantile_inverts_sf(p in 0.01_f64..0.99, d1 in 1.0_f64..10.0, d2 in 2.0_f64..100.0) {
            let x = f_quantile(p, d1, d2);
            let back = 1.0 - f_sf(x, d1, d2);
            prop_assert!((back - p).abs() < 1e-5, "p = {p}, round trip = {back}");
        }
    }
}
