//! Hotelling's T² test for one sample or two independent samples.
//!
//! The multivariate extension of Student's t-test. The one-sample form tests
//! H₀: μ = μ₀; the two-sample form tests whether two samples with the same
//! features share a mean vector (sample sizes may differ).
//!
//! # Algorithm
//!
//! One sample (n observations, p features, covariance S of the sample):
//!
//! ```text
//! T² = n (x̄ - μ₀)ᵀ S⁺ (x̄ - μ₀)
//! F  = (n - p) T² / ((n - 1) p)          ~ F(p, n - p)
//! ```
//!
//! S⁺ is the Moore-Penrose pseudo-inverse, so a rank-deficient covariance
//! still yields a statistic.
//!
//! Two samples (pooled covariance S, effective counts n₁ + n₂ = n):
//!
//! ```text
//! T² = n_x n_y / (n_x + n_y) · (x̄ - ȳ)ᵀ S⁻¹ (x̄ - ȳ)
//! F  = (n_x + n_y - p - 1) T² / (n p)    ~ F(p, n - p)
//! ```
//!
//! S⁻¹ is a direct inverse; a singular pooled covariance is reported as
//! [`HotellingError::SingularCovariance`].
//!
//! When n ≤ p the second degree of freedom is not positive: the F value
//! and p-value come out as NaN or infinite, never as an error.
//!
//! # References
//!
//! - Hotelling, H. (1931). "The Generalization of Student's Ratio",
//!   *Ann. Math. Statist.* 2(3), pp. 360-378.
//! - Anderson, T.W. (1992). "Introduction to Hotelling (1931)". In: Kotz &
//!   Johnson (eds), *Breakthroughs in Statistics*. Springer.
//!
//! # Examples
//!
//! ```
//! use hotelling::table::EagerTable;
//! use hotelling::testing::two_sample_t2;
//!
//! let x = EagerTable::from_rows(&[
//!     [23.0, 45.0, 15.0], [40.0, 85.0, 18.0], [215.0, 307.0, 60.0],
//!     [110.0, 110.0, 50.0], [65.0, 105.0, 24.0],
//! ]).unwrap();
//! let y = EagerTable::from_rows(&[
//!     [277.0, 230.0, 63.0], [153.0, 80.0, 29.0], [306.0, 440.0, 105.0],
//!     [252.0, 350.0, 175.0], [143.0, 205.0, 42.0],
//! ]).unwrap();
//!
//! let r = two_sample_t2(&x, &y, true).unwrap();
//! assert!((r.statistic - 11.1037).abs() < 1e-4);
//! assert!(r.p_value > 0.05); // cannot reject equal means
//! ```

use std::fmt;

use nalgebra::{DMatrix, DVector};
use serde::Serialize;

use crate::distribution::f_sf;
use crate::error::{HotellingError, Result};
use crate::moments::{check_features, effective_counts, moments};
use crate::pooling::{inverse_pooled_covariance, pseudo_inverse};
use crate::table::ObservationTable;

/// What the first sample is compared against.
#[derive(Clone, Copy)]
pub enum Comparand<'a> {
    /// One-sample test against the zero vector.
    Origin,
    /// One-sample test against a hypothesized mean μ₀ (length p).
    Mean(&'a [f64]),
    /// Two-sample test against a second table with the same features.
    Sample(&'a dyn ObservationTable),
}

impl fmt::Debug for Comparand<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Comparand::Origin => f.write_str("Origin"),
            Comparand::Mean(mu0) => f.debug_tuple("Mean").field(mu0).finish(),
            Comparand::Sample(table) => f
                .debug_struct("Sample")
                .field("features", &table.feature_count())
                .finish_non_exhaustive(),
        }
    }
}

/// Result of a Hotelling T² test.
#[derive(Debug, Clone, PartialEq)]
pub struct T2Result {
    /// The T² statistic. Not clamped: round-off may leave it slightly below zero.
    pub statistic: f64,
    /// The F statistic derived from T².
    pub f_value: f64,
    /// Survival probability of `f_value` under F(df.0, df.1).
    pub p_value: f64,
    /// Numerator and denominator degrees of freedom.
    pub df: (f64, f64),
    /// Covariance used: the sample's own for one sample, pooled for two.
    pub covariance: DMatrix<f64>,
}

impl T2Result {
    /// Dictionary form of the result.
    pub fn to_report(&self) -> T2Report {
        T2Report {
            t2_stat: self.statistic,
            f_stat: self.f_value,
            p_value: self.p_value,
            pooled_var: self
                .covariance
                .row_iter()
                .map(|row| row.iter().copied().collect())
                .collect(),
        }
    }
}

/// Serializable summary `{t2_stat, f_stat, p_value, pooled_var}`.
///
/// Non-finite values serialize as `null`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct T2Report {
    pub t2_stat: f64,
    pub f_stat: f64,
    pub p_value: f64,
    /// Covariance matrix as nested rows.
    pub pooled_var: Vec<Vec<f64>>,
}

/// `dᵀ · A · d`.
pub(crate) fn quadratic_form(diff: &DVector<f64>, a: &DMatrix<f64>) -> f64 {
    diff.dot(&(a * diff))
}

fn mean_vector(mu0: Option<&[f64]>, p: usize) -> Result<DVector<f64>> {
    match mu0 {
        None => Ok(DVector::zeros(p)),
        Some(values) => {
            check_features(p, values.len())?;
            Ok(DVector::from_column_slice(values))
        }
    }
}

// ---------------------------------------------------------------------------
// One sample
// ---------------------------------------------------------------------------

/// One-sample T² test of H₀: μ = μ₀ (μ₀ = 0 when `None`).
///
/// # Errors
///
/// [`HotellingError::ShapeMismatch`] if `mu0` does not have p entries.
///
/// # Examples
///
/// ```
/// use hotelling::table::EagerTable;
/// use hotelling::testing::one_sample_t2;
///
/// let x = EagerTable::from_rows(&[
///     [3.7, 48.5, 9.3], [5.7, 65.1, 8.0], [3.8, 47.2, 10.9], [3.2, 53.2, 12.0],
///     [3.1, 55.5, 9.7], [4.6, 36.1, 7.9], [2.4, 24.8, 14.0], [7.2, 33.1, 7.6],
/// ]).unwrap();
/// let r = one_sample_t2(&x, Some(&[4.0, 50.0, 10.0])).unwrap();
/// let expected_f = (8.0 - 3.0) * r.statistic / (7.0 * 3.0);
/// assert!((r.f_value - expected_f).abs() < 1e-12);
/// assert_eq!(r.df, (3.0, 5.0));
/// ```
pub fn one_sample_t2<X: ObservationTable + ?Sized>(x: &X, mu0: Option<&[f64]>) -> Result<T2Result> {
    let p = x.feature_count();
    let mu0 = mean_vector(mu0, p)?;
    let m = moments(x)?;

    let inv_cov = pseudo_inverse(&m.covariance)?;
    let n = m.rows as f64;
    let pf = p as f64;
    let diff = &m.mean - &mu0;
    let statistic = n * quadratic_form(&diff, &inv_cov);

    let f_value = (n - pf) * statistic / ((n - 1.0) * pf);
    let df = (pf, n - pf);
    let p_value = f_sf(f_value, df.0, df.1);

    Ok(T2Result {
        statistic,
        f_value,
        p_value,
        df,
        covariance: m.covariance,
    })
}

/// Abbreviated one-sample path: T² of `x` against a fixed `mean` and
/// externally supplied `covariance`, without the F conversion.
///
/// This is the per-point statistic of a T² control chart, where each
/// observation is a one-row sample tested against the moments of the whole
/// dataset.
///
/// # Errors
///
/// [`HotellingError::ShapeMismatch`] if `mean` or `covariance` do not match
/// the feature count of `x`.
pub fn t2_statistic<X: ObservationTable + ?Sized>(
    x: &X,
    mean: &DVector<f64>,
    covariance: &DMatrix<f64>,
) -> Result<f64> {
    let p = x.feature_count();
    check_features(p, mean.len())?;
    check_features(p, covariance.nrows())?;
    check_features(p, covariance.ncols())?;

    let n = x.row_count()? as f64;
    let diff = x.mean()? - mean;
    let inv_cov = pseudo_inverse(covariance)?;
    Ok(n * quadratic_form(&diff, &inv_cov))
}

// ---------------------------------------------------------------------------
// Two samples
// ---------------------------------------------------------------------------

/// Two-sample T² test with pooled covariance.
///
/// With `bessel` (the usual choice) the covariances are pooled with weights
/// `(n_x - 1, n_y - 1)`; otherwise with the raw row counts.
///
/// # Errors
///
/// [`HotellingError::ShapeMismatch`] if the feature counts differ and
/// [`HotellingError::SingularCovariance`] if the pooled covariance cannot be
/// inverted.
pub fn two_sample_t2<X, Y>(x: &X, y: &Y, bessel: bool) -> Result<T2Result>
where
    X: ObservationTable + ?Sized,
    Y: ObservationTable + ?Sized,
{
    let (inv, pooled) = inverse_pooled_covariance(x, y, bessel)?;
    let (rows_x, rows_y) = (x.row_count()?, y.row_count()?);
    let (n1, n2) = effective_counts(rows_x, rows_y, bessel);

    let nx = rows_x as f64;
    let ny = rows_y as f64;
    let pf = x.feature_count() as f64;
    let n = n1 + n2;

    let diff = x.mean()? - y.mean()?;
    let statistic = nx * ny / (nx + ny) * quadratic_form(&diff, &inv);

    let f_value = (nx + ny - pf - 1.0) * statistic / (n * pf);
    let df = (pf, n - pf);
    let p_value = f_sf(f_value, df.0, df.1);

    Ok(T2Result {
        statistic,
        f_value,
        p_value,
        df,
        covariance: pooled,
    })
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

/// Run the one- or two-sample test selected by `comparand`.
///
/// `bessel` only affects the two-sample form.
pub fn hotelling_t2<X: ObservationTable + ?Sized>(
    x: &X,
    comparand: Comparand<'_>,
    bessel: bool,
) -> Result<T2Result> {
    match comparand {
        Comparand::Origin => one_sample_t2(x, None),
        Comparand::Mean(mu0) => one_sample_t2(x, Some(mu0)),
        Comparand::Sample(y) => two_sample_t2(x, y, bessel),
    }
}

/// Same as [`hotelling_t2`], returned as the serializable dictionary.
pub fn hotelling_report<X: ObservationTable + ?Sized>(
    x: &X,
    comparand: Comparand<'_>,
    bessel: bool,
) -> Result<T2Report> {
    hotelling_t2(x, comparand, bessel).map(|r| r.to_report())
}


#[cfg(test)]
mod proptests {
    use super::*;
    use crate::table::EagerTable;
    use proptest::prelude::*;

    fn table(values: &[f64], p: usize) -> EagerTable {
        let n = values.len() / p;
        EagerTable::new(DMatrix::from_row_slice(n, p, &values[..n * p])).unwrap()
    }

    proptest! {
        #[test]
        fn one_sample_p_bounded(values in proptest::collection::vec(-1e3_f64..1e3, 12..=60)) {
            let r = one_sample_t2(&table(&values, 2), None).unwrap();
            prop_assert!(r.statistic >= -1e-6, "T2 = {}", r.statistic);
            prop_assert!((0.0..=1.0).contains(&r.p_value), "p = {}", r.p_value);
        }

        #[test]
        fn two_sample_swap_invariant(
            a in proptest::collection::vec(-1e3_f64..1e3, 12..=40),
            b in proptest::collection::vec(-1e3_f64..1e3, 12..=40),
        ) {
            let (x, y) = (table(&a, 2), table(&b, 2));
            if let (Ok(r1), Ok(r2)) = (two_sample_t2(&x, &y, true), two_sample_t2(&y, &x, true)) {
                let tol = 1e-6 * (1.0 + r1.statistic.abs());
                prop_assert!((r1.statistic - r2.statistic).abs() < tol);
                prop_assert!((r1.p_value - r2.p_value).abs() < 1e-6);
            }
        }
    }
}
