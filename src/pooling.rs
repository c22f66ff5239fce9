//! Covariance pooling and inversion.
//!
//! The pooled covariance of two samples is the weighted mean of their
//! individual covariance matrices:
//!
//! ```text
//! S = (n₁·S_x + n₂·S_y) / (n₁ + n₂)
//! ```
//!
//! where (n₁, n₂) are the effective counts, `(n_x - 1, n_y - 1)` with Bessel's
//! correction or the raw row counts without it.
//!
//! Two inversions are offered, and the T² engine uses them asymmetrically:
//!
//! - [`inverse`] — direct LU solve against the identity. A singular matrix is
//!   an error ([`HotellingError::SingularCovariance`]); the two-sample test
//!   propagates it.
//! - [`pseudo_inverse`] — Moore-Penrose inverse through the SVD. Rank
//!   deficient matrices (e.g. p > n) still produce a defined result; the
//!   one-sample test uses it.
//!
//! # Reference
//!
//! Hotelling, H. (1931). "The Generalization of Student's Ratio",
//! *Ann. Math. Statist.* 2(3), pp. 360-378.

use nalgebra::DMatrix;

use crate::error::{HotellingError, Result};
use crate::moments::{effective_counts, paired_moments};
use crate::table::ObservationTable;

/// Relative cutoff below which singular values are treated as zero.
const PINV_RCOND: f64 = 1e-15;

/// Iteration cap for the SVD; exceeding it yields a degenerate (NaN) result.
const SVD_MAX_ITERATIONS: usize = 10_000;

/// Pool two covariance matrices with effective counts `nx` and `ny`.
///
/// # Errors
///
/// [`HotellingError::ShapeMismatch`] if the matrices differ in size.
///
/// # Examples
///
/// ```
/// use hotelling::pooling::pool;
/// use nalgebra::DMatrix;
///
/// let a = DMatrix::from_row_slice(1, 1, &[2.0]);
/// let b = DMatrix::from_row_slice(1, 1, &[6.0]);
/// let s = pool(&a, 1.0, &b, 3.0).unwrap();
/// assert!((s[(0, 0)] - 5.0).abs() < 1e-12);
/// ```
pub fn pool(cov_x: &DMatrix<f64>, nx: f64, cov_y: &DMatrix<f64>, ny: f64) -> Result<DMatrix<f64>> {
    if cov_x.shape() != cov_y.shape() {
        return Err(HotellingError::ShapeMismatch {
            expected: cov_x.ncols(),
            found: cov_y.ncols(),
        });
    }
    Ok((cov_x * nx + cov_y * ny) / (nx + ny))
}

/// Invert a square matrix by solving `S · X = I`.
///
/// # Errors
///
/// [`HotellingError::SingularCovariance`] when the LU factorization has a
/// zero pivot, [`HotellingError::ShapeMismatch`] for a non-square input.
pub fn inverse(s: &DMatrix<f64>) -> Result<DMatrix<f64>> {
    if !s.is_square() {
        return Err(HotellingError::ShapeMismatch {
            expected: s.nrows(),
            found: s.ncols(),
        });
    }
    let identity = DMatrix::<f64>::identity(s.nrows(), s.ncols());
    s.clone()
        .lu()
        .solve(&identity)
        .ok_or(HotellingError::SingularCovariance)
}

/// Moore-Penrose pseudo-inverse.
///
/// Singular values below `1e-15 · σ_max` are treated as zero, so rank
/// deficient matrices are tolerated. A matrix with non-finite entries (for
/// instance the covariance of a single observation) yields a NaN matrix of
/// the transposed shape rather than an error.
///
/// # Errors
///
/// [`HotellingError::Numeric`] if the SVD backend rejects the cutoff.
///
/// # Examples
///
/// ```
/// use hotelling::pooling::pseudo_inverse;
/// use nalgebra::DMatrix;
///
/// // Rank one: an ordinary inverse does not exist.
/// let s = DMatrix::from_row_slice(2, 2, &[1.0, 1.0, 1.0, 1.0]);
/// let pinv = pseudo_inverse(&s).unwrap();
/// assert!((pinv[(0, 0)] - 0.25).abs() < 1e-12);
/// ```
pub fn pseudo_inverse(s: &DMatrix<f64>) -> Result<DMatrix<f64>> {
    let degenerate = || DMatrix::from_element(s.ncols(), s.nrows(), f64::NAN);
    if s.iter().any(|v| !v.is_finite()) {
        return Ok(degenerate());
    }
    let Some(svd) = s.clone().try_svd(true, true, f64::EPSILON, SVD_MAX_ITERATIONS) else {
        return Ok(degenerate());
    };
    let sigma_max = svd.singular_values.iter().copied().fold(0.0_f64, f64::max);
    svd.pseudo_inverse(PINV_RCOND * sigma_max)
        .map_err(|e| HotellingError::Numeric(e.to_string()))
}

/// Pooled covariance of two tables and its direct inverse, `(S⁻¹, S)`.
///
/// # Errors
///
/// [`HotellingError::ShapeMismatch`] for differing feature counts and
/// [`HotellingError::SingularCovariance`] when `S` cannot be inverted.
pub fn inverse_pooled_covariance<X, Y>(
    x: &X,
    y: &Y,
    bessel: bool,
) -> Result<(DMatrix<f64>, DMatrix<f64>)>
where
    X: ObservationTable + ?Sized,
    Y: ObservationTable + ?Sized,
{
    let (mx, my) = paired_moments(x, y)?;
    let (nx, ny) = effective_counts(mx.rows, my.rows, bessel);
    let s = pool(&mx.covariance, nx, &my.covariance, ny)?;
    let inv = inverse(&s)?;
    Ok((inv, s))
}
