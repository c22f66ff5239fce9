//! Moment estimation: sample mean vectors and covariance matrices.
//!
//! # Algorithm
//!
//! For an n × p table X with column means x̄:
//!
//! ```text
//! S = Σᵢ (xᵢ - x̄)(xᵢ - x̄)ᵀ / (n - 1)
//! ```
//!
//! The divisor is always n − 1, matching the native covariance routines of
//! the usual array and dataframe libraries. Bessel's correction as a
//! *weighting* policy (see [`bessel_correction`]) only affects how two
//! covariance matrices are pooled, never the individual matrices.
//!
//! Lazily aggregated tables merge per-partition co-moments with
//! [`CoMomentAccumulator`], which reproduces the eager result up to floating
//! round-off.
//!
//! # Examples
//!
//! ```
//! use hotelling::moments::{bessel_correction, moments};
//! use hotelling::table::EagerTable;
//!
//! let x = EagerTable::from_column(&[7.0, 8.0, 5.0, 7.0, 9.0, 8.0]).unwrap();
//! let y = EagerTable::from_column(&[7.0, 8.0, 5.0, 7.0, 9.0]).unwrap();
//! assert_eq!(bessel_correction(&x, Some(&y)).unwrap(), (5, 4));
//! assert_eq!(bessel_correction(&x, None).unwrap(), (5, 0));
//!
//! let m = moments(&x).unwrap();
//! assert_eq!(m.covariance.shape(), (1, 1));
//! ```

use nalgebra::{DMatrix, DVector};

use crate::error::{HotellingError, Result};
use crate::table::ObservationTable;

// ---------------------------------------------------------------------------
// Matrix kernels
// ---------------------------------------------------------------------------

/// Per-column mean of an n × p matrix.
pub(crate) fn column_means(data: &DMatrix<f64>) -> DVector<f64> {
    let n = data.nrows() as f64;
    DVector::from_iterator(data.ncols(), data.column_iter().map(|c| c.sum() / n))
}

/// Sum of outer products of the centered rows (the co-moment matrix).
fn comoment(data: &DMatrix<f64>, mean: &DVector<f64>) -> DMatrix<f64> {
    let mut centered = data.clone();
    for (j, mut column) in centered.column_iter_mut().enumerate() {
        column.add_scalar_mut(-mean[j]);
    }
    centered.tr_mul(&centered)
}

/// Sample covariance (divisor n − 1). A single row yields NaN entries.
pub(crate) fn sample_covariance(data: &DMatrix<f64>, mean: &DVector<f64>) -> DMatrix<f64> {
    let divisor = data.nrows() as f64 - 1.0;
    comoment(data, mean) / divisor
}

// ---------------------------------------------------------------------------
// Mergeable accumulator
// ---------------------------------------------------------------------------

/// Mergeable running count, mean vector and co-moment matrix.
///
/// The multivariate form of Welford's accumulator: partial aggregates over
/// disjoint row sets combine with Chan's pairwise update
///
/// ```text
/// δ  = x̄_b - x̄_a
/// x̄  = x̄_a + δ · n_b / n
/// M  = M_a + M_b + δ δᵀ · n_a n_b / n
/// ```
///
/// # Reference
///
/// Chan, Golub & LeVeque (1979), "Updating Formulae and a Pairwise Algorithm
/// for Computing Sample Variances".
#[derive(Debug, Clone)]
pub struct CoMomentAccumulator {
    count: usize,
    mean: DVector<f64>,
    comoment: DMatrix<f64>,
}

impl CoMomentAccumulator {
    /// Empty accumulator for `features` columns.
    pub fn new(features: usize) -> Self {
        Self {
            count: 0,
            mean: DVector::zeros(features),
            comoment: DMatrix::zeros(features, features),
        }
    }

    /// Accumulator summarizing every row of `data`.
    pub fn from_matrix(data: &DMatrix<f64>) -> Self {
        if data.nrows() == 0 {
            return Self::new(data.ncols());
        }
        let mean = column_means(data);
        let comoment = comoment(data, &mean);
        Self {
            count: data.nrows(),
            mean,
            comoment,
        }
    }

    /// Fold another partial aggregate into this one.
    pub fn merge(&mut self, other: &CoMomentAccumulator) {
        if other.count == 0 {
            return;
        }
        if self.count == 0 {
            *self = other.clone();
            return;
        }
        let na = self.count as f64;
        let nb = other.count as f64;
        let total = na + nb;
        let delta = &other.mean - &self.mean;
        let correction = &delta * delta.transpose() * (na * nb / total);

        self.mean += &delta * (nb / total);
        self.comoment += &other.comoment + correction;
        self.count += other.count;
    }

    /// Rows accumulated so far.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Running mean vector.
    pub fn mean(&self) -> &DVector<f64> {
        &self.mean
    }

    /// Sample covariance (divisor n − 1); NaN entries for fewer than two rows.
    pub fn covariance(&self) -> DMatrix<f64> {
        &self.comoment / (self.count as f64 - 1.0)
    }
}

// ---------------------------------------------------------------------------
// Moment pairs
// ---------------------------------------------------------------------------

/// Mean vector, covariance matrix and row count of one table.
///
/// Created fresh for every analysis and never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct MomentPair {
    /// Sample mean, length p.
    pub mean: DVector<f64>,
    /// Sample covariance, p × p (divisor n − 1).
    pub covariance: DMatrix<f64>,
    /// Number of observations n.
    pub rows: usize,
}

impl MomentPair {
    /// Number of features p.
    pub fn features(&self) -> usize {
        self.mean.len()
    }
}

/// Compute the moment pair of one table.
///
/// Each quantity (row count, mean, covariance) is requested from the table
/// exactly once.
pub fn moments<X: ObservationTable + ?Sized>(x: &X) -> Result<MomentPair> {
    let rows = x.row_count()?;
    let mean = x.mean()?;
    let covariance = x.covariance()?;
    Ok(MomentPair {
        mean,
        covariance,
        rows,
    })
}

/// Compute the moment pairs of two tables with the same feature count.
///
/// # Errors
///
/// [`HotellingError::ShapeMismatch`] if the feature counts differ. The check
/// runs before either table is aggregated.
pub fn paired_moments<X, Y>(x: &X, y: &Y) -> Result<(MomentPair, MomentPair)>
where
    X: ObservationTable + ?Sized,
    Y: ObservationTable + ?Sized,
{
    check_features(x.feature_count(), y.feature_count())?;
    Ok((moments(x)?, moments(y)?))
}

pub(crate) fn check_features(expected: usize, found: usize) -> Result<()> {
    if expected != found {
        return Err(HotellingError::ShapeMismatch { expected, found });
    }
    Ok(())
}

/// Bessel-corrected sample sizes: `(n_x - 1, n_y - 1)`, or `(n_x - 1, 0)`
/// without a second table.
///
/// Sampling tends to underestimate the variability of a population; using
/// n − 1 as the weight corrects the bias of the pooled variance estimate.
pub fn bessel_correction<X: ObservationTable + ?Sized>(
    x: &X,
    y: Option<&dyn ObservationTable>,
) -> Result<(usize, usize)> {
    let nx = x.row_count()?;
    let ny = match y {
        Some(y) => y.row_count()?,
        None => 1,
    };
    Ok((nx.saturating_sub(1), ny.saturating_sub(1)))
}

/// Weights used to pool two covariance matrices.
///
/// With `bessel` the counts are `(n_x - 1, n_y - 1)`; otherwise the raw row
/// counts are used.
pub fn effective_counts(nx: usize, ny: usize, bessel: bool) -> (f64, f64) {
    if bessel {
        (nx.saturating_sub(1) as f64, ny.saturating_sub(1) as f64)
    } else {
        (nx as f64, ny as f64)
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use crate::table::{EagerTable, LazyTable};
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn lazy_moments_match_eager(
            values in proptest::collection::vec(-1e3_f64..1e3, 6..=60),
            chunk in 1usize..10,
        ) {
            let p = 3;
            let n = values.len() / p;
            let data = DMatrix::from_row_slice(n, p, &values[..n * p]);
            let eager = moments(&EagerTable::new(data.clone()).unwrap()).unwrap();
            let lazy = moments(&LazyTable::from_matrix_chunks(&data, chunk).unwrap()).unwrap();

            prop_assert_eq!(eager.rows, lazy.rows);
            for (a, b) in eager.mean.iter().zip(lazy.mean.iter()) {
                prop_assert!((a - b).abs() < 1e-9, "{} vs {}", a, b);
            }
            for (a, b) in eager.covariance.iter().zip(lazy.covariance.iter()) {
                prop_assert!((a - b).abs() < 1e-6 * (1.0 + a.abs()), "{} vs {}", a, b);
            }
        }
    }
}
