//! Hotelling T² control chart.
//!
//! Each observation is charted as its own T² distance from the process mean:
//!
//! ```text
//! qᵢ = (xᵢ - x̄)ᵀ S⁺ (xᵢ - x̄)
//! ```
//!
//! which is the abbreviated T² of a one-row table against the moments
//! `(x̄, S)`. The moments come from the charted table itself (phase 1) or
//! from a reference sample established earlier (phase 2).
//!
//! # Control limits
//!
//! With m reference observations, subgroup size n and f features:
//!
//! ```text
//! Phase 1:  (m-1)(n-1)/m · Beta(f/2, (m-f-1)/2)⁻¹(·)
//! Phase 2:  f(m-1)(m+1)/(m(m-f)) · F(f, m-f)⁻¹(·)
//! ```
//!
//! evaluated at `α/2` (LCL), `0.5` (center line) and `1 - α/2` (UCL).
//!
//! # References
//!
//! - Tracy, N.D., Young, J.C. & Mason, R.L. (1992). "Multivariate Control
//!   Charts for Individual Observations", *J. Quality Technology* 24(2).
//! - Montgomery, D.C. (2019). *Introduction to Statistical Quality Control*,
//!   8th ed., Chapter 11.
//!
//! # Examples
//!
//! ```
//! use hotelling::config::ChartConfig;
//! use hotelling::spc::{ControlChart, HotellingChart};
//! use hotelling::table::EagerTable;
//!
//! let x = EagerTable::from_rows(&[
//!     [3.7, 48.5, 9.3], [5.7, 65.1, 8.0], [3.8, 47.2, 10.9], [3.2, 53.2, 12.0],
//!     [3.1, 55.5, 9.7], [4.6, 36.1, 7.9], [2.4, 24.8, 14.0], [7.2, 33.1, 7.6],
//!     [6.7, 47.4, 8.5], [5.4, 54.1, 11.3],
//! ]).unwrap();
//!
//! let chart = HotellingChart::build(&x, None, None, &ChartConfig::default()).unwrap();
//! assert_eq!(chart.points().len(), 10);
//! let limits = chart.control_limits();
//! assert!(limits.lcl < limits.cl && limits.cl < limits.ucl);
//! ```

use log::debug;
use nalgebra::{DMatrix, DVector};
use serde::Serialize;

use super::chart::{annotate, ChartPoint, ControlChart, ControlLimits, Phase};
use super::cusum::cusum_trace;
use super::subsample::display_indices;
use crate::config::ChartConfig;
use crate::distribution::{beta_quantile, f_quantile};
use crate::error::{HotellingError, Result};
use crate::moments::{check_features, column_means, sample_covariance};
use crate::pooling::pseudo_inverse;
use crate::table::ObservationTable;
use crate::testing::quadratic_form;

/// T² control limits for `m` reference observations in subgroups of `n`
/// with `f` features.
///
/// Parameters that leave a distribution undefined (for instance `m <= f + 1`
/// in phase 1) give NaN limits rather than an error.
///
/// # Errors
///
/// [`HotellingError::InvalidParameter`] if `alpha` is not in `(0, 1)`.
///
/// # Examples
///
/// ```
/// use hotelling::spc::{control_interval, Phase};
///
/// let l = control_interval(20, 20, 3, Phase::One, 0.01).unwrap();
/// assert!((l.ucl - 9.7773).abs() < 1e-3);
/// ```
pub fn control_interval(
    m: usize,
    n: usize,
    f: usize,
    phase: Phase,
    alpha: f64,
) -> Result<ControlLimits> {
    if !(alpha > 0.0 && alpha < 1.0) {
        return Err(HotellingError::InvalidParameter(format!(
            "alpha must lie in (0, 1), got {alpha}"
        )));
    }
    let (m, n, f) = (m as f64, n as f64, f as f64);
    let quantiles = [alpha / 2.0, 0.5, 1.0 - alpha / 2.0];

    let [lcl, cl, ucl] = match phase {
        Phase::One => {
            let (a, b) = (f / 2.0, (m - f - 1.0) / 2.0);
            let scale = (m - 1.0) * (n - 1.0) / m;
            quantiles.map(|q| scale * beta_quantile(q, a, b))
        }
        Phase::Two => {
            let scale = f * (m - 1.0) * (m + 1.0) / (m * (m - f));
            quantiles.map(|q| scale * f_quantile(q, f, m - f))
        }
    };
    Ok(ControlLimits { ucl, cl, lcl })
}

/// A T² chart: one point per observation, annotated against the limits.
#[derive(Debug, Clone, Serialize)]
pub struct HotellingChart {
    pub phase: Phase,
    pub alpha: f64,
    pub limits: ControlLimits,
    pub points: Vec<ChartPoint>,
    /// Running CUSUM of the T² values around the center line, if requested.
    pub cusum: Option<Vec<f64>>,
    /// Sorted indices of the points to display.
    pub display: Vec<usize>,
}

impl HotellingChart {
    /// Chart every row of `x`.
    ///
    /// Without `mean` and `covariance` the moments of `x` are used. Both must
    /// be supplied together to chart against a reference process. The table
    /// is materialized once; limits use m = n = row count and f = feature
    /// count.
    ///
    /// # Errors
    ///
    /// - [`HotellingError::MissingPairedArgument`] if exactly one of `mean`
    ///   and `covariance` is given.
    /// - [`HotellingError::ShapeMismatch`] if they do not match the feature
    ///   count.
    /// - [`HotellingError::InvalidParameter`] for an invalid `config`.
    pub fn build<X: ObservationTable + ?Sized>(
        x: &X,
        mean: Option<&DVector<f64>>,
        covariance: Option<&DMatrix<f64>>,
        config: &ChartConfig,
    ) -> Result<Self> {
        config.validate()?;
        let p = x.feature_count();
        match (mean, covariance) {
            (Some(mu), Some(s)) => {
                check_features(p, mu.len())?;
                check_features(p, s.nrows())?;
                check_features(p, s.ncols())?;
            }
            (None, None) => {}
            _ => return Err(HotellingError::MissingPairedArgument),
        }

        let data = x.realize()?;
        let (mean, covariance) = match (mean, covariance) {
            (Some(mu), Some(s)) => (mu.clone(), s.clone()),
            _ => {
                let mu = column_means(&data);
                let s = sample_covariance(&data, &mu);
                (mu, s)
            }
        };
        let inv = pseudo_inverse(&covariance)?;

        let statistics: Vec<f64> = data
            .row_iter()
            .map(|row| quadratic_form(&(row.transpose() - &mean), &inv))
            .collect();

        let rows = data.nrows();
        let limits = control_interval(rows, rows, p, config.phase, config.alpha)?;
        let cusum = config.cusum.then(|| cusum_trace(&statistics, limits.cl));
        let display = display_indices(rows, config.display_limit, config.seed);
        debug!(
            "T² chart: {rows} points, phase {}, UCL {:.4}",
            u8::from(config.phase),
            limits.ucl
        );

        Ok(Self {
            phase: config.phase,
            alpha: config.alpha,
            limits,
            points: annotate(&statistics, &limits),
            cusum,
            display,
        })
    }

    /// T² value of every observation, in order.
    pub fn statistics(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.value).collect()
    }

    /// Indices of the observations outside the limits.
    pub fn out_of_control(&self) -> Vec<usize> {
        self.points
            .iter()
            .filter(|p| !p.violations.is_empty())
            .map(|p| p.index)
            .collect()
    }
}

impl ControlChart for HotellingChart {
    fn control_limits(&self) -> ControlLimits {
        self.limits
    }

    fn points(&self) -> &[ChartPoint] {
        &self.points
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spc::ViolationType;
    use crate::table::{EagerTable, LazyTable};
    use crate::testing::t2_statistic;

    fn sweat() -> EagerTable {
        EagerTable::from_rows(&[
            [3.7, 48.5, 9.3],
            [5.7, 65.1, 8.0],
            [3.8, 47.2, 10.9],
            [3.2, 53.2, 12.0],
            [3.1, 55.5, 9.7],
            [4.6, 36.1, 7.9],
            [2.4, 24.8, 14.0],
            [7.2, 33.1, 7.6],
            [6.7, 47.4, 8.5],
            [5.4, 54.1, 11.3],
            [3.9, 36.9, 12.7],
            [4.5, 58.8, 12.3],
            [3.5, 27.8, 9.8],
            [4.5, 40.2, 8.4],
            [1.5, 13.5, 10.1],
            [8.5, 56.4, 7.1],
            [4.5, 71.6, 8.2],
            [6.5, 52.8, 10.9],
            [4.1, 44.1, 11.2],
            [5.5, 40.9, 9.4],
        ])
        .unwrap()
    }

    fn assert_limits(l: &ControlLimits, lcl: f64, cl: f64, ucl: f64) {
        assert!((l.lcl - lcl).abs() < 1e-4, "lcl = {}", l.lcl);
        assert!((l.cl - cl).abs() < 1e-4, "cl = {}", l.cl);
        assert!((l.ucl - ucl).abs() < 1e-3, "ucl = {}", l.ucl);
    }

    #[test]
    fn test_control_interval_phase_one() {
        let l = control_interval(20, 20, 3, Phase::One, 0.01).unwrap();
        assert_limits(&l, 0.078350, 2.413755, 9.777335);
    }

    #[test]
    fn test_control_interval_phase_two() {
        let l = control_interval(20, 20, 3, Phase::Two, 0.01).unwrap();
        assert_limits(&l, 0.081987, 2.891138, 21.671406);
    }

    #[test]
    fn test_control_interval_ordering() {
        for phase in [Phase::One, Phase::Two] {
            for alpha in [0.001, 0.01, 0.05, 0.2] {
                let l = control_interval(30, 30, 4, phase, alpha).unwrap();
                assert!(l.lcl < l.cl && l.cl < l.ucl, "{phase:?} alpha={alpha}: {l:?}");
            }
        }
    }

    #[test]
    fn test_control_interval_degenerate_is_nan() {
        // Phase 1 needs m > f + 1; phase 2 needs m > f.
        let l = control_interval(4, 4, 3, Phase::One, 0.01).unwrap();
        assert!(l.ucl.is_nan() && l.cl.is_nan() && l.lcl.is_nan());
        let l = control_interval(3, 3, 3, Phase::Two, 0.01).unwrap();
        assert!(l.ucl.is_nan());
    }

    #[test]
    fn test_control_interval_invalid_alpha() {
        for alpha in [0.0, 1.0, -0.5, f64::NAN] {
            assert!(matches!(
                control_interval(20, 20, 3, Phase::One, alpha),
                Err(HotellingError::InvalidParameter(_))
            ));
        }
    }

    #[test]
    fn test_points_match_abbreviated_statistic() {
        let x = sweat();
        let chart = HotellingChart::build(&x, None, None, &ChartConfig::default()).unwrap();
        let mean = x.mean().unwrap();
        let cov = x.covariance().unwrap();

        for (i, point) in chart.points().iter().enumerate() {
            let values: Vec<f64> = x.data().row(i).iter().copied().collect();
            let row = EagerTable::from_rows(&[values]).unwrap();
            let expected = t2_statistic(&row, &mean, &cov).unwrap();
            assert!((point.value - expected).abs() < 1e-9, "row {i}");
            assert_eq!(point.index, i);
        }
    }

    #[test]
    fn test_phase_one_statistics_average_to_p() {
        // Σ (xᵢ - x̄)ᵀ S⁻¹ (xᵢ - x̄) = (n - 1) p for the sample's own moments.
        let chart = HotellingChart::build(&sweat(), None, None, &ChartConfig::default()).unwrap();
        let total: f64 = chart.statistics().iter().sum();
        assert!((total - 19.0 * 3.0).abs() < 1e-8, "total = {total}");
    }

    #[test]
    fn test_annotations_follow_limits() {
        let config = ChartConfig {
            alpha: 0.5,
            ..ChartConfig::default()
        };
        let chart = HotellingChart::build(&sweat(), None, None, &config).unwrap();
        let limits = chart.control_limits();
        for point in chart.points() {
            let expected = limits.classify(point.value).into_iter().collect::<Vec<_>>();
            assert_eq!(point.violations, expected);
        }
        assert_eq!(chart.is_in_control(), chart.out_of_control().is_empty());
        assert_eq!(chart.violations().len(), chart.out_of_control().len());
    }

    #[test]
    fn test_reference_moments_flag_shifted_points() {
        let x = sweat();
        let mean = x.mean().unwrap();
        let cov = x.covariance().unwrap();
        let mut rows: Vec<Vec<f64>> = x
            .data()
            .row_iter()
            .map(|r| r.iter().copied().collect())
            .collect();
        rows.push(vec![40.0, 500.0, 90.0]);
        let monitored = EagerTable::from_rows(&rows).unwrap();
        let config = ChartConfig {
            phase: Phase::Two,
            alpha: 0.01,
            ..ChartConfig::default()
        };
        let chart = HotellingChart::build(&monitored, Some(&mean), Some(&cov), &config).unwrap();
        assert_eq!(chart.points[20].violations, vec![ViolationType::AboveUcl]);
        assert!(chart.points[..20]
            .iter()
            .all(|p| !p.violations.contains(&ViolationType::AboveUcl)));
        assert!(chart.out_of_control().contains(&20));
    }

    #[test]
    fn test_missing_paired_argument() {
        let x = sweat();
        let mean = x.mean().unwrap();
        let cov = x.covariance().unwrap();
        let config = ChartConfig::default();
        assert!(matches!(
            HotellingChart::build(&x, Some(&mean), None, &config),
            Err(HotellingError::MissingPairedArgument)
        ));
        assert!(matches!(
            HotellingChart::build(&x, None, Some(&cov), &config),
            Err(HotellingError::MissingPairedArgument)
        ));
    }

    #[test]
    fn test_reference_shape_mismatch() {
        let x = sweat();
        let mean = DVector::zeros(2);
        let cov = DMatrix::identity(2, 2);
        assert!(matches!(
            HotellingChart::build(&x, Some(&mean), Some(&cov), &ChartConfig::default()),
            Err(HotellingError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_cusum_is_optional() {
        let x = sweat();
        let plain = HotellingChart::build(&x, None, None, &ChartConfig::default()).unwrap();
        assert!(plain.cusum.is_none());

        let config = ChartConfig {
            cusum: true,
            ..ChartConfig::default()
        };
        let chart = HotellingChart::build(&x, None, None, &config).unwrap();
        let trace = chart.cusum.as_ref().unwrap();
        assert_eq!(trace.len(), 20);
        let expected = chart.points[0].value;
        assert!((trace[0] - expected).abs() < 1e-12);
    }

    #[test]
    fn test_display_subsample_does_not_change_statistics() {
        let x = sweat();
        let full = HotellingChart::build(&x, None, None, &ChartConfig::default()).unwrap();
        let config = ChartConfig {
            display_limit: 5,
            ..ChartConfig::default()
        };
        let sampled = HotellingChart::build(&x, None, None, &config).unwrap();
        assert_eq!(full.display, (0..20).collect::<Vec<_>>());
        assert_eq!(sampled.display.len(), 5);
        assert_eq!(full.statistics(), sampled.statistics());
        assert_eq!(full.limits, sampled.limits);
    }

    #[test]
    fn test_lazy_table_matches_eager() {
        let x = sweat();
        let lazy = LazyTable::from_matrix_chunks(x.data(), 6).unwrap();
        let config = ChartConfig::default();
        let eager_chart = HotellingChart::build(&x, None, None, &config).unwrap();
        let lazy_chart = HotellingChart::build(&lazy, None, None, &config).unwrap();
        for (a, b) in eager_chart.statistics().iter().zip(lazy_chart.statistics()) {
            assert!((a - b).abs() < 1e-9);
        }
        // Realizing the rows is not an aggregation pass.
        assert_eq!(lazy.aggregation_passes(), 0);
    }
}
