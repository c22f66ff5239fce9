//! Per-feature k-sigma charts.
//!
//! Each feature is charted on its own with Shewhart-style limits
//! `mean ± k·σ`, σ taken from the diagonal of the sample covariance
//! (divisor n − 1). Useful alongside a T² chart to see which feature drove
//! an out-of-control signal.

use log::debug;
use nalgebra::{DMatrix, DVector};
use serde::Serialize;

use super::chart::{annotate, ChartPoint, ControlChart, ControlLimits};
use super::cusum::cusum_trace;
use super::subsample::display_indices;
use crate::config::ChartConfig;
use crate::error::{HotellingError, Result};
use crate::moments::{column_means, moments, sample_covariance};
use crate::table::ObservationTable;

/// `mean ± k·σ` limits for every feature of `x`.
///
/// Only the table's moments are needed, so a lazy table is aggregated once
/// and never materialized.
///
/// # Errors
///
/// [`HotellingError::InvalidParameter`] if `k` is not positive and finite.
///
/// # Examples
///
/// ```
/// use hotelling::spc::univariate_limits;
/// use hotelling::table::EagerTable;
///
/// let x = EagerTable::from_column(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap();
/// let limits = univariate_limits(&x, 3.0).unwrap();
/// assert!((limits[0].cl - 5.0).abs() < 1e-12);
/// assert!(limits[0].ucl > limits[0].cl);
/// ```
pub fn univariate_limits<X: ObservationTable + ?Sized>(
    x: &X,
    k: f64,
) -> Result<Vec<ControlLimits>> {
    check_sigma(k)?;
    let m = moments(x)?;
    Ok(limits_from(&m.mean, &m.covariance, k))
}

fn check_sigma(k: f64) -> Result<()> {
    if !(k.is_finite() && k > 0.0) {
        return Err(HotellingError::InvalidParameter(format!(
            "sigma multiplier must be positive, got {k}"
        )));
    }
    Ok(())
}

fn limits_from(mean: &DVector<f64>, covariance: &DMatrix<f64>, k: f64) -> Vec<ControlLimits> {
    mean.iter()
        .enumerate()
        .map(|(j, &cl)| {
            let sd = covariance[(j, j)].sqrt();
            ControlLimits {
                ucl: cl + k * sd,
                cl,
                lcl: cl - k * sd,
            }
        })
        .collect()
}

/// Chart of a single feature.
#[derive(Debug, Clone, Serialize)]
pub struct FeatureChart {
    /// Zero-based column index of the feature.
    pub feature: usize,
    pub limits: ControlLimits,
    pub points: Vec<ChartPoint>,
    /// Running CUSUM around the feature mean, if requested.
    pub cusum: Option<Vec<f64>>,
}

impl ControlChart for FeatureChart {
    fn control_limits(&self) -> ControlLimits {
        self.limits
    }

    fn points(&self) -> &[ChartPoint] {
        &self.points
    }
}

/// k-sigma charts for every feature (or the one selected by
/// [`ChartConfig::feature`]).
#[derive(Debug, Clone, Serialize)]
pub struct UnivariateChart {
    /// The multiplier k.
    pub sigma: f64,
    pub features: Vec<FeatureChart>,
    /// Sorted indices of the points to display, shared by all features.
    pub display: Vec<usize>,
}

impl UnivariateChart {
    /// Chart the features of `x` against their own moments.
    ///
    /// # Errors
    ///
    /// [`HotellingError::InvalidParameter`] for an invalid `config` or a
    /// feature filter beyond the feature count.
    pub fn build<X: ObservationTable + ?Sized>(x: &X, config: &ChartConfig) -> Result<Self> {
        config.validate()?;
        let p = x.feature_count();
        let selected: Vec<usize> = match config.feature {
            Some(j) if j >= p => {
                return Err(HotellingError::InvalidParameter(format!(
                    "feature {j} out of range for {p} features"
                )))
            }
            Some(j) => vec![j],
            None => (0..p).collect(),
        };

        let data = x.realize()?;
        let mean = column_means(&data);
        let covariance = sample_covariance(&data, &mean);
        let limits = limits_from(&mean, &covariance, config.sigma);

        let features = selected
            .into_iter()
            .map(|j| {
                let values: Vec<f64> = data.column(j).iter().copied().collect();
                let cusum = config.cusum.then(|| cusum_trace(&values, mean[j]));
                FeatureChart {
                    feature: j,
                    limits: limits[j],
                    points: annotate(&values, &limits[j]),
                    cusum,
                }
            })
            .collect::<Vec<_>>();
        debug!(
            "univariate chart: {} feature(s), {} points, k = {}",
            features.len(),
            data.nrows(),
            config.sigma
        );

        Ok(Self {
            sigma: config.sigma,
            features,
            display: display_indices(data.nrows(), config.display_limit, config.seed),
        })
    }

    /// Whether every feature chart is in control.
    pub fn is_in_control(&self) -> bool {
        self.features.iter().all(|f| f.is_in_control())
    }
}
