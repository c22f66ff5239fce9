//! Core control chart types.
//!
//! Control limits, chart points with out-of-limit annotations, and the chart
//! phase. Charts in this crate are plain data: rendering is left to the
//! consumer.
//!
//! # References
//!
//! - Montgomery, D.C. (2019). *Introduction to Statistical Quality Control*, 8th ed.
//! - Tracy, N.D., Young, J.C. & Mason, R.L. (1992). "Multivariate Control Charts
//!   for Individual Observations", *Journal of Quality Technology* 24(2), pp. 88-95.

use serde::{Deserialize, Serialize};

use crate::error::HotellingError;

/// Control limits for a chart.
///
/// For univariate charts the center line is the feature mean and the limits
/// are `CL ± k·σ`. For T² charts the center line is the *median* of the
/// reference distribution, and the limits are its `α/2` and `1 - α/2`
/// quantiles.
///
/// # Invariants
///
/// - `lcl <= cl <= ucl` for non-degenerate inputs
/// - Degenerate inputs (too few observations) give NaN values
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ControlLimits {
    /// Upper control limit.
    pub ucl: f64,
    /// Center line.
    pub cl: f64,
    /// Lower control limit.
    pub lcl: f64,
}

impl ControlLimits {
    /// Classify a value against the limits.
    ///
    /// NaN values and NaN limits never produce a violation.
    pub fn classify(&self, value: f64) -> Option<ViolationType> {
        if value > self.ucl {
            Some(ViolationType::AboveUcl)
        } else if value < self.lcl {
            Some(ViolationType::BelowLcl)
        } else {
            None
        }
    }

    /// Whether `value` lies within `[lcl, ucl]`.
    pub fn contains(&self, value: f64) -> bool {
        self.classify(value).is_none()
    }
}

/// A single point on a control chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartPoint {
    /// The plotted statistic (a T² value or a raw observation).
    pub value: f64,
    /// The zero-based observation index.
    pub index: usize,
    /// Limits violated at this point (empty when in control).
    pub violations: Vec<ViolationType>,
}

/// Ways a point can fall outside the control limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationType {
    /// Point above the upper control limit.
    AboveUcl,
    /// Point below the lower control limit.
    BelowLcl,
}

/// A violation detected on the chart.
#[derive(Debug, Clone, PartialEq)]
pub struct Violation {
    /// The index of the point where the violation was detected.
    pub point_index: usize,
    /// The type of violation.
    pub violation_type: ViolationType,
}

/// Control chart phase.
///
/// Phase 1 sets limits retrospectively from the data being charted; phase 2
/// monitors new observations against limits established earlier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Phase {
    #[default]
    One,
    Two,
}

impl TryFrom<u8> for Phase {
    type Error = HotellingError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Phase::One),
            2 => Ok(Phase::Two),
            other => Err(HotellingError::InvalidParameter(format!(
                "phase must be 1 or 2, got {other}"
            ))),
        }
    }
}

impl From<Phase> for u8 {
    fn from(phase: Phase) -> Self {
        match phase {
            Phase::One => 1,
            Phase::Two => 2,
        }
    }
}

/// Common interface for the charts in this module.
///
/// Charts are built in one shot from a table; the trait exposes the computed
/// limits and annotated points.
pub trait ControlChart {
    /// The control limits the points were annotated against.
    fn control_limits(&self) -> ControlLimits;

    /// All chart points, in observation order.
    fn points(&self) -> &[ChartPoint];

    /// Get all violations detected across all chart points.
    fn violations(&self) -> Vec<Violation> {
        collect_violations(self.points())
    }

    /// Returns `true` if no point lies outside the control limits.
    fn is_in_control(&self) -> bool {
        self.points().iter().all(|p| p.violations.is_empty())
    }
}

/// Build chart points for `values`, annotated against `limits`.
pub(crate) fn annotate(values: &[f64], limits: &ControlLimits) -> Vec<ChartPoint> {
    values
        .iter()
        .enumerate()
        .map(|(index, &value)| ChartPoint {
            value,
            index,
            violations: limits.classify(value).into_iter().collect(),
        })
        .collect()
}

/// Collect all violations from chart points into a flat list.
pub(crate) fn collect_violations(points: &[ChartPoint]) -> Vec<Violation> {
    let mut result = Vec::new();
    for point in points {
        for &vtype in &point.violations {
            result.push(Violation {
                point_index: point.index,
                violation_type: vtype,
            });
        }
    }
    result
}
