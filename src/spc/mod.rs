//! Statistical Process Control (SPC) charts.
//!
//! Charts are returned as plain, serializable data; drawing them is up to
//! the consumer.
//!
//! # Multivariate
//!
//! - [`HotellingChart`] — per-observation T² against phase-1 (Beta) or
//!   phase-2 (F) limits, see [`control_interval`]
//!
//! # Univariate
//!
//! - [`UnivariateChart`] — `mean ± k·σ` chart per feature, see
//!   [`univariate_limits`]
//!
//! # Helpers
//!
//! - [`cusum_trace`] — running cumulative sum around a center line
//! - [`display_indices`] — seeded subsample of the points to show
//!
//! # References
//!
//! - Montgomery, D.C. (2019). *Introduction to Statistical Quality Control*, 8th ed.
//! - Tracy, N.D., Young, J.C. & Mason, R.L. (1992). "Multivariate Control Charts
//!   for Individual Observations", *Journal of Quality Technology* 24(2), pp. 88-95.

mod chart;
mod cusum;
mod hotelling;
mod subsample;
mod univariate;

pub use chart::{ChartPoint, ControlChart, ControlLimits, Phase, Violation, ViolationType};
pub use cusum::cusum_trace;
pub use hotelling::{control_interval, HotellingChart};
pub use subsample::display_indices;
pub use univariate::{univariate_limits, FeatureChart, UnivariateChart};
