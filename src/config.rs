//! Configuration for charts and table loading.
//!
//! Both structs carry their defaults in [`Default`] and deserialize from JSON
//! with missing fields filled in, so a config file only needs the keys it
//! changes:
//!
//! ```
//! use hotelling::config::ChartConfig;
//! use hotelling::spc::Phase;
//!
//! let config = ChartConfig::from_json(r#"{ "phase": 2, "cusum": true }"#).unwrap();
//! assert_eq!(config.phase, Phase::Two);
//! assert!(config.cusum);
//! assert_eq!(config.seed, 42);
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{HotellingError, Result};
use crate::spc::Phase;

/// Default significance level of T² limits.
pub const DEFAULT_ALPHA: f64 = 0.001;
/// Default k of univariate `mean ± k·σ` limits.
pub const DEFAULT_SIGMA: f64 = 3.0;
/// Default number of points shown before subsampling.
pub const DEFAULT_DISPLAY_LIMIT: usize = 1000;
/// Default seed of the display subsample.
pub const DEFAULT_SEED: u64 = 42;

/// Options shared by [`HotellingChart`](crate::spc::HotellingChart) and
/// [`UnivariateChart`](crate::spc::UnivariateChart).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartConfig {
    /// Phase 1 (retrospective, Beta limits) or phase 2 (monitoring, F limits).
    pub phase: Phase,
    /// Significance level of the T² limits, in `(0, 1)`.
    pub alpha: f64,
    /// Multiplier k of the univariate limits.
    pub sigma: f64,
    /// Also compute a CUSUM trace.
    pub cusum: bool,
    /// Maximum number of displayed points.
    pub display_limit: usize,
    /// Seed of the display subsample.
    pub seed: u64,
    /// Restrict univariate charts to one feature (zero-based).
    pub feature: Option<usize>,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            phase: Phase::One,
            alpha: DEFAULT_ALPHA,
            sigma: DEFAULT_SIGMA,
            cusum: false,
            display_limit: DEFAULT_DISPLAY_LIMIT,
            seed: DEFAULT_SEED,
            feature: None,
        }
    }
}

impl ChartConfig {
    /// Parse a JSON document, filling missing keys with defaults.
    ///
    /// # Errors
    ///
    /// [`HotellingError::Parse`] for malformed JSON or an invalid value,
    /// [`HotellingError::InvalidParameter`] for out-of-range settings.
    /// Syntax errors carry the line of the offending token; a value that
    /// parses but is rejected (such as `"phase": 3`) is reported at the line
    /// where its enclosing object ends.
    pub fn from_json(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text).map_err(|e| HotellingError::Parse {
            line: e.line(),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a JSON config file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Check value ranges.
    ///
    /// # Errors
    ///
    /// [`HotellingError::InvalidParameter`] if `alpha` is outside `(0, 1)`,
    /// `sigma` is not positive and finite, or `display_limit` is zero.
    pub fn validate(&self) -> Result<()> {
        if !(self.alpha > 0.0 && self.alpha < 1.0) {
            return Err(HotellingError::InvalidParameter(format!(
                "alpha must lie in (0, 1), got {}",
                self.alpha
            )));
        }
        if !(self.sigma.is_finite() && self.sigma > 0.0) {
            return Err(HotellingError::InvalidParameter(format!(
                "sigma must be positive, got {}",
                self.sigma
            )));
        }
        if self.display_limit == 0 {
            return Err(HotellingError::InvalidParameter(
                "display limit must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Field separator of a text table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Delimiter {
    /// Comma if the first data line contains one, whitespace otherwise.
    #[default]
    Auto,
    Comma,
    Whitespace,
}

/// How [`load_table`](crate::loader::load_table) reads a file.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadOptions {
    pub delimiter: Delimiter,
    /// `Some(true)` / `Some(false)` forces a header row; `None` detects one
    /// from a non-numeric field on the first line.
    pub header: Option<bool>,
    /// Zero-based column holding row labels, dropped before parsing.
    pub index_col: Option<usize>,
    /// Load lazily in partitions of this many rows.
    pub chunk_rows: Option<usize>,
}
