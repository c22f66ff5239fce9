//! Observation tables: the numeric input of every analysis.
//!
//! A table is an immutable n × p matrix of observations (rows) by features
//! (columns). Two representations exist:
//!
//! - [`EagerTable`] — fully materialized in memory.
//! - [`LazyTable`] — a set of row partitions produced on demand by a
//!   [`PartitionSource`], aggregated in a single pass without materializing
//!   the whole table.
//!
//! Both implement [`ObservationTable`], the capability set the moment
//! estimator relies on. [`Table`] wraps either one with static dispatch and is
//! what the loader returns.
//!
//! # Examples
//!
//! ```
//! use hotelling::table::{EagerTable, LazyTable, ObservationTable};
//!
//! let rows = vec![vec![1.0, 2.0], vec![3.0, 5.0], vec![5.0, 11.0]];
//! let eager = EagerTable::from_rows(&rows).unwrap();
//! let lazy = LazyTable::from_matrix_chunks(eager.data(), 2).unwrap();
//!
//! assert_eq!(lazy.row_count().unwrap(), 3);
//! let (a, b) = (eager.mean().unwrap(), lazy.mean().unwrap());
//! assert!((a[1] - b[1]).abs() < 1e-12);
//! ```

mod eager;
mod lazy;

use std::borrow::Cow;

use nalgebra::{DMatrix, DVector};

use crate::error::Result;

pub use eager::EagerTable;
pub use lazy::{InMemoryPartitions, LazyTable, PartitionSource, Partitions};

/// Capabilities required from an observation table.
///
/// Implementations must return the same numbers (up to floating round-off)
/// regardless of how the data is stored. Covariance uses the n − 1 divisor.
pub trait ObservationTable {
    /// Number of observations (rows).
    fn row_count(&self) -> Result<usize>;

    /// Number of features (columns).
    fn feature_count(&self) -> usize;

    /// Per-feature sample mean, length p.
    fn mean(&self) -> Result<DVector<f64>>;

    /// Sample covariance matrix (p × p, divisor n − 1).
    ///
    /// A single-row table yields a NaN matrix.
    fn covariance(&self) -> Result<DMatrix<f64>>;

    /// Materialize every row as an n × p matrix.
    ///
    /// Only needed by operations that look at individual observations.
    fn realize(&self) -> Result<Cow<'_, DMatrix<f64>>>;
}

/// Either table representation, dispatched statically.
#[derive(Debug)]
pub enum Table {
    Eager(EagerTable),
    Lazy(LazyTable),
}

impl Table {
    /// Whether this table aggregates lazily.
    pub fn is_lazy(&self) -> bool {
        matches!(self, Table::Lazy(_))
    }
}

impl From<EagerTable> for Table {
    fn from(table: EagerTable) -> Self {
        Table::Eager(table)
    }
}

impl From<LazyTable> for Table {
    fn from(table: LazyTable) -> Self {
        Table::Lazy(table)
    }
}

impl ObservationTable for Table {
    fn row_count(&self) -> Result<usize> {
        match self {
            Table::Eager(t) => t.row_count(),
            Table::Lazy(t) => t.row_count(),
        }
    }

    fn feature_count(&self) -> usize {
        match self {
            Table::Eager(t) => t.feature_count(),
            Table::Lazy(t) => t.feature_count(),
        }
    }

    fn mean(&self) -> Result<DVector<f64>> {
        match self {
            Table::Eager(t) => t.mean(),
            Table::Lazy(t) => t.mean(),
        }
    }

    fn covariance(&self) -> Result<DMatrix<f64>> {
        match self {
            Table::Eager(t) => t.covariance(),
            Table::Lazy(t) => t.covariance(),
        }
    }

    fn realize(&self) -> Result<Cow<'_, DMatrix<f64>>> {
        match self {
            Table::Eager(t) => t.realize(),
            Table::Lazy(t) => t.realize(),
        }
    }
}
