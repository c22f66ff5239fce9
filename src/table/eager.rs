//! Fully materialized observation table.

use std::borrow::Cow;

use nalgebra::{DMatrix, DVector};

use super::ObservationTable;
use crate::error::{HotellingError, Result};
use crate::moments::{column_means, sample_covariance};

/// An in-memory n × p table.
#[derive(Debug, Clone, PartialEq)]
pub struct EagerTable {
    data: DMatrix<f64>,
}

impl EagerTable {
    /// Wrap an n × p matrix (rows are observations).
    ///
    /// # Errors
    ///
    /// [`HotellingError::EmptyTable`] if the matrix has no rows or no columns.
    pub fn new(data: DMatrix<f64>) -> Result<Self> {
        if data.nrows() == 0 || data.ncols() == 0 {
            return Err(HotellingError::EmptyTable);
        }
        Ok(Self { data })
    }

    /// Build a table from row slices, all of the same length.
    ///
    /// # Errors
    ///
    /// [`HotellingError::EmptyTable`] for no rows or zero-length rows,
    /// [`HotellingError::RaggedRows`] when a row length differs from the first.
    pub fn from_rows<R: AsRef<[f64]>>(rows: &[R]) -> Result<Self> {
        let first = rows.first().ok_or(HotellingError::EmptyTable)?;
        let p = first.as_ref().len();
        if p == 0 {
            return Err(HotellingError::EmptyTable);
        }
        let mut values = Vec::with_capacity(rows.len() * p);
        for (i, row) in rows.iter().enumerate() {
            let row = row.as_ref();
            if row.len() != p {
                return Err(HotellingError::RaggedRows {
                    row: i,
                    expected: p,
                    found: row.len(),
                });
            }
            values.extend_from_slice(row);
        }
        Self::new(DMatrix::from_row_slice(rows.len(), p, &values))
    }

    /// Build a single-feature table (n × 1) from a column of values.
    pub fn from_column(values: &[f64]) -> Result<Self> {
        Self::new(DMatrix::from_column_slice(values.len(), 1, values))
    }

    /// Borrow the underlying matrix.
    pub fn data(&self) -> &DMatrix<f64> {
        &self.data
    }

    /// Consume the table, returning the matrix.
    pub fn into_inner(self) -> DMatrix<f64> {
        self.data
    }
}

impl ObservationTable for EagerTable {
    fn row_count(&self) -> Result<usize> {
        Ok(self.data.nrows())
    }

    fn feature_count(&self) -> usize {
        self.data.ncols()
    }

    fn mean(&self) -> Result<DVector<f64>> {
        Ok(column_means(&self.data))
    }

    fn covariance(&self) -> Result<DMatrix<f64>> {
        let mean = column_means(&self.data);
        Ok(sample_covariance(&self.data, &mean))
    }

    fn realize(&self) -> Result<Cow<'_, DMatrix<f64>>> {
        Ok(Cow::Borrowed(&self.data))
    }
}
