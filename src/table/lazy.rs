//! Lazily aggregated observation table.
//!
//! Rows live in partitions produced on demand by a [`PartitionSource`]
//! (in-memory chunks, a chunked file reader, or any external backend).
//! Row count, mean and covariance are computed together in one pass over the
//! partitions; per-partition moments are merged with Chan's pairwise update,
//! so no more than one partition is held in memory at a time.
//!
//! The aggregate is memoized: however many of the three quantities are
//! requested, the source is traversed at most once for them. Only
//! [`ObservationTable::realize`] traverses the source again, because it has
//! to materialize the rows.
//!
//! # Reference
//!
//! Chan, T.F., Golub, G.H. & LeVeque, R.J. (1979). "Updating Formulae and a
//! Pairwise Algorithm for Computing Sample Variances".

use std::borrow::Cow;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use log::{debug, trace};
use nalgebra::{DMatrix, DVector};

use super::ObservationTable;
use crate::error::{HotellingError, Result};
use crate::moments::CoMomentAccumulator;

/// Iterator over the partitions of a source.
pub type Partitions<'a> = Box<dyn Iterator<Item = Result<DMatrix<f64>>> + 'a>;

/// Producer of row partitions for a [`LazyTable`].
///
/// Every partition is an `rows × feature_count()` matrix. Each call to
/// [`partitions`](PartitionSource::partitions) starts a fresh traversal and
/// may be expensive (disk or network), which is why the table calls it as
/// rarely as possible.
pub trait PartitionSource: Send + Sync {
    /// Number of columns every partition has.
    fn feature_count(&self) -> usize;

    /// Start a traversal over all partitions.
    fn partitions(&self) -> Result<Partitions<'_>>;
}

/// Partitions already held in memory.
#[derive(Debug, Clone)]
pub struct InMemoryPartitions {
    features: usize,
    chunks: Vec<DMatrix<f64>>,
}

impl InMemoryPartitions {
    /// Wrap a list of chunks that must all have the same column count.
    ///
    /// # Errors
    ///
    /// [`HotellingError::EmptyTable`] when there are no chunks or zero columns,
    /// [`HotellingError::ShapeMismatch`] when chunks disagree on column count.
    pub fn new(chunks: Vec<DMatrix<f64>>) -> Result<Self> {
        let features = chunks.first().map(|c| c.ncols()).unwrap_or(0);
        if features == 0 {
            return Err(HotellingError::EmptyTable);
        }
        if let Some(bad) = chunks.iter().find(|c| c.ncols() != features) {
            return Err(HotellingError::ShapeMismatch {
                expected: features,
                found: bad.ncols(),
            });
        }
        Ok(Self { features, chunks })
    }
}

impl PartitionSource for InMemoryPartitions {
    fn feature_count(&self) -> usize {
        self.features
    }

    fn partitions(&self) -> Result<Partitions<'_>> {
        Ok(Box::new(self.chunks.iter().cloned().map(Ok)))
    }
}

#[derive(Debug, Clone)]
struct Aggregate {
    rows: usize,
    mean: DVector<f64>,
    covariance: DMatrix<f64>,
}

/// An observation table whose moments are aggregated on first use.
pub struct LazyTable {
    source: Box<dyn PartitionSource>,
    aggregate: Mutex<Option<Aggregate>>,
    passes: AtomicUsize,
}

impl fmt::Debug for LazyTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyTable")
            .field("features", &self.source.feature_count())
            .field("passes", &self.aggregation_passes())
            .finish()
    }
}

impl LazyTable {
    /// Create a lazy table over any partition source.
    pub fn from_source<S: PartitionSource + 'static>(source: S) -> Self {
        Self {
            source: Box::new(source),
            aggregate: Mutex::new(None),
            passes: AtomicUsize::new(0),
        }
    }

    /// Create a lazy table from in-memory chunks.
    pub fn from_partitions(chunks: Vec<DMatrix<f64>>) -> Result<Self> {
        Ok(Self::from_source(InMemoryPartitions::new(chunks)?))
    }

    /// Split a matrix into chunks of at most `chunk_rows` rows.
    ///
    /// # Errors
    ///
    /// [`HotellingError::InvalidParameter`] if `chunk_rows` is zero,
    /// [`HotellingError::EmptyTable`] if the matrix is empty.
    pub fn from_matrix_chunks(data: &DMatrix<f64>, chunk_rows: usize) -> Result<Self> {
        if chunk_rows == 0 {
            return Err(HotellingError::InvalidParameter(
                "chunk_rows must be at least 1".to_string(),
            ));
        }
        if data.nrows() == 0 || data.ncols() == 0 {
            return Err(HotellingError::EmptyTable);
        }
        let mut chunks = Vec::with_capacity(data.nrows().div_ceil(chunk_rows));
        let mut start = 0;
        while start < data.nrows() {
            let len = chunk_rows.min(data.nrows() - start);
            chunks.push(data.rows(start, len).into_owned());
            start += len;
        }
        Self::from_partitions(chunks)
    }

    /// Number of aggregation passes run over the source so far.
    pub fn aggregation_passes(&self) -> usize {
        self.passes.load(Ordering::SeqCst)
    }

    fn aggregated(&self) -> Result<Aggregate> {
        let mut guard = self.aggregate.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(agg) = guard.as_ref() {
            return Ok(agg.clone());
        }

        let features = self.source.feature_count();
        let mut acc = CoMomentAccumulator::new(features);
        let mut chunks = 0usize;
        for partition in self.source.partitions()? {
            let partition = partition?;
            if partition.ncols() != features {
                return Err(HotellingError::ShapeMismatch {
                    expected: features,
                    found: partition.ncols(),
                });
            }
            trace!("aggregating partition of {} rows", partition.nrows());
            acc.merge(&CoMomentAccumulator::from_matrix(&partition));
            chunks += 1;
        }
        self.passes.fetch_add(1, Ordering::SeqCst);

        if acc.count() == 0 {
            return Err(HotellingError::EmptyTable);
        }
        debug!(
            "aggregated {} rows x {} features from {} partitions",
            acc.count(),
            features,
            chunks
        );
        let agg = Aggregate {
            rows: acc.count(),
            mean: acc.mean().clone(),
            covariance: acc.covariance(),
        };
        *guard = Some(agg.clone());
        Ok(agg)
    }
}

impl ObservationTable for LazyTable {
    fn row_count(&self) -> Result<usize> {
        Ok(self.aggregated()?.rows)
    }

    fn feature_count(&self) -> usize {
        self.source.feature_count()
    }

    fn mean(&self) -> Result<DVector<f64>> {
        Ok(self.aggregated()?.mean)
    }

    fn covariance(&self) -> Result<DMatrix<f64>> {
        Ok(self.aggregated()?.covariance)
    }

    fn realize(&self) -> Result<Cow<'_, DMatrix<f64>>> {
        let features = self.source.feature_count();
        let mut values: Vec<f64> = Vec::new();
        let mut rows = 0usize;
        for partition in self.source.partitions()? {
            let partition = partition?;
            if partition.ncols() != features {
                return Err(HotellingError::ShapeMismatch {
                    expected: features,
                    found: partition.ncols(),
                });
            }
            for row in partition.row_iter() {
                values.extend(row.iter());
            }
            rows += partition.nrows();
        }
        if rows == 0 {
            return Err(HotellingError::EmptyTable);
        }
        debug!("realized lazy table: {rows} rows x {features} features");
        Ok(Cow::Owned(DMatrix::from_row_slice(rows, features, &values)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::EagerTable;

    fn matrix() -> DMatrix<f64> {
        DMatrix::from_row_slice(
            7,
            2,
            &[
                1.0, 10.0, 2.0, 11.5, 4.0, 9.0, 3.5, 14.0, 6.0, 8.0, 0.5, 12.0, 5.0, 13.0,
            ],
        )
    }

    #[test]
    fn test_matches_eager_moments() {
        let data = matrix();
        let eager = EagerTable::new(data.clone()).unwrap();
        for chunk in 1..=8 {
            let lazy = LazyTable::from_matrix_chunks(&data, chunk).unwrap();
            assert_eq!(lazy.row_count().unwrap(), 7);
            let (me, ml) = (eager.mean().unwrap(), lazy.mean().unwrap());
            let (ce, cl) = (eager.covariance().unwrap(), lazy.covariance().unwrap());
            for (a, b) in me.iter().zip(ml.iter()) {
                assert!((a - b).abs() < 1e-12, "chunk={chunk}: {a} vs {b}");
            }
            for (a, b) in ce.iter().zip(cl.iter()) {
                assert!((a - b).abs() < 1e-10, "chunk={chunk}: {a} vs {b}");
            }
        }
    }

    #[test]
    fn test_aggregates_once() {
        let lazy = LazyTable::from_matrix_chunks(&matrix(), 3).unwrap();
        assert_eq!(lazy.aggregation_passes(), 0);
        let _ = lazy.row_count().unwrap();
        let _ = lazy.mean().unwrap();
        let _ = lazy.covariance().unwrap();
        let _ = lazy.row_count().unwrap();
        assert_eq!(lazy.aggregation_passes(), 1);
    }

    #[test]
    fn test_poisoned_state_still_aggregates() {
        let lazy = LazyTable::from_matrix_chunks(&matrix(), 3).unwrap();
        std::thread::scope(|s| {
            let _ = s
                .spawn(|| {
                    let _guard = lazy.aggregate.lock().unwrap();
                    panic!("worker failed while holding the aggregate");
                })
                .join();
        });
        assert!(lazy.aggregate.is_poisoned());
        assert_eq!(lazy.row_count().unwrap(), 7);
        assert_eq!(lazy.mean().unwrap().len(), 2);
        assert_eq!(lazy.aggregation_passes(), 1);
    }

    #[test]
    fn test_realize_preserves_row_order() {
        let data = matrix();
        let lazy = LazyTable::from_matrix_chunks(&data, 3).unwrap();
        let realized = lazy.realize().unwrap();
        assert_eq!(*realized, data);
        // Realizing does not count as an aggregation pass.
        assert_eq!(lazy.aggregation_passes(), 0);
    }

    #[test]
    fn test_rejects_mismatched_chunks() {
        let a = DMatrix::from_row_slice(1, 2, &[1.0, 2.0]);
        let b = DMatrix::from_row_slice(1, 3, &[1.0, 2.0, 3.0]);
        assert!(matches!(
            LazyTable::from_partitions(vec![a, b]),
            Err(HotellingError::ShapeMismatch {
                expected: 2,
                found: 3
            })
        ));
    }

    #[test]
    fn test_empty_partitions_rejected() {
        assert!(matches!(
            LazyTable::from_partitions(Vec::new()),
            Err(HotellingError::EmptyTable)
        ));
        let empty = DMatrix::<f64>::zeros(0, 2);
        let lazy = LazyTable::from_partitions(vec![empty]).unwrap();
        assert!(matches!(lazy.mean(), Err(HotellingError::EmptyTable)));
    }

    #[test]
    fn test_zero_chunk_rows_rejected() {
        assert!(matches!(
            LazyTable::from_matrix_chunks(&matrix(), 0),
            Err(HotellingError::InvalidParameter(_))
        ));
    }
}
