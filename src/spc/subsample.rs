//! Seeded subsampling of chart points for display.
//!
//! Large tables produce more points than a chart can usefully show. Only the
//! displayed set is reduced; limits and statistics always use every row.

use log::debug;
use rand::rngs::StdRng;
use rand::seq::index;
use rand::SeedableRng;

/// Indices of the rows to display.
///
/// All indices when `rows <= limit`, otherwise exactly `limit` distinct
/// indices drawn uniformly with a generator seeded from `seed`. The result is
/// sorted, and the same `(rows, limit, seed)` always yields the same indices.
///
/// # Examples
///
/// ```
/// use hotelling::spc::display_indices;
///
/// assert_eq!(display_indices(4, 10, 42), vec![0, 1, 2, 3]);
///
/// let a = display_indices(10_000, 50, 7);
/// assert_eq!(a.len(), 50);
/// assert_eq!(a, display_indices(10_000, 50, 7));
/// ```
pub fn display_indices(rows: usize, limit: usize, seed: u64) -> Vec<usize> {
    if rows <= limit {
        return (0..rows).collect();
    }
    let mut rng = StdRng::seed_from_u64(seed);
    let mut picked = index::sample(&mut rng, rows, limit).into_vec();
    picked.sort_unstable();
    debug!("displaying {limit} of {rows} points (seed {seed})");
    picked
}
