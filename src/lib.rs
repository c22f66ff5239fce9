//! # hotelling
//!
//! Hotelling's T² tests and multivariate statistical process control.
//!
//! The multivariate counterpart of Student's t: test whether one sample has
//! a hypothesized mean vector, or whether two samples share one, and chart
//! individual observations against T² control limits.
//!
//! ## Modules
//!
//! - [`table`] — Observation tables, eager or lazily aggregated from partitions
//! - [`moments`] — Mean vectors, covariance matrices, Bessel weights
//! - [`pooling`] — Pooled covariance, direct and pseudo-inverse
//! - [`testing`] — One- and two-sample T² tests with F approximation
//! - [`spc`] — T² and k-sigma control charts, CUSUM traces, display subsampling
//! - [`distribution`] — F and Beta distribution functions
//! - [`loader`] — Delimited text files as tables
//! - [`config`] — Chart and loader options
//! - [`error`] — The crate error type
//!
//! ## Quick start
//!
//! ```
//! use hotelling::table::EagerTable;
//! use hotelling::testing::{hotelling_t2, Comparand};
//!
//! let x = EagerTable::from_rows(&[
//!     [3.7, 48.5, 9.3], [5.7, 65.1, 8.0], [3.8, 47.2, 10.9], [3.2, 53.2, 12.0],
//!     [3.1, 55.5, 9.7], [4.6, 36.1, 7.9], [2.4, 24.8, 14.0], [7.2, 33.1, 7.6],
//! ]).unwrap();
//!
//! let mu0 = [4.0, 50.0, 10.0];
//! let result = hotelling_t2(&x, Comparand::Mean(&mu0), true).unwrap();
//! assert!((0.0..=1.0).contains(&result.p_value));
//! ```
//!
//! ## Design Philosophy
//!
//! - **Storage-agnostic**: every analysis runs on [`table::ObservationTable`],
//!   so in-memory and partitioned data give the same answers
//! - **No silent coercion**: mismatched shapes are errors, degenerate sample
//!   sizes are NaN
//! - **Research-backed**: algorithms cite their literature

pub mod config;
pub mod distribution;
pub mod error;
pub mod loader;
pub mod moments;
pub mod pooling;
pub mod spc;
pub mod table;
pub mod testing;
