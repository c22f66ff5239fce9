//! Error type shared by every fallible operation in the crate.
//!
//! Degenerate sample sizes (n <= p) are deliberately absent: they produce
//! NaN or infinite statistics instead of an error.

use thiserror::Error;

/// Errors reported by table construction, the T² engine and the chart builders.
#[derive(Debug, Error)]
pub enum HotellingError {
    /// Two inputs disagree on the number of features.
    #[error("shape mismatch: expected {expected} features, found {found}")]
    ShapeMismatch { expected: usize, found: usize },

    /// Only one of an external mean / external covariance pair was supplied.
    #[error("external mean and covariance must be supplied together, or not at all")]
    MissingPairedArgument,

    /// The pooled covariance matrix could not be inverted by direct solve.
    #[error("pooled covariance matrix is singular")]
    SingularCovariance,

    /// A table was built with zero rows or zero columns.
    #[error("observation table must have at least one row and one column")]
    EmptyTable,

    /// A row does not have the same number of values as the first row.
    #[error("row {row} has {found} values, expected {expected}")]
    RaggedRows {
        row: usize,
        expected: usize,
        found: usize,
    },

    /// A caller-supplied parameter is outside its valid domain.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// The linear-algebra backend reported a failure.
    #[error("numeric failure: {0}")]
    Numeric(String),

    /// A delimited file could not be parsed.
    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl HotellingError {
    /// Short machine-readable name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            HotellingError::ShapeMismatch { .. } => "shape_mismatch",
            HotellingError::MissingPairedArgument => "missing_paired_argument",
            HotellingError::SingularCovariance => "singular_covariance",
            HotellingError::EmptyTable => "empty_table",
            HotellingError::RaggedRows { .. } => "ragged_rows",
            HotellingError::InvalidParameter(_) => "invalid_parameter",
            HotellingError::Numeric(_) => "numeric",
            HotellingError::Parse { .. } => "parse",
            HotellingError::Io(_) => "io",
        }
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, HotellingError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_mismatch_message() {
        let err = HotellingError::ShapeMismatch {
            expected: 3,
            found: 2,
        };
        assert_eq!(
            err.to_string(),
            "shape mismatch: expected 3 features, found 2"
        );
        assert_eq!(err.kind(), "shape_mismatch");
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing.csv");
        let err: HotellingError = io.into();
        assert_eq!(err.kind(), "io");
        assert!(err.to_string().contains("missing.csv"));
    }

    #[test]
    fn test_ragged_rows_message() {
        let err = HotellingError::RaggedRows {
            row: 4,
            expected: 3,
            found: 2,
        };
        assert_eq!(err.to_string(), "row 4 has 2 values, expected 3");
    }
}
