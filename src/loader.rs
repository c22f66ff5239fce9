//! Delimited text files as observation tables.
//!
//! Reads comma- or whitespace-separated numeric columns. The first line is a
//! header when any of its fields is not a number (or when forced through
//! [`LoadOptions::header`]). An index column of row labels can be dropped by
//! position. Blank lines are skipped.
//!
//! With [`LoadOptions::chunk_rows`] set, the file is not read up front: the
//! returned [`LazyTable`] streams it in partitions of that many rows each
//! time it needs to aggregate or materialize.
//!
//! # Examples
//!
//! ```
//! use hotelling::config::LoadOptions;
//! use hotelling::loader::load_table;
//! use hotelling::table::ObservationTable;
//!
//! let dir = tempfile::tempdir().unwrap();
//! let path = dir.path().join("x.csv");
//! std::fs::write(&path, "a,b\n1,2\n3,5\n4,4\n").unwrap();
//!
//! let table = load_table(&path, &LoadOptions::default()).unwrap();
//! assert_eq!(table.row_count().unwrap(), 3);
//! assert_eq!(table.feature_count(), 2);
//! ```

use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::iter::Enumerate;
use std::path::{Path, PathBuf};

use log::debug;
use nalgebra::DMatrix;

use crate::config::{Delimiter, LoadOptions};
use crate::error::{HotellingError, Result};
use crate::table::{EagerTable, LazyTable, PartitionSource, Partitions, Table};

/// Upper bound on the rows reserved up front for one partition buffer.
const MAX_RESERVED_ROWS: usize = 4096;

/// Load `path` as an eager table, or a lazy one when `chunk_rows` is set.
///
/// # Errors
///
/// - [`HotellingError::Io`] if the file cannot be read.
/// - [`HotellingError::Parse`] for a non-numeric field or a row with the
///   wrong number of fields. A lazy table reports these when first
///   aggregated.
/// - [`HotellingError::EmptyTable`] for a file without data rows.
/// - [`HotellingError::InvalidParameter`] for `chunk_rows == Some(0)`.
pub fn load_table(path: impl AsRef<Path>, options: &LoadOptions) -> Result<Table> {
    let path = path.as_ref();
    let layout = Layout::detect(path, options)?;
    debug!(
        "{}: {:?} delimited, {} features, header: {}",
        path.display(),
        layout.delimiter,
        layout.features,
        layout.header
    );

    match options.chunk_rows {
        Some(0) => Err(HotellingError::InvalidParameter(
            "chunk_rows must be at least 1".to_string(),
        )),
        Some(chunk_rows) => {
            let source = FilePartitions {
                path: path.to_path_buf(),
                layout,
                chunk_rows,
            };
            Ok(LazyTable::from_source(source).into())
        }
        None => {
            let mut values = Vec::new();
            let mut rows = 0usize;
            for row in RowReader::open(path, layout)? {
                values.extend(row?);
                rows += 1;
            }
            if rows == 0 {
                return Err(HotellingError::EmptyTable);
            }
            debug!("{}: loaded {rows} rows", path.display());
            let table = EagerTable::new(DMatrix::from_row_slice(rows, layout.features, &values))?;
            Ok(table.into())
        }
    }
}

/// How the lines of one file are split.
#[derive(Debug, Clone, Copy)]
struct Layout {
    delimiter: Delimiter,
    header: bool,
    index_col: Option<usize>,
    features: usize,
}

impl Layout {
    /// Inspect the first non-blank line.
    fn detect(path: &Path, options: &LoadOptions) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        for (i, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let delimiter = match options.delimiter {
                Delimiter::Auto if line.contains(',') => Delimiter::Comma,
                Delimiter::Auto => Delimiter::Whitespace,
                explicit => explicit,
            };
            let mut layout = Layout {
                delimiter,
                header: false,
                index_col: options.index_col,
                features: 0,
            };
            if let Some(col) = options.index_col {
                let width = Layout { index_col: None, ..layout }.fields(&line).len();
                if col >= width {
                    return Err(HotellingError::Parse {
                        line: i + 1,
                        message: format!("index column {col} beyond {width} fields"),
                    });
                }
            }
            let fields = layout.fields(&line);
            layout.features = fields.len();
            layout.header = options
                .header
                .unwrap_or_else(|| fields.iter().any(|f| f.parse::<f64>().is_err()));
            if layout.features == 0 {
                return Err(HotellingError::EmptyTable);
            }
            return Ok(layout);
        }
        Err(HotellingError::EmptyTable)
    }

    /// Split a line, dropping the index column.
    fn fields<'l>(&self, line: &'l str) -> Vec<&'l str> {
        let raw: Vec<&str> = match self.delimiter {
            Delimiter::Comma => line.split(',').map(str::trim).collect(),
            _ => line.split_whitespace().collect(),
        };
        raw.into_iter()
            .enumerate()
            .filter(|(j, _)| Some(*j) != self.index_col)
            .map(|(_, f)| f)
            .collect()
    }

    fn parse(&self, line: &str, number: usize) -> Result<Vec<f64>> {
        let fields = self.fields(line);
        if fields.len() != self.features {
            return Err(HotellingError::Parse {
                line: number,
                message: format!("expected {} values, found {}", self.features, fields.len()),
            });
        }
        fields
            .iter()
            .map(|f| {
                f.parse::<f64>().map_err(|_| HotellingError::Parse {
                    line: number,
                    message: format!("not a number: {f:?}"),
                })
            })
            .collect()
    }
}

/// Parsed data rows of a file, in order.
struct RowReader {
    lines: Enumerate<Lines<BufReader<File>>>,
    layout: Layout,
    header_pending: bool,
}

impl RowReader {
    fn open(path: &Path, layout: Layout) -> Result<Self> {
        Ok(Self {
            lines: BufReader::new(File::open(path)?).lines().enumerate(),
            layout,
            header_pending: layout.header,
        })
    }
}

impl Iterator for RowReader {
    type Item = Result<Vec<f64>>;

    fn next(&mut self) -> Option<Self::Item> {
        for (i, line) in self.lines.by_ref() {
            let line = match line {
                Ok(line) => line,
                Err(e) => return Some(Err(e.into())),
            };
            if line.trim().is_empty() {
                continue;
            }
            if self.header_pending {
                self.header_pending = false;
                continue;
            }
            return Some(self.layout.parse(&line, i + 1));
        }
        None
    }
}

/// A file read in fixed-size row partitions on every pass.
struct FilePartitions {
    path: PathBuf,
    layout: Layout,
    chunk_rows: usize,
}

impl PartitionSource for FilePartitions {
    fn feature_count(&self) -> usize {
        self.layout.features
    }

    fn partitions(&self) -> Result<Partitions<'_>> {
        debug!(
            "streaming {} in chunks of {} rows",
            self.path.display(),
            self.chunk_rows
        );
        Ok(Box::new(ChunkReader {
            rows: RowReader::open(&self.path, self.layout)?,
            features: self.layout.features,
            chunk_rows: self.chunk_rows,
            done: false,
        }))
    }
}

struct ChunkReader {
    rows: RowReader,
    features: usize,
    chunk_rows: usize,
    done: bool,
}

impl Iterator for ChunkReader {
    type Item = Result<DMatrix<f64>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let reserved = self.chunk_rows.min(MAX_RESERVED_ROWS);
        let mut values = Vec::with_capacity(reserved.saturating_mul(self.features));
        let mut count = 0;
        while count < self.chunk_rows {
            match self.rows.next() {
                Some(Ok(row)) => {
                    values.extend(row);
                    count += 1;
                }
                Some(Err(e)) => {
                    self.done = true;
                    return Some(Err(e));
                }
                None => {
                    self.done = true;
                    break;
                }
            }
        }
        if count == 0 {
            return None;
        }
        Some(Ok(DMatrix::from_row_slice(count, self.features, &values)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::ObservationTable;

    fn write(content: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.txt");
        std::fs::write(&path, content).unwrap();
        (dir, path)
    }

    #[test]
    fn test_comma_with_header() {
        let (_dir, path) = write("a,b,c\n1,2,3\n4,5,6\n");
        let table = load_table(&path, &LoadOptions::default()).unwrap();
        assert!(!table.is_lazy());
        assert_eq!(table.row_count().unwrap(), 2);
        let data = table.realize().unwrap();
        assert!((data[(1, 2)] - 6.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_whitespace_without_header() {
        let (_dir, path) = write("  1.5   2\n\n3  4.5\n");
        let table = load_table(&path, &LoadOptions::default()).unwrap();
        assert_eq!(table.row_count().unwrap(), 2);
        let mean = table.mean().unwrap();
        assert!((mean[0] - 2.25).abs() < 1e-12);
        assert!((mean[1] - 3.25).abs() < 1e-12);
    }

    #[test]
    fn test_index_column_dropped() {
        let (_dir, path) = write("Subject,a,b\ns1,1,10\ns2,2,20\ns3,3,30\n");
        let options = LoadOptions {
            index_col: Some(0),
            ..LoadOptions::default()
        };
        let table = load_table(&path, &options).unwrap();
        assert_eq!(table.feature_count(), 2);
        let data = table.realize().unwrap();
        assert!((data[(2, 1)] - 30.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_forced_header_skips_numeric_first_line() {
        let (_dir, path) = write("1 2\n3 4\n5 6\n");
        let options = LoadOptions {
            header: Some(true),
            ..LoadOptions::default()
        };
        let table = load_table(&path, &options).unwrap();
        assert_eq!(table.row_count().unwrap(), 2);
    }

    #[test]
    fn test_parse_error_reports_line() {
        let (_dir, path) = write("a,b\n1,2\n3,x\n");
        match load_table(&path, &LoadOptions::default()) {
            Err(HotellingError::Parse { line, .. }) => assert_eq!(line, 3),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_ragged_row_is_parse_error() {
        let (_dir, path) = write("1,2\n3,4,5\n");
        assert!(matches!(
            load_table(&path, &LoadOptions::default()),
            Err(HotellingError::Parse { line: 2, .. })
        ));
    }

    #[test]
    fn test_empty_and_header_only() {
        let (_dir, path) = write("\n\n");
        assert!(matches!(
            load_table(&path, &LoadOptions::default()),
            Err(HotellingError::EmptyTable)
        ));
        let (_dir, path) = write("a,b\n");
        assert!(matches!(
            load_table(&path, &LoadOptions::default()),
            Err(HotellingError::EmptyTable)
        ));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            load_table(dir.path().join("nope.csv"), &LoadOptions::default()),
            Err(HotellingError::Io(_))
        ));
    }

    #[test]
    fn test_chunked_load_is_lazy_and_matches() {
        let content = "x y\n1 2\n2 4\n3 7\n4 7\n5 11\n6 12\n7 13\n";
        let (_dir, path) = write(content);
        let eager = load_table(&path, &LoadOptions::default()).unwrap();
        let options = LoadOptions {
            chunk_rows: Some(3),
            ..LoadOptions::default()
        };
        let lazy = load_table(&path, &options).unwrap();
        assert!(lazy.is_lazy());

        assert_eq!(lazy.row_count().unwrap(), 7);
        let (a, b) = (eager.covariance().unwrap(), lazy.covariance().unwrap());
        for (x, y) in a.iter().zip(b.iter()) {
            assert!((x - y).abs() < 1e-9);
        }
        assert_eq!(*lazy.realize().unwrap(), *eager.realize().unwrap());
        if let Table::Lazy(t) = &lazy {
            assert_eq!(t.aggregation_passes(), 1);
        }
    }

    #[test]
    fn test_chunked_parse_error_surfaces_on_aggregation() {
        let (_dir, path) = write("1,2\n3,4\n5,oops\n");
        let options = LoadOptions {
            chunk_rows: Some(2),
            ..LoadOptions::default()
        };
        let table = load_table(&path, &options).unwrap();
        assert!(matches!(table.mean(), Err(HotellingError::Parse { line: 3, .. })));
    }

    #[test]
    fn test_zero_chunk_rows_rejected() {
        let (_dir, path) = write("1,2\n");
        let options = LoadOptions {
            chunk_rows: Some(0),
            ..LoadOptions::default()
        };
        assert!(matches!(
            load_table(&path, &options),
            Err(HotellingError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_huge_chunk_rows_reads_small_file() {
        let (_dir, path) = write("a,b\n1,2\n3,4\n5,7\n6,8\n");
        for chunk_rows in [usize::MAX / 2, usize::MAX, 1_000_000_000] {
            let options = LoadOptions {
                chunk_rows: Some(chunk_rows),
                ..LoadOptions::default()
            };
            let table = load_table(&path, &options).unwrap();
            assert_eq!(table.row_count().unwrap(), 4);
            assert_eq!(table.realize().unwrap().shape(), (4, 2));
        }
    }
}
