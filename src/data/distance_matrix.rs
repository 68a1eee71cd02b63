//! Symmetric distance matrix indexed by sample identifiers.

use crate::error::{BetaDivError, Result};
use nalgebra::DMatrix;
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// A symmetric, zero-diagonal, non-negative matrix of pairwise distances
/// between samples.
///
/// Immutable once constructed; derived matrices are produced with
/// [`DistanceMatrix::filter`].
#[derive(Debug, Clone)]
pub struct DistanceMatrix {
    /// Dense symmetric matrix (n × n).
    data: DMatrix<f64>,
    /// Sample identifiers in matrix order.
    ids: Vec<String>,
    /// Identifier → row/column index.
    index: HashMap<String, usize>,
}

const SYMMETRY_TOL: f64 = 1e-12;

impl DistanceMatrix {
    /// Create a new DistanceMatrix from a dense matrix and identifiers.
    ///
    /// # Errors
    ///
    /// Returns an error if the matrix is not square, dimensions don't match
    /// the identifier count, identifiers are duplicated, the diagonal is
    /// non-zero, or any entry is negative or asymmetric.
    pub fn new(data: DMatrix<f64>, ids: Vec<String>) -> Result<Self> {
        let (nrows, ncols) = data.shape();
        if nrows != ncols {
            return Err(BetaDivError::DimensionMismatch {
                expected: nrows,
                actual: ncols,
            });
        }
        if nrows != ids.len() {
            return Err(BetaDivError::DimensionMismatch {
                expected: nrows,
                actual: ids.len(),
            });
        }

        let mut index = HashMap::with_capacity(ids.len());
        for (i, id) in ids.iter().enumerate() {
            if index.insert(id.clone(), i).is_some() {
                return Err(BetaDivError::InvalidParameter(format!(
                    "Duplicate sample ID '{}' in distance matrix",
                    id
                )));
            }
        }

        for i in 0..nrows {
            if data[(i, i)] != 0.0 {
                return Err(BetaDivError::InvalidParameter(format!(
                    "Distance matrix diagonal must be zero (found {} at '{}')",
                    data[(i, i)],
                    ids[i]
                )));
            }
            for j in (i + 1)..nrows {
                let d = data[(i, j)];
                if d < 0.0 {
                    return Err(BetaDivError::InvalidParameter(format!(
                        "Distance matrix contains negative value {} at ('{}', '{}')",
                        d, ids[i], ids[j]
                    )));
                }
                if (d - data[(j, i)]).abs() > SYMMETRY_TOL {
                    return Err(BetaDivError::InvalidParameter(format!(
                        "Distance matrix is not symmetric at ('{}', '{}')",
                        ids[i], ids[j]
                    )));
                }
            }
        }

        Ok(Self { data, ids, index })
    }

    /// Build from a row-major vector of pairwise distances.
    ///
    /// Convenience constructor used heavily in tests and by the diversity
    /// metrics, which produce `Vec<Vec<f64>>` matrices.
    pub fn from_rows(rows: Vec<Vec<f64>>, ids: Vec<String>) -> Result<Self> {
        let n = rows.len();
        for row in &rows {
            if row.len() != n {
                return Err(BetaDivError::DimensionMismatch {
                    expected: n,
                    actual: row.len(),
                });
            }
        }
        let data = DMatrix::from_fn(n, n, |i, j| rows[i][j]);
        Self::new(data, ids)
    }

    /// Load a distance matrix from a TSV file.
    ///
    /// Expected format:
    /// - First row: header with sample IDs (first cell is ignored)
    /// - Subsequent rows: sample ID followed by distances, in header order
    pub fn from_tsv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let mut lines = reader.lines();

        let header_line = lines
            .next()
            .ok_or_else(|| BetaDivError::EmptyData("Empty distance matrix file".to_string()))??;
        let header: Vec<&str> = header_line.split('\t').collect();
        if header.len() < 2 {
            return Err(BetaDivError::EmptyData(
                "Distance matrix must have at least one sample".to_string(),
            ));
        }
        let ids: Vec<String> = header[1..].iter().map(|s| s.to_string()).collect();
        let n = ids.len();

        let mut data = DMatrix::zeros(n, n);
        let mut row_idx = 0usize;
        for line_result in lines {
            let line = line_result?;
            if line.trim().is_empty() {
                continue;
            }
            if row_idx >= n {
                return Err(BetaDivError::DimensionMismatch {
                    expected: n,
                    actual: row_idx + 1,
                });
            }
            let fields: Vec<&str> = line.split('\t').collect();
            if fields.len() != n + 1 {
                return Err(BetaDivError::DimensionMismatch {
                    expected: n + 1,
                    actual: fields.len(),
                });
            }
            if fields[0] != ids[row_idx] {
                return Err(BetaDivError::InvalidParameter(format!(
                    "Row ID '{}' does not match header ID '{}'",
                    fields[0], ids[row_idx]
                )));
            }
            for (col_idx, value_str) in fields[1..].iter().enumerate() {
                let value: f64 = value_str.trim().parse().map_err(|_| {
                    BetaDivError::InvalidParameter(format!(
                        "Invalid distance value '{}' at row {}, column {}",
                        value_str, row_idx, col_idx
                    ))
                })?;
                data[(row_idx, col_idx)] = value;
            }
            row_idx += 1;
        }

        if row_idx != n {
            return Err(BetaDivError::DimensionMismatch {
                expected: n,
                actual: row_idx,
            });
        }

        Self::new(data, ids)
    }

    /// Write the distance matrix to a TSV file.
    pub fn to_tsv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);

        write!(writer, "sample_id")?;
        for id in &self.ids {
            write!(writer, "\t{}", id)?;
        }
        writeln!(writer)?;

        for (i, id) in self.ids.iter().enumerate() {
            write!(writer, "{}", id)?;
            for j in 0..self.ids.len() {
                write!(writer, "\t{}", self.data[(i, j)])?;
            }
            writeln!(writer)?;
        }

        Ok(())
    }

    /// Number of samples.
    #[inline]
    pub fn n_samples(&self) -> usize {
        self.ids.len()
    }

    /// Sample identifiers in matrix order.
    #[inline]
    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    /// Sample identifiers as a set.
    pub fn id_set(&self) -> HashSet<&str> {
        self.ids.iter().map(String::as_str).collect()
    }

    /// Check if a sample exists.
    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Matrix index of a sample identifier.
    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    /// Distance at (row, col) by matrix index.
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[(row, col)]
    }

    /// Distance between two samples by identifier.
    ///
    /// # Errors
    ///
    /// Returns an error if either identifier is unknown.
    pub fn distance(&self, id1: &str, id2: &str) -> Result<f64> {
        let i = self
            .index_of(id1)
            .ok_or_else(|| BetaDivError::id_mismatch([id1]))?;
        let j = self
            .index_of(id2)
            .ok_or_else(|| BetaDivError::id_mismatch([id2]))?;
        Ok(self.data[(i, j)])
    }

    /// Filter to a subset of identifiers, in the requested order.
    ///
    /// In strict mode every requested identifier must exist in the matrix;
    /// unmatched identifiers produce an [`BetaDivError::IdMismatch`] listing
    /// each of them. In lenient mode unmatched identifiers are silently
    /// skipped and the result holds the intersection.
    pub fn filter(&self, ids: &[String], strict: bool) -> Result<Self> {
        let mut keep: Vec<usize> = Vec::with_capacity(ids.len());
        let mut kept_ids: Vec<String> = Vec::with_capacity(ids.len());
        let mut missing: Vec<&str> = Vec::new();

        for id in ids {
            match self.index_of(id) {
                Some(i) => {
                    keep.push(i);
                    kept_ids.push(id.clone());
                }
                None => missing.push(id),
            }
        }

        if strict && !missing.is_empty() {
            return Err(BetaDivError::id_mismatch(missing));
        }

        let n = keep.len();
        let data = DMatrix::from_fn(n, n, |i, j| self.data[(keep[i], keep[j])]);
        Self::new(data, kept_ids)
    }

    /// Flatten the strict upper triangle (i < j) in row-major order.
    ///
    /// This is the vector form used by the Mantel and BIOENV correlations.
    pub fn upper_triangle(&self) -> Vec<f64> {
        let n = self.n_samples();
        let mut v = Vec::with_capacity(n * (n - 1) / 2);
        for i in 0..n {
            for j in (i + 1)..n {
                v.push(self.data[(i, j)]);
            }
        }
        v
    }

    /// The underlying dense matrix.
    #[inline]
    pub fn data(&self) -> &DMatrix<f64> {
        &self.data
    }
}
