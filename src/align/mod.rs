//! Sample-set alignment between distance matrices and metadata.
//!
//! Each analysis driver starts by reconciling the sample ids of its inputs;
//! the functions here perform that filtering and report what was dropped so
//! the rendering layer can surface it.

use crate::data::{CategoryColumn, DistanceMatrix, Metadata};
use crate::error::{BetaDivError, Result};
use std::collections::{BTreeSet, HashSet};

/// Numeric metadata aligned to a distance matrix (BIOENV input form).
#[derive(Debug, Clone)]
pub struct NumericAlignment {
    /// Surviving numeric column names, in metadata order.
    pub names: Vec<String>,
    /// Column values in the filtered matrix's id order.
    pub columns: Vec<Vec<f64>>,
    /// Distance matrix filtered to the surviving samples.
    pub distance_matrix: DistanceMatrix,
    /// Sample count before filtering.
    pub initial_samples: usize,
    /// Sample count after filtering.
    pub filtered_samples: usize,
    /// Categorical columns dropped from the analysis, sorted.
    pub dropped_categorical: Vec<String>,
    /// Zero-variance numeric columns dropped from the analysis, sorted.
    pub dropped_zero_variance: Vec<String>,
}

/// Align metadata to a distance matrix for BIOENV.
///
/// Keeps only numeric columns (categorical columns are dropped and
/// reported), drops samples with any missing value, drops numeric columns
/// whose variance is exactly zero (reported separately), then filters the
/// distance matrix leniently to the surviving sample ids.
pub fn align_numeric_metadata(
    dm: &DistanceMatrix,
    metadata: &Metadata,
) -> Result<NumericAlignment> {
    let numeric_names = metadata.numeric_columns();
    let mut dropped_categorical = metadata.categorical_columns();
    dropped_categorical.sort();

    // Drop samples with a missing value in any numeric column.
    let complete_ids: Vec<String> = metadata
        .sample_ids()
        .iter()
        .filter(|id| {
            numeric_names.iter().all(|col| {
                metadata
                    .get(id, col)
                    .map(|v| !v.is_missing())
                    .unwrap_or(false)
            })
        })
        .cloned()
        .collect();

    // Zero-variance columns are detected over all complete metadata rows,
    // before the matrix intersection.
    let mut names = Vec::new();
    let mut dropped_zero_variance = Vec::new();
    for col in &numeric_names {
        let values: Vec<f64> = complete_ids
            .iter()
            .filter_map(|id| metadata.get(id, col).and_then(|v| v.as_numeric()))
            .collect();
        if is_zero_variance(&values) {
            dropped_zero_variance.push(col.clone());
        } else {
            names.push(col.clone());
        }
    }
    dropped_zero_variance.sort();

    let initial_samples = dm.n_samples();
    let distance_matrix = dm.filter(&complete_ids, false)?;
    let filtered_samples = distance_matrix.n_samples();

    let mut columns = Vec::with_capacity(names.len());
    for col in &names {
        let mut values = Vec::with_capacity(filtered_samples);
        for id in distance_matrix.ids() {
            let value = metadata
                .get(id, col)
                .and_then(|v| v.as_numeric())
                .ok_or_else(|| {
                    BetaDivError::Numerical(format!(
                        "Missing value for '{}' in column '{}' after filtering",
                        id, col
                    ))
                })?;
            values.push(value);
        }
        columns.push(values);
    }

    Ok(NumericAlignment {
        names,
        columns,
        distance_matrix,
        initial_samples,
        filtered_samples,
        dropped_categorical,
        dropped_zero_variance,
    })
}

fn is_zero_variance(values: &[f64]) -> bool {
    match values.first() {
        Some(first) => values.iter().all(|v| v == first),
        None => true,
    }
}

/// A metadata column aligned to a distance matrix (group-significance
/// input form).
#[derive(Debug, Clone)]
pub struct CategoryAlignment {
    /// The column restricted to the matrix's samples, missing values
    /// dropped.
    pub column: CategoryColumn,
    /// Distance matrix filtered to the surviving samples.
    pub distance_matrix: DistanceMatrix,
    /// Sample count before filtering.
    pub initial_samples: usize,
    /// Sample count after filtering.
    pub filtered_samples: usize,
}

/// Align a single metadata column to a distance matrix.
///
/// Restricts the column to the matrix's id order, drops missing values
/// (empty strings in the source are missing), then filters the matrix
/// strictly to the remaining ids.
pub fn align_category(dm: &DistanceMatrix, column: &CategoryColumn) -> Result<CategoryAlignment> {
    let restricted = column.restrict(dm.ids()).drop_missing();
    if restricted.is_empty() {
        return Err(BetaDivError::EmptyData(format!(
            "No samples in the distance matrix have a value for column '{}'",
            column.name()
        )));
    }

    let initial_samples = dm.n_samples();
    let distance_matrix = dm.filter(restricted.ids(), true)?;
    let filtered_samples = distance_matrix.n_samples();

    Ok(CategoryAlignment {
        column: restricted,
        distance_matrix,
        initial_samples,
        filtered_samples,
    })
}

/// Two distance matrices aligned to a common id set (Mantel input form).
#[derive(Debug, Clone)]
pub struct MatrixAlignment {
    /// First matrix, filtered when ids mismatched.
    pub dm1: DistanceMatrix,
    /// Second matrix, filtered when ids mismatched.
    pub dm2: DistanceMatrix,
    /// The symmetric difference of the input id sets, sorted.
    pub mismatched_ids: Vec<String>,
}

/// Align two distance matrices on their shared sample ids.
///
/// Computes the symmetric difference of the id sets. When mismatches exist
/// and `intersect_ids` is false the call fails listing every mismatched id;
/// otherwise both matrices are strictly filtered to the (sorted)
/// intersection.
pub fn align_distance_matrices(
    dm1: &DistanceMatrix,
    dm2: &DistanceMatrix,
    intersect_ids: bool,
) -> Result<MatrixAlignment> {
    let ids1: HashSet<&str> = dm1.id_set();
    let ids2: HashSet<&str> = dm2.id_set();

    let mismatched: BTreeSet<&str> = ids1.symmetric_difference(&ids2).copied().collect();
    let mismatched_ids: Vec<String> = mismatched.iter().map(|s| s.to_string()).collect();

    if mismatched_ids.is_empty() {
        return Ok(MatrixAlignment {
            dm1: dm1.clone(),
            dm2: dm2.clone(),
            mismatched_ids,
        });
    }

    if !intersect_ids {
        return Err(BetaDivError::id_mismatch(mismatched_ids));
    }

    let matched: Vec<String> = {
        let shared: BTreeSet<&str> = ids1.intersection(&ids2).copied().collect();
        shared.iter().map(|s| s.to_string()).collect()
    };
    if matched.is_empty() {
        return Err(BetaDivError::EmptyData(
            "The distance matrices share no sample IDs".to_string(),
        ));
    }

    // Every matched id resolves in both matrices, so strict filtering is an
    // internal invariant here.
    Ok(MatrixAlignment {
        dm1: dm1.filter(&matched, true)?,
        dm2: dm2.filter(&matched, true)?,
        mismatched_ids,
    })
}
