//! BIOENV: best subset of metadata variables explaining community structure.

use crate::data::DistanceMatrix;
use crate::error::{BetaDivError, Result};
use crate::stats::correlation::spearman;
use serde::{Deserialize, Serialize};

/// Best variable subset for one subset size.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BioenvRow {
    /// Subset size.
    pub size: usize,
    /// Names of the variables in the best subset of this size.
    pub variables: Vec<String>,
    /// Spearman correlation between the community distances and the
    /// Euclidean distances over the subset.
    pub correlation: f64,
}

/// Result of a BIOENV analysis: the best subset per subset size.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BioenvResult {
    /// One row per subset size, ascending.
    pub rows: Vec<BioenvRow>,
}

impl BioenvResult {
    /// The overall best row (highest correlation).
    pub fn best(&self) -> Option<&BioenvRow> {
        self.rows
            .iter()
            .max_by(|a, b| a.correlation.total_cmp(&b.correlation))
    }
}

/// BIOENV: for every subset of the given variables, correlate the Euclidean
/// distance over the (z-scored) subset with the community distance matrix,
/// and report the best subset of each size.
///
/// `columns[v]` holds variable `v`'s values in the distance matrix's id
/// order; the aligner produces exactly this layout.
///
/// # Errors
///
/// Returns an error if no variables are given, lengths disagree with the
/// matrix, or a variable has zero variance (the aligner drops those first).
pub fn bioenv(
    dm: &DistanceMatrix,
    names: &[String],
    columns: &[Vec<f64>],
) -> Result<BioenvResult> {
    if names.is_empty() || columns.is_empty() {
        return Err(BetaDivError::EmptyData(
            "BIOENV requires at least one numeric variable".to_string(),
        ));
    }
    if names.len() != columns.len() {
        return Err(BetaDivError::DimensionMismatch {
            expected: names.len(),
            actual: columns.len(),
        });
    }
    let n = dm.n_samples();
    for col in columns {
        if col.len() != n {
            return Err(BetaDivError::DimensionMismatch {
                expected: n,
                actual: col.len(),
            });
        }
    }

    let scaled: Vec<Vec<f64>> = columns
        .iter()
        .enumerate()
        .map(|(v, col)| zscore(col).ok_or_else(|| {
            BetaDivError::Numerical(format!(
                "Variable '{}' has zero variance",
                names[v]
            ))
        }))
        .collect::<Result<_>>()?;

    let community = dm.upper_triangle();
    let n_vars = names.len();

    let mut rows = Vec::with_capacity(n_vars);
    for size in 1..=n_vars {
        let mut best: Option<(Vec<usize>, f64)> = None;
        for subset in combinations(n_vars, size) {
            let env = euclidean_upper_triangle(&scaled, &subset, n);
            let rho = spearman(&community, &env)?;
            let better = match &best {
                None => true,
                Some((_, best_rho)) => rho > *best_rho,
            };
            if better {
                best = Some((subset, rho));
            }
        }
        let (subset, correlation) = best.ok_or_else(|| {
            BetaDivError::Numerical(format!("No variable subset of size {}", size))
        })?;
        rows.push(BioenvRow {
            size,
            variables: subset.iter().map(|&v| names[v].clone()).collect(),
            correlation,
        });
    }

    Ok(BioenvResult { rows })
}

/// Standardize to mean 0, standard deviation 1. None for zero variance.
fn zscore(values: &[f64]) -> Option<Vec<f64>> {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    if var == 0.0 {
        return None;
    }
    let std = var.sqrt();
    Some(values.iter().map(|v| (v - mean) / std).collect())
}

/// Upper-triangle Euclidean distances over the selected variables.
fn euclidean_upper_triangle(scaled: &[Vec<f64>], subset: &[usize], n: usize) -> Vec<f64> {
    let mut out = Vec::with_capacity(n * (n - 1) / 2);
    for i in 0..n {
        for j in (i + 1)..n {
            let mut d2 = 0.0;
            for &v in subset {
                let diff = scaled[v][i] - scaled[v][j];
                d2 += diff * diff;
            }
            out.push(d2.sqrt());
        }
    }
    out
}

/// All k-subsets of 0..n in lexicographic order.
fn combinations(n: usize, k: usize) -> Vec<Vec<usize>> {
    let mut result = Vec::new();
    let mut current = Vec::with_capacity(k);
    fn helper(start: usize, n: usize, k: usize, current: &mut Vec<usize>, result: &mut Vec<Vec<usize>>) {
        if current.len() == k {
            result.push(current.clone());
            return;
        }
        for i in start..n {
            current.push(i);
            helper(i + 1, n, k, current, result);
            current.pop();
        }
    }
    helper(0, n, k, &mut current, &mut result);
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn gradient_dm(n: usize) -> DistanceMatrix {
        let mut rows = vec![vec![0.0; n]; n];
        for i in 0..n {
            for j in (i + 1)..n {
                let d = (j - i) as f64;
                rows[i][j] = d;
                rows[j][i] = d;
            }
        }
        let ids = (0..n).map(|i| format!("s{}", i)).collect();
        DistanceMatrix::from_rows(rows, ids).unwrap()
    }

    #[test]
    fn test_combinations() {
        assert_eq!(combinations(3, 2), vec![vec![0, 1], vec![0, 2], vec![1, 2]]);
        assert_eq!(combinations(3, 3), vec![vec![0, 1, 2]]);
    }

    #[test]
    fn test_finds_correlated_variable() {
        let dm = gradient_dm(4);
        // Variable "depth" follows the community gradient, "noise" does not.
        let cols = vec![
            vec![0.0, 1.0, 2.0, 3.0],
            vec![5.0, 3.0, 7.0, 1.0],
        ];
        let result = bioenv(&dm, &names(&["depth", "noise"]), &cols).unwrap();

        assert_eq!(result.rows.len(), 2);
        assert_eq!(result.rows[0].size, 1);
        assert_eq!(result.rows[0].variables, vec!["depth"]);
        assert!(result.rows[0].correlation > 0.9);

        let best = result.best().unwrap();
        assert!(best.variables.contains(&"depth".to_string()));
    }

    #[test]
    fn test_row_per_subset_size() {
        let dm = gradient_dm(5);
        let cols = vec![
            vec![0.0, 1.0, 2.0, 3.0, 4.0],
            vec![1.0, 0.0, 2.0, 4.0, 3.0],
            vec![2.0, 2.5, 1.0, 0.5, 0.0],
        ];
        let result = bioenv(&dm, &names(&["a", "b", "c"]), &cols).unwrap();
        assert_eq!(result.rows.len(), 3);
        for (i, row) in result.rows.iter().enumerate() {
            assert_eq!(row.size, i + 1);
            assert_eq!(row.variables.len(), i + 1);
        }
    }

    #[test]
    fn test_zero_variance_errors() {
        let dm = gradient_dm(3);
        let cols = vec![vec![2.0, 2.0, 2.0]];
        assert!(bioenv(&dm, &names(&["flat"]), &cols).is_err());
    }

    #[test]
    fn test_no_variables_errors() {
        let dm = gradient_dm(3);
        assert!(bioenv(&dm, &[], &[]).is_err());
    }

    #[test]
    fn test_length_mismatch_errors() {
        let dm = gradient_dm(3);
        let cols = vec![vec![1.0, 2.0]];
        assert!(bioenv(&dm, &names(&["a"]), &cols).is_err());
    }
}
