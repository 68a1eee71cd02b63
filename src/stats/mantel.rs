//! Mantel test: correlation between two distance matrices.

use crate::data::DistanceMatrix;
use crate::error::{BetaDivError, Result};
use crate::stats::correlation::{correlate, CorrelationMethod};
use crate::stats::rng::SimpleRng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Result of a Mantel test.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MantelResult {
    /// Correlation method used.
    pub method: CorrelationMethod,
    /// Observed correlation statistic.
    pub statistic: f64,
    /// Two-sided permutation p-value; NaN when `permutations` was zero.
    pub p_value: f64,
    /// Number of samples correlated.
    pub sample_size: usize,
    /// Number of permutations performed.
    pub permutations: usize,
}

/// Mantel test between two distance matrices with identical id sets.
///
/// Flattens the upper triangles, computes the correlation, and permutes
/// rows/columns of the first matrix to estimate a two-sided p-value
/// (`|permuted| >= |observed|`).
///
/// # Errors
///
/// Returns [`BetaDivError::IdMismatch`] when the matrices don't share the
/// same ids, and a numerical error for matrices smaller than 3 samples.
pub fn mantel(
    dm1: &DistanceMatrix,
    dm2: &DistanceMatrix,
    method: CorrelationMethod,
    permutations: usize,
    seed: u64,
) -> Result<MantelResult> {
    let ids1: HashSet<&str> = dm1.id_set();
    let ids2: HashSet<&str> = dm2.id_set();
    if ids1 != ids2 {
        let mismatched: Vec<&str> = ids1.symmetric_difference(&ids2).copied().collect();
        return Err(BetaDivError::id_mismatch(mismatched));
    }

    let n = dm1.n_samples();
    if n < 3 {
        return Err(BetaDivError::Numerical(
            "Mantel test requires at least 3 samples".to_string(),
        ));
    }

    // Align the second matrix to the first's id order.
    let dm2 = dm2.filter(dm1.ids(), true)?;

    let flat1 = dm1.upper_triangle();
    let flat2 = dm2.upper_triangle();

    let observed = correlate(method, &flat1, &flat2)?;

    let p_value = if permutations == 0 {
        f64::NAN
    } else {
        let abs_observed = observed.abs();
        let n_extreme = (0..permutations)
            .into_par_iter()
            .filter(|&p| {
                let mut rng = SimpleRng::new(seed.wrapping_add(p as u64));
                let mut order: Vec<usize> = (0..n).collect();
                rng.shuffle(&mut order);

                let mut permuted = Vec::with_capacity(flat1.len());
                for i in 0..n {
                    for j in (i + 1)..n {
                        permuted.push(dm1.get(order[i], order[j]));
                    }
                }
                let stat = correlate(method, &permuted, &flat2).unwrap_or(0.0);
                stat.abs() >= abs_observed
            })
            .count();
        (n_extreme as f64 + 1.0) / (permutations as f64 + 1.0)
    };

    Ok(MantelResult {
        method,
        statistic: observed,
        p_value,
        sample_size: n,
        permutations,
    })
}

/// One row of a pairwise Mantel comparison.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairwiseMantelRow {
    /// Label of the first matrix.
    pub label1: String,
    /// Label of the second matrix.
    pub label2: String,
    /// Correlation statistic.
    pub statistic: f64,
    /// Two-sided permutation p-value; NaN when permutations was zero.
    pub p_value: f64,
    /// Number of samples correlated.
    pub sample_size: usize,
}

/// Mantel test over every unordered pair of labeled distance matrices.
///
/// Id matching is strict: every matrix must carry exactly the same sample
/// set, otherwise the call fails listing the ids missing from any matrix.
pub fn pairwise_mantel(
    matrices: &[(String, DistanceMatrix)],
    method: CorrelationMethod,
    permutations: usize,
    seed: u64,
) -> Result<Vec<PairwiseMantelRow>> {
    if matrices.len() < 2 {
        return Err(BetaDivError::InvalidParameter(
            "Pairwise Mantel requires at least 2 distance matrices".to_string(),
        ));
    }

    let reference: HashSet<&str> = matrices[0].1.id_set();
    let mut mismatched: HashSet<&str> = HashSet::new();
    for (_, dm) in &matrices[1..] {
        let ids = dm.id_set();
        mismatched.extend(reference.symmetric_difference(&ids));
    }
    if !mismatched.is_empty() {
        return Err(BetaDivError::id_mismatch(mismatched));
    }

    let mut rows = Vec::new();
    for i in 0..matrices.len() {
        for j in (i + 1)..matrices.len() {
            let result = mantel(
                &matrices[i].1,
                &matrices[j].1,
                method,
                permutations,
                seed.wrapping_add((i * matrices.len() + j) as u64),
            )?;
            rows.push(PairwiseMantelRow {
                label1: matrices[i].0.clone(),
                label2: matrices[j].0.clone(),
                statistic: result.statistic,
                p_value: result.p_value,
                sample_size: result.sample_size,
            });
        }
    }
    Ok(rows)
}
