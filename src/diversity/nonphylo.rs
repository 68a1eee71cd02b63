//! Non-phylogenetic beta-diversity metrics.

use crate::error::{BetaDivError, Result};

/// Bray-Curtis dissimilarity between two count vectors.
///
/// `BC = 1 - 2 * Σ min(a_i, b_i) / (Σ a_i + Σ b_i)`, ranging from 0
/// (identical) to 1 (completely different).
///
/// # Errors
///
/// Returns an error if lengths differ or both samples are all-zero.
pub fn bray_curtis(a: &[u64], b: &[u64]) -> Result<f64> {
    validate_pair(a, b)?;
    let sum_a: u64 = a.iter().sum();
    let sum_b: u64 = b.iter().sum();
    if sum_a == 0 && sum_b == 0 {
        return Err(BetaDivError::EmptyData(
            "Both samples have zero total counts".to_string(),
        ));
    }
    let sum_min: u64 = a.iter().zip(b.iter()).map(|(&ai, &bi)| ai.min(bi)).sum();
    Ok(1.0 - 2.0 * sum_min as f64 / (sum_a + sum_b) as f64)
}

/// Jaccard dissimilarity between two count vectors (presence/absence).
///
/// `J = 1 - |A∩B| / |A∪B|` over the sets of features present.
///
/// # Errors
///
/// Returns an error if lengths differ or both samples are all-zero.
pub fn jaccard(a: &[u64], b: &[u64]) -> Result<f64> {
    validate_pair(a, b)?;
    let mut intersection = 0usize;
    let mut union = 0usize;
    for (&ai, &bi) in a.iter().zip(b.iter()) {
        let pa = ai > 0;
        let pb = bi > 0;
        if pa || pb {
            union += 1;
        }
        if pa && pb {
            intersection += 1;
        }
    }
    if union == 0 {
        return Err(BetaDivError::EmptyData(
            "Both samples have zero total counts".to_string(),
        ));
    }
    Ok(1.0 - intersection as f64 / union as f64)
}

fn validate_pair(a: &[u64], b: &[u64]) -> Result<()> {
    if a.len() != b.len() {
        return Err(BetaDivError::DimensionMismatch {
            expected: a.len(),
            actual: b.len(),
        });
    }
    Ok(())
}

/// Pairwise distance matrix over per-sample count vectors.
pub fn pairwise_matrix<F>(samples: &[Vec<u64>], distance: F) -> Result<Vec<Vec<f64>>>
where
    F: Fn(&[u64], &[u64]) -> Result<f64>,
{
    if samples.len() < 2 {
        return Err(BetaDivError::EmptyData(
            "At least 2 samples are required for a distance matrix".to_string(),
        ));
    }
    let n = samples.len();
    let mut matrix = vec![vec![0.0; n]; n];
    for i in 0..n {
        for j in (i + 1)..n {
            let d = distance(samples[i].as_slice(), samples[j].as_slice())?;
            matrix[i][j] = d;
            matrix[j][i] = d;
        }
    }
    Ok(matrix)
}
