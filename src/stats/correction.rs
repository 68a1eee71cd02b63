//! Benjamini-Hochberg false discovery rate correction.

/// Apply Benjamini-Hochberg FDR correction to a set of p-values.
///
/// The BH procedure controls the false discovery rate: for each p-value,
/// the adjusted q-value is `min(p * n / rank, q[next])`, capped at 1.
/// Returned q-values are in the same order as the input p-values, so rows
/// can be annotated without reordering.
pub fn correct_bh(p_values: &[f64]) -> Vec<f64> {
    let n = p_values.len();
    if n == 0 {
        return Vec::new();
    }

    // Create sorted index
    let mut indices: Vec<usize> = (0..n).collect();
    indices.sort_by(|&a, &b| p_values[a].total_cmp(&p_values[b]));

    let n_f64 = n as f64;
    let mut q_sorted = vec![0.0; n];

    // Start from the largest p-value and work backwards.
    q_sorted[n - 1] = p_values[indices[n - 1]].min(1.0);
    for i in (0..n - 1).rev() {
        let rank = i + 1;
        let adjusted = p_values[indices[i]] * n_f64 / rank as f64;
        q_sorted[i] = adjusted.min(q_sorted[i + 1]).min(1.0);
    }

    // Restore original order
    let mut q_values = vec![0.0; n];
    for (i, &orig_idx) in indices.iter().enumerate() {
        q_values[orig_idx] = q_sorted[i];
    }
    q_values
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_bh_known_values() {
        // 5 tests, p = [0.005, 0.01, 0.02, 0.04, 0.1]
        // Rank 1: 0.005 * 5/1 = 0.025
        // Rank 2: 0.01 * 5/2 = 0.025
        // Rank 3: 0.02 * 5/3 = 0.0333...
        // Rank 4: 0.04 * 5/4 = 0.05
        // Rank 5: 0.1 * 5/5 = 0.1
        let q = correct_bh(&[0.005, 0.01, 0.02, 0.04, 0.1]);

        assert_relative_eq!(q[0], 0.025, epsilon = 1e-10);
        assert_relative_eq!(q[1], 0.025, epsilon = 1e-10);
        assert_relative_eq!(q[2], 1.0 / 30.0, epsilon = 1e-10);
        assert_relative_eq!(q[3], 0.05, epsilon = 1e-10);
        assert_relative_eq!(q[4], 0.1, epsilon = 1e-10);
    }

    #[test]
    fn test_bh_preserves_input_order() {
        // P-values in non-sorted order
        let q = correct_bh(&[0.04, 0.01, 0.03, 0.005]);

        // Smallest p-value (0.005 at index 3): q = 0.005 * 4 / 1 = 0.02
        assert_relative_eq!(q[3], 0.02, epsilon = 1e-10);
        // Second smallest (0.01 at index 1): min(0.01 * 4/2, next) = 0.02
        assert_relative_eq!(q[1], 0.02, epsilon = 1e-10);
    }

    #[test]
    fn test_bh_monotonic_for_increasing_pvalues() {
        let p = [0.001, 0.01, 0.02, 0.05, 0.1, 0.5];
        let q = correct_bh(&p);
        for i in 1..q.len() {
            assert!(q[i] >= q[i - 1] - 1e-12);
        }
    }

    #[test]
    fn test_bh_bounded_by_one() {
        for q in correct_bh(&[0.5, 0.6, 0.7, 0.8, 0.9]) {
            assert!(q <= 1.0);
        }
    }

    #[test]
    fn test_bh_qvalues_at_least_pvalues() {
        let p = [0.02, 0.4, 0.001, 0.3];
        let q = correct_bh(&p);
        for (pi, qi) in p.iter().zip(q.iter()) {
            assert!(qi >= pi);
        }
    }

    #[test]
    fn test_bh_empty_and_single() {
        assert!(correct_bh(&[]).is_empty());
        let q = correct_bh(&[0.05]);
        assert_relative_eq!(q[0], 0.05, epsilon = 1e-12);
    }
}
