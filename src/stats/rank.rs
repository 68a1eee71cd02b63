//! Ranking with average tie handling.

/// Assign 1-based ranks to `data`, giving tied values the average of their
/// would-be ranks (the convention Spearman correlation and ANOSIM expect).
///
/// Empty input produces empty output.
pub fn rank_average(data: &[f64]) -> Vec<f64> {
    let n = data.len();
    if n == 0 {
        return Vec::new();
    }

    let mut indexed: Vec<(f64, usize)> = data.iter().copied().zip(0..n).collect();
    indexed.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut ranks = vec![0.0; n];
    let mut i = 0;
    while i < n {
        // Find the end of the tie group.
        let mut j = i + 1;
        while j < n && indexed[j].0.total_cmp(&indexed[i].0).is_eq() {
            j += 1;
        }
        // Ranks in the group are (i+1)..=j; all members get the mean.
        let rank_val = (i + 1 + j) as f64 / 2.0;
        for k in i..j {
            ranks[indexed[k].1] = rank_val;
        }
        i = j;
    }
    ranks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_ties() {
        assert_eq!(rank_average(&[3.0, 1.0, 2.0]), vec![3.0, 1.0, 2.0]);
    }

    #[test]
    fn test_ties_get_average() {
        // 1.0 occupies ranks 1 and 2 -> both get 1.5
        assert_eq!(rank_average(&[1.0, 1.0, 2.0]), vec![1.5, 1.5, 3.0]);
    }

    #[test]
    fn test_all_tied() {
        assert_eq!(rank_average(&[5.0, 5.0, 5.0]), vec![2.0, 2.0, 2.0]);
    }

    #[test]
    fn test_empty() {
        assert!(rank_average(&[]).is_empty());
    }
}
