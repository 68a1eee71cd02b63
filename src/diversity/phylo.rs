//! Phylogenetic beta-diversity metrics (UniFrac).
//!
//! Both metrics propagate per-sample information up the tree in postorder
//! and compare branch-length contributions between the two samples.

use crate::data::PhyloTree;
use crate::error::{BetaDivError, Result};
use std::collections::HashMap;

/// Unweighted UniFrac distance between two samples.
///
/// `U = unique_branch_length / total_branch_length`, where unique branches
/// lead only to taxa present in exactly one of the samples. Taxa absent
/// from the tree contribute nothing.
///
/// # Errors
///
/// Returns an error if either sample has no observed features.
pub fn unweighted_unifrac(
    tree: &PhyloTree,
    sample_a: &HashMap<String, f64>,
    sample_b: &HashMap<String, f64>,
) -> Result<f64> {
    validate_samples(sample_a, sample_b)?;

    let n = tree.node_count();
    let mut in_a = vec![false; n];
    let mut in_b = vec![false; n];

    for id in tree.postorder() {
        let node = tree.node(id);
        if node.is_leaf() {
            if let Some(name) = &node.name {
                in_a[id] = sample_a.get(name).is_some_and(|&v| v > 0.0);
                in_b[id] = sample_b.get(name).is_some_and(|&v| v > 0.0);
            }
        } else {
            in_a[id] = node.children.iter().any(|&c| in_a[c]);
            in_b[id] = node.children.iter().any(|&c| in_b[c]);
        }
    }

    let mut unique_bl = 0.0;
    let mut total_bl = 0.0;
    for id in 0..n {
        if id == tree.root() {
            continue;
        }
        let bl = tree.node(id).branch_length.unwrap_or(0.0);
        if in_a[id] || in_b[id] {
            total_bl += bl;
            if in_a[id] != in_b[id] {
                unique_bl += bl;
            }
        }
    }

    if total_bl == 0.0 {
        return Ok(0.0);
    }
    Ok(unique_bl / total_bl)
}

/// Weighted (normalized) UniFrac distance between two samples.
///
/// `W = Σ bl * |pA - pB| / Σ bl * (pA + pB)` with proportions propagated
/// up from the leaves.
///
/// # Errors
///
/// Returns an error if either sample has no observed features.
pub fn weighted_unifrac(
    tree: &PhyloTree,
    sample_a: &HashMap<String, f64>,
    sample_b: &HashMap<String, f64>,
) -> Result<f64> {
    validate_samples(sample_a, sample_b)?;

    let n = tree.node_count();
    let total_a: f64 = sample_a.values().sum();
    let total_b: f64 = sample_b.values().sum();
    if total_a == 0.0 && total_b == 0.0 {
        return Ok(0.0);
    }

    let mut prop_a = vec![0.0; n];
    let mut prop_b = vec![0.0; n];

    for id in tree.postorder() {
        let node = tree.node(id);
        if node.is_leaf() {
            if let Some(name) = &node.name {
                if total_a > 0.0 {
                    prop_a[id] = sample_a.get(name).copied().unwrap_or(0.0) / total_a;
                }
                if total_b > 0.0 {
                    prop_b[id] = sample_b.get(name).copied().unwrap_or(0.0) / total_b;
                }
            }
        } else {
            prop_a[id] = node.children.iter().map(|&c| prop_a[c]).sum();
            prop_b[id] = node.children.iter().map(|&c| prop_b[c]).sum();
        }
    }

    let mut numerator = 0.0;
    let mut denominator = 0.0;
    for id in 0..n {
        if id == tree.root() {
            continue;
        }
        let bl = tree.node(id).branch_length.unwrap_or(0.0);
        numerator += bl * (prop_a[id] - prop_b[id]).abs();
        denominator += bl * (prop_a[id] + prop_b[id]);
    }

    if denominator == 0.0 {
        return Ok(0.0);
    }
    Ok(numerator / denominator)
}

fn validate_samples(a: &HashMap<String, f64>, b: &HashMap<String, f64>) -> Result<()> {
    if a.is_empty() || b.is_empty() {
        return Err(BetaDivError::EmptyData(
            "UniFrac requires non-empty samples".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sample(pairs: &[(&str, f64)]) -> HashMap<String, f64> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    fn test_tree() -> PhyloTree {
        PhyloTree::from_newick("((A:1,B:1):1,(C:1,D:1):1);").unwrap()
    }

    #[test]
    fn test_unweighted_identical_samples() {
        let tree = test_tree();
        let s = sample(&[("A", 3.0), ("C", 2.0)]);
        assert_relative_eq!(unweighted_unifrac(&tree, &s, &s).unwrap(), 0.0);
    }

    #[test]
    fn test_unweighted_disjoint_clades() {
        let tree = test_tree();
        let a = sample(&[("A", 1.0), ("B", 1.0)]);
        let b = sample(&[("C", 1.0), ("D", 1.0)]);
        // No shared branches at all
        assert_relative_eq!(unweighted_unifrac(&tree, &a, &b).unwrap(), 1.0);
    }

    #[test]
    fn test_unweighted_partial_overlap() {
        let tree = test_tree();
        let a = sample(&[("A", 1.0), ("C", 1.0)]);
        let b = sample(&[("B", 1.0), ("C", 1.0)]);
        // Observed branches: A(1), B(1), C(1), both internals (1 each) = 5
        // Unique: A and B leaves = 2
        assert_relative_eq!(unweighted_unifrac(&tree, &a, &b).unwrap(), 0.4);
    }

    #[test]
    fn test_weighted_identical_samples() {
        let tree = test_tree();
        let s = sample(&[("A", 5.0), ("D", 5.0)]);
        assert_relative_eq!(weighted_unifrac(&tree, &s, &s).unwrap(), 0.0);
    }

    #[test]
    fn test_weighted_disjoint_is_one() {
        let tree = test_tree();
        let a = sample(&[("A", 2.0)]);
        let b = sample(&[("D", 7.0)]);
        assert_relative_eq!(weighted_unifrac(&tree, &a, &b).unwrap(), 1.0);
    }

    #[test]
    fn test_weighted_abundance_sensitivity() {
        let tree = test_tree();
        let a = sample(&[("A", 9.0), ("C", 1.0)]);
        let b = sample(&[("A", 1.0), ("C", 9.0)]);
        let c = sample(&[("A", 8.0), ("C", 2.0)]);
        let far = weighted_unifrac(&tree, &a, &b).unwrap();
        let near = weighted_unifrac(&tree, &a, &c).unwrap();
        assert!(far > near, "far={} near={}", far, near);
        // Unweighted sees identical presence patterns
        assert_relative_eq!(unweighted_unifrac(&tree, &a, &b).unwrap(), 0.0);
    }

    #[test]
    fn test_empty_sample_errors() {
        let tree = test_tree();
        let a = sample(&[("A", 1.0)]);
        assert!(unweighted_unifrac(&tree, &a, &HashMap::new()).is_err());
        assert!(weighted_unifrac(&tree, &HashMap::new(), &a).is_err());
    }
}
