//! Permutation-based group significance tests.
//!
//! PERMANOVA partitions the total sum of squared distances into among- and
//! within-group components and tests the pseudo-F ratio; ANOSIM compares
//! mean ranks of between-group distances to within-group distances. Both
//! estimate a p-value by shuffling group labels:
//! `p = (n_extreme + 1) / (permutations + 1)`.

use crate::data::DistanceMatrix;
use crate::error::{BetaDivError, Result};
use crate::stats::rank::rank_average;
use crate::stats::rng::SimpleRng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Result of a permutation-based group significance test.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignificanceResult {
    /// Method name ("PERMANOVA" or "ANOSIM").
    pub method: String,
    /// Test statistic name ("pseudo-F" or "R").
    pub statistic_name: String,
    /// Number of samples tested.
    pub sample_size: usize,
    /// Number of groups.
    pub n_groups: usize,
    /// Observed test statistic.
    pub statistic: f64,
    /// Permutation p-value; NaN when `permutations` was zero.
    pub p_value: f64,
    /// Number of permutations performed.
    pub permutations: usize,
}

fn validate_groups(dm: &DistanceMatrix, groups: &[usize]) -> Result<usize> {
    let n = dm.n_samples();
    if groups.len() != n {
        return Err(BetaDivError::DimensionMismatch {
            expected: n,
            actual: groups.len(),
        });
    }
    if n < 2 {
        return Err(BetaDivError::InvalidParameter(
            "Group significance requires at least 2 samples".to_string(),
        ));
    }
    let mut unique: Vec<usize> = groups.to_vec();
    unique.sort_unstable();
    unique.dedup();
    if unique.len() < 2 {
        return Err(BetaDivError::InvalidParameter(
            "All values in the grouping are the same; at least 2 groups are required".to_string(),
        ));
    }
    Ok(unique.len())
}

/// Count permutations whose statistic is >= the observed one.
///
/// Each permutation derives its own seed so serial and parallel execution
/// agree.
fn count_extreme<F>(groups: &[usize], permutations: usize, seed: u64, observed: f64, stat: F) -> usize
where
    F: Fn(&[usize]) -> f64 + Sync,
{
    (0..permutations)
        .into_par_iter()
        .filter(|&i| {
            let mut rng = SimpleRng::new(seed.wrapping_add(i as u64));
            let mut perm = groups.to_vec();
            rng.shuffle(&mut perm);
            stat(&perm) >= observed
        })
        .count()
}

fn permutation_p_value(n_extreme: usize, permutations: usize) -> f64 {
    if permutations == 0 {
        f64::NAN
    } else {
        (n_extreme as f64 + 1.0) / (permutations as f64 + 1.0)
    }
}

/// PERMANOVA: permutational multivariate analysis of variance.
///
/// # Arguments
///
/// * `dm` — distance matrix over the samples to test
/// * `groups` — group index per sample, in matrix order
/// * `permutations` — number of label permutations (0 skips the p-value)
/// * `seed` — random seed
///
/// # Errors
///
/// Returns an error if group labels don't match the matrix or fewer than
/// 2 distinct groups are present.
pub fn permanova(
    dm: &DistanceMatrix,
    groups: &[usize],
    permutations: usize,
    seed: u64,
) -> Result<SignificanceResult> {
    let k = validate_groups(dm, groups)?;
    let n = dm.n_samples();

    // SS_total is invariant under relabeling, so compute it once.
    let ss_total = sum_squares_total(dm);
    let stat = |labels: &[usize]| pseudo_f(dm, labels, ss_total, n, k);

    let observed = stat(groups);
    let n_extreme = count_extreme(groups, permutations, seed, observed, stat);

    Ok(SignificanceResult {
        method: "PERMANOVA".to_string(),
        statistic_name: "pseudo-F".to_string(),
        sample_size: n,
        n_groups: k,
        statistic: observed,
        p_value: permutation_p_value(n_extreme, permutations),
        permutations,
    })
}

fn sum_squares_total(dm: &DistanceMatrix) -> f64 {
    let n = dm.n_samples();
    let mut ss = 0.0;
    for i in 0..n {
        for j in (i + 1)..n {
            let d = dm.get(i, j);
            ss += d * d;
        }
    }
    ss / n as f64
}

fn sum_squares_within(dm: &DistanceMatrix, groups: &[usize]) -> f64 {
    let n = dm.n_samples();
    let n_groups = groups.iter().copied().max().map(|m| m + 1).unwrap_or(0);
    let mut members: Vec<Vec<usize>> = vec![Vec::new(); n_groups];
    for (i, &g) in groups.iter().enumerate().take(n) {
        members[g].push(i);
    }

    let mut ss_within = 0.0;
    for group in &members {
        let ng = group.len();
        if ng < 2 {
            continue;
        }
        let mut ss_g = 0.0;
        for ii in 0..ng {
            for jj in (ii + 1)..ng {
                let d = dm.get(group[ii], group[jj]);
                ss_g += d * d;
            }
        }
        ss_within += ss_g / ng as f64;
    }
    ss_within
}

fn pseudo_f(dm: &DistanceMatrix, groups: &[usize], ss_total: f64, n: usize, k: usize) -> f64 {
    let ss_within = sum_squares_within(dm, groups);
    let ss_among = ss_total - ss_within;

    let df_among = (k - 1) as f64;
    let df_within = (n - k) as f64;
    if df_within <= 0.0 || ss_within <= 0.0 {
        return 0.0;
    }
    (ss_among / df_among) / (ss_within / df_within)
}

/// ANOSIM: analysis of similarities.
///
/// Ranks all pairwise distances once, then compares mean between-group and
/// within-group ranks: `R = (r_between - r_within) / (n(n-1)/4)`.
///
/// # Errors
///
/// Returns an error if group labels don't match the matrix or fewer than
/// 2 distinct groups are present.
pub fn anosim(
    dm: &DistanceMatrix,
    groups: &[usize],
    permutations: usize,
    seed: u64,
) -> Result<SignificanceResult> {
    let k = validate_groups(dm, groups)?;
    let n = dm.n_samples();

    let ranks = rank_average(&dm.upper_triangle());
    let stat = |labels: &[usize]| anosim_r(&ranks, labels, n);

    let observed = stat(groups);
    let n_extreme = count_extreme(groups, permutations, seed, observed, stat);

    Ok(SignificanceResult {
        method: "ANOSIM".to_string(),
        statistic_name: "R".to_string(),
        sample_size: n,
        n_groups: k,
        statistic: observed,
        p_value: permutation_p_value(n_extreme, permutations),
        permutations,
    })
}

/// ANOSIM R over ranked upper-triangle distances (row-major i < j order).
fn anosim_r(ranks: &[f64], groups: &[usize], n: usize) -> f64 {
    let mut r_between_sum = 0.0;
    let mut r_within_sum = 0.0;
    let mut n_between = 0usize;
    let mut n_within = 0usize;

    let mut idx = 0;
    for i in 0..n {
        for j in (i + 1)..n {
            if groups[i] == groups[j] {
                r_within_sum += ranks[idx];
                n_within += 1;
            } else {
                r_between_sum += ranks[idx];
                n_between += 1;
            }
            idx += 1;
        }
    }

    let r_between = if n_between > 0 {
        r_between_sum / n_between as f64
    } else {
        0.0
    };
    let r_within = if n_within > 0 {
        r_within_sum / n_within as f64
    } else {
        0.0
    };

    let denom = (n * (n - 1)) as f64 / 4.0;
    if denom == 0.0 {
        return 0.0;
    }
    (r_between - r_within) / denom
}
