//! Beta-rarefaction driver: robustness of a beta-diversity metric under
//! repeated random subsampling.

use crate::data::{FeatureTable, PhyloTree};
use crate::diversity::{beta_diversity, rarefy, BetaMetric};
use crate::error::{BetaDivError, Result};
use crate::stats::correlation::{CorrelationMatrix, CorrelationMethod};
use crate::stats::mantel::pairwise_mantel;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Full result of a beta-rarefaction analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BetaRarefactionReport {
    /// Metric used for each iteration's distance matrix.
    pub metric: String,
    /// Correlation method used between iterations.
    pub correlation_method: CorrelationMethod,
    /// Number of rarefaction iterations.
    pub iterations: usize,
    /// Per-sample subsampling depth.
    pub sampling_depth: u64,
    /// Color scheme identifier, passed through to the rendering layer.
    pub color_scheme: String,
    /// Iteration x iteration correlation-statistic matrix.
    pub correlations: CorrelationMatrix,
}

impl BetaRarefactionReport {
    /// Serialize the report for the rendering layer.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Run a beta-rarefaction analysis.
///
/// Rarefies the feature table `iterations` times to `sampling_depth`,
/// computes one beta-diversity distance matrix per iteration, and measures
/// the pairwise Mantel correlation between all iteration pairs (zero
/// permutations, strict id matching). Writes
/// `rarefaction-iteration-correlation.tsv` into `output_dir`.
///
/// Iterations are independent and run in parallel with derived seeds.
#[allow(clippy::too_many_arguments)]
pub fn beta_rarefaction(
    output_dir: &Path,
    table: &FeatureTable,
    metric: BetaMetric,
    sampling_depth: u64,
    iterations: usize,
    phylogeny: Option<&PhyloTree>,
    correlation_method: CorrelationMethod,
    color_scheme: &str,
    seed: u64,
) -> Result<BetaRarefactionReport> {
    if metric.is_phylogenetic() && phylogeny.is_none() {
        return Err(BetaDivError::MissingPhylogeny(metric.name().to_string()));
    }
    if iterations < 2 {
        return Err(BetaDivError::InvalidParameter(
            "Beta rarefaction requires at least 2 iterations".to_string(),
        ));
    }

    let matrices: Vec<_> = (0..iterations)
        .into_par_iter()
        .map(|i| {
            let rarefied = rarefy(table, sampling_depth, seed.wrapping_add(i as u64))?;
            let dm = beta_diversity(metric, &rarefied, phylogeny)?;
            Ok((format!("{}", i + 1), dm))
        })
        .collect::<Result<_>>()?;

    let rows = pairwise_mantel(&matrices, correlation_method, 0, seed)?;

    let labels: Vec<String> = matrices.iter().map(|(label, _)| label.clone()).collect();
    let mut correlations = CorrelationMatrix::new(labels.clone());
    for row in &rows {
        // Labels are "1".."n", assigned above; both lookups always resolve.
        let i = labels.iter().position(|l| *l == row.label1);
        let j = labels.iter().position(|l| *l == row.label2);
        if let (Some(i), Some(j)) = (i, j) {
            correlations.set(i, j, row.statistic);
        }
    }

    correlations.to_tsv(output_dir.join("rarefaction-iteration-correlation.tsv"))?;

    Ok(BetaRarefactionReport {
        metric: metric.name().to_string(),
        correlation_method,
        iterations,
        sampling_depth,
        color_scheme: color_scheme.to_string(),
        correlations,
    })
}
