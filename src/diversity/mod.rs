//! Beta-diversity metrics and rarefaction.

pub mod nonphylo;
pub mod phylo;
pub mod rarefy;

pub use rarefy::rarefy;

use crate::data::{DistanceMatrix, FeatureTable, PhyloTree};
use crate::error::{BetaDivError, Result};
use serde::{Deserialize, Serialize};

/// A beta-diversity metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BetaMetric {
    BrayCurtis,
    Jaccard,
    UnweightedUnifrac,
    WeightedUnifrac,
}

impl BetaMetric {
    const CHOICES: [&'static str; 4] = [
        "braycurtis",
        "jaccard",
        "unweighted_unifrac",
        "weighted_unifrac",
    ];

    /// Parse a metric name.
    ///
    /// # Errors
    ///
    /// Returns an [`BetaDivError::InvalidOption`] listing the valid names.
    pub fn from_name(name: &str) -> Result<Self> {
        match name {
            "braycurtis" => Ok(Self::BrayCurtis),
            "jaccard" => Ok(Self::Jaccard),
            "unweighted_unifrac" => Ok(Self::UnweightedUnifrac),
            "weighted_unifrac" => Ok(Self::WeightedUnifrac),
            _ => Err(BetaDivError::invalid_option("metric", name, &Self::CHOICES)),
        }
    }

    /// Lowercase metric name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::BrayCurtis => "braycurtis",
            Self::Jaccard => "jaccard",
            Self::UnweightedUnifrac => "unweighted_unifrac",
            Self::WeightedUnifrac => "weighted_unifrac",
        }
    }

    /// Whether this metric requires a phylogenetic tree.
    pub fn is_phylogenetic(&self) -> bool {
        matches!(self, Self::UnweightedUnifrac | Self::WeightedUnifrac)
    }
}

/// Compute a beta-diversity distance matrix over a feature table.
///
/// The phylogenetic/non-phylogenetic computation path is resolved once
/// from the metric before any per-pair work.
///
/// # Errors
///
/// Returns [`BetaDivError::MissingPhylogeny`] when a phylogenetic metric is
/// requested without a tree, and propagates metric errors (e.g. all-zero
/// samples).
pub fn beta_diversity(
    metric: BetaMetric,
    table: &FeatureTable,
    tree: Option<&PhyloTree>,
) -> Result<DistanceMatrix> {
    let ids = table.sample_ids().to_vec();
    let n = table.n_samples();

    let rows = match metric {
        BetaMetric::BrayCurtis | BetaMetric::Jaccard => {
            let samples: Vec<Vec<u64>> = (0..n).map(|col| table.sample_counts(col)).collect();
            match metric {
                BetaMetric::BrayCurtis => nonphylo::pairwise_matrix(&samples, nonphylo::bray_curtis)?,
                _ => nonphylo::pairwise_matrix(&samples, nonphylo::jaccard)?,
            }
        }
        BetaMetric::UnweightedUnifrac | BetaMetric::WeightedUnifrac => {
            let tree = tree.ok_or_else(|| {
                BetaDivError::MissingPhylogeny(metric.name().to_string())
            })?;
            let samples: Vec<_> = (0..n).map(|col| table.sample_map(col)).collect();
            let pair = |a: usize, b: usize| match metric {
                BetaMetric::UnweightedUnifrac => {
                    phylo::unweighted_unifrac(tree, &samples[a], &samples[b])
                }
                _ => phylo::weighted_unifrac(tree, &samples[a], &samples[b]),
            };
            let mut rows = vec![vec![0.0; n]; n];
            for i in 0..n {
                for j in (i + 1)..n {
                    let d = pair(i, j)?;
                    rows[i][j] = d;
                    rows[j][i] = d;
                }
            }
            rows
        }
    };

    DistanceMatrix::from_rows(rows, ids)
}
