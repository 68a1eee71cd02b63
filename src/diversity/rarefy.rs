//! Random rarefaction of a feature table.

use crate::data::FeatureTable;
use crate::error::{BetaDivError, Result};
use crate::stats::rng::SimpleRng;

/// Rarefy (randomly subsample) each sample to exactly `depth` reads,
/// without replacement.
///
/// Samples with fewer than `depth` total reads are dropped. Each read unit
/// in a sample has equal probability of selection (selection sampling over
/// the sample's reads), so feature counts follow the multivariate
/// hypergeometric distribution.
///
/// # Errors
///
/// Returns an error if `depth` is zero or no sample has sufficient reads.
pub fn rarefy(table: &FeatureTable, depth: u64, seed: u64) -> Result<FeatureTable> {
    if depth == 0 {
        return Err(BetaDivError::InvalidParameter(
            "Rarefaction depth must be greater than zero".to_string(),
        ));
    }

    let mut rng = SimpleRng::new(seed);
    let mut columns: Vec<Vec<u64>> = Vec::new();
    let mut kept_ids: Vec<String> = Vec::new();

    for (col, sample_id) in table.sample_ids().iter().enumerate() {
        let counts = table.sample_counts(col);
        let total: u64 = counts.iter().sum();
        if total < depth {
            continue;
        }

        columns.push(subsample(&counts, total, depth, &mut rng));
        kept_ids.push(sample_id.clone());
    }

    if columns.is_empty() {
        return Err(BetaDivError::EmptyData(format!(
            "No samples have at least {} reads",
            depth
        )));
    }

    FeatureTable::from_columns(&columns, table.feature_ids().to_vec(), kept_ids)
}

/// Draw `depth` reads without replacement from a count vector totaling
/// `total` (selection sampling; Knuth's Algorithm S).
fn subsample(counts: &[u64], total: u64, depth: u64, rng: &mut SimpleRng) -> Vec<u64> {
    let mut out = vec![0u64; counts.len()];
    let mut remaining = total;
    let mut needed = depth;

    'features: for (f, &count) in counts.iter().enumerate() {
        for _ in 0..count {
            if rng.next_f64() * (remaining as f64) < needed as f64 {
                out[f] += 1;
                needed -= 1;
                if needed == 0 {
                    break 'features;
                }
            }
            remaining -= 1;
        }
    }
    out
}
