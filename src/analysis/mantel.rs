//! Mantel driver: correlation between two distance matrices with explicit
//! mismatch diagnostics and scatter data extraction.

use crate::align::align_distance_matrices;
use crate::data::DistanceMatrix;
use crate::error::Result;
use crate::stats::correlation::CorrelationMethod;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Full result of a Mantel analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MantelReport {
    /// Correlation method used.
    pub method: CorrelationMethod,
    /// Observed correlation statistic.
    pub statistic: f64,
    /// Two-sided permutation p-value.
    pub p_value: f64,
    /// Number of samples used after id matching.
    pub sample_size: usize,
    /// Number of permutations performed.
    pub permutations: usize,
    /// Alternative hypothesis of the test.
    pub alternative: String,
    /// Display label for the first matrix.
    pub label1: String,
    /// Display label for the second matrix.
    pub label2: String,
    /// Ids found in only one of the matrices (empty without mismatches),
    /// sorted.
    pub mismatched_ids: Vec<String>,
    /// Paired (dm1, dm2) distances for every unordered shared-id pair.
    pub scatter: Vec<(f64, f64)>,
}

impl MantelReport {
    /// Serialize the report for the rendering layer.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Run a Mantel analysis between two distance matrices.
///
/// Computes the symmetric difference of the id sets; mismatches fail the
/// call unless `intersect_ids` is set, in which case both matrices are
/// filtered to their common ids (and the dropped ids are reported). Runs a
/// two-sided Mantel test and extracts the paired distances for scatter
/// visualization. Writes `mantel-results.tsv` and `mantel-scatter-data.tsv`
/// into `output_dir`.
#[allow(clippy::too_many_arguments)]
pub fn mantel(
    output_dir: &Path,
    dm1: &DistanceMatrix,
    dm2: &DistanceMatrix,
    method: CorrelationMethod,
    permutations: usize,
    intersect_ids: bool,
    label1: &str,
    label2: &str,
    seed: u64,
) -> Result<MantelReport> {
    let aligned = align_distance_matrices(dm1, dm2, intersect_ids)?;

    let result = crate::stats::mantel::mantel(
        &aligned.dm1,
        &aligned.dm2,
        method,
        permutations,
        seed,
    )?;

    // Both matrices share an id set here, so the pairing is total.
    let mut scatter = Vec::with_capacity(result.sample_size * (result.sample_size - 1) / 2);
    let ids = aligned.dm1.ids();
    for i in 0..ids.len() {
        for j in (i + 1)..ids.len() {
            let d1 = aligned.dm1.get(i, j);
            let d2 = aligned.dm2.distance(&ids[i], &ids[j])?;
            scatter.push((d1, d2));
        }
    }

    let report = MantelReport {
        method,
        statistic: result.statistic,
        p_value: result.p_value,
        sample_size: result.sample_size,
        permutations: result.permutations,
        alternative: "two-sided".to_string(),
        label1: label1.to_string(),
        label2: label2.to_string(),
        mismatched_ids: aligned.mismatched_ids,
        scatter,
    };

    write_results(output_dir, &report)?;
    write_scatter_data(output_dir, &report)?;

    Ok(report)
}

fn write_results(output_dir: &Path, report: &MantelReport) -> Result<()> {
    let file = File::create(output_dir.join("mantel-results.tsv"))?;
    let mut writer = BufWriter::new(file);

    writeln!(writer, "Method\t{}", title_case(report.method.name()))?;
    writeln!(writer, "Sample size\t{}", report.sample_size)?;
    writeln!(writer, "Permutations\t{}", report.permutations)?;
    writeln!(writer, "Alternative hypothesis\t{}", report.alternative)?;
    writeln!(
        writer,
        "{}\t{}",
        report.method.statistic_name(),
        report.statistic
    )?;
    writeln!(writer, "p-value\t{}", report.p_value)?;
    Ok(())
}

fn write_scatter_data(output_dir: &Path, report: &MantelReport) -> Result<()> {
    let file = File::create(output_dir.join("mantel-scatter-data.tsv"))?;
    let mut writer = BufWriter::new(file);

    writeln!(
        writer,
        "Pairwise Distance ({})\tPairwise Distance ({})",
        report.label1, report.label2
    )?;
    for (d1, d2) in &report.scatter {
        writeln!(writer, "{}\t{}", d1, d2)?;
    }
    Ok(())
}

fn title_case(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use tempfile::tempdir;

    fn gradient_dm(names: &[&str], scale: f64) -> DistanceMatrix {
        let n = names.len();
        let mut rows = vec![vec![0.0; n]; n];
        for i in 0..n {
            for j in (i + 1)..n {
                let d = (j - i) as f64 * scale;
                rows[i][j] = d;
                rows[j][i] = d;
            }
        }
        let ids = names.iter().map(|s| s.to_string()).collect();
        DistanceMatrix::from_rows(rows, ids).unwrap()
    }

    #[test]
    fn test_mantel_matching_ids() {
        let dm1 = gradient_dm(&["a", "b", "c", "d"], 1.0);
        let dm2 = gradient_dm(&["a", "b", "c", "d"], 2.0);
        let dir = tempdir().unwrap();

        let report = mantel(
            dir.path(),
            &dm1,
            &dm2,
            CorrelationMethod::Pearson,
            99,
            false,
            "unweighted",
            "weighted",
            42,
        )
        .unwrap();

        assert_relative_eq!(report.statistic, 1.0, epsilon = 1e-10);
        assert_eq!(report.sample_size, 4);
        assert!(report.mismatched_ids.is_empty());
        // C(4,2) scatter points, second coordinate doubled.
        assert_eq!(report.scatter.len(), 6);
        for (d1, d2) in &report.scatter {
            assert_relative_eq!(*d2, d1 * 2.0, epsilon = 1e-12);
        }
        assert!(dir.path().join("mantel-results.tsv").exists());
        assert!(dir.path().join("mantel-scatter-data.tsv").exists());
    }

    #[test]
    fn test_mantel_mismatch_fails_without_intersect() {
        let dm1 = gradient_dm(&["a", "b", "c"], 1.0);
        let dm2 = gradient_dm(&["a", "b", "d"], 1.0);
        let dir = tempdir().unwrap();

        let err = mantel(
            dir.path(),
            &dm1,
            &dm2,
            CorrelationMethod::Spearman,
            99,
            false,
            "dm1",
            "dm2",
            42,
        )
        .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("c") && msg.contains("d"), "{}", msg);
    }

    #[test]
    fn test_mantel_intersect_reports_mismatches() {
        let dm1 = gradient_dm(&["a", "b", "c", "x"], 1.0);
        let dm2 = gradient_dm(&["a", "b", "c", "y"], 1.5);
        let dir = tempdir().unwrap();

        let report = mantel(
            dir.path(),
            &dm1,
            &dm2,
            CorrelationMethod::Spearman,
            99,
            true,
            "dm1",
            "dm2",
            42,
        )
        .unwrap();

        assert_eq!(report.mismatched_ids, vec!["x", "y"]);
        assert_eq!(report.sample_size, 3);
        assert_eq!(report.scatter.len(), 3);
    }

    #[test]
    fn test_alternative_is_two_sided() {
        let dm = gradient_dm(&["a", "b", "c", "d"], 1.0);
        let dir = tempdir().unwrap();
        let report = mantel(
            dir.path(),
            &dm,
            &dm,
            CorrelationMethod::Spearman,
            9,
            false,
            "dm1",
            "dm2",
            42,
        )
        .unwrap();
        assert_eq!(report.alternative, "two-sided");
    }
}
