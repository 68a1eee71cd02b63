//! BIOENV driver: metadata-to-distance-matrix association.

use crate::align::align_numeric_metadata;
use crate::data::{DistanceMatrix, Metadata};
use crate::error::Result;
use crate::stats::bioenv::BioenvResult;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Full result of a BIOENV analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BioenvReport {
    /// Best variable subset per subset size.
    pub result: BioenvResult,
    /// Distance matrix size before metadata alignment.
    pub initial_samples: usize,
    /// Distance matrix size after metadata alignment.
    pub filtered_samples: usize,
    /// Categorical columns excluded from the analysis, sorted.
    pub filtered_categorical_cols: Vec<String>,
    /// Zero-variance numeric columns excluded from the analysis, sorted.
    pub filtered_zero_variance_cols: Vec<String>,
}

impl BioenvReport {
    /// Serialize the report for the rendering layer.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Run a BIOENV analysis.
///
/// Aligns the metadata to the distance matrix (dropping categorical
/// columns, incomplete samples, and zero-variance columns), finds the best
/// variable subset per subset size, and writes `bioenv-results.tsv` into
/// `output_dir`.
pub fn bioenv(output_dir: &Path, dm: &DistanceMatrix, metadata: &Metadata) -> Result<BioenvReport> {
    let aligned = align_numeric_metadata(dm, metadata)?;

    let result = crate::stats::bioenv::bioenv(
        &aligned.distance_matrix,
        &aligned.names,
        &aligned.columns,
    )?;

    write_results(output_dir, &result)?;

    Ok(BioenvReport {
        result,
        initial_samples: aligned.initial_samples,
        filtered_samples: aligned.filtered_samples,
        filtered_categorical_cols: aligned.dropped_categorical,
        filtered_zero_variance_cols: aligned.dropped_zero_variance,
    })
}

fn write_results(output_dir: &Path, result: &BioenvResult) -> Result<()> {
    let file = File::create(output_dir.join("bioenv-results.tsv"))?;
    let mut writer = BufWriter::new(file);

    writeln!(writer, "size\tcorrelation\tvariables")?;
    for row in &result.rows {
        writeln!(
            writer,
            "{}\t{}\t{}",
            row.size,
            row.correlation,
            row.variables.join(", ")
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;
    use tempfile::{tempdir, NamedTempFile};

    fn gradient_dm(names: &[&str]) -> DistanceMatrix {
        let n = names.len();
        let mut rows = vec![vec![0.0; n]; n];
        for i in 0..n {
            for j in (i + 1)..n {
                let d = (j - i) as f64;
                rows[i][j] = d;
                rows[j][i] = d;
            }
        }
        let ids = names.iter().map(|s| s.to_string()).collect();
        DistanceMatrix::from_rows(rows, ids).unwrap()
    }

    #[test]
    fn test_bioenv_reports_dropped_columns() {
        // One categorical column and one zero-variance numeric column
        // among 3 -> each reported, remaining column used.
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "sample_id\tsite\tdepth\tflat").unwrap();
        writeln!(file, "a\tgut\t1\t3").unwrap();
        writeln!(file, "b\tgut\t2\t3").unwrap();
        writeln!(file, "c\tpalm\t3\t3").unwrap();
        writeln!(file, "d\tpalm\t4\t3").unwrap();
        file.flush().unwrap();
        let metadata = Metadata::from_tsv(file.path()).unwrap();

        let dm = gradient_dm(&["a", "b", "c", "d"]);
        let dir = tempdir().unwrap();
        let report = bioenv(dir.path(), &dm, &metadata).unwrap();

        assert_eq!(report.filtered_categorical_cols, vec!["site"]);
        assert_eq!(report.filtered_zero_variance_cols, vec!["flat"]);
        assert_eq!(report.result.rows.len(), 1);
        assert_eq!(report.result.rows[0].variables, vec!["depth"]);
        assert!(report.result.rows[0].correlation > 0.9);
        assert!(dir.path().join("bioenv-results.tsv").exists());
    }

    #[test]
    fn test_bioenv_no_numeric_columns_fails() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "sample_id\tsite").unwrap();
        writeln!(file, "a\tgut").unwrap();
        writeln!(file, "b\tpalm").unwrap();
        file.flush().unwrap();
        let metadata = Metadata::from_tsv(file.path()).unwrap();

        let dm = gradient_dm(&["a", "b"]);
        let dir = tempdir().unwrap();
        assert!(bioenv(dir.path(), &dm, &metadata).is_err());
    }

    #[test]
    fn test_bioenv_json_roundtrip() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "sample_id\tdepth\tph").unwrap();
        writeln!(file, "a\t1\t6.1").unwrap();
        writeln!(file, "b\t2\t6.4").unwrap();
        writeln!(file, "c\t3\t7.0").unwrap();
        file.flush().unwrap();
        let metadata = Metadata::from_tsv(file.path()).unwrap();

        let dm = gradient_dm(&["a", "b", "c"]);
        let dir = tempdir().unwrap();
        let report = bioenv(dir.path(), &dm, &metadata).unwrap();

        assert_eq!(report.result.rows.len(), 2);
        let json = report.to_json().unwrap();
        assert!(json.contains("correlation"));
    }
}
