//! Integration tests for the beta-diversity analysis workflows.

use betadiv::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

/// Create a synthetic feature table with three distinct communities.
///
/// - Samples 0-3: dominated by features 0-1
/// - Samples 4-7: dominated by features 2-3
/// - Samples 8-11: dominated by features 4-5
fn create_synthetic_table() -> FeatureTable {
    let n_samples = 12;
    let n_features = 6;

    let mut rng_seed = 42u64;
    let mut simple_rand = move || -> u64 {
        rng_seed = rng_seed.wrapping_mul(1103515245).wrapping_add(12345);
        (rng_seed >> 16) & 0x3F
    };

    let mut columns: Vec<Vec<u64>> = Vec::with_capacity(n_samples);
    for sample in 0..n_samples {
        let community = sample / 4;
        let mut counts = vec![0u64; n_features];
        for (feat, count) in counts.iter_mut().enumerate() {
            let noise = simple_rand();
            *count = if feat / 2 == community {
                // Dominant features: always present, high abundance.
                250 + noise
            } else if noise % 4 == 0 {
                // Sporadic low-abundance noise.
                1 + noise % 8
            } else {
                0
            };
        }
        columns.push(counts);
    }

    let feature_ids = (0..n_features).map(|i| format!("feat_{}", i)).collect();
    let sample_ids = (0..n_samples).map(|i| format!("s{}", i)).collect();
    FeatureTable::from_columns(&columns, feature_ids, sample_ids).unwrap()
}

fn community_column() -> CategoryColumn {
    let sites = ["gut", "tongue", "palm"];
    let pairs: Vec<(String, String)> = (0..12)
        .map(|i| (format!("s{}", i), sites[i / 4].to_string()))
        .collect();
    let pair_refs: Vec<(&str, &str)> = pairs
        .iter()
        .map(|(a, b)| (a.as_str(), b.as_str()))
        .collect();
    CategoryColumn::from_pairs("body-site", &pair_refs)
}

#[test]
fn group_significance_end_to_end() {
    let table = create_synthetic_table();
    let dm = beta_diversity(BetaMetric::BrayCurtis, &table, None).unwrap();
    let column = community_column();
    let dir = tempdir().unwrap();

    let report = beta_group_significance(
        dir.path(),
        &dm,
        &column,
        TestMethod::Permanova,
        true,
        199,
        42,
    )
    .unwrap();

    // Three well-separated communities must come out significant.
    assert!(report.result.p_value < 0.05, "p = {}", report.result.p_value);
    assert_eq!(report.result.n_groups, 3);
    assert_eq!(report.result.sample_size, 12);

    // Groups are displayed in sorted order.
    assert_eq!(report.group_labels, vec!["gut", "palm", "tongue"]);

    // Distance count identity: for a group of size n in a grouping with
    // other groups of sizes m1, m2, counts are C(n,2) and n*m per pair.
    for boxplot in &report.boxplots {
        assert_eq!(boxplot.distances[0].len(), 4 * 3 / 2);
        assert_eq!(boxplot.distances[1].len(), 4 * 4);
        assert_eq!(boxplot.distances[2].len(), 4 * 4);
        let total: usize = boxplot.distances.iter().map(Vec::len).sum();
        assert_eq!(total, 6 + 4 * (4 + 4));
    }

    let rows = report.pairwise.as_ref().unwrap();
    assert_eq!(rows.len(), 3);

    // Output rows are sorted by (group1, group2) and q-values match a BH
    // recomputation over the same p-values.
    let keys: Vec<(String, String)> = rows
        .iter()
        .map(|r| (r.group1.clone(), r.group2.clone()))
        .collect();
    let mut sorted_keys = keys.clone();
    sorted_keys.sort();
    assert_eq!(keys, sorted_keys);

    let p_values: Vec<f64> = rows.iter().map(|r| r.p_value).collect();
    let expected_q = correct_bh(&p_values);
    for (row, q) in rows.iter().zip(expected_q) {
        assert!((row.q_value - q).abs() < 1e-12);
    }

    assert!(dir.path().join("permanova-group-significance.tsv").exists());
    let csv = fs::read_to_string(dir.path().join("permanova-pairwise.csv")).unwrap();
    let mut lines = csv.lines();
    assert_eq!(
        lines.next().unwrap(),
        "Group 1,Group 2,Sample size,Permutations,pseudo-F,p-value,q-value"
    );
    assert_eq!(lines.count(), 3);
}

#[test]
fn group_significance_drops_missing_values() {
    // Column values [1,2,3,'',5] over ids [s0..s4]: s3 must be dropped.
    let dm = {
        let n = 5;
        let mut rows = vec![vec![0.0; n]; n];
        for i in 0..n {
            for j in (i + 1)..n {
                let d = if (i < 2) == (j < 2) { 0.5 } else { 3.0 };
                rows[i][j] = d;
                rows[j][i] = d;
            }
        }
        let ids = (0..n).map(|i| format!("s{}", i)).collect();
        DistanceMatrix::from_rows(rows, ids).unwrap()
    };
    let column = CategoryColumn::from_pairs(
        "depth",
        &[("s0", "1"), ("s1", "1"), ("s2", "3"), ("s3", ""), ("s4", "3")],
    );
    let dir = tempdir().unwrap();

    let report = beta_group_significance(
        dir.path(),
        &dm,
        &column,
        TestMethod::Anosim,
        false,
        99,
        42,
    )
    .unwrap();

    assert_eq!(report.initial_samples, 5);
    assert_eq!(report.filtered_samples, 4);
    assert_eq!(report.result.sample_size, 4);
}

#[test]
fn bioenv_end_to_end() {
    let table = create_synthetic_table();
    let dm = beta_diversity(BetaMetric::BrayCurtis, &table, None).unwrap();
    let dir = tempdir().unwrap();

    // "gradient" tracks community membership, "site" is categorical and
    // must be dropped, "constant" has zero variance.
    let metadata = {
        use std::io::Write;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "sample_id\tsite\tgradient\tconstant").unwrap();
        for i in 0..12 {
            writeln!(file, "s{}\tsite-{}\t{}\t7", i, i / 4, (i / 4) * 10 + i % 4).unwrap();
        }
        file.flush().unwrap();
        Metadata::from_tsv(file.path()).unwrap()
    };

    let report = bioenv(dir.path(), &dm, &metadata).unwrap();

    assert_eq!(report.filtered_categorical_cols, vec!["site"]);
    assert_eq!(report.filtered_zero_variance_cols, vec!["constant"]);
    assert_eq!(report.initial_samples, 12);
    assert_eq!(report.filtered_samples, 12);

    assert_eq!(report.result.rows.len(), 1);
    let best = report.result.best().unwrap();
    assert_eq!(best.variables, vec!["gradient"]);
    assert!(best.correlation > 0.5, "rho = {}", best.correlation);

    let tsv = fs::read_to_string(dir.path().join("bioenv-results.tsv")).unwrap();
    assert!(tsv.starts_with("size\tcorrelation\tvariables"));
}

#[test]
fn beta_rarefaction_end_to_end() {
    let table = create_synthetic_table();
    let dir = tempdir().unwrap();

    let report = beta_rarefaction(
        dir.path(),
        &table,
        BetaMetric::BrayCurtis,
        400,
        5,
        None,
        CorrelationMethod::Spearman,
        "BrBG",
        42,
    )
    .unwrap();

    assert_eq!(report.correlations.size(), 5);
    // Community structure dominates sampling noise, so iterations agree.
    for i in 0..5 {
        for j in (i + 1)..5 {
            let corr = report.correlations.get(i, j);
            assert!(corr > 0.5, "iterations {} and {}: {}", i, j, corr);
        }
    }

    let tsv =
        fs::read_to_string(dir.path().join("rarefaction-iteration-correlation.tsv")).unwrap();
    let mut lines = tsv.lines();
    // Square matrix: label header plus one row per iteration.
    assert_eq!(lines.next().unwrap(), "\t1\t2\t3\t4\t5");
    assert_eq!(lines.count(), 5);
}

#[test]
fn mantel_end_to_end() {
    let table = create_synthetic_table();
    let dm1 = beta_diversity(BetaMetric::BrayCurtis, &table, None).unwrap();
    let dm2 = beta_diversity(BetaMetric::Jaccard, &table, None).unwrap();
    let dir = tempdir().unwrap();

    let report = mantel(
        dir.path(),
        &dm1,
        &dm2,
        CorrelationMethod::Spearman,
        199,
        false,
        "Bray-Curtis",
        "Jaccard",
        42,
    )
    .unwrap();

    // Both metrics see the same three-community structure.
    assert!(report.statistic > 0.3, "rho = {}", report.statistic);
    assert!(report.p_value < 0.05, "p = {}", report.p_value);
    assert_eq!(report.sample_size, 12);
    assert_eq!(report.scatter.len(), 12 * 11 / 2);
    assert!(report.mismatched_ids.is_empty());

    let results = fs::read_to_string(dir.path().join("mantel-results.tsv")).unwrap();
    assert!(results.contains("Alternative hypothesis\ttwo-sided"));
    assert!(results.contains("Spearman rho"));

    let scatter = fs::read_to_string(dir.path().join("mantel-scatter-data.tsv")).unwrap();
    assert!(scatter.starts_with("Pairwise Distance (Bray-Curtis)\tPairwise Distance (Jaccard)"));
}

#[test]
fn mantel_intersect_ids_workflow() {
    // Shared core of 10 samples, one extra sample on each side.
    let table = create_synthetic_table();
    let dm_full = beta_diversity(BetaMetric::BrayCurtis, &table, None).unwrap();

    let keep1: Vec<String> = (0..11).map(|i| format!("s{}", i)).collect();
    let keep2: Vec<String> = (1..12).map(|i| format!("s{}", i)).collect();
    let dm1 = dm_full.filter(&keep1, true).unwrap();
    let dm2 = dm_full.filter(&keep2, true).unwrap();

    let dir = tempdir().unwrap();

    // Without intersect_ids the mismatch is fatal.
    let err = mantel(
        dir.path(),
        &dm1,
        &dm2,
        CorrelationMethod::Pearson,
        99,
        false,
        "dm1",
        "dm2",
        42,
    )
    .unwrap_err();
    assert!(err.to_string().contains("s0") && err.to_string().contains("s11"));

    // With intersect_ids the shared 10 samples are used.
    let report = mantel(
        dir.path(),
        &dm1,
        &dm2,
        CorrelationMethod::Pearson,
        99,
        true,
        "dm1",
        "dm2",
        42,
    )
    .unwrap();
    assert_eq!(report.mismatched_ids, vec!["s0", "s11"]);
    assert_eq!(report.sample_size, 10);
    assert!((report.statistic - 1.0).abs() < 1e-10);
}

#[test]
fn rarefaction_then_significance_workflow() {
    // Rarefy once, recompute distances, and re-test: the group signal
    // must survive subsampling.
    let table = create_synthetic_table();
    let rarefied = rarefy(&table, 400, 7).unwrap();
    assert_eq!(rarefied.n_samples(), 12);
    for &total in &rarefied.sample_sums() {
        assert_eq!(total, 400);
    }

    let dm = beta_diversity(BetaMetric::BrayCurtis, &rarefied, None).unwrap();
    let dir = tempdir().unwrap();
    let report = beta_group_significance(
        dir.path(),
        &dm,
        &community_column(),
        TestMethod::Anosim,
        false,
        199,
        42,
    )
    .unwrap();

    assert!(report.result.statistic > 0.5, "R = {}", report.result.statistic);
    assert!(report.result.p_value < 0.05);
}

#[test]
fn artifacts_are_written_into_output_dir() {
    let table = create_synthetic_table();
    let dm = beta_diversity(BetaMetric::BrayCurtis, &table, None).unwrap();
    let dir = tempdir().unwrap();
    let out: &Path = dir.path();

    beta_group_significance(
        out,
        &dm,
        &community_column(),
        TestMethod::Permanova,
        true,
        99,
        42,
    )
    .unwrap();

    let names: Vec<String> = fs::read_dir(out)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert!(names.contains(&"permanova-group-significance.tsv".to_string()));
    assert!(names.contains(&"permanova-pairwise.csv".to_string()));
}
