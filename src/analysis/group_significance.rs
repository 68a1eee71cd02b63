//! Beta-diversity group significance: PERMANOVA/ANOSIM with pairwise
//! comparisons and per-group distance boxplot data.

use crate::align::align_category;
use crate::data::{CategoryColumn, DistanceMatrix, Grouping};
use crate::error::{BetaDivError, Result};
use crate::stats::correction::correct_bh;
use crate::stats::permutation::{anosim, permanova, SignificanceResult};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Group significance test method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TestMethod {
    Permanova,
    Anosim,
}

impl TestMethod {
    const CHOICES: [&'static str; 2] = ["permanova", "anosim"];

    /// Parse a method name.
    ///
    /// # Errors
    ///
    /// Returns an [`BetaDivError::InvalidOption`] listing the valid names.
    pub fn from_name(name: &str) -> Result<Self> {
        match name {
            "permanova" => Ok(Self::Permanova),
            "anosim" => Ok(Self::Anosim),
            _ => Err(BetaDivError::invalid_option(
                "group significance method",
                name,
                &Self::CHOICES,
            )),
        }
    }

    /// Lowercase method name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Permanova => "permanova",
            Self::Anosim => "anosim",
        }
    }

    fn run(
        &self,
        dm: &DistanceMatrix,
        groups: &[usize],
        permutations: usize,
        seed: u64,
    ) -> Result<SignificanceResult> {
        match self {
            Self::Permanova => permanova(dm, groups, permutations, seed),
            Self::Anosim => anosim(dm, groups, permutations, seed),
        }
    }
}

/// Distance boxplot data for one group: within-group distances first, then
/// between-group distances for every other group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupBoxplotData {
    /// The target group label.
    pub group: String,
    /// One distance list per box, in label order.
    pub distances: Vec<Vec<f64>>,
    /// X-axis labels of the form `"<label> (n=<count>)"`.
    pub labels: Vec<String>,
}

/// Extract within- and between-group distance lists for one group.
///
/// The within-group list (all unordered pairs inside the target group,
/// counted once each) comes first; then one list per other group in the
/// grouping's iteration order, pairing every target sample with every
/// sample of the other group.
pub fn distance_boxplot_data(
    dm: &DistanceMatrix,
    group_label: &str,
    grouping: &Grouping,
) -> Result<GroupBoxplotData> {
    let group = grouping
        .get(group_label)
        .ok_or_else(|| BetaDivError::InvalidParameter(format!("Unknown group '{}'", group_label)))?;

    let mut distances = Vec::new();
    let mut labels = Vec::new();

    let mut within = Vec::new();
    for (i, sid1) in group.iter().enumerate() {
        for sid2 in &group[..i] {
            within.push(dm.distance(sid1, sid2)?);
        }
    }
    labels.push(format!("{} (n={})", group_label, within.len()));
    distances.push(within);

    for (other_label, other_group) in grouping.iter() {
        if other_label == group_label {
            continue;
        }
        let mut between = Vec::with_capacity(group.len() * other_group.len());
        for sid1 in group {
            for sid2 in other_group {
                between.push(dm.distance(sid1, sid2)?);
            }
        }
        labels.push(format!("{} (n={})", other_label, between.len()));
        distances.push(between);
    }

    Ok(GroupBoxplotData {
        group: group_label.to_string(),
        distances,
        labels,
    })
}

/// One pairwise group comparison row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairwiseComparison {
    pub group1: String,
    pub group2: String,
    pub sample_size: usize,
    pub permutations: usize,
    pub statistic: f64,
    pub p_value: f64,
    /// Benjamini-Hochberg corrected q-value.
    pub q_value: f64,
}

/// Full result of a group significance analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupSignificanceReport {
    /// Method that produced the result.
    pub method: String,
    /// The global test result.
    pub result: SignificanceResult,
    /// Distance matrix size before metadata alignment.
    pub initial_samples: usize,
    /// Distance matrix size after metadata alignment.
    pub filtered_samples: usize,
    /// Group labels in display order.
    pub group_labels: Vec<String>,
    /// Boxplot distance data, one entry per group in display order.
    pub boxplots: Vec<GroupBoxplotData>,
    /// Pairwise comparisons sorted by (group1, group2); None when pairwise
    /// mode was not requested.
    pub pairwise: Option<Vec<PairwiseComparison>>,
}

impl GroupSignificanceReport {
    /// Serialize the report for the rendering layer.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Run a group significance analysis.
///
/// Aligns the metadata column and the distance matrix, runs the global
/// test, extracts per-group boxplot data, and (optionally) re-runs the
/// test on every unordered pair of groups with BH-corrected q-values.
/// Writes `<method>-group-significance.tsv` and, in pairwise mode,
/// `<method>-pairwise.csv` into `output_dir`.
#[allow(clippy::too_many_arguments)]
pub fn beta_group_significance(
    output_dir: &Path,
    dm: &DistanceMatrix,
    column: &CategoryColumn,
    method: TestMethod,
    pairwise: bool,
    permutations: usize,
    seed: u64,
) -> Result<GroupSignificanceReport> {
    let aligned = align_category(dm, column)?;
    let grouping = Grouping::from_column(&aligned.column)?;
    let group_indices = grouping.integer_labels(aligned.distance_matrix.ids())?;

    let result = method.run(&aligned.distance_matrix, &group_indices, permutations, seed)?;

    let mut boxplots = Vec::with_capacity(grouping.len());
    for label in grouping.labels() {
        boxplots.push(distance_boxplot_data(
            &aligned.distance_matrix,
            label,
            &grouping,
        )?);
    }

    let pairwise_rows = if pairwise {
        Some(run_pairwise(
            &aligned.distance_matrix,
            &aligned.column,
            &grouping,
            method,
            permutations,
            seed,
        )?)
    } else {
        None
    };

    write_global_result(output_dir, method, &result)?;
    if let Some(rows) = &pairwise_rows {
        write_pairwise_csv(output_dir, method, &result.statistic_name, rows)?;
    }

    Ok(GroupSignificanceReport {
        method: method.name().to_string(),
        result,
        initial_samples: aligned.initial_samples,
        filtered_samples: aligned.filtered_samples,
        group_labels: grouping.labels().to_vec(),
        boxplots,
        pairwise: pairwise_rows,
    })
}

/// Re-run the test on every unordered pair of groups.
///
/// Rows are produced in the grouping's iteration order; q-values are
/// computed across that ordering and attached before the final sort by
/// (group1, group2).
fn run_pairwise(
    dm: &DistanceMatrix,
    column: &CategoryColumn,
    grouping: &Grouping,
    method: TestMethod,
    permutations: usize,
    seed: u64,
) -> Result<Vec<PairwiseComparison>> {
    let labels = grouping.labels();
    let mut rows: Vec<PairwiseComparison> = Vec::new();

    for i in 0..labels.len() {
        for j in (i + 1)..labels.len() {
            let mut pair_ids: Vec<String> = grouping.members(i).to_vec();
            pair_ids.extend_from_slice(grouping.members(j));

            let pair_dm = dm.filter(&pair_ids, true)?;
            let pair_column = column.restrict(&pair_ids);
            let pair_grouping = Grouping::from_column(&pair_column)?;
            let pair_indices = pair_grouping.integer_labels(pair_dm.ids())?;

            let pair_seed = seed.wrapping_add((rows.len() + 1) as u64);
            let result = method.run(&pair_dm, &pair_indices, permutations, pair_seed)?;

            rows.push(PairwiseComparison {
                group1: labels[i].clone(),
                group2: labels[j].clone(),
                sample_size: result.sample_size,
                permutations: result.permutations,
                statistic: result.statistic,
                p_value: result.p_value,
                q_value: f64::NAN,
            });
        }
    }

    // Correct across the production ordering, then sort for output.
    let p_values: Vec<f64> = rows.iter().map(|r| r.p_value).collect();
    let q_values = correct_bh(&p_values);
    for (row, q) in rows.iter_mut().zip(q_values) {
        row.q_value = q;
    }

    rows.sort_by(|a, b| (&a.group1, &a.group2).cmp(&(&b.group1, &b.group2)));
    Ok(rows)
}

fn write_global_result(
    output_dir: &Path,
    method: TestMethod,
    result: &SignificanceResult,
) -> Result<()> {
    let path = output_dir.join(format!("{}-group-significance.tsv", method.name()));
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);

    writeln!(writer, "method name\t{}", result.method)?;
    writeln!(writer, "test statistic name\t{}", result.statistic_name)?;
    writeln!(writer, "sample size\t{}", result.sample_size)?;
    writeln!(writer, "number of groups\t{}", result.n_groups)?;
    writeln!(writer, "test statistic\t{}", result.statistic)?;
    writeln!(writer, "p-value\t{}", result.p_value)?;
    writeln!(writer, "number of permutations\t{}", result.permutations)?;
    Ok(())
}

fn write_pairwise_csv(
    output_dir: &Path,
    method: TestMethod,
    statistic_name: &str,
    rows: &[PairwiseComparison],
) -> Result<()> {
    let path = output_dir.join(format!("{}-pairwise.csv", method.name()));
    let mut writer = csv::Writer::from_path(path)?;

    writer.write_record([
        "Group 1",
        "Group 2",
        "Sample size",
        "Permutations",
        statistic_name,
        "p-value",
        "q-value",
    ])?;
    for row in rows {
        writer.write_record(&[
            row.group1.clone(),
            row.group2.clone(),
            row.sample_size.to_string(),
            row.permutations.to_string(),
            row.statistic.to_string(),
            row.p_value.to_string(),
            row.q_value.to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}
