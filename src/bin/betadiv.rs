//! betadiv - Beta-diversity analysis CLI
//!
//! Command-line interface for the beta-diversity analysis drivers. All
//! statistics live in the library; this binary only parses arguments,
//! loads TSV inputs, and prints result summaries.

use betadiv::prelude::*;
use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::path::PathBuf;

/// CLI-friendly group significance method.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliTestMethod {
    /// Permutational multivariate analysis of variance
    Permanova,
    /// Analysis of similarities
    Anosim,
}

impl From<CliTestMethod> for TestMethod {
    fn from(method: CliTestMethod) -> Self {
        match method {
            CliTestMethod::Permanova => TestMethod::Permanova,
            CliTestMethod::Anosim => TestMethod::Anosim,
        }
    }
}

/// CLI-friendly correlation method.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliCorrelation {
    Spearman,
    Pearson,
}

impl From<CliCorrelation> for CorrelationMethod {
    fn from(method: CliCorrelation) -> Self {
        match method {
            CliCorrelation::Spearman => CorrelationMethod::Spearman,
            CliCorrelation::Pearson => CorrelationMethod::Pearson,
        }
    }
}

/// CLI-friendly beta-diversity metric.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliMetric {
    Braycurtis,
    Jaccard,
    UnweightedUnifrac,
    WeightedUnifrac,
}

impl From<CliMetric> for BetaMetric {
    fn from(metric: CliMetric) -> Self {
        match metric {
            CliMetric::Braycurtis => BetaMetric::BrayCurtis,
            CliMetric::Jaccard => BetaMetric::Jaccard,
            CliMetric::UnweightedUnifrac => BetaMetric::UnweightedUnifrac,
            CliMetric::WeightedUnifrac => BetaMetric::WeightedUnifrac,
        }
    }
}

/// Beta-diversity statistics for microbiome sample sets
#[derive(Parser)]
#[command(name = "betadiv")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Find the metadata variable subsets best explaining community distances
    Bioenv {
        /// Path to distance matrix TSV
        #[arg(short, long)]
        distance_matrix: PathBuf,

        /// Path to metadata TSV
        #[arg(short, long)]
        metadata: PathBuf,

        /// Output directory for result tables
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Test whether groups of samples differ (PERMANOVA/ANOSIM)
    GroupSignificance {
        /// Path to distance matrix TSV
        #[arg(short, long)]
        distance_matrix: PathBuf,

        /// Path to metadata TSV
        #[arg(short, long)]
        metadata: PathBuf,

        /// Metadata column holding the grouping
        #[arg(short, long)]
        column: String,

        /// Test method
        #[arg(long, value_enum, default_value = "permanova")]
        method: CliTestMethod,

        /// Also run pairwise comparisons between all group pairs
        #[arg(long)]
        pairwise: bool,

        /// Number of label permutations
        #[arg(short, long, default_value_t = 999)]
        permutations: usize,

        /// Random seed
        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Output directory for result tables
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Assess metric robustness under repeated rarefaction
    BetaRarefaction {
        /// Path to feature table TSV (features x samples)
        #[arg(short, long)]
        table: PathBuf,

        /// Beta-diversity metric
        #[arg(long, value_enum)]
        metric: CliMetric,

        /// Per-sample subsampling depth
        #[arg(short, long)]
        sampling_depth: u64,

        /// Number of rarefaction iterations
        #[arg(short, long, default_value_t = 10)]
        iterations: usize,

        /// Path to a Newick phylogeny (required for UniFrac metrics)
        #[arg(long)]
        phylogeny: Option<PathBuf>,

        /// Correlation method between iterations
        #[arg(long, value_enum, default_value = "spearman")]
        correlation_method: CliCorrelation,

        /// Color scheme passed through to the rendering layer
        #[arg(long, default_value = "BrBG")]
        color_scheme: String,

        /// Random seed
        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Output directory for result tables
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Mantel correlation between two distance matrices
    Mantel {
        /// Path to the first distance matrix TSV
        #[arg(long)]
        dm1: PathBuf,

        /// Path to the second distance matrix TSV
        #[arg(long)]
        dm2: PathBuf,

        /// Correlation method
        #[arg(long, value_enum, default_value = "spearman")]
        method: CliCorrelation,

        /// Number of permutations
        #[arg(short, long, default_value_t = 999)]
        permutations: usize,

        /// Discard mismatched ids instead of failing
        #[arg(long)]
        intersect_ids: bool,

        /// Display label for the first matrix
        #[arg(long, default_value = "Distance Matrix 1")]
        label1: String,

        /// Display label for the second matrix
        #[arg(long, default_value = "Distance Matrix 2")]
        label2: String,

        /// Random seed
        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Output directory for result tables
        #[arg(short, long)]
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Bioenv {
            distance_matrix,
            metadata,
            output,
        } => {
            let dm = DistanceMatrix::from_tsv(distance_matrix)?;
            let metadata = Metadata::from_tsv(metadata)?;
            fs::create_dir_all(&output)?;

            let report = bioenv(&output, &dm, &metadata)?;
            println!(
                "BIOENV: {} of {} samples used",
                report.filtered_samples, report.initial_samples
            );
            if !report.filtered_categorical_cols.is_empty() {
                println!(
                    "Dropped categorical columns: {}",
                    report.filtered_categorical_cols.join(", ")
                );
            }
            if !report.filtered_zero_variance_cols.is_empty() {
                println!(
                    "Dropped zero-variance columns: {}",
                    report.filtered_zero_variance_cols.join(", ")
                );
            }
            if let Some(best) = report.result.best() {
                println!(
                    "Best subset (size {}): {} (rho = {:.4})",
                    best.size,
                    best.variables.join(", "),
                    best.correlation
                );
            }
        }

        Commands::GroupSignificance {
            distance_matrix,
            metadata,
            column,
            method,
            pairwise,
            permutations,
            seed,
            output,
        } => {
            let dm = DistanceMatrix::from_tsv(distance_matrix)?;
            let metadata = Metadata::from_tsv(metadata)?;
            let column = metadata.category(&column)?;
            fs::create_dir_all(&output)?;

            let report = beta_group_significance(
                &output,
                &dm,
                &column,
                method.into(),
                pairwise,
                permutations,
                seed,
            )?;
            println!(
                "{}: {} = {:.4}, p = {} ({} samples, {} groups, {} permutations)",
                report.result.method,
                report.result.statistic_name,
                report.result.statistic,
                report.result.p_value,
                report.result.sample_size,
                report.result.n_groups,
                report.result.permutations
            );
            if let Some(rows) = &report.pairwise {
                println!("Pairwise comparisons: {}", rows.len());
            }
        }

        Commands::BetaRarefaction {
            table,
            metric,
            sampling_depth,
            iterations,
            phylogeny,
            correlation_method,
            color_scheme,
            seed,
            output,
        } => {
            let table = FeatureTable::from_tsv(table)?;
            let tree = match phylogeny {
                Some(path) => Some(PhyloTree::from_newick(&fs::read_to_string(path)?)?),
                None => None,
            };
            fs::create_dir_all(&output)?;

            let report = beta_rarefaction(
                &output,
                &table,
                metric.into(),
                sampling_depth,
                iterations,
                tree.as_ref(),
                correlation_method.into(),
                &color_scheme,
                seed,
            )?;

            let n = report.correlations.size();
            let mut min_corr = f64::INFINITY;
            for i in 0..n {
                for j in (i + 1)..n {
                    min_corr = min_corr.min(report.correlations.get(i, j));
                }
            }
            println!(
                "Beta rarefaction ({}, depth {}): {} iterations, min pairwise {} = {:.4}",
                report.metric,
                report.sampling_depth,
                report.iterations,
                report.correlation_method.statistic_name(),
                min_corr
            );
        }

        Commands::Mantel {
            dm1,
            dm2,
            method,
            permutations,
            intersect_ids,
            label1,
            label2,
            seed,
            output,
        } => {
            let dm1 = DistanceMatrix::from_tsv(dm1)?;
            let dm2 = DistanceMatrix::from_tsv(dm2)?;
            fs::create_dir_all(&output)?;

            let report = mantel(
                &output,
                &dm1,
                &dm2,
                method.into(),
                permutations,
                intersect_ids,
                &label1,
                &label2,
                seed,
            )?;
            println!(
                "Mantel: {} = {:.4}, p = {} ({} samples, {} permutations)",
                report.method.statistic_name(),
                report.statistic,
                report.p_value,
                report.sample_size,
                report.permutations
            );
            if !report.mismatched_ids.is_empty() {
                println!(
                    "Discarded {} mismatched id(s): {}",
                    report.mismatched_ids.len(),
                    report.mismatched_ids.join(", ")
                );
            }
        }
    }

    Ok(())
}
