//! Pearson and Spearman correlation.

use crate::error::{BetaDivError, Result};
use crate::stats::rank::rank_average;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Correlation method for Mantel-style tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CorrelationMethod {
    Spearman,
    Pearson,
}

impl CorrelationMethod {
    const CHOICES: [&'static str; 2] = ["spearman", "pearson"];

    /// Parse a method name.
    ///
    /// # Errors
    ///
    /// Returns an [`BetaDivError::InvalidOption`] listing the valid names.
    pub fn from_name(name: &str) -> Result<Self> {
        match name {
            "spearman" => Ok(Self::Spearman),
            "pearson" => Ok(Self::Pearson),
            _ => Err(BetaDivError::invalid_option(
                "correlation method",
                name,
                &Self::CHOICES,
            )),
        }
    }

    /// Lowercase method name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Spearman => "spearman",
            Self::Pearson => "pearson",
        }
    }

    /// Human-readable test statistic label.
    pub fn statistic_name(&self) -> &'static str {
        match self {
            Self::Spearman => "Spearman rho",
            Self::Pearson => "Pearson r",
        }
    }
}

/// Pearson product-moment correlation coefficient.
///
/// Returns 0.0 when either series has zero variance.
///
/// # Errors
///
/// Returns an error if lengths differ or fewer than 2 observations.
pub fn pearson(x: &[f64], y: &[f64]) -> Result<f64> {
    validate_paired(x, y)?;

    let n = x.len() as f64;
    let mean_x: f64 = x.iter().sum::<f64>() / n;
    let mean_y: f64 = y.iter().sum::<f64>() / n;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (xi, yi) in x.iter().zip(y.iter()) {
        let dx = xi - mean_x;
        let dy = yi - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    let denom = (var_x * var_y).sqrt();
    if denom == 0.0 {
        return Ok(0.0);
    }
    Ok(cov / denom)
}

/// Spearman rank correlation: Pearson on average-tie ranks.
pub fn spearman(x: &[f64], y: &[f64]) -> Result<f64> {
    validate_paired(x, y)?;
    let rx = rank_average(x);
    let ry = rank_average(y);
    pearson(&rx, &ry)
}

/// Correlate with the chosen method.
pub fn correlate(method: CorrelationMethod, x: &[f64], y: &[f64]) -> Result<f64> {
    match method {
        CorrelationMethod::Pearson => pearson(x, y),
        CorrelationMethod::Spearman => spearman(x, y),
    }
}

fn validate_paired(x: &[f64], y: &[f64]) -> Result<()> {
    if x.len() != y.len() {
        return Err(BetaDivError::Numerical(format!(
            "correlation: series must have the same length ({} vs {})",
            x.len(),
            y.len()
        )));
    }
    if x.len() < 2 {
        return Err(BetaDivError::Numerical(
            "correlation: need at least 2 observations".to_string(),
        ));
    }
    Ok(())
}

/// A labeled square matrix of pairwise correlation statistics.
///
/// Produced by the rarefaction driver, one row/column per iteration; the
/// diagonal is fixed at 1.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrelationMatrix {
    labels: Vec<String>,
    /// Flat row-major storage (n × n).
    data: Vec<f64>,
}

impl CorrelationMatrix {
    /// Create an identity-diagonal matrix for the given labels.
    pub fn new(labels: Vec<String>) -> Self {
        let n = labels.len();
        let mut data = vec![0.0; n * n];
        for i in 0..n {
            data[i * n + i] = 1.0;
        }
        Self { labels, data }
    }

    /// Set the symmetric pair (i, j) and (j, i).
    pub fn set(&mut self, i: usize, j: usize, value: f64) {
        let n = self.labels.len();
        self.data[i * n + j] = value;
        self.data[j * n + i] = value;
    }

    /// Value at (i, j).
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.data[i * self.labels.len() + j]
    }

    /// Number of rows/columns.
    pub fn size(&self) -> usize {
        self.labels.len()
    }

    /// Row/column labels.
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Write as a square TSV matrix with a label header and row labels.
    pub fn to_tsv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);

        for label in &self.labels {
            write!(writer, "\t{}", label)?;
        }
        writeln!(writer)?;

        for (i, label) in self.labels.iter().enumerate() {
            write!(writer, "{}", label)?;
            for j in 0..self.size() {
                write!(writer, "\t{}", self.get(i, j))?;
            }
            writeln!(writer)?;
        }

        Ok(())
    }
}
