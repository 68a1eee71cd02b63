//! Beta-diversity statistics for microbiome and ecology sample sets.
//!
//! This library computes distance-matrix-based community statistics and
//! packages them for reporting:
//!
//! - **BIOENV**: best subset of numeric metadata variables explaining
//!   community distance structure
//! - **Group significance**: PERMANOVA/ANOSIM over a metadata category,
//!   with pairwise post-hoc comparisons and Benjamini-Hochberg q-values
//! - **Beta rarefaction**: robustness of a beta-diversity metric under
//!   repeated random subsampling, measured by pairwise Mantel correlation
//! - **Mantel**: correlation between two distance matrices with explicit
//!   id-mismatch diagnostics
//!
//! # Overview
//!
//! The library is organized into composable modules:
//!
//! - **data**: Core data structures (DistanceMatrix, FeatureTable,
//!   Metadata, Grouping, PhyloTree)
//! - **align**: Sample-set alignment between matrices and metadata
//! - **stats**: Permutation tests, Mantel, BIOENV, correlation, and
//!   multiple-testing correction
//! - **diversity**: Beta-diversity metrics (Bray-Curtis, Jaccard,
//!   UniFrac) and rarefaction
//! - **analysis**: One driver per analysis, writing tabular artifacts and
//!   returning serializable reports for a rendering layer
//!
//! # Example
//!
//! ```no_run
//! use betadiv::prelude::*;
//! use std::path::Path;
//!
//! // Load data
//! let dm = DistanceMatrix::from_tsv("distances.tsv").unwrap();
//! let metadata = Metadata::from_tsv("metadata.tsv").unwrap();
//! let column = metadata.category("body-site").unwrap();
//!
//! // Test whether body sites differ, with pairwise comparisons
//! let report = beta_group_significance(
//!     Path::new("out"),
//!     &dm,
//!     &column,
//!     TestMethod::Permanova,
//!     true,
//!     999,
//!     42,
//! )
//! .unwrap();
//! println!("p = {}", report.result.p_value);
//! ```

pub mod align;
pub mod analysis;
pub mod data;
pub mod diversity;
pub mod error;
pub mod stats;

/// Convenient re-exports for common usage.
pub mod prelude {
    pub use crate::align::{
        align_category, align_distance_matrices, align_numeric_metadata, CategoryAlignment,
        MatrixAlignment, NumericAlignment,
    };
    pub use crate::analysis::{
        beta_group_significance, beta_rarefaction, bioenv, distance_boxplot_data, mantel,
        BetaRarefactionReport, BioenvReport, GroupBoxplotData, GroupSignificanceReport,
        MantelReport, PairwiseComparison, TestMethod,
    };
    pub use crate::data::{
        CategoryColumn, DistanceMatrix, FeatureTable, Grouping, Metadata, PhyloTree, Variable,
        VariableType,
    };
    pub use crate::diversity::{beta_diversity, rarefy, BetaMetric};
    pub use crate::error::{BetaDivError, Result};
    pub use crate::stats::{
        correct_bh, BioenvResult, BioenvRow, CorrelationMatrix, CorrelationMethod, MantelResult,
        SignificanceResult,
    };
}
